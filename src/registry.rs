//! The identity registry: one stable obfuscated name per discovered symbol.
//!
//! Identity is keyed by `(kind, case-folded name)`. Each kind owns an
//! independent namespace, but generated names draw from one run-wide pool so
//! no two generated names ever look alike, even across kinds. Safety-listed
//! and skip-listed names are returned unchanged and never enter a table.
//!
//! The registry is populated during the discovery pass and read-only
//! afterwards; the rewrite pass only sees the exported [`MappingTables`].

use crate::config::{Config, SafetyList};
use crate::error::{Result, YsnpError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// The closed set of renaming namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Function,
    Method,
    Class,
    File,
}

impl SymbolKind {
    /// Short prefix carried by every generated name of this kind.
    fn tag(self) -> &'static str {
        match self {
            SymbolKind::Variable => "v",
            SymbolKind::Function => "fn",
            SymbolKind::Method => "m",
            SymbolKind::Class => "c",
            SymbolKind::File => "file",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::File => "file",
        }
    }
}

/// The five per-kind mapping tables, case-folded original name to obfuscated
/// name. `BTreeMap` keeps exports key-ordered and diffable.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MappingTables {
    pub variables: BTreeMap<String, String>,
    pub functions: BTreeMap<String, String>,
    pub methods: BTreeMap<String, String>,
    pub classes: BTreeMap<String, String>,
    pub files: BTreeMap<String, String>,
}

impl MappingTables {
    pub fn table(&self, kind: SymbolKind) -> &BTreeMap<String, String> {
        match kind {
            SymbolKind::Variable => &self.variables,
            SymbolKind::Function => &self.functions,
            SymbolKind::Method => &self.methods,
            SymbolKind::Class => &self.classes,
            SymbolKind::File => &self.files,
        }
    }

    fn table_mut(&mut self, kind: SymbolKind) -> &mut BTreeMap<String, String> {
        match kind {
            SymbolKind::Variable => &mut self.variables,
            SymbolKind::Function => &mut self.functions,
            SymbolKind::Method => &mut self.methods,
            SymbolKind::Class => &mut self.classes,
            SymbolKind::File => &mut self.files,
        }
    }

    /// Case-insensitive lookup. No generation: a miss means the name was
    /// skip-listed, safety-listed, or never declared, and stays as-is.
    pub fn get(&self, kind: SymbolKind, name: &str) -> Option<&str> {
        self.table(kind).get(&name.to_lowercase()).map(String::as_str)
    }

    /// Map a file name (stem plus extension) through the file table,
    /// preserving the extension. Returns `None` when the stem is unmapped.
    pub fn mapped_file_name(&self, file_name: &str) -> Option<String> {
        let (stem, ext) = split_file_name(file_name);
        let obfuscated = self.files.get(&stem.to_lowercase())?;
        Some(match ext {
            Some(ext) => format!("{obfuscated}.{ext}"),
            None => obfuscated.clone(),
        })
    }

    pub fn total_mappings(&self) -> usize {
        self.variables.len()
            + self.functions.len()
            + self.methods.len()
            + self.classes.len()
            + self.files.len()
    }
}

/// File identity is keyed by stem only; the extension is reattached after
/// mapping. Splitting at the last dot keeps multi-dot stems intact.
fn split_file_name(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    }
}

/// Merged, case-folded view of the safety list and the configured skip and
/// ignore lists. Built once per run.
#[derive(Debug)]
struct Policy {
    rename_files: bool,
    skip_variables: HashSet<String>,
    skip_functions: HashSet<String>,
    skip_methods: HashSet<String>,
    skip_classes: HashSet<String>,
    skip_files: HashSet<String>,
    safe_variables: HashSet<String>,
    safe_functions: HashSet<String>,
    safe_classes: HashSet<String>,
    ignore_files: HashSet<String>,
    ignore_directories: Vec<String>,
}

fn lower_set(names: &[String]) -> HashSet<String> {
    names.iter().map(|n| n.to_lowercase()).collect()
}

impl Policy {
    fn new(config: &Config, safety: &SafetyList) -> Self {
        Self {
            rename_files: config.rename_files,
            skip_variables: lower_set(&config.skip.variables),
            skip_functions: lower_set(&config.skip.functions),
            skip_methods: lower_set(&config.skip.methods),
            skip_classes: lower_set(&config.skip.classes),
            skip_files: lower_set(&config.skip.files),
            safe_variables: lower_set(&safety.variables),
            safe_functions: lower_set(&safety.functions),
            safe_classes: lower_set(&safety.classes),
            ignore_files: lower_set(&config.ignore_files),
            ignore_directories: config
                .ignore_directories
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
        }
    }

    /// Skip decision for an already case-folded name. Methods consult the
    /// function safety list too: a method declaration is syntactically a
    /// function, and the built-in safe functions include the magic methods.
    fn should_skip(&self, kind: SymbolKind, lower: &str) -> bool {
        match kind {
            SymbolKind::Variable => {
                self.safe_variables.contains(lower) || self.skip_variables.contains(lower)
            }
            SymbolKind::Function => {
                self.safe_functions.contains(lower) || self.skip_functions.contains(lower)
            }
            SymbolKind::Method => {
                self.safe_functions.contains(lower) || self.skip_methods.contains(lower)
            }
            SymbolKind::Class => {
                self.safe_classes.contains(lower) || self.skip_classes.contains(lower)
            }
            SymbolKind::File => self.skip_files.contains(lower),
        }
    }
}

/// Owns the mapping tables, the skip/safety policy, and the unique name
/// generator for one run.
pub struct NameRegistry {
    policy: Policy,
    tables: MappingTables,
    used_names: HashSet<String>,
    rng: SmallRng,
}

impl NameRegistry {
    pub fn new(config: &Config, safety: &SafetyList) -> Self {
        Self {
            policy: Policy::new(config, safety),
            tables: MappingTables::default(),
            used_names: HashSet::new(),
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Resolve a symbol to its obfuscated name, generating one on first
    /// sight. Idempotent: the same `(kind, case-folded name)` always yields
    /// the same result within a run. Safety- and skip-listed names come back
    /// unchanged and never occupy a table slot.
    pub fn resolve(&mut self, kind: SymbolKind, name: &str) -> Result<String> {
        let lower = name.to_lowercase();

        // The implicit receiver is a structural keyword, not a user symbol.
        if kind == SymbolKind::Variable && lower == "this" {
            return Ok(name.to_string());
        }

        if self.policy.should_skip(kind, &lower) {
            return Ok(name.to_string());
        }

        self.intern(kind, lower)
    }

    /// Resolve a file path. Identity when renaming is disabled or the file
    /// name is skip-listed; otherwise the stem maps through the file table
    /// and the path is rebuilt with the original directory and extension.
    ///
    /// Keyed by stem only: two files with the same stem in different
    /// directories share one obfuscated stem. That is specified behavior.
    pub fn resolve_file(&mut self, path: &Path) -> Result<PathBuf> {
        if !self.policy.rename_files {
            return Ok(path.to_path_buf());
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(path.to_path_buf());
        };
        if self.policy.skip_files.contains(&file_name.to_lowercase()) {
            return Ok(path.to_path_buf());
        }

        let (stem, ext) = split_file_name(file_name);
        let obfuscated = self.intern(SymbolKind::File, stem.to_lowercase())?;
        let new_name = match ext {
            Some(ext) => format!("{obfuscated}.{ext}"),
            None => obfuscated,
        };
        Ok(path.with_file_name(new_name))
    }

    /// Whether a path is excluded from both passes by the ignore rules.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let lower = path.to_string_lossy().to_lowercase();
        for dir in &self.policy.ignore_directories {
            if lower.contains(&format!("{dir}{MAIN_SEPARATOR}")) {
                return true;
            }
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => self.policy.ignore_files.contains(&name.to_lowercase()),
            None => false,
        }
    }

    pub fn rename_files_enabled(&self) -> bool {
        self.policy.rename_files
    }

    /// Read access to the mapping tables for the rewrite pass and for
    /// persistence.
    pub fn tables(&self) -> &MappingTables {
        &self.tables
    }

    fn intern(&mut self, kind: SymbolKind, key: String) -> Result<String> {
        if let Some(existing) = self.tables.table(kind).get(&key) {
            return Ok(existing.clone());
        }
        let generated = self.generate(kind.tag());
        // An existing entry here means the uniqueness check was bypassed;
        // never overwrite a mapping.
        if self
            .tables
            .table_mut(kind)
            .insert(key.clone(), generated.clone())
            .is_some()
        {
            return Err(YsnpError::MappingCollision {
                kind: kind.as_str(),
                name: key,
            });
        }
        Ok(generated)
    }

    /// Kind tag plus eight random bytes in hex. The used-name set spans all
    /// kinds, so a generated name is never reissued within a run.
    fn generate(&mut self, tag: &str) -> String {
        loop {
            let candidate = format!("{tag}_{:016x}", self.rng.random::<u64>());
            if self.used_names.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> NameRegistry {
        let config = Config::builder()
            .source_root("in")
            .destination_root("out")
            .build();
        NameRegistry::new(&config, &SafetyList::default())
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut reg = registry();
        let first = reg.resolve(SymbolKind::Class, "Order").unwrap();
        let second = reg.resolve(SymbolKind::Class, "Order").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let mut reg = registry();
        let a = reg.resolve(SymbolKind::Variable, "userId").unwrap();
        let b = reg.resolve(SymbolKind::Variable, "USERID").unwrap();
        let c = reg.resolve(SymbolKind::Variable, "userid").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_kinds_are_independent_namespaces() {
        let mut reg = registry();
        let as_class = reg.resolve(SymbolKind::Class, "Foo").unwrap();
        let as_function = reg.resolve(SymbolKind::Function, "Foo").unwrap();
        let as_method = reg.resolve(SymbolKind::Method, "Foo").unwrap();
        assert_ne!(as_class, as_function);
        assert_ne!(as_function, as_method);
        assert!(as_class.starts_with("c_"));
        assert!(as_function.starts_with("fn_"));
        assert!(as_method.starts_with("m_"));
    }

    #[test]
    fn test_skip_listed_name_passes_through_and_is_not_exported() {
        let config = Config::builder()
            .source_root("in")
            .destination_root("out")
            .skip_classes(vec!["Logger".into()])
            .build();
        let mut reg = NameRegistry::new(&config, &SafetyList::default());

        for variant in ["Logger", "LOGGER", "logger"] {
            assert_eq!(reg.resolve(SymbolKind::Class, variant).unwrap(), variant);
        }
        assert!(reg.tables().classes.is_empty());
    }

    #[test]
    fn test_method_consults_function_safety_list() {
        let mut reg = registry();
        assert_eq!(
            reg.resolve(SymbolKind::Method, "__construct").unwrap(),
            "__construct"
        );
        assert!(reg.tables().methods.is_empty());
    }

    #[test]
    fn test_receiver_is_never_mapped() {
        let mut reg = registry();
        assert_eq!(reg.resolve(SymbolKind::Variable, "this").unwrap(), "this");
        assert_eq!(reg.resolve(SymbolKind::Variable, "This").unwrap(), "This");
        assert!(reg.tables().variables.is_empty());
    }

    #[test]
    fn test_generated_names_are_unique() {
        let mut reg = registry();
        let mut seen = HashSet::new();
        for i in 0..1000 {
            let name = reg.resolve(SymbolKind::Variable, &format!("var{i}")).unwrap();
            assert!(seen.insert(name));
        }
    }

    #[test]
    fn test_resolve_file_disabled_is_identity() {
        let mut reg = registry();
        let path = Path::new("lib/helpers.php");
        assert_eq!(reg.resolve_file(path).unwrap(), path);
        assert!(reg.tables().files.is_empty());
    }

    #[test]
    fn test_resolve_file_shares_stem_across_directories() {
        let config = Config::builder()
            .source_root("in")
            .destination_root("out")
            .rename_files(true)
            .build();
        let mut reg = NameRegistry::new(&config, &SafetyList::default());

        let a = reg.resolve_file(Path::new("lib/helpers.php")).unwrap();
        let b = reg.resolve_file(Path::new("admin/Helpers.php")).unwrap();
        assert_eq!(a.file_name(), b.file_name());
        assert_eq!(a.parent(), Some(Path::new("lib")));
        assert_eq!(b.parent(), Some(Path::new("admin")));
        assert_eq!(a.extension().unwrap(), "php");
        assert_eq!(reg.tables().files.len(), 1);
    }

    #[test]
    fn test_resolve_file_honors_skip_list() {
        let config = Config::builder()
            .source_root("in")
            .destination_root("out")
            .rename_files(true)
            .skip_files(vec!["index.php".into()])
            .build();
        let mut reg = NameRegistry::new(&config, &SafetyList::default());
        let path = Path::new("public/index.php");
        assert_eq!(reg.resolve_file(path).unwrap(), path);
    }

    #[test]
    fn test_should_ignore_matches_directories_and_files() {
        let config = Config::builder()
            .source_root("in")
            .destination_root("out")
            .ignore_files(vec!["bootstrap.php".into()])
            .ignore_directories(vec!["vendor".into()])
            .build();
        let reg = NameRegistry::new(&config, &SafetyList::default());

        assert!(reg.should_ignore(Path::new("app/vendor/lib.php")));
        assert!(reg.should_ignore(Path::new("app/Bootstrap.php")));
        assert!(!reg.should_ignore(Path::new("app/src/main.php")));
    }

    #[test]
    fn test_mapped_file_name_preserves_extension() {
        let config = Config::builder()
            .source_root("in")
            .destination_root("out")
            .rename_files(true)
            .build();
        let mut reg = NameRegistry::new(&config, &SafetyList::default());
        reg.resolve_file(Path::new("lib/helpers.php")).unwrap();

        let mapped = reg.tables().mapped_file_name("helpers.php").unwrap();
        assert!(mapped.starts_with("file_"));
        assert!(mapped.ends_with(".php"));
        assert!(reg.tables().mapped_file_name("unmapped.php").is_none());
    }
}
