//! Configuration management for the obfuscator.
//!
//! Two independent policy objects feed the engine: the project [`Config`]
//! (roots, skip lists, ignore rules, stripping toggles) and the built-in
//! [`SafetyList`] of names that must never be renamed. A user-supplied
//! safety file merges into the defaults; it never replaces them.

use crate::error::{Result, YsnpError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for an obfuscation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Root of the source tree to obfuscate.
    pub source_root: PathBuf,

    /// Root of the tree the rewritten files are written to.
    pub destination_root: PathBuf,

    /// Rename the files themselves, not only the symbols inside them.
    #[serde(default)]
    pub rename_files: bool,

    /// Per-kind opt-outs from renaming. Matched case-insensitively.
    #[serde(default)]
    pub skip: SkipLists,

    /// File names excluded from both passes entirely.
    #[serde(default)]
    pub ignore_files: Vec<String>,

    /// Directory names excluded from both passes. A path is ignored when it
    /// contains the directory name followed by a path separator.
    #[serde(default)]
    pub ignore_directories: Vec<String>,

    /// Drop all comment trivia during rewrite.
    #[serde(default)]
    pub strip_comments: bool,

    /// Collapse whitespace runs to single spaces during rewrite.
    #[serde(default)]
    pub strip_whitespace: bool,

    /// Remove line breaks from the rewritten output.
    #[serde(default)]
    pub strip_linebreaks: bool,
}

/// Project-specific names excluded from renaming, one list per symbol kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkipLists {
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| YsnpError::FileIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| YsnpError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the required fields. Fatal before any file is touched.
    pub fn validate(&self) -> Result<()> {
        if self.source_root.as_os_str().is_empty() {
            return Err(YsnpError::Config("source_root is not set".into()));
        }
        if self.destination_root.as_os_str().is_empty() {
            return Err(YsnpError::Config("destination_root is not set".into()));
        }
        if self.source_root == self.destination_root {
            return Err(YsnpError::Config(
                "source_root and destination_root must differ".into(),
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for creating configurations programmatically.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_root = path.into();
        self
    }

    pub fn destination_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.destination_root = path.into();
        self
    }

    pub fn rename_files(mut self, enable: bool) -> Self {
        self.config.rename_files = enable;
        self
    }

    pub fn skip_variables(mut self, names: Vec<String>) -> Self {
        self.config.skip.variables = names;
        self
    }

    pub fn skip_functions(mut self, names: Vec<String>) -> Self {
        self.config.skip.functions = names;
        self
    }

    pub fn skip_methods(mut self, names: Vec<String>) -> Self {
        self.config.skip.methods = names;
        self
    }

    pub fn skip_classes(mut self, names: Vec<String>) -> Self {
        self.config.skip.classes = names;
        self
    }

    pub fn skip_files(mut self, names: Vec<String>) -> Self {
        self.config.skip.files = names;
        self
    }

    pub fn ignore_files(mut self, names: Vec<String>) -> Self {
        self.config.ignore_files = names;
        self
    }

    pub fn ignore_directories(mut self, names: Vec<String>) -> Self {
        self.config.ignore_directories = names;
        self
    }

    pub fn strip_comments(mut self, enable: bool) -> Self {
        self.config.strip_comments = enable;
        self
    }

    pub fn strip_whitespace(mut self, enable: bool) -> Self {
        self.config.strip_whitespace = enable;
        self
    }

    pub fn strip_linebreaks(mut self, enable: bool) -> Self {
        self.config.strip_linebreaks = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Built-in names that must never be renamed, merged with the skip lists at
/// policy-evaluation time. Method lookups consult the function list too,
/// since a method declaration is syntactically a function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyList {
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
}

impl Default for SafetyList {
    fn default() -> Self {
        Self {
            variables: [
                "this", "GLOBALS", "_SERVER", "_GET", "_POST", "_REQUEST", "_SESSION",
                "_COOKIE", "_FILES", "_ENV",
            ]
            .map(String::from)
            .to_vec(),
            functions: [
                "__construct",
                "__destruct",
                "__call",
                "__callStatic",
                "__get",
                "__set",
                "__isset",
                "__unset",
                "__sleep",
                "__wakeup",
                "__serialize",
                "__unserialize",
                "__toString",
                "__invoke",
                "__clone",
                "__debugInfo",
                "main",
            ]
            .map(String::from)
            .to_vec(),
            classes: [
                "self",
                "parent",
                "static",
                "stdClass",
                "Exception",
                "Throwable",
                "ArrayAccess",
                "Countable",
                "Iterator",
                "IteratorAggregate",
                "JsonSerializable",
                "Stringable",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl SafetyList {
    /// Load a user safety file and merge it into the built-in defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| YsnpError::FileIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        let user: SafetyList = serde_json::from_str(&content)
            .map_err(|e| YsnpError::Config(format!("{}: {}", path.display(), e)))?;
        let mut merged = SafetyList::default();
        merged.variables.extend(user.variables);
        merged.functions.extend(user.functions);
        merged.classes.extend(user.classes);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_roots_and_toggles() {
        let config = Config::builder()
            .source_root("in")
            .destination_root("out")
            .rename_files(true)
            .strip_comments(true)
            .build();

        assert_eq!(config.source_root, PathBuf::from("in"));
        assert_eq!(config.destination_root, PathBuf::from("out"));
        assert!(config.rename_files);
        assert!(config.strip_comments);
        assert!(!config.strip_whitespace);
    }

    #[test]
    fn test_validate_rejects_missing_roots() {
        let config = Config::builder().source_root("in").build();
        assert!(matches!(config.validate(), Err(YsnpError::Config(_))));

        let config = Config::builder().destination_root("out").build();
        assert!(matches!(config.validate(), Err(YsnpError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_identical_roots() {
        let config = Config::builder()
            .source_root("same")
            .destination_root("same")
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_safety_defaults_cover_receiver_and_magic_methods() {
        let safety = SafetyList::default();
        assert!(safety.variables.iter().any(|v| v == "this"));
        assert!(safety.functions.iter().any(|f| f == "__construct"));
        assert!(safety.classes.iter().any(|c| c == "parent"));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "source_root": "src_php",
            "destination_root": "dist",
            "rename_files": true,
            "skip": { "classes": ["Logger"] },
            "ignore_directories": ["vendor"],
            "strip_comments": true
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.rename_files);
        assert_eq!(config.skip.classes, vec!["Logger".to_string()]);
        assert_eq!(config.ignore_directories, vec!["vendor".to_string()]);
        assert!(config.skip.variables.is_empty());
    }
}
