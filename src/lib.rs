//! ysnp - PHP source obfuscator.
//!
//! Renames classes, methods, functions, variables, and optionally the files
//! themselves, consistently across an entire source tree, and rewrites every
//! reference (calls, property accesses, type hints, `extends`/`implements`,
//! `new`, include paths) to match.
//!
//! # Architecture
//!
//! Two coordinated passes over the tree:
//!
//! - **Discovery** parses every file and harvests declaration sites into the
//!   [`registry::NameRegistry`], which owns symbol identity (one obfuscated
//!   name per case-folded name, per kind) and the skip/safety policy.
//! - **Rewrite** runs only after discovery has finished for *all* files. It
//!   replays each file against the frozen mapping tables, replacing every
//!   occurrence and rewriting include paths, then applies the optional
//!   comment/whitespace stripping.
//!
//! The hard phase barrier is what makes a symbol declared in one file and
//! referenced in another come out consistent regardless of traversal order.
//!
//! # Example
//!
//! ```no_run
//! use ysnp::{Config, Obfuscator, SafetyList};
//!
//! fn main() -> ysnp::Result<()> {
//!     let config = Config::builder()
//!         .source_root("app")
//!         .destination_root("dist")
//!         .rename_files(true)
//!         .build();
//!
//!     let mut obfuscator = Obfuscator::new(config, SafetyList::default())?;
//!     let report = obfuscator.run()?;
//!     println!("{} files rewritten", report.files_rewritten);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod discover;
pub mod error;
pub mod mappings;
pub mod parser;
pub mod registry;
pub mod rewrite;

pub use config::{Config, SafetyList};
pub use error::{Result, YsnpError};
pub use registry::{MappingTables, NameRegistry, SymbolKind};

use discover::{discover_tree, FileDiscovery};
use parser::PhpParser;
use rewrite::{rewrite_tree, RewriteOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A recoverable per-file failure, reported at the end of the run.
#[derive(Debug)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a full two-phase run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub files_discovered: usize,
    pub files_rewritten: usize,
    pub files_renamed: usize,
    pub symbols_mapped: usize,
    pub errors: Vec<FileError>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Orchestrates the two passes over a source tree.
///
/// The registry is mutated only during discovery. `run` persists the tables
/// between the phases; from that point on every lookup is read-only.
pub struct Obfuscator {
    config: Config,
    registry: NameRegistry,
    parser: PhpParser,
    failed: HashSet<PathBuf>,
}

impl Obfuscator {
    pub fn new(config: Config, safety: SafetyList) -> Result<Self> {
        config.validate()?;
        let registry = NameRegistry::new(&config, &safety);
        Ok(Self {
            config,
            registry,
            parser: PhpParser::new()?,
            failed: HashSet::new(),
        })
    }

    /// Whether the ignore rules exclude this path from both passes.
    pub fn should_ignore(&self, path: &Path) -> bool {
        self.registry.should_ignore(path)
    }

    /// Discovery for one file: parse, harvest declarations into the
    /// registry, and (when renaming) claim the file's own stem.
    pub fn discover(&mut self, path: &Path) -> Result<FileDiscovery> {
        let source = read_file(path)?;
        let tree = self.parser.parse(&source, path)?;
        let stats = discover_tree(&tree, &source, &mut self.registry)?;
        if let Some(name) = path.file_name() {
            self.registry.resolve_file(Path::new(name))?;
        }
        Ok(stats)
    }

    /// Rewrite one file against the frozen tables and write it to `dest`.
    pub fn rewrite(&mut self, source_path: &Path, dest_path: &Path) -> Result<()> {
        let source = read_file(source_path)?;
        let tree = self.parser.parse(&source, source_path)?;
        let output = rewrite_tree(
            &tree,
            &source,
            self.registry.tables(),
            RewriteOptions::from_config(&self.config),
        );

        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| YsnpError::FileIo {
                path: dest_path.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(dest_path, output).map_err(|e| YsnpError::FileIo {
            path: dest_path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Read access to the mapping tables.
    pub fn export_mappings(&self) -> &MappingTables {
        self.registry.tables()
    }

    /// Run both passes over the configured source tree.
    ///
    /// Per-file parse and IO failures are collected into the report; a file
    /// that fails discovery is excluded from the rewrite pass too. Anything
    /// else (configuration, collision invariant) aborts the run.
    pub fn run(&mut self) -> Result<RunReport> {
        let mut report = RunReport::default();
        let files = self.collect_files()?;

        info!(files = files.len(), "starting discovery pass");
        for path in &files {
            match self.discover(path) {
                Ok(stats) => {
                    report.files_discovered += 1;
                    debug!(path = %path.display(), symbols = stats.total(), "discovered");
                }
                Err(e) if e.is_recoverable() => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    self.failed.insert(path.clone());
                    report.errors.push(FileError {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // Discovery is complete for the whole tree; the registry is frozen
        // from here and the rewrite pass only performs lookups.
        report.symbols_mapped = self.registry.tables().total_mappings();
        mappings::save_mappings(self.registry.tables(), &self.config.destination_root)?;

        info!(
            symbols = report.symbols_mapped,
            "starting rewrite pass"
        );
        for path in &files {
            if self.failed.contains(path) {
                continue;
            }
            let relative = path
                .strip_prefix(&self.config.source_root)
                .unwrap_or(path)
                .to_path_buf();
            let dest = self.destination_for(&relative);
            match self.rewrite(path, &dest) {
                Ok(()) => {
                    report.files_rewritten += 1;
                    if dest.file_name() != path.file_name() {
                        report.files_renamed += 1;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    warn!(path = %path.display(), error = %e, "rewrite failed");
                    report.errors.push(FileError {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            rewritten = report.files_rewritten,
            renamed = report.files_renamed,
            errors = report.errors.len(),
            "run complete"
        );
        Ok(report)
    }

    /// Enumerate the PHP files under the source root, honoring the ignore
    /// rules. Sorted so logs and error ordering are reproducible.
    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.config.source_root).sort_by_file_name() {
            let entry = entry.map_err(|e| YsnpError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            let is_php = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("php"));
            if !is_php {
                continue;
            }
            if self.registry.should_ignore(&path) {
                debug!(path = %path.display(), "ignored");
                continue;
            }
            files.push(path);
        }
        Ok(files)
    }

    /// Destination path for a file, applying the (lookup-only) file rename.
    fn destination_for(&self, relative: &Path) -> PathBuf {
        let mut dest = self.config.destination_root.join(relative);
        if self.registry.rename_files_enabled() {
            if let Some(mapped) = relative
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| self.registry.tables().mapped_file_name(n))
            {
                dest.set_file_name(mapped);
            }
        }
        dest
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| YsnpError::FileIo {
        path: path.to_path_buf(),
        source: e,
    })
}
