//! Discovery pass: the first of the two traversals.
//!
//! Walks one file's syntax tree, harvests every declaration site, and asks
//! the registry for an identity. No rewriting happens here. Traversal order
//! within a file is irrelevant because `resolve` is idempotent; across
//! files, discovery must finish for the whole tree before any rewrite runs.

use crate::error::Result;
use crate::parser::{for_each_node, node_text};
use crate::registry::{NameRegistry, SymbolKind};
use tracing::debug;
use tree_sitter::Tree;

/// Per-file tally of discovered declaration sites.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDiscovery {
    pub classes: usize,
    pub methods: usize,
    pub functions: usize,
    pub variables: usize,
}

impl FileDiscovery {
    pub fn total(&self) -> usize {
        self.classes + self.methods + self.functions + self.variables
    }
}

/// Harvest declarations from one parsed file into the registry.
pub fn discover_tree(
    tree: &Tree,
    source: &str,
    registry: &mut NameRegistry,
) -> Result<FileDiscovery> {
    let mut symbols: Vec<(SymbolKind, String)> = Vec::new();
    let mut stats = FileDiscovery::default();

    for_each_node(tree, &mut |node| match node.kind() {
        "class_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                symbols.push((SymbolKind::Class, node_text(name, source).to_string()));
                stats.classes += 1;
            }
        }
        "method_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                symbols.push((SymbolKind::Method, node_text(name, source).to_string()));
                stats.methods += 1;
            }
        }
        "function_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                symbols.push((SymbolKind::Function, node_text(name, source).to_string()));
                stats.functions += 1;
            }
        }
        // Covers reads, writes, parameters, and property declarations, whose
        // elements are variable_name nodes.
        "variable_name" => {
            let bare = node_text(node, source).trim_start_matches('$');
            if !bare.is_empty() && !bare.eq_ignore_ascii_case("this") {
                symbols.push((SymbolKind::Variable, bare.to_string()));
                stats.variables += 1;
            }
        }
        _ => {}
    });

    for (kind, name) in symbols {
        registry.resolve(kind, &name)?;
    }

    debug!(
        classes = stats.classes,
        methods = stats.methods,
        functions = stats.functions,
        variables = stats.variables,
        "discovered declarations"
    );
    Ok(stats)
}
