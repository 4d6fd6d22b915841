//! Thin wrapper around the tree-sitter PHP grammar.
//!
//! This is the boundary to the external parser collaborator: everything the
//! two passes know about tree-sitter (parsing, cursor walks, node text,
//! include-path literals) goes through here.

use crate::error::{Result, YsnpError};
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// The include/require expression kinds that can carry a rewritable path.
pub const INCLUDE_KINDS: [&str; 4] = [
    "include_expression",
    "include_once_expression",
    "require_expression",
    "require_once_expression",
];

pub struct PhpParser {
    parser: Parser,
}

impl PhpParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .map_err(|e| YsnpError::Parser(format!("failed to load PHP grammar: {e}")))?;
        Ok(Self { parser })
    }

    /// Parse one file's source text. Any syntax error is reported as a
    /// per-file error carrying the offending path; the caller excludes the
    /// file from both passes.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| YsnpError::Parse {
                path: path.to_path_buf(),
                message: "parser produced no tree".into(),
            })?;

        if tree.root_node().has_error() {
            let message = first_error_position(&tree)
                .map(|(row, col)| format!("syntax error at line {}, column {}", row + 1, col + 1))
                .unwrap_or_else(|| "syntax error".into());
            return Err(YsnpError::Parse {
                path: path.to_path_buf(),
                message,
            });
        }

        Ok(tree)
    }
}

fn first_error_position(tree: &Tree) -> Option<(usize, usize)> {
    let mut found = None;
    for_each_node(tree, &mut |node| {
        if found.is_none() && (node.is_error() || node.is_missing()) {
            let pos = node.start_position();
            found = Some((pos.row, pos.column));
        }
    });
    found
}

/// Depth-first visit of every node in the tree.
pub fn for_each_node<'t>(tree: &'t Tree, f: &mut impl FnMut(Node<'t>)) {
    let mut cursor = tree.walk();
    loop {
        f(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Slice the source text covered by a node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Whether `node` occupies the named field of `parent`.
pub fn is_field(parent: Node<'_>, field: &str, node: Node<'_>) -> bool {
    parent
        .child_by_field_name(field)
        .map(|n| n.id() == node.id())
        .unwrap_or(false)
}

/// The string literal holding the path of an include/require expression.
///
/// Handles a plain literal argument (with or without parentheses) and a
/// concatenation whose trailing operand is the literal, as in
/// `__DIR__ . '/lib/helpers.php'`. A fully dynamic path yields `None`.
pub fn include_path_literal(include_node: Node<'_>) -> Option<Node<'_>> {
    let mut expr = include_node.named_child(0)?;
    while expr.kind() == "parenthesized_expression" {
        expr = expr.named_child(0)?;
    }
    match expr.kind() {
        "string" | "encapsed_string" => Some(expr),
        "binary_expression" => {
            let right = expr.child_by_field_name("right")?;
            matches!(right.kind(), "string" | "encapsed_string").then_some(right)
        }
        _ => None,
    }
}

/// The single content node inside a string literal. `None` for empty strings
/// and for interpolated strings, which are left alone.
pub fn string_inner(string_node: Node<'_>) -> Option<Node<'_>> {
    if string_node.named_child_count() != 1 {
        return None;
    }
    let inner = string_node.named_child(0)?;
    (inner.kind() == "string_content").then_some(inner)
}
