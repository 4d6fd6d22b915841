//! Rewrite pass: the second traversal, over a frozen registry.
//!
//! Collects byte-range edits from one cursor walk over the tree — every
//! declaration and reference form dispatches on its node kind to the table
//! of the syntactically implied symbol kind — then applies them back to
//! front so earlier offsets stay valid. Lookup-only: a miss means the name
//! was skipped or never declared, and the occurrence is left alone.

use crate::config::Config;
use crate::parser::{
    for_each_node, include_path_literal, is_field, node_text, string_inner, INCLUDE_KINDS,
};
use crate::registry::{MappingTables, SymbolKind};
use tree_sitter::{Node, Tree};

/// Post-rewrite stripping toggles.
#[derive(Debug, Default, Clone, Copy)]
pub struct RewriteOptions {
    pub strip_comments: bool,
    pub strip_whitespace: bool,
    pub strip_linebreaks: bool,
}

impl RewriteOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            strip_comments: config.strip_comments,
            strip_whitespace: config.strip_whitespace,
            strip_linebreaks: config.strip_linebreaks,
        }
    }
}

struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

/// Rewrite one parsed file against the frozen mapping tables.
pub fn rewrite_tree(
    tree: &Tree,
    source: &str,
    tables: &MappingTables,
    options: RewriteOptions,
) -> String {
    let edits = collect_edits(tree, source, tables, options);
    let rewritten = apply_edits(source, edits);
    if options.strip_whitespace || options.strip_linebreaks {
        normalize(&rewritten, options.strip_whitespace)
    } else {
        rewritten
    }
}

fn collect_edits(
    tree: &Tree,
    source: &str,
    tables: &MappingTables,
    options: RewriteOptions,
) -> Vec<Edit> {
    let mut edits = Vec::new();

    for_each_node(tree, &mut |node| match node.kind() {
        "comment" if options.strip_comments => {
            edits.push(Edit {
                start: node.start_byte(),
                end: node.end_byte(),
                replacement: String::new(),
            });
        }
        "variable_name" => {
            let bare = node_text(node, source).trim_start_matches('$');
            if bare.eq_ignore_ascii_case("this") {
                return;
            }
            if let Some(obfuscated) = tables.get(SymbolKind::Variable, bare) {
                edits.push(Edit {
                    start: node.start_byte(),
                    end: node.end_byte(),
                    replacement: format!("${obfuscated}"),
                });
            }
        }
        "name" => {
            let Some(kind) = classify_name(node) else {
                return;
            };
            if let Some(obfuscated) = tables.get(kind, node_text(node, source)) {
                edits.push(Edit {
                    start: node.start_byte(),
                    end: node.end_byte(),
                    replacement: obfuscated.to_string(),
                });
            }
        }
        kind if INCLUDE_KINDS.contains(&kind) => {
            if let Some(inner) = include_path_literal(node).and_then(string_inner) {
                let content = node_text(inner, source);
                if let Some(rewritten) = rewrite_include_path(content, tables) {
                    edits.push(Edit {
                        start: inner.start_byte(),
                        end: inner.end_byte(),
                        replacement: rewritten,
                    });
                }
            }
        }
        _ => {}
    });

    edits
}

/// The symbol kind implied by a bare `name` node's syntactic position.
/// `None` for positions outside the renaming rules (namespace-qualified
/// names, labels, constants), which pass through untouched.
fn classify_name(node: Node<'_>) -> Option<SymbolKind> {
    let parent = node.parent()?;
    match parent.kind() {
        "class_declaration" if is_field(parent, "name", node) => Some(SymbolKind::Class),
        "function_definition" if is_field(parent, "name", node) => Some(SymbolKind::Function),
        "method_declaration" if is_field(parent, "name", node) => Some(SymbolKind::Method),
        "function_call_expression" if is_field(parent, "function", node) => {
            Some(SymbolKind::Function)
        }
        "member_call_expression" | "nullsafe_member_call_expression"
            if is_field(parent, "name", node) =>
        {
            Some(SymbolKind::Method)
        }
        // Foo::bar(): the scope is a class reference, the name a method.
        "scoped_call_expression" => Some(if is_field(parent, "name", node) {
            SymbolKind::Method
        } else {
            SymbolKind::Class
        }),
        "member_access_expression" | "nullsafe_member_access_expression"
            if is_field(parent, "name", node) =>
        {
            Some(SymbolKind::Variable)
        }
        "object_creation_expression" | "base_clause" | "class_interface_clause" | "named_type" => {
            Some(SymbolKind::Class)
        }
        _ => None,
    }
}

/// Replace the final path segment when its stem is in the file table; the
/// directory prefix and extension are preserved verbatim.
fn rewrite_include_path(content: &str, tables: &MappingTables) -> Option<String> {
    let (dir, file_name) = match content.rsplit_once('/') {
        Some((dir, file_name)) => (Some(dir), file_name),
        None => (None, content),
    };
    let mapped = tables.mapped_file_name(file_name)?;
    Some(match dir {
        Some(dir) => format!("{dir}/{mapped}"),
        None => mapped,
    })
}

/// Apply edits back to front. Overlapping edits are a traversal bug; the
/// later-starting one wins and the other is dropped.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start));

    let mut result = source.to_string();
    let mut last_start = usize::MAX;
    for edit in edits {
        if edit.end > last_start || edit.end > result.len() {
            continue;
        }
        result.replace_range(edit.start..edit.end, &edit.replacement);
        last_start = edit.start;
    }
    result
}

#[derive(PartialEq)]
enum LexState {
    Code,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
}

/// Textual whitespace normalization, aware of string literals and comments
/// so it never alters runtime values or swallows comment terminators.
///
/// With `collapse` set, every whitespace run in code collapses to a single
/// space, spacing tightens around brackets, and a space after `,` and `;`
/// is kept. Without it (linebreak stripping alone), only line breaks are
/// turned into spaces. Line comments always keep their terminating newline.
fn normalize(text: &str, collapse: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = LexState::Code;
    let mut pending_ws = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            LexState::Code => {
                if c.is_whitespace() {
                    if collapse {
                        pending_ws = true;
                    } else if c == '\n' {
                        out.push(' ');
                    } else if c != '\r' {
                        out.push(c);
                    }
                    i += 1;
                    continue;
                }

                if pending_ws {
                    pending_ws = false;
                    let prev = out.chars().last();
                    let emit = match prev {
                        None => false,
                        Some(p) if ",;".contains(p) => true,
                        Some(p) if "([{".contains(p) => false,
                        Some(_) => !")]},;".contains(c),
                    };
                    if emit {
                        out.push(' ');
                    }
                }

                match c {
                    '\'' => {
                        state = LexState::SingleQuote;
                        out.push(c);
                    }
                    '"' => {
                        state = LexState::DoubleQuote;
                        out.push(c);
                    }
                    '/' if next == Some('/') => {
                        state = LexState::LineComment;
                        out.push_str("//");
                        i += 2;
                        continue;
                    }
                    '/' if next == Some('*') => {
                        state = LexState::BlockComment;
                        out.push_str("/*");
                        i += 2;
                        continue;
                    }
                    '#' => {
                        state = LexState::LineComment;
                        out.push(c);
                    }
                    _ => out.push(c),
                }
            }
            LexState::SingleQuote | LexState::DoubleQuote => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = next {
                        out.push(escaped);
                        i += 2;
                        continue;
                    }
                } else if (c == '\'' && state == LexState::SingleQuote)
                    || (c == '"' && state == LexState::DoubleQuote)
                {
                    state = LexState::Code;
                }
            }
            LexState::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = LexState::Code;
                } else {
                    out.push(c);
                }
            }
            LexState::BlockComment => {
                out.push(c);
                if c == '*' && next == Some('/') {
                    out.push('/');
                    state = LexState::Code;
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }

    out
}
