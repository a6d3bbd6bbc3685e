//! Tree-sitter analyzer for the general-purpose language family
//! (rust, python, javascript, typescript, tsx).
//!
//! Parse failures are non-fatal: if parsing fails outright, or more than
//! 30% of AST nodes are error nodes, the file is flagged `parse_error` and
//! returned with an empty symbol table.

use super::{Extraction, LanguageAnalyzer};
use crate::models::{SourceFile, Symbol, SymbolKind};

/// If more than this fraction of AST nodes are error nodes, give up.
const ERROR_THRESHOLD: f64 = 0.30;

/// Node kinds counted toward the branch-complexity proxy.
const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "if_expression",
    "elif_clause",
    "while_statement",
    "while_expression",
    "for_statement",
    "for_expression",
    "for_in_statement",
    "match_expression",
    "switch_statement",
    "catch_clause",
    "except_clause",
    "conditional_expression",
    "ternary_expression",
];

pub struct SourceCodeAnalyzer;

fn grammar_for(language: &str) -> Option<tree_sitter::Language> {
    match language {
        "rust" => Some(tree_sitter_rust::LANGUAGE.into()),
        "python" => Some(tree_sitter_python::LANGUAGE.into()),
        "javascript" => Some(tree_sitter_javascript::LANGUAGE.into()),
        "typescript" => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "tsx" => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        _ => None,
    }
}

impl LanguageAnalyzer for SourceCodeAnalyzer {
    fn can_parse(&self, language: &str) -> bool {
        grammar_for(language).is_some()
    }

    fn extract(&self, file: &SourceFile) -> Extraction {
        let Some(grammar) = grammar_for(&file.language) else {
            return Extraction::default();
        };

        let mut parser = tree_sitter::Parser::new();
        if parser.set_language(&grammar).is_err() {
            return parse_failure();
        }
        let Some(tree) = parser.parse(&file.content, None) else {
            return parse_failure();
        };
        let root = tree.root_node();

        let (total, errors) = count_nodes(root);
        if total > 0 && (errors as f64 / total as f64) > ERROR_THRESHOLD {
            tracing::warn!(
                "{}: {:.0}% AST error nodes, keeping file as unstructured",
                file.path,
                (errors as f64 / total as f64) * 100.0
            );
            return parse_failure();
        }

        let lines: Vec<&str> = file.content.lines().collect();
        let mut extraction = Extraction::default();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            visit(child, file, &lines, None, &mut extraction);
        }
        extraction.complexity = count_branches(root);
        extraction
    }
}

fn parse_failure() -> Extraction {
    Extraction {
        parse_error: true,
        ..Extraction::default()
    }
}

/// Walk one node, emitting symbols and dependency edges. Only container
/// bodies are descended into, so closures and locals stay out of the
/// symbol table.
fn visit(
    node: tree_sitter::Node,
    file: &SourceFile,
    lines: &[&str],
    parent: Option<usize>,
    out: &mut Extraction,
) {
    match node.kind() {
        "function_item" | "function_definition" | "function_declaration"
        | "generator_function_declaration" | "method_definition" => {
            let kind = if parent.is_some() {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            push_symbol(node, file, lines, kind, parent, out);
        }
        "struct_item" | "enum_item" | "trait_item" | "class_definition"
        | "class_declaration" | "abstract_class_declaration" | "interface_declaration" => {
            let idx = push_symbol(node, file, lines, SymbolKind::Class, parent, out);
            descend_body(node, file, lines, Some(idx), out);
        }
        "impl_item" => {
            // Methods hang off the impl block; name it after the type.
            let idx = push_symbol(node, file, lines, SymbolKind::Class, parent, out);
            descend_body(node, file, lines, Some(idx), out);
        }
        "mod_item" => {
            let idx = push_symbol(node, file, lines, SymbolKind::Module, parent, out);
            descend_body(node, file, lines, Some(idx), out);
        }
        // Python decorators are transparent
        "decorated_definition" => {
            if let Some(definition) = node.child_by_field_name("definition") {
                visit(definition, file, lines, parent, out);
            }
        }
        // JS/TS export wrappers are transparent
        "export_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                visit(child, file, lines, parent, out);
            }
        }
        "use_declaration" | "import_statement" | "import_from_statement" => {
            if let Some(dep) = import_target(node, file) {
                if !out.dependencies.contains(&dep) {
                    out.dependencies.push(dep);
                }
            }
        }
        _ => {}
    }
}

/// Visit the members of a container's body node (python `block`, JS
/// `class_body`, rust `declaration_list`).
fn descend_body(
    node: tree_sitter::Node,
    file: &SourceFile,
    lines: &[&str],
    parent: Option<usize>,
    out: &mut Extraction,
) {
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        visit(child, file, lines, parent, out);
    }
}

fn push_symbol(
    node: tree_sitter::Node,
    file: &SourceFile,
    lines: &[&str],
    kind: SymbolKind,
    parent: Option<usize>,
    out: &mut Extraction,
) -> usize {
    let name = symbol_name(node, file);
    let start_line = node.start_position().row + 1;
    let end_line = node.end_position().row + 1;

    let docstring = if file.language == "python" {
        python_docstring(node, file)
    } else {
        doc_comment_above(lines, node.start_position().row)
    };

    out.symbols.push(Symbol {
        name,
        kind,
        start_line,
        end_line,
        docstring,
        parent,
    });
    out.symbols.len() - 1
}

fn symbol_name(node: tree_sitter::Node, file: &SourceFile) -> String {
    let field = if node.kind() == "impl_item" { "type" } else { "name" };
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(file.content.as_bytes()).ok())
        .unwrap_or("<anonymous>")
        .to_string()
}

/// Extract the imported module name (first path segment / source string).
fn import_target(node: tree_sitter::Node, file: &SourceFile) -> Option<String> {
    let bytes = file.content.as_bytes();
    match node.kind() {
        "use_declaration" => {
            let arg = node.child_by_field_name("argument")?;
            let text = arg.utf8_text(bytes).ok()?;
            let first = text.split("::").next()?.trim();
            Some(first.trim_start_matches("crate").trim().to_string())
                .filter(|s| !s.is_empty())
        }
        "import_statement" => {
            // JS: import x from "source"; Python: import a.b
            if let Some(source) = node.child_by_field_name("source") {
                let text = source.utf8_text(bytes).ok()?;
                return Some(text.trim_matches(['"', '\'']).to_string());
            }
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if matches!(child.kind(), "dotted_name" | "aliased_import") {
                    let text = child.utf8_text(bytes).ok()?;
                    return Some(text.split('.').next()?.split_whitespace().next()?.to_string());
                }
            }
            None
        }
        "import_from_statement" => {
            let module = node.child_by_field_name("module_name")?;
            let text = module.utf8_text(bytes).ok()?;
            Some(text.split('.').next()?.to_string()).filter(|s| !s.is_empty())
        }
        _ => None,
    }
}

/// Python docstring: first statement of the body, when it is a bare string.
fn python_docstring(node: tree_sitter::Node, file: &SourceFile) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first = body.named_children(&mut cursor).next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let mut inner = first.walk();
    let string = first
        .named_children(&mut inner)
        .find(|c| c.kind() == "string")?;
    let raw = string.utf8_text(file.content.as_bytes()).ok()?;
    let trimmed = raw
        .trim_start_matches(['r', 'b', 'f', 'u'])
        .trim_matches(['"', '\''])
        .trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Contiguous comment block directly above `row` (0-based), for languages
/// with comment-style docs.
fn doc_comment_above(lines: &[&str], row: usize) -> Option<String> {
    let mut collected: Vec<&str> = Vec::new();
    let mut i = row;
    while i > 0 {
        i -= 1;
        let line = lines.get(i)?.trim_start();
        let is_comment = line.starts_with("///")
            || line.starts_with("//!")
            || line.starts_with("//")
            || line.starts_with("/*")
            || line.starts_with('*');
        if !is_comment {
            break;
        }
        let cleaned = line
            .trim_start_matches('/')
            .trim_start_matches('*')
            .trim_end_matches("*/")
            .trim();
        collected.push(cleaned);
    }
    if collected.is_empty() {
        return None;
    }
    collected.reverse();
    let text = collected.join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn count_nodes(node: tree_sitter::Node) -> (usize, usize) {
    let mut total = 1usize;
    let mut errors = if node.is_error() { 1usize } else { 0 };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let (t, e) = count_nodes(child);
        total += t;
        errors += e;
    }

    (total, errors)
}

fn count_branches(node: tree_sitter::Node) -> usize {
    let mut count = usize::from(BRANCH_KINDS.contains(&node.kind()));
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        count += count_branches(child);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze_file;

    fn file(path: &str, language: &str, content: &str) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            language: language.to_string(),
            content: content.to_string(),
            size_bytes: content.len(),
        }
    }

    // ── Python ──────────────────────────────────────────

    #[test]
    fn test_python_functions_and_imports() {
        let f = file(
            "calc.py",
            "python",
            "import os\nfrom json import loads\n\ndef add(a, b):\n    \"\"\"Add two numbers.\"\"\"\n    return a + b\n",
        );
        let a = analyze_file(&f);
        assert_eq!(a.symbols.len(), 1);
        assert_eq!(a.symbols[0].name, "add");
        assert_eq!(a.symbols[0].kind, SymbolKind::Function);
        assert_eq!(a.symbols[0].docstring.as_deref(), Some("Add two numbers."));
        assert_eq!(a.dependencies, vec!["os".to_string(), "json".to_string()]);
    }

    #[test]
    fn test_python_class_with_methods_nested() {
        let f = file(
            "store.py",
            "python",
            "class Store:\n    \"\"\"Keeps things.\"\"\"\n\n    def get(self, key):\n        return self.data[key]\n\n    def put(self, key, value):\n        self.data[key] = value\n",
        );
        let a = analyze_file(&f);
        let class_idx = a
            .symbols
            .iter()
            .position(|s| s.kind == SymbolKind::Class)
            .unwrap();
        assert_eq!(a.symbols[class_idx].name, "Store");

        let methods: Vec<_> = a
            .symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Method)
            .collect();
        assert_eq!(methods.len(), 2);
        for m in methods {
            assert_eq!(m.parent, Some(class_idx));
        }
    }

    #[test]
    fn test_python_complexity_counts_branches() {
        let f = file(
            "branchy.py",
            "python",
            "def f(x):\n    if x > 0:\n        for i in range(x):\n            pass\n    elif x < 0:\n        while x:\n            x += 1\n    return x\n",
        );
        let a = analyze_file(&f);
        assert!(a.complexity >= 4, "got complexity {}", a.complexity);
    }

    #[test]
    fn test_python_garbage_never_fails_analysis() {
        let f = file("bad.py", "python", "???!!! ::\n)( ][\n");
        let a = analyze_file(&f);
        assert!(a.symbols.is_empty());
        assert!(a.dependencies.is_empty());
        assert_eq!(a.total_lines, 2);
    }

    // ── Rust ────────────────────────────────────────────

    #[test]
    fn test_rust_items_and_doc_comments() {
        let f = file(
            "lib.rs",
            "rust",
            "use serde::Serialize;\n\n/// Adds two numbers.\nfn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n\nstruct Point {\n    x: i32,\n}\n",
        );
        let a = analyze_file(&f);
        let add = a.symbols.iter().find(|s| s.name == "add").unwrap();
        assert_eq!(add.kind, SymbolKind::Function);
        assert_eq!(add.docstring.as_deref(), Some("Adds two numbers."));
        assert!(a.symbols.iter().any(|s| s.name == "Point"));
        assert_eq!(a.dependencies, vec!["serde".to_string()]);
    }

    #[test]
    fn test_rust_impl_methods_have_parent() {
        let f = file(
            "point.rs",
            "rust",
            "struct Point;\n\nimpl Point {\n    fn origin() -> Self {\n        Point\n    }\n}\n",
        );
        let a = analyze_file(&f);
        let impl_idx = a.symbols.iter().position(|s| s.kind == SymbolKind::Class && s.start_line == 3).unwrap();
        let origin = a.symbols.iter().find(|s| s.name == "origin").unwrap();
        assert_eq!(origin.kind, SymbolKind::Method);
        assert_eq!(origin.parent, Some(impl_idx));
    }

    // ── JavaScript / TypeScript ─────────────────────────

    #[test]
    fn test_javascript_functions_classes_imports() {
        let f = file(
            "app.js",
            "javascript",
            "import express from 'express';\n\nfunction handler(req, res) {\n    res.send('ok');\n}\n\nclass Server {\n    start() {\n        return 1;\n    }\n}\n",
        );
        let a = analyze_file(&f);
        assert!(a.symbols.iter().any(|s| s.name == "handler" && s.kind == SymbolKind::Function));
        let class_idx = a.symbols.iter().position(|s| s.name == "Server").unwrap();
        let start = a.symbols.iter().find(|s| s.name == "start").unwrap();
        assert_eq!(start.parent, Some(class_idx));
        assert_eq!(a.dependencies, vec!["express".to_string()]);
    }

    #[test]
    fn test_typescript_exported_class() {
        let f = file(
            "svc.ts",
            "typescript",
            "export class Service {\n    process(): string {\n        return 'x';\n    }\n}\n",
        );
        let a = analyze_file(&f);
        assert!(a.symbols.iter().any(|s| s.name == "Service" && s.kind == SymbolKind::Class));
    }

    // ── Helpers ─────────────────────────────────────────

    #[test]
    fn test_doc_comment_above_stops_at_code() {
        let lines = vec!["let x = 1;", "// first", "// second", "fn target() {}"];
        let doc = doc_comment_above(&lines, 3).unwrap();
        assert_eq!(doc, "first\nsecond");
    }

    #[test]
    fn test_doc_comment_above_none_when_absent() {
        let lines = vec!["let x = 1;", "fn target() {}"];
        assert!(doc_comment_above(&lines, 1).is_none());
    }
}
