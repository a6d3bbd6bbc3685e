//! Regex and parser-backed analyzers for non-code files: markup,
//! stylesheets, and data formats. These only produce coarse section-level
//! symbols but still feed the chunker and the documentation generator.

use regex::Regex;

use super::{Extraction, LanguageAnalyzer};
use crate::models::{SourceFile, Symbol, SymbolKind};

// ─── Markup (markdown, html) ─────────────────────────────

pub struct MarkupAnalyzer;

impl LanguageAnalyzer for MarkupAnalyzer {
    fn can_parse(&self, language: &str) -> bool {
        matches!(language, "markdown" | "html")
    }

    fn extract(&self, file: &SourceFile) -> Extraction {
        match file.language.as_str() {
            "markdown" => extract_markdown(file),
            "html" => extract_html(file),
            _ => Extraction::default(),
        }
    }
}

/// Markdown headings become section symbols. A section spans from its
/// heading to the line before the next heading of any level.
fn extract_markdown(file: &SourceFile) -> Extraction {
    let heading = match Regex::new(r"^(#{1,6})\s+(.+?)\s*$") {
        Ok(re) => re,
        Err(_) => return Extraction::default(),
    };

    let lines: Vec<&str> = file.content.lines().collect();
    let mut headings: Vec<(usize, String)> = Vec::new();
    let mut in_fence = false;
    for (i, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = heading.captures(line) {
            headings.push((i + 1, caps[2].to_string()));
        }
    }

    let mut extraction = Extraction::default();
    for (i, (start, name)) in headings.iter().enumerate() {
        let end = headings
            .get(i + 1)
            .map(|(next, _)| next - 1)
            .unwrap_or(lines.len());
        extraction.symbols.push(Symbol {
            name: name.clone(),
            kind: SymbolKind::Module,
            start_line: *start,
            end_line: end.max(*start),
            docstring: None,
            parent: None,
        });
    }
    extraction
}

/// HTML yields no symbols, only external resource dependencies from
/// script and stylesheet tags.
fn extract_html(file: &SourceFile) -> Extraction {
    let mut extraction = Extraction::default();
    let patterns = [r#"<script[^>]+src=["']([^"']+)["']"#, r#"<link[^>]+href=["']([^"']+)["']"#];
    for pattern in patterns {
        let Ok(re) = Regex::new(pattern) else { continue };
        for caps in re.captures_iter(&file.content) {
            let dep = caps[1].to_string();
            if !extraction.dependencies.contains(&dep) {
                extraction.dependencies.push(dep);
            }
        }
    }
    extraction
}

// ─── Stylesheets ─────────────────────────────────────────

pub struct StylesheetAnalyzer;

impl LanguageAnalyzer for StylesheetAnalyzer {
    fn can_parse(&self, language: &str) -> bool {
        language == "css"
    }

    fn extract(&self, file: &SourceFile) -> Extraction {
        let mut extraction = Extraction::default();

        if let Ok(import) = Regex::new(r#"@import\s+(?:url\()?["']([^"']+)["']"#) {
            for caps in import.captures_iter(&file.content) {
                let dep = caps[1].to_string();
                if !extraction.dependencies.contains(&dep) {
                    extraction.dependencies.push(dep);
                }
            }
        }

        // Depth-0 rule blocks become section symbols, named by selector.
        let mut depth: i32 = 0;
        let mut open: Option<(usize, String)> = None;
        for (i, line) in file.content.lines().enumerate() {
            for ch in line.chars() {
                match ch {
                    '{' => {
                        if depth == 0 && open.is_none() {
                            let selector = line.split('{').next().unwrap_or("").trim();
                            if !selector.is_empty() {
                                open = Some((i + 1, selector.to_string()));
                            }
                        }
                        depth += 1;
                    }
                    '}' => {
                        depth -= 1;
                        if depth <= 0 {
                            depth = 0;
                            if let Some((start, name)) = open.take() {
                                extraction.symbols.push(Symbol {
                                    name,
                                    kind: SymbolKind::Module,
                                    start_line: start,
                                    end_line: i + 1,
                                    docstring: None,
                                    parent: None,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        extraction
    }
}

// ─── Data formats (json, toml, yaml) ─────────────────────

pub struct DataAnalyzer;

impl LanguageAnalyzer for DataAnalyzer {
    fn can_parse(&self, language: &str) -> bool {
        matches!(language, "json" | "toml" | "yaml")
    }

    fn extract(&self, file: &SourceFile) -> Extraction {
        let keys = match file.language.as_str() {
            "json" => top_level_json_keys(&file.content),
            "toml" => top_level_toml_keys(&file.content),
            "yaml" => top_level_yaml_keys(&file.content),
            _ => Some(Vec::new()),
        };

        let Some(keys) = keys else {
            return Extraction {
                parse_error: true,
                ..Extraction::default()
            };
        };

        let mut extraction = Extraction::default();
        for key in keys {
            let line = first_line_containing(&file.content, &key).unwrap_or(1);
            extraction.symbols.push(Symbol {
                name: key,
                kind: SymbolKind::Module,
                start_line: line,
                end_line: line,
                docstring: None,
                parent: None,
            });
        }
        extraction
    }
}

fn top_level_json_keys(content: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    match value {
        serde_json::Value::Object(map) => Some(map.keys().cloned().collect()),
        _ => Some(Vec::new()),
    }
}

fn top_level_toml_keys(content: &str) -> Option<Vec<String>> {
    let value: toml::Value = content.parse().ok()?;
    match value {
        toml::Value::Table(table) => Some(table.keys().cloned().collect()),
        _ => Some(Vec::new()),
    }
}

fn top_level_yaml_keys(content: &str) -> Option<Vec<String>> {
    let value: serde_yaml::Value = serde_yaml::from_str(content).ok()?;
    match value {
        serde_yaml::Value::Mapping(map) => Some(
            map.keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect(),
        ),
        _ => Some(Vec::new()),
    }
}

fn first_line_containing(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, language: &str, content: &str) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            language: language.to_string(),
            content: content.to_string(),
            size_bytes: content.len(),
        }
    }

    #[test]
    fn test_markdown_headings_become_sections() {
        let f = file(
            "README.md",
            "markdown",
            "# Intro\n\nsome text\n\n## Install\n\nrun make\n",
        );
        let e = MarkupAnalyzer.extract(&f);
        assert_eq!(e.symbols.len(), 2);
        assert_eq!(e.symbols[0].name, "Intro");
        assert_eq!(e.symbols[0].start_line, 1);
        assert_eq!(e.symbols[0].end_line, 4);
        assert_eq!(e.symbols[1].name, "Install");
        assert_eq!(e.symbols[1].end_line, 7);
    }

    #[test]
    fn test_markdown_ignores_headings_in_code_fences() {
        let f = file(
            "doc.md",
            "markdown",
            "# Real\n\n```\n# not a heading\n```\n",
        );
        let e = MarkupAnalyzer.extract(&f);
        assert_eq!(e.symbols.len(), 1);
        assert_eq!(e.symbols[0].name, "Real");
    }

    #[test]
    fn test_html_collects_script_and_link_deps() {
        let f = file(
            "index.html",
            "html",
            r#"<html><head><script src="app.js"></script><link rel="stylesheet" href="style.css"></head></html>"#,
        );
        let e = MarkupAnalyzer.extract(&f);
        assert!(e.symbols.is_empty());
        assert_eq!(e.dependencies, vec!["app.js".to_string(), "style.css".to_string()]);
    }

    #[test]
    fn test_css_rules_and_imports() {
        let f = file(
            "style.css",
            "css",
            "@import url(\"base.css\");\n\n.button {\n  color: red;\n}\n\n@media screen {\n  .nested { margin: 0; }\n}\n",
        );
        let e = StylesheetAnalyzer.extract(&f);
        assert_eq!(e.dependencies, vec!["base.css".to_string()]);
        let names: Vec<&str> = e.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![".button", "@media screen"]);
    }

    #[test]
    fn test_json_top_level_keys() {
        let f = file(
            "package.json",
            "json",
            "{\n  \"name\": \"demo\",\n  \"dependencies\": {}\n}\n",
        );
        let e = DataAnalyzer.extract(&f);
        let names: Vec<&str> = e.symbols.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"name"));
        assert!(names.contains(&"dependencies"));
        assert!(!e.parse_error);
    }

    #[test]
    fn test_toml_tables() {
        let f = file(
            "Cargo.toml",
            "toml",
            "[package]\nname = \"demo\"\n\n[dependencies]\nserde = \"1\"\n",
        );
        let e = DataAnalyzer.extract(&f);
        let names: Vec<&str> = e.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["dependencies", "package"]);
    }

    #[test]
    fn test_invalid_json_flags_parse_error() {
        let f = file("broken.json", "json", "{not json");
        let e = DataAnalyzer.extract(&f);
        assert!(e.parse_error);
        assert!(e.symbols.is_empty());
    }
}
