//! Repository documentation synthesis.
//!
//! Components and the dependency map come straight from the structural
//! analysis, so they are complete and deterministic. The prose sections
//! (overview, architecture, usage guide) are generated, one model call
//! each, grounded in the analysis summary.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use crate::error::EngineError;
use crate::llm::{with_retry, ModelProvider};
use crate::models::{ChatMessage, ComponentDoc, Documentation, FileAnalysis, SymbolKind};

/// Generate documentation for an analyzed repository.
pub async fn generate(
    provider: &Arc<dyn ModelProvider>,
    summary: &str,
    files: &[FileAnalysis],
) -> Result<Documentation, EngineError> {
    let components = collect_components(files);
    let dependencies = collect_dependencies(files);

    let component_digest = components
        .iter()
        .map(|c| format!("- {} ({}): {}", c.name, c.file, c.description))
        .collect::<Vec<_>>()
        .join("\n");

    let overview = generate_section(
        provider,
        summary,
        &component_digest,
        "Write a concise overview of this repository: what it does and who would use it. \
         Two or three paragraphs of plain prose.",
    )
    .await?;

    let architecture = generate_section(
        provider,
        summary,
        &component_digest,
        "Describe the architecture of this repository: the main components, how they \
         interact, and the flow of data between them.",
    )
    .await?;

    let usage_guide = generate_section(
        provider,
        summary,
        &component_digest,
        "Write a short usage guide for a developer new to this repository: where to \
         start reading, how the pieces fit together, and any setup the code implies.",
    )
    .await?;

    Ok(Documentation {
        overview,
        architecture,
        components,
        dependencies,
        usage_guide,
    })
}

async fn generate_section(
    provider: &Arc<dyn ModelProvider>,
    summary: &str,
    component_digest: &str,
    instruction: &str,
) -> Result<String, EngineError> {
    let messages = vec![
        ChatMessage {
            role: "system".to_string(),
            content: "You are a technical writer documenting a source repository. \
                      Base everything on the provided analysis. Do not invent files or \
                      features that are not listed."
                .to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: format!(
                "Repository analysis:\n{summary}\n\nComponents:\n{component_digest}\n\n{instruction}"
            ),
        },
    ];
    Ok(with_retry(|| provider.complete(&messages)).await?)
}

/// Top-level classes and modules across all files, in file order.
fn collect_components(files: &[FileAnalysis]) -> Vec<ComponentDoc> {
    let mut components = Vec::new();
    for file in files {
        for (idx, symbol) in file.symbols.iter().enumerate() {
            if symbol.parent.is_some()
                || !matches!(symbol.kind, SymbolKind::Class | SymbolKind::Module)
            {
                continue;
            }
            let methods: Vec<String> = file
                .symbols
                .iter()
                .filter(|s| s.parent == Some(idx))
                .map(|s| s.name.clone())
                .collect();

            let description = match &symbol.docstring {
                Some(doc) => first_line(doc).to_string(),
                None => format!(
                    "{} {} with {} members defined in {}",
                    kind_label(symbol.kind),
                    symbol.name,
                    methods.len(),
                    file.path
                ),
            };

            components.push(ComponentDoc {
                name: symbol.name.clone(),
                file: file.path.clone(),
                description,
                methods,
            });
        }
    }
    components
}

/// One entry per analyzed file, even when the file imports nothing. A
/// reader can tell "no dependencies" apart from "file missing".
fn collect_dependencies(files: &[FileAnalysis]) -> BTreeMap<String, Vec<String>> {
    files
        .iter()
        .map(|f| (f.path.clone(), f.dependencies.clone()))
        .collect()
}

fn kind_label(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Class => "Class",
        SymbolKind::Module => "Module",
        SymbolKind::Function => "Function",
        SymbolKind::Method => "Method",
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// Render the documentation as a plain-text report for download.
pub fn render_report(docs: &Documentation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "REPOSITORY DOCUMENTATION");
    let _ = writeln!(out, "========================\n");

    let _ = writeln!(out, "OVERVIEW\n--------\n{}\n", docs.overview);
    let _ = writeln!(out, "ARCHITECTURE\n------------\n{}\n", docs.architecture);

    let _ = writeln!(out, "COMPONENTS\n----------");
    for c in &docs.components {
        let _ = writeln!(out, "\n{} ({})", c.name, c.file);
        let _ = writeln!(out, "  {}", c.description);
        for m in &c.methods {
            let _ = writeln!(out, "  - {m}");
        }
    }

    let _ = writeln!(out, "\nDEPENDENCIES\n------------");
    for (file, deps) in &docs.dependencies {
        if deps.is_empty() {
            let _ = writeln!(out, "{file}: (none)");
        } else {
            let _ = writeln!(out, "{file}: {}", deps.join(", "));
        }
    }

    let _ = writeln!(out, "\nUSAGE GUIDE\n-----------\n{}", docs.usage_guide);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{analyze_file, detect_language};
    use crate::llm::mock::MockProvider;
    use crate::models::SourceFile;

    fn analyze(path: &str, content: &str) -> FileAnalysis {
        analyze_file(&SourceFile {
            path: path.to_string(),
            language: detect_language(path),
            content: content.to_string(),
            size_bytes: content.len(),
        })
    }

    #[test]
    fn test_components_use_docstring_first_line() {
        let files = vec![analyze(
            "store.py",
            "class Store:\n    \"\"\"Keeps things.\n    Second line.\"\"\"\n    def get(self):\n        pass\n",
        )];
        let components = collect_components(&files);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].name, "Store");
        assert_eq!(components[0].description, "Keeps things.");
        assert_eq!(components[0].methods, vec!["get".to_string()]);
    }

    #[test]
    fn test_components_without_docstring_get_generated_line() {
        let files = vec![analyze("point.rs", "struct Point {\n    x: i32,\n}\n")];
        let components = collect_components(&files);
        assert_eq!(components.len(), 1);
        assert!(components[0].description.contains("Point"));
        assert!(components[0].description.contains("point.rs"));
    }

    #[test]
    fn test_dependency_map_covers_every_file() {
        let files = vec![
            analyze("a.py", "import os\n\ndef f():\n    pass\n"),
            analyze("plain.txt", "no imports here\n"),
        ];
        let deps = collect_dependencies(&files);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps["a.py"], vec!["os".to_string()]);
        assert!(deps["plain.txt"].is_empty());
    }

    #[tokio::test]
    async fn test_generate_fills_all_sections() {
        let mock = Arc::new(MockProvider::new(8));
        mock.set_answer("Generated prose.");
        let provider: Arc<dyn ModelProvider> = mock.clone();

        let files = vec![analyze("a.py", "class App:\n    \"\"\"Main app.\"\"\"\n    def run(self):\n        pass\n")];
        let docs = generate(&provider, "summary text", &files).await.unwrap();

        assert_eq!(docs.overview, "Generated prose.");
        assert_eq!(docs.architecture, "Generated prose.");
        assert_eq!(docs.usage_guide, "Generated prose.");
        assert_eq!(docs.components.len(), 1);
        assert!(docs.dependencies.contains_key("a.py"));
        assert_eq!(mock.complete_calls(), 3);
    }

    #[test]
    fn test_report_renders_every_section() {
        let docs = Documentation {
            overview: "An overview.".into(),
            architecture: "An architecture.".into(),
            components: vec![ComponentDoc {
                name: "App".into(),
                file: "a.py".into(),
                description: "Main app.".into(),
                methods: vec!["run".into()],
            }],
            dependencies: [("a.py".to_string(), vec!["os".to_string()])]
                .into_iter()
                .collect(),
            usage_guide: "Start at a.py.".into(),
        };
        let report = render_report(&docs);
        assert!(report.contains("OVERVIEW"));
        assert!(report.contains("An architecture."));
        assert!(report.contains("App (a.py)"));
        assert!(report.contains("a.py: os"));
        assert!(report.contains("Start at a.py."));
    }
}
