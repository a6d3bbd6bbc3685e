//! Structural analysis: per-file symbol tables, dependency edges, and metrics.
//!
//! Analysis is polymorphic over language families. Each family implements
//! [`LanguageAnalyzer`]; `analyze_file` picks the first variant that claims
//! the file's language tag and falls back to an unstructured result (no
//! symbols, no dependencies) for everything else. Adding a language means
//! adding a variant, not scattering string comparisons through the core.

pub mod lightweight;
pub mod source;

use std::collections::HashMap;
use std::path::Path;

use crate::models::{FileAnalysis, SourceFile, Symbol, SymbolKind};

/// What one analyzer variant pulls out of a file.
#[derive(Debug, Default)]
pub struct Extraction {
    pub symbols: Vec<Symbol>,
    pub dependencies: Vec<String>,
    pub complexity: usize,
    pub parse_error: bool,
}

/// A per-language-family extractor.
pub trait LanguageAnalyzer: Send + Sync {
    fn can_parse(&self, language: &str) -> bool;
    fn extract(&self, file: &SourceFile) -> Extraction;
}

fn analyzer_for(language: &str) -> Option<Box<dyn LanguageAnalyzer>> {
    let variants: Vec<Box<dyn LanguageAnalyzer>> = vec![
        Box::new(source::SourceCodeAnalyzer),
        Box::new(lightweight::MarkupAnalyzer),
        Box::new(lightweight::StylesheetAnalyzer),
        Box::new(lightweight::DataAnalyzer),
    ];
    variants.into_iter().find(|a| a.can_parse(language))
}

/// Analyze one file. Never fails: unparseable files come back with empty
/// symbols and the `parse_error` flag set so ingestion can continue.
pub fn analyze_file(file: &SourceFile) -> FileAnalysis {
    let extraction = match analyzer_for(&file.language) {
        Some(analyzer) => analyzer.extract(file),
        // Plain text family: whole file is unstructured
        None => Extraction::default(),
    };

    let total_lines = file.content.lines().count();

    // Clamp symbol spans to the file. A span outside the file would break
    // the chunker's coverage invariant. Clamping (not dropping) keeps the
    // arena's parent indices valid.
    let symbols = if total_lines == 0 {
        Vec::new()
    } else {
        extraction
            .symbols
            .into_iter()
            .map(|mut s| {
                s.start_line = s.start_line.clamp(1, total_lines);
                s.end_line = s.end_line.clamp(s.start_line, total_lines);
                s
            })
            .collect()
    };

    FileAnalysis {
        path: file.path.clone(),
        language: file.language.clone(),
        total_lines,
        size_bytes: file.size_bytes,
        symbols,
        dependencies: extraction.dependencies,
        complexity: extraction.complexity,
        parse_error: extraction.parse_error,
    }
}

/// Deterministic repository summary from the aggregated analysis:
/// language distribution, main components, and key dependencies.
pub fn repository_summary(files: &[FileAnalysis]) -> String {
    let total_lines: usize = files.iter().map(|f| f.total_lines).sum();
    let mut languages: HashMap<&str, usize> = HashMap::new();
    for f in files {
        *languages.entry(f.language.as_str()).or_insert(0) += 1;
    }

    let main_language = languages
        .iter()
        .max_by_key(|(name, count)| (**count, std::cmp::Reverse(*name)))
        .map(|(name, _)| *name)
        .unwrap_or("unknown");

    let mut summary = vec![format!(
        "This is a {main_language} repository containing {} files with a total of {total_lines} lines.",
        files.len()
    )];

    if languages.len() > 1 {
        summary.push("\nLanguage distribution:".to_string());
        let mut by_count: Vec<_> = languages.into_iter().collect();
        by_count.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        for (lang, count) in by_count {
            summary.push(format!("- {lang}: {count} files"));
        }
    }

    let components: Vec<String> = files
        .iter()
        .flat_map(|f| {
            f.symbols
                .iter()
                .filter(|s| s.parent.is_none() && s.kind == SymbolKind::Class)
                .map(move |s| match &s.docstring {
                    Some(doc) => format!("- {} (in {}): {}", s.name, f.path, first_line(doc)),
                    None => format!("- {} (in {})", s.name, f.path),
                })
        })
        .take(8)
        .collect();
    if !components.is_empty() {
        summary.push("\nMain components:".to_string());
        summary.extend(components);
    }

    let mut deps: Vec<&str> = files
        .iter()
        .flat_map(|f| f.dependencies.iter().map(String::as_str))
        .collect();
    deps.sort_unstable();
    deps.dedup();
    if !deps.is_empty() {
        summary.push("\nKey dependencies:".to_string());
        for dep in deps.into_iter().take(5) {
            summary.push(format!("- {dep}"));
        }
    }

    summary.join("\n")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// Whether a path should survive the upload filter.
pub fn is_supported_path(path: &str) -> bool {
    let p = Path::new(path);

    let filename = p
        .file_name()
        .map(|f| f.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if filename.starts_with('.') {
        return false;
    }
    if matches!(
        filename.as_ref(),
        "makefile" | "dockerfile" | "rakefile" | "gemfile" | "cargo.toml" | "package.json"
    ) {
        return true;
    }

    let ext = p
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    matches!(
        ext.as_str(),
        "rs" | "py"
            | "js"
            | "ts"
            | "tsx"
            | "jsx"
            | "go"
            | "java"
            | "c"
            | "cpp"
            | "cc"
            | "h"
            | "hpp"
            | "cs"
            | "rb"
            | "php"
            | "swift"
            | "kt"
            | "scala"
            | "lua"
            | "sh"
            | "sql"
            | "html"
            | "css"
            | "scss"
            | "less"
            | "xml"
            | "json"
            | "yaml"
            | "yml"
            | "toml"
            | "ini"
            | "cfg"
            | "md"
            | "rst"
            | "txt"
    )
}

/// Map a path to its language tag.
pub fn detect_language(path: &str) -> String {
    let ext = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" => "typescript",
        "tsx" => "tsx",
        "go" => "go",
        "java" => "java",
        "c" => "c",
        "cpp" | "cc" | "h" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "lua" => "lua",
        "sh" => "shell",
        "sql" => "sql",
        "html" => "html",
        "md" => "markdown",
        "css" | "scss" | "less" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        _ => "text",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(path: &str, content: &str) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            language: detect_language(path),
            content: content.to_string(),
            size_bytes: content.len(),
        }
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("src/main.rs"), "rust");
        assert_eq!(detect_language("app.py"), "python");
        assert_eq!(detect_language("index.tsx"), "tsx");
        assert_eq!(detect_language("README.md"), "markdown");
        assert_eq!(detect_language("LICENSE"), "text");
    }

    #[test]
    fn test_supported_path_filter() {
        assert!(is_supported_path("src/lib.rs"));
        assert!(is_supported_path("Makefile"));
        assert!(!is_supported_path(".env"));
        assert!(!is_supported_path("logo.png"));
    }

    #[test]
    fn test_analyze_plain_text_is_unstructured() {
        let file = make_file("notes.txt", "just some notes\nnothing to parse\n");
        let analysis = analyze_file(&file);
        assert!(analysis.symbols.is_empty());
        assert!(analysis.dependencies.is_empty());
        assert!(!analysis.parse_error);
        assert_eq!(analysis.total_lines, 2);
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let file = make_file(
            "app.py",
            "import os\n\ndef handler(req):\n    if req:\n        return 1\n    return 0\n",
        );
        let a = analyze_file(&file);
        let b = analyze_file(&file);
        assert_eq!(serde_json::to_string(&a.symbols).unwrap(), serde_json::to_string(&b.symbols).unwrap());
        assert_eq!(a.dependencies, b.dependencies);
        assert_eq!(a.complexity, b.complexity);
    }

    #[test]
    fn test_symbol_spans_clamped_to_file() {
        let file = make_file("tiny.py", "def f():\n    pass\n");
        let analysis = analyze_file(&file);
        for s in &analysis.symbols {
            assert!(s.start_line >= 1);
            assert!(s.end_line <= analysis.total_lines);
        }
    }

    #[test]
    fn test_repository_summary_mentions_language_and_counts() {
        let files = vec![
            analyze_file(&make_file("a.py", "import os\n\nclass Store:\n    \"\"\"Keeps things.\"\"\"\n    def get(self):\n        pass\n")),
            analyze_file(&make_file("b.py", "def run():\n    pass\n")),
        ];
        let summary = repository_summary(&files);
        assert!(summary.contains("python"));
        assert!(summary.contains("2 files"));
        assert!(summary.contains("Store"));
        assert!(summary.contains("os"));
    }
}
