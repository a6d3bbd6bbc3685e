use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A source file as handed over by the transport layer, decoded to text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Repository-relative path (unique within the upload).
    pub path: String,
    /// Detected language tag, e.g. "rust", "python", "text".
    pub language: String,
    pub content: String,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Module,
}

/// An extracted symbol. Symbols for one file live in a flat arena
/// (`Vec<Symbol>`); `parent` is an index into that arena, not an owning edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub docstring: Option<String>,
    pub parent: Option<usize>,
}

/// Structural analysis of one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: String,
    pub language: String,
    pub total_lines: usize,
    pub size_bytes: usize,
    /// Symbol arena in source order (stable across re-analysis).
    pub symbols: Vec<Symbol>,
    /// Imported modules/names, duplicates collapsed, source order preserved.
    pub dependencies: Vec<String>,
    /// Branch-count complexity proxy summed over the file.
    pub complexity: usize,
    /// Set when the file could not be parsed; symbols are empty but the
    /// file stays in the repository.
    pub parse_error: bool,
}

/// A retrieval unit: a contiguous line range of one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Repository-wide insertion index; doubles as the index entry key.
    pub id: usize,
    pub file_path: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub content: String,
    /// Name of the symbol this chunk was cut for, if any.
    pub symbol: Option<String>,
}

/// A single chat turn (user, assistant, or system) sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// One turn in a repository's conversation history. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A cited code snippet attached to an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeReference {
    pub file: String,
    pub description: String,
    /// Full chunk text.
    pub code: String,
    /// 1-based line numbers relative to `code`.
    pub highlight_lines: Vec<usize>,
    /// 1-based line range within the file.
    pub start_line: usize,
    pub end_line: usize,
}

/// Answer to a query, with its supporting references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub code_references: Vec<CodeReference>,
}

/// One documented component (top-level class or module).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDoc {
    pub name: String,
    pub file: String,
    pub description: String,
    pub methods: Vec<String>,
}

/// Generated repository documentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Documentation {
    pub overview: String,
    pub architecture: String,
    pub components: Vec<ComponentDoc>,
    /// Every analyzed file appears as a key, even with no dependencies.
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub usage_guide: String,
}

/// Repository metadata returned from listings.
#[derive(Debug, Clone, Serialize)]
pub struct RepoInfo {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub file_count: usize,
    pub chunk_count: usize,
}

// ─── API request/response types ──────────────────────────

/// Successful ingest outcome.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub repo_id: Uuid,
    pub summary: String,
    pub files: Vec<String>,
}

/// Query request body.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_kind_serializes_snake_case() {
        let json = serde_json::to_value(SymbolKind::Function).unwrap();
        assert_eq!(json, "function");
    }

    #[test]
    fn test_code_reference_round_trips() {
        let r = CodeReference {
            file: "src/lib.rs".into(),
            description: "fn add in src/lib.rs".into(),
            code: "fn add(a: i32, b: i32) -> i32 { a + b }".into(),
            highlight_lines: vec![1],
            start_line: 3,
            end_line: 3,
        };
        let json = serde_json::to_string(&r).unwrap();
        let back: CodeReference = serde_json::from_str(&json).unwrap();
        assert_eq!(back.file, "src/lib.rs");
        assert_eq!(back.highlight_lines, vec![1]);
    }
}
