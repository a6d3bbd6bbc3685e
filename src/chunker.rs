//! Symbol-aligned chunking.
//!
//! Every line of every file lands in exactly one chunk. Top-level functions
//! and classes each get their own chunk; text between symbols is swept into
//! residual chunks capped at a fixed line count. Oversized classes are
//! split along their method boundaries instead of being emitted whole.

use crate::models::{FileAnalysis, SymbolKind};

/// Classes longer than this many lines are partitioned by method.
pub const FOLD_CEILING_LINES: usize = 300;

/// Residual (non-symbol) text is split into runs of at most this many lines.
pub const RESIDUAL_MAX_LINES: usize = 50;

/// A chunk before the engine assigns its repository-wide id.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub content: String,
    pub symbol: Option<String>,
}

/// Cut one file into chunks. Deterministic for a given analysis + content.
pub fn chunk_file(analysis: &FileAnalysis, content: &str) -> Vec<ChunkDraft> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }
    let total = lines.len();

    // Top-level function/class spans, sorted by position. Overlapping spans
    // (tree-sitter can emit them for odd code) keep the earlier one.
    let mut spans: Vec<(usize, usize, String, SymbolKind)> = analysis
        .symbols
        .iter()
        .filter(|s| {
            s.parent.is_none() && matches!(s.kind, SymbolKind::Function | SymbolKind::Class)
        })
        .map(|s| (s.start_line, s.end_line.min(total), s.name.clone(), s.kind))
        .collect();
    spans.sort_by_key(|(start, end, _, _)| (*start, *end));

    let mut accepted: Vec<(usize, usize, String, SymbolKind)> = Vec::new();
    let mut high_water = 0usize;
    for span in spans {
        if span.0 > high_water {
            high_water = span.1;
            accepted.push(span);
        }
    }

    let mut chunks = Vec::new();
    let mut cursor = 1usize; // next unclaimed line

    for (start, end, name, kind) in accepted {
        // Pull an adjacent comment block above the symbol into its chunk so
        // doc comments retrieve together with the code they describe.
        let mut effective_start = start;
        while effective_start > cursor && is_comment_line(lines[effective_start - 2]) {
            effective_start -= 1;
        }

        if effective_start > cursor {
            emit_residual(&lines, cursor, effective_start - 1, &mut chunks);
        }

        let span_lines = end - effective_start + 1;
        if kind == SymbolKind::Class && span_lines > FOLD_CEILING_LINES {
            partition_class(analysis, &lines, effective_start, end, &name, &mut chunks);
        } else {
            chunks.push(draft(&lines, effective_start, end, Some(name)));
        }
        cursor = end + 1;
    }

    if cursor <= total {
        emit_residual(&lines, cursor, total, &mut chunks);
    }

    chunks
}

/// Split an oversized class along its method boundaries. Gaps between
/// methods (the class header, fields, trailing code) become residual runs
/// tagged with the class name.
fn partition_class(
    analysis: &FileAnalysis,
    lines: &[&str],
    start: usize,
    end: usize,
    class_name: &str,
    out: &mut Vec<ChunkDraft>,
) {
    let mut methods: Vec<(usize, usize, String)> = analysis
        .symbols
        .iter()
        .filter(|s| {
            s.kind == SymbolKind::Method && s.start_line > start && s.end_line <= end
        })
        .map(|s| (s.start_line, s.end_line, s.name.clone()))
        .collect();
    methods.sort_by_key(|(s, e, _)| (*s, *e));

    let mut cursor = start;
    let mut high_water = start - 1;
    for (m_start, m_end, m_name) in methods {
        if m_start <= high_water {
            continue;
        }
        if m_start > cursor {
            emit_residual_named(lines, cursor, m_start - 1, class_name, out);
        }
        out.push(draft(
            lines,
            m_start,
            m_end,
            Some(format!("{class_name}.{m_name}")),
        ));
        cursor = m_end + 1;
        high_water = m_end;
    }
    if cursor <= end {
        emit_residual_named(lines, cursor, end, class_name, out);
    }
}

fn emit_residual(lines: &[&str], start: usize, end: usize, out: &mut Vec<ChunkDraft>) {
    let mut cursor = start;
    while cursor <= end {
        let run_end = (cursor + RESIDUAL_MAX_LINES - 1).min(end);
        out.push(draft(lines, cursor, run_end, None));
        cursor = run_end + 1;
    }
}

fn emit_residual_named(
    lines: &[&str],
    start: usize,
    end: usize,
    class_name: &str,
    out: &mut Vec<ChunkDraft>,
) {
    let mut cursor = start;
    while cursor <= end {
        let run_end = (cursor + RESIDUAL_MAX_LINES - 1).min(end);
        out.push(draft(lines, cursor, run_end, Some(class_name.to_string())));
        cursor = run_end + 1;
    }
}

fn draft(lines: &[&str], start: usize, end: usize, symbol: Option<String>) -> ChunkDraft {
    ChunkDraft {
        start_line: start,
        end_line: end,
        content: lines[start - 1..end].join("\n"),
        symbol,
    }
}

fn is_comment_line(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("//") || t.starts_with('#') || t.starts_with("/*") || t.starts_with('*')
}
