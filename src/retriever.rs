//! Retrieval: query embedding, index search, and assembly of deduplicated,
//! budget-bounded code references.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::EngineError;
use crate::index::SimilarityIndex;
use crate::llm::{with_retry, ModelProvider};
use crate::models::{Chunk, CodeReference};

/// Common words excluded from highlight matching.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "code", "do", "does", "for", "from", "how",
    "in", "is", "it", "of", "on", "or", "the", "this", "to", "what", "when", "where", "which",
    "why", "with",
];

/// Retrieve the references most relevant to `query`. At most `k` results,
/// deduplicated by overlapping file range, trimmed to the character budget.
pub async fn retrieve(
    provider: &Arc<dyn ModelProvider>,
    index: &SimilarityIndex,
    chunks: &[Chunk],
    query: &str,
    k: usize,
    budget_chars: usize,
) -> Result<Vec<CodeReference>, EngineError> {
    if index.is_empty() {
        return Ok(Vec::new());
    }

    let query_text = vec![query.to_string()];
    let vectors = with_retry(|| provider.embed(&query_text)).await?;
    let query_vector = vectors.first().ok_or_else(|| {
        EngineError::Provider(crate::error::ProviderError::Rejected(
            "provider returned no embedding for query".into(),
        ))
    })?;

    // Over-fetch so deduplication can still fill k slots.
    let hits = index.search(query_vector, k.saturating_mul(2))?;

    let keywords = query_keywords(query);
    let mut refs: Vec<CodeReference> = Vec::new();
    let mut spent = 0usize;

    for (chunk_id, _score) in hits {
        if refs.len() >= k {
            break;
        }
        let Some(chunk) = chunks.get(chunk_id) else {
            continue;
        };
        if refs.iter().any(|kept| overlaps(kept, chunk)) {
            continue;
        }
        let remaining = budget_chars.saturating_sub(spent);
        if chunk.content.len() <= remaining {
            spent += chunk.content.len();
            refs.push(to_reference(chunk, &keywords));
            continue;
        }
        // A top hit bigger than what is left gets trimmed when nothing has
        // been admitted yet; otherwise the rest of the ranking is dropped.
        if refs.is_empty() && remaining > 0 {
            let (code, end_line) = trim_to_budget(&chunk.content, chunk.start_line, remaining);
            refs.push(reference_with_code(chunk, code, end_line, &keywords));
        }
        break;
    }

    Ok(refs)
}

/// Same file with intersecting line ranges.
fn overlaps(a: &CodeReference, b: &Chunk) -> bool {
    a.file == b.file_path && a.start_line <= b.end_line && b.start_line <= a.end_line
}

/// Cut `content` down to at most `budget` characters on a line boundary,
/// or a char boundary within the first line when not even one line fits.
/// Returns the kept text and its 1-based inclusive end line.
pub(crate) fn trim_to_budget(content: &str, start_line: usize, budget: usize) -> (String, usize) {
    let mut kept = String::new();
    let mut count = 0usize;
    for line in content.lines() {
        let extra = if kept.is_empty() {
            line.len()
        } else {
            line.len() + 1
        };
        if kept.len() + extra > budget {
            break;
        }
        if !kept.is_empty() {
            kept.push('\n');
        }
        kept.push_str(line);
        count += 1;
    }
    if count == 0 {
        let first = content.lines().next().unwrap_or("");
        let mut end = budget.min(first.len());
        while !first.is_char_boundary(end) {
            end -= 1;
        }
        kept = first[..end].to_string();
        count = 1;
    }
    (kept, start_line + count - 1)
}

fn to_reference(chunk: &Chunk, keywords: &HashSet<String>) -> CodeReference {
    reference_with_code(chunk, chunk.content.clone(), chunk.end_line, keywords)
}

fn reference_with_code(
    chunk: &Chunk,
    code: String,
    end_line: usize,
    keywords: &HashSet<String>,
) -> CodeReference {
    let description = match &chunk.symbol {
        Some(symbol) => format!("{symbol} in {}", chunk.file_path),
        None => format!(
            "Lines {}-{} of {}",
            chunk.start_line, end_line, chunk.file_path
        ),
    };

    CodeReference {
        file: chunk.file_path.clone(),
        description,
        highlight_lines: highlight_lines(&code, keywords),
        code,
        start_line: chunk.start_line,
        end_line,
    }
}

/// 1-based line numbers within the snippet that mention a query keyword.
/// When nothing matches, every line is highlighted so the client still
/// renders the snippet as relevant.
fn highlight_lines(code: &str, keywords: &HashSet<String>) -> Vec<usize> {
    let total = code.lines().count();
    if keywords.is_empty() {
        return (1..=total).collect();
    }

    let matched: Vec<usize> = code
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let lowered = line.to_lowercase();
            keywords.iter().any(|kw| lowered.contains(kw))
        })
        .map(|(i, _)| i + 1)
        .collect();

    if matched.is_empty() {
        (1..=total).collect()
    } else {
        matched
    }
}

fn query_keywords(query: &str) -> HashSet<String> {
    query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .map(str::to_lowercase)
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}
