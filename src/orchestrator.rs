//! Prompt assembly and answer generation.
//!
//! One generation call per request: system prompt with behavioral rules,
//! windowed conversation history, then a single user message carrying the
//! retrieved code context and the question. After generation, references
//! the answer actually mentions are promoted to the front.

use std::fmt::Write;
use std::sync::Arc;

use crate::error::EngineError;
use crate::index::SimilarityIndex;
use crate::llm::{with_retry, ModelProvider};
use crate::models::{AnswerResult, ChatMessage, Chunk, CodeReference, ConversationTurn};
use crate::retriever;

const MAX_QUESTION_LEN: usize = 2_000;

/// Repositories at or below this many chunks are sent whole for the
/// repository-wide operations; larger ones go through retrieval.
const WIDE_CONTEXT_CHUNKS: usize = 24;
const WIDE_TOP_K: usize = 12;

pub const OPTIMIZE_PROMPT: &str = "Review this codebase for optimization opportunities. \
     Identify performance problems, redundant work, and unidiomatic patterns. \
     For each finding, name the file and lines involved and propose a concrete improvement.";

pub const SUGGEST_PROMPT: &str = "Review this codebase and suggest improvements to its \
     structure, naming, error handling, and test coverage. \
     For each suggestion, name the file involved and explain the change briefly.";

/// Generate an answer for `question` grounded in `refs`.
pub async fn answer(
    provider: &Arc<dyn ModelProvider>,
    summary: &str,
    history: &[ConversationTurn],
    refs: Vec<CodeReference>,
    question: &str,
    history_window: usize,
) -> Result<AnswerResult, EngineError> {
    let question = sanitize_for_prompt(&truncate_to_char_boundary(question, MAX_QUESTION_LEN));
    let messages = build_messages(
        build_system_prompt(summary),
        &window_history(history, history_window),
        &build_context_block(&refs),
        &question,
    );

    let text = with_retry(|| provider.complete(&messages)).await?;
    let code_references = correlate_citations(&text, refs);

    Ok(AnswerResult {
        answer: text,
        code_references,
    })
}

/// Context for the repository-wide operations (optimize, suggest). Small
/// repositories are passed in full, in chunk order; larger ones fall back
/// to retrieval with the analysis prompt as the query.
pub async fn repository_wide_references(
    provider: &Arc<dyn ModelProvider>,
    index: &SimilarityIndex,
    chunks: &[Chunk],
    prompt: &str,
    budget_chars: usize,
) -> Result<Vec<CodeReference>, EngineError> {
    if chunks.len() <= WIDE_CONTEXT_CHUNKS {
        let mut refs = Vec::new();
        let mut spent = 0usize;
        for chunk in chunks {
            let remaining = budget_chars.saturating_sub(spent);
            let (code, end_line) = if chunk.content.len() <= remaining {
                (chunk.content.clone(), chunk.end_line)
            } else if refs.is_empty() && remaining > 0 {
                // An oversized leading chunk is trimmed, not sent whole
                retriever::trim_to_budget(&chunk.content, chunk.start_line, remaining)
            } else {
                break;
            };
            spent += code.len();
            refs.push(CodeReference {
                file: chunk.file_path.clone(),
                description: match &chunk.symbol {
                    Some(s) => format!("{s} in {}", chunk.file_path),
                    None => format!(
                        "Lines {}-{} of {}",
                        chunk.start_line, end_line, chunk.file_path
                    ),
                },
                code,
                highlight_lines: Vec::new(),
                start_line: chunk.start_line,
                end_line,
            });
        }
        return Ok(refs);
    }

    retriever::retrieve(provider, index, chunks, prompt, WIDE_TOP_K, budget_chars).await
}

// ─── Prompt construction ─────────────────────────────────

fn build_system_prompt(summary: &str) -> String {
    format!(
        "You are a code assistant answering questions about one uploaded repository.\n\
         Each user message includes source code retrieved from that repository.\n\
         Answer ONLY based on the provided code. Never use outside knowledge.\n\
         Never say you cannot access the code — it is included in the message.\n\
         If the snippets don't answer the question, say what you found and what's missing.\n\
         Reference file paths and line numbers. Use markdown code blocks with language tags.\n\n\
         Repository summary:\n{summary}"
    )
}

fn build_context_block(refs: &[CodeReference]) -> String {
    let mut ctx = String::from("Here is source code from the repository:\n\n");

    if refs.is_empty() {
        ctx.push_str("(No relevant code was found for this query.)\n");
    } else {
        for r in refs {
            let content = sanitize_for_prompt(&r.code);
            write!(
                ctx,
                "--- {} (lines {}-{}) ---\n{}\n\n",
                r.file, r.start_line, r.end_line, content
            )
            .unwrap_or_default();
        }
    }

    ctx
}

fn build_messages(
    system_prompt: String,
    history: &[ChatMessage],
    context_block: &str,
    question: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system".to_string(),
        content: system_prompt,
    });
    messages.extend(history.iter().cloned());
    // Embed code context directly in the user message so smaller models attend to it
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: format!("{context_block}---\nQuestion: {question}"),
    });
    messages
}

/// Last `window` stored turns, oldest first, restricted to roles the chat
/// API accepts.
fn window_history(history: &[ConversationTurn], window: usize) -> Vec<ChatMessage> {
    history
        .iter()
        .filter(|t| t.role == "user" || t.role == "assistant")
        .map(|t| ChatMessage {
            role: t.role.clone(),
            content: sanitize_for_prompt(&truncate_to_char_boundary(&t.content, MAX_QUESTION_LEN)),
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .take(window)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}

/// Move references whose file path the answer mentions to the front,
/// keeping relative retrieval order within each group. References never get
/// invented here; a path mentioned without a matching reference stays plain
/// text in the answer.
fn correlate_citations(answer: &str, refs: Vec<CodeReference>) -> Vec<CodeReference> {
    let (cited, uncited): (Vec<_>, Vec<_>) =
        refs.into_iter().partition(|r| answer.contains(&r.file));
    cited.into_iter().chain(uncited).collect()
}

/// Strip ChatML-style control tokens so retrieved code or history cannot
/// smuggle role markers into the prompt.
fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|im_start|>", "").replace("<|im_end|>", "")
}

fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.char_indices()
        .take_while(|(i, _)| *i < max_len)
        .map(|(_, c)| c)
        .collect()
}
