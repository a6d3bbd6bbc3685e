//! HTTP-backed provider for Ollama and OpenAI-compatible APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::ProviderError;
use crate::models::ChatMessage;

use super::ModelProvider;

/// Maximum characters to send per text to the embedding API.
/// nomic-embed-text has an 8 192-token context. Code tokenises at roughly
/// 1 token per 2-3 chars, but dense content (JSON blobs, minified JS) can
/// hit ~2.3 tokens/char, so 3 000 chars stays safely under the window even
/// in the worst case.
const MAX_EMBED_CHARS: usize = 3_000;

pub struct HttpProvider {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpProvider {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ModelProvider for HttpProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_for_embedding(t).to_string())
            .collect();

        match self.config.provider.as_str() {
            "ollama" => embed_ollama(&self.client, &self.config, &truncated).await,
            "openai" => embed_openai(&self.client, &self.config, &truncated).await,
            other => Err(ProviderError::Rejected(format!(
                "unknown LLM provider: {other}"
            ))),
        }
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        match self.config.provider.as_str() {
            "ollama" => chat_ollama(&self.client, &self.config, messages).await,
            "openai" => chat_openai(&self.client, &self.config, messages).await,
            other => Err(ProviderError::Rejected(format!(
                "unknown LLM provider: {other}"
            ))),
        }
    }
}

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Map a transport failure. Timeouts and refused connections are worth a
/// retry; everything else is a hard rejection.
fn transport_error(context: &str, err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::Transient(format!("{context}: {err}"))
    } else {
        ProviderError::Rejected(format!("{context}: {err}"))
    }
}

/// Map a non-success HTTP status. Rate limits and server-side errors are
/// transient; client errors are rejections.
async fn status_error(context: &str, resp: reqwest::Response) -> ProviderError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let msg = format!("{context} returned {status}: {body}");
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ProviderError::Transient(msg)
    } else {
        ProviderError::Rejected(msg)
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
    /// Ask Ollama to silently truncate inputs that exceed the model's
    /// context length instead of returning a 400 error.
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, ProviderError> {
    let url = format!("{}/api/embed", config.base_url);

    // Ollama supports batch embedding with the /api/embed endpoint
    let batch_size = 32;
    let mut all_embeddings = Vec::new();

    for chunk in texts.chunks(batch_size) {
        let req = OllamaEmbedRequest {
            model: config.embedding_model.clone(),
            input: chunk.to_vec(),
            truncate: true,
        };

        let resp = client
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| transport_error("Ollama embed API", e))?;

        if !resp.status().is_success() {
            return Err(status_error("Ollama embed API", resp).await);
        }

        let body: OllamaEmbedResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Rejected(format!("bad Ollama embed response: {e}")))?;

        all_embeddings.extend(body.embeddings);
    }

    Ok(all_embeddings)
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

async fn chat_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
) -> Result<String, ProviderError> {
    let url = format!("{}/api/chat", config.base_url);

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: messages.to_vec(),
        stream: false,
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .map_err(|e| transport_error("Ollama chat API", e))?;

    if !resp.status().is_success() {
        return Err(status_error("Ollama chat API", resp).await);
    }

    let body: OllamaChatResponse = resp
        .json()
        .await
        .map_err(|e| ProviderError::Rejected(format!("bad Ollama chat response: {e}")))?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

async fn embed_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, ProviderError> {
    let url = format!("{}/v1/embeddings", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let batch_size = 64;
    let mut all_embeddings = Vec::new();

    for chunk in texts.chunks(batch_size) {
        let req = OpenAiEmbedRequest {
            model: config.embedding_model.clone(),
            input: chunk.to_vec(),
        };

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&req)
            .send()
            .await
            .map_err(|e| transport_error("OpenAI embed API", e))?;

        if !resp.status().is_success() {
            return Err(status_error("OpenAI embed API", resp).await);
        }

        let body: OpenAiEmbedResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Rejected(format!("bad OpenAI embed response: {e}")))?;

        let mut embeddings: Vec<Vec<f32>> = body.data.into_iter().map(|d| d.embedding).collect();
        all_embeddings.append(&mut embeddings);
    }

    Ok(all_embeddings)
}

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

async fn chat_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
) -> Result<String, ProviderError> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: messages.to_vec(),
        temperature: 0.3,
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .map_err(|e| transport_error("OpenAI chat API", e))?;

    if !resp.status().is_success() {
        return Err(status_error("OpenAI chat API", resp).await);
    }

    let body: OpenAiChatResponse = resp
        .json()
        .await
        .map_err(|e| ProviderError::Rejected(format!("bad OpenAI chat response: {e}")))?;
    Ok(body
        .choices
        .first()
        .map(|c| c.message.content.clone())
        .unwrap_or_default())
}
