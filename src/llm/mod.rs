//! Model provider abstraction: batch embeddings and chat completion behind
//! one trait so the engine never touches HTTP directly and tests can swap
//! in a deterministic in-process provider.

pub mod http;
pub mod mock;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::ChatMessage;

/// Wait before the single retry of a transient provider failure.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Embed a batch of texts. The result has one vector per input text,
    /// in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// One non-streaming chat completion over the given messages.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;
}

/// Run a provider call, retrying exactly once after a backoff if the first
/// attempt fails transiently. Rejections propagate immediately.
pub async fn with_retry<T, F, Fut>(op: F) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(err) if err.is_transient() => {
            tracing::warn!("provider call failed transiently, retrying once: {err}");
            tokio::time::sleep(RETRY_BACKOFF).await;
            op().await
        }
        Err(err) => Err(err),
    }
}
