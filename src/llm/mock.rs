//! Deterministic in-process provider for tests and offline runs.
//!
//! Embeddings are bag-of-words vectors: each lowercase alphanumeric token
//! hashes to a bucket, buckets accumulate counts, and the vector is
//! L2-normalized. Texts sharing tokens therefore score higher under cosine
//! similarity, which is enough signal for end-to-end retrieval tests
//! without a model server.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ProviderError;
use crate::models::ChatMessage;

use super::ModelProvider;

pub struct MockProvider {
    dim: usize,
    answer: Mutex<String>,
    /// Remaining scripted transient failures, consumed one per embed call.
    embed_failures: AtomicUsize,
    /// Remaining scripted transient failures, consumed one per complete call.
    complete_failures: AtomicUsize,
    embed_calls: AtomicUsize,
    complete_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            answer: Mutex::new("This is a mock answer.".to_string()),
            embed_failures: AtomicUsize::new(0),
            complete_failures: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_answer(&self, answer: impl Into<String>) {
        *self.answer.lock() = answer.into();
    }

    /// Script the next `n` embed calls to fail transiently.
    pub fn fail_next_embeds(&self, n: usize) {
        self.embed_failures.store(n, Ordering::SeqCst);
    }

    /// Script the next `n` complete calls to fail transiently.
    pub fn fail_next_completions(&self, n: usize) {
        self.complete_failures.store(n, Ordering::SeqCst);
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dim;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.embed_failures) {
            return Err(ProviderError::Transient("scripted embed failure".into()));
        }
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.complete_failures) {
            return Err(ProviderError::Transient("scripted completion failure".into()));
        }
        Ok(self.answer.lock().clone())
    }
}
