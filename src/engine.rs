//! The engine ties the pipeline together: ingest, query, repository-wide
//! analysis, and documentation. It owns the store and the model provider;
//! the HTTP layer holds an `Arc<Engine>` and stays thin.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::analyzer;
use crate::chunker;
use crate::config::Config;
use crate::docs;
use crate::error::EngineError;
use crate::index::SimilarityIndex;
use crate::llm::{with_retry, ModelProvider};
use crate::models::{
    AnswerResult, Chunk, ConversationTurn, Documentation, IngestOutcome, RepoInfo, SourceFile,
};
use crate::orchestrator;
use crate::retriever;
use crate::store::{RepoEntry, RepositoryStore};

pub struct Engine {
    store: RepositoryStore,
    provider: Arc<dyn ModelProvider>,
    config: Config,
}

impl Engine {
    pub fn new(config: Config, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            store: RepositoryStore::new(),
            provider,
            config,
        }
    }

    /// Ingest one uploaded repository: analyze, chunk, embed, index, and
    /// only then make it visible in the store. Fails as a whole; a failed
    /// upload leaves no trace.
    pub async fn ingest(&self, files: Vec<(String, Vec<u8>)>) -> Result<IngestOutcome, EngineError> {
        let total_bytes: u64 = files.iter().map(|(_, data)| data.len() as u64).sum();
        if total_bytes > self.config.max_upload_bytes {
            return Err(EngineError::SizeLimitExceeded {
                actual: total_bytes,
                limit: self.config.max_upload_bytes,
            });
        }

        let sources: Vec<SourceFile> = files
            .into_iter()
            .filter(|(path, _)| analyzer::is_supported_path(path))
            .map(|(path, data)| {
                let content = String::from_utf8_lossy(&data).into_owned();
                SourceFile {
                    language: analyzer::detect_language(&path),
                    size_bytes: data.len(),
                    path,
                    content,
                }
            })
            .collect();

        if sources.is_empty() {
            return Err(EngineError::EmptyArchive);
        }

        let analyses: Vec<_> = sources.iter().map(analyzer::analyze_file).collect();

        // Chunk ids are assigned repository-wide in file order, matching
        // the index insertion order one to one.
        let mut chunks: Vec<Chunk> = Vec::new();
        for (source, analysis) in sources.iter().zip(&analyses) {
            for draft in chunker::chunk_file(analysis, &source.content) {
                chunks.push(Chunk {
                    id: chunks.len(),
                    file_path: source.path.clone(),
                    start_line: draft.start_line,
                    end_line: draft.end_line,
                    content: draft.content,
                    symbol: draft.symbol,
                });
            }
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = with_retry(|| self.provider.embed(&texts)).await?;
        if vectors.len() != chunks.len() {
            return Err(EngineError::Provider(crate::error::ProviderError::Rejected(
                format!(
                    "provider returned {} embeddings for {} chunks",
                    vectors.len(),
                    chunks.len()
                ),
            )));
        }

        let mut index = SimilarityIndex::new(self.config.llm.embedding_dim);
        for (chunk, vector) in chunks.iter().zip(vectors) {
            index.insert(chunk.id, vector)?;
        }

        let summary = analyzer::repository_summary(&analyses);
        let file_paths: Vec<String> = sources.iter().map(|s| s.path.clone()).collect();

        let entry = self.store.insert(RepoEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            files: analyses,
            chunks,
            index,
            summary,
            history: parking_lot::Mutex::new(Vec::new()),
        });

        tracing::info!(
            repo_id = %entry.id,
            files = file_paths.len(),
            chunks = entry.chunks.len(),
            "repository ingested"
        );

        Ok(IngestOutcome {
            repo_id: entry.id,
            summary: entry.summary.clone(),
            files: file_paths,
        })
    }

    /// Answer a question about one repository and record the exchange in
    /// its conversation history.
    pub async fn query(&self, repo_id: Uuid, question: &str) -> Result<AnswerResult, EngineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        let entry = self.entry(repo_id)?;

        let refs = retriever::retrieve(
            &self.provider,
            &entry.index,
            &entry.chunks,
            question,
            self.config.retrieval.top_k,
            self.config.retrieval.context_budget_chars,
        )
        .await?;

        // Snapshot the history so no lock is held across the model call
        let history = entry.history.lock().clone();
        let result = orchestrator::answer(
            &self.provider,
            &entry.summary,
            &history,
            refs,
            question,
            self.config.retrieval.history_window,
        )
        .await?;

        let mut history = entry.history.lock();
        history.push(ConversationTurn {
            role: "user".into(),
            content: question.to_string(),
            timestamp: Utc::now(),
        });
        history.push(ConversationTurn {
            role: "assistant".into(),
            content: result.answer.clone(),
            timestamp: Utc::now(),
        });

        Ok(result)
    }

    /// Repository-wide optimization review.
    pub async fn optimize(&self, repo_id: Uuid) -> Result<AnswerResult, EngineError> {
        self.repository_wide(repo_id, orchestrator::OPTIMIZE_PROMPT)
            .await
    }

    /// Repository-wide improvement suggestions.
    pub async fn suggest(&self, repo_id: Uuid) -> Result<AnswerResult, EngineError> {
        self.repository_wide(repo_id, orchestrator::SUGGEST_PROMPT)
            .await
    }

    async fn repository_wide(
        &self,
        repo_id: Uuid,
        prompt: &str,
    ) -> Result<AnswerResult, EngineError> {
        let entry = self.entry(repo_id)?;
        let refs = orchestrator::repository_wide_references(
            &self.provider,
            &entry.index,
            &entry.chunks,
            prompt,
            self.config.retrieval.context_budget_chars,
        )
        .await?;
        // Stateless analysis, so the conversation history stays untouched
        orchestrator::answer(&self.provider, &entry.summary, &[], refs, prompt, 0).await
    }

    pub async fn generate_docs(&self, repo_id: Uuid) -> Result<Documentation, EngineError> {
        let entry = self.entry(repo_id)?;
        docs::generate(&self.provider, &entry.summary, &entry.files).await
    }

    pub fn delete(&self, repo_id: Uuid) -> Result<(), EngineError> {
        self.store
            .remove(repo_id)
            .map(|_| ())
            .ok_or(EngineError::UnknownRepository(repo_id))
    }

    pub fn list(&self) -> Vec<RepoInfo> {
        self.store.list()
    }

    /// Upload ceiling in decompressed bytes, shared with the HTTP layer so
    /// archives are bounded while still being extracted.
    pub fn max_upload_bytes(&self) -> u64 {
        self.config.max_upload_bytes
    }

    fn entry(&self, repo_id: Uuid) -> Result<Arc<RepoEntry>, EngineError> {
        self.store
            .get(repo_id)
            .ok_or(EngineError::UnknownRepository(repo_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockProvider;

    const DIM: usize = 128;

    fn engine() -> (Engine, Arc<MockProvider>) {
        let mut config = Config::default();
        config.llm.provider = "mock".into();
        config.llm.embedding_dim = DIM;
        let mock = Arc::new(MockProvider::new(DIM));
        (Engine::new(config, mock.clone()), mock)
    }

    fn sample_files() -> Vec<(String, Vec<u8>)> {
        vec![
            (
                "math.py".to_string(),
                b"def add(a, b):\n    \"\"\"Add two numbers.\"\"\"\n    return a + b\n".to_vec(),
            ),
            (
                "style.css".to_string(),
                b".button {\n  color: red;\n}\n".to_vec(),
            ),
        ]
    }

    #[tokio::test]
    async fn test_ingest_then_query() {
        let (engine, _) = engine();
        let outcome = engine.ingest(sample_files()).await.unwrap();
        assert_eq!(outcome.files.len(), 2);
        assert!(outcome.summary.contains("2 files"));

        let result = engine
            .query(outcome.repo_id, "what does the add function do?")
            .await
            .unwrap();
        assert!(!result.code_references.is_empty());
        assert_eq!(result.code_references[0].file, "math.py");
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty_archive() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.ingest(Vec::new()).await,
            Err(EngineError::EmptyArchive)
        ));
        // Unsupported files only is the same as empty
        let files = vec![("logo.png".to_string(), vec![0u8; 10])];
        assert!(matches!(
            engine.ingest(files).await,
            Err(EngineError::EmptyArchive)
        ));
    }

    #[tokio::test]
    async fn test_ingest_enforces_size_limit() {
        let (mut engine, _mock) = engine();
        engine.config.max_upload_bytes = 16;
        let files = vec![("big.py".to_string(), vec![b'x'; 64])];
        assert!(matches!(
            engine.ingest(files).await,
            Err(EngineError::SizeLimitExceeded { actual: 64, limit: 16 })
        ));
    }

    #[tokio::test]
    async fn test_query_validates_before_model_call() {
        let (engine, mock) = engine();
        let outcome = engine.ingest(sample_files()).await.unwrap();
        let calls_after_ingest = mock.embed_calls();

        assert!(matches!(
            engine.query(outcome.repo_id, "   ").await,
            Err(EngineError::EmptyQuery)
        ));
        assert!(matches!(
            engine.query(Uuid::new_v4(), "hello").await,
            Err(EngineError::UnknownRepository(_))
        ));
        assert_eq!(mock.embed_calls(), calls_after_ingest);
        assert_eq!(mock.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_query_appends_history() {
        let (engine, mock) = engine();
        mock.set_answer("add sums two numbers, see math.py");
        let outcome = engine.ingest(sample_files()).await.unwrap();

        engine
            .query(outcome.repo_id, "what does add do?")
            .await
            .unwrap();
        engine
            .query(outcome.repo_id, "and what about css?")
            .await
            .unwrap();

        let entry = engine.entry(outcome.repo_id).unwrap();
        let history = entry.history.lock();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_embed_failure_is_retried() {
        let (engine, mock) = engine();
        let outcome = engine.ingest(sample_files()).await.unwrap();

        mock.fail_next_embeds(1);
        let result = engine
            .query(outcome.repo_id, "what does add do?")
            .await
            .unwrap();
        assert!(!result.answer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_completion_failure_is_retried() {
        let (engine, mock) = engine();
        mock.set_answer("add sums two numbers");
        let outcome = engine.ingest(sample_files()).await.unwrap();

        mock.fail_next_completions(1);
        let result = engine
            .query(outcome.repo_id, "what does add do?")
            .await
            .unwrap();
        assert_eq!(result.answer, "add sums two numbers");
        // Failed attempt plus the successful retry
        assert_eq!(mock.complete_calls(), 2);
    }

    #[tokio::test]
    async fn test_optimize_and_suggest_leave_history_alone() {
        let (engine, mock) = engine();
        mock.set_answer("Consider caching the result.");
        let outcome = engine.ingest(sample_files()).await.unwrap();

        let opt = engine.optimize(outcome.repo_id).await.unwrap();
        assert_eq!(opt.answer, "Consider caching the result.");
        assert!(!opt.code_references.is_empty());

        let sug = engine.suggest(outcome.repo_id).await.unwrap();
        assert!(!sug.answer.is_empty());

        let entry = engine.entry(outcome.repo_id).unwrap();
        assert!(entry.history.lock().is_empty());
    }

    #[tokio::test]
    async fn test_docs_cover_every_file() {
        let (engine, _) = engine();
        let outcome = engine.ingest(sample_files()).await.unwrap();
        let docs = engine.generate_docs(outcome.repo_id).await.unwrap();

        for file in &outcome.files {
            assert!(
                docs.dependencies.contains_key(file),
                "{file} missing from dependency map"
            );
        }
    }

    #[tokio::test]
    async fn test_delete_removes_repository() {
        let (engine, _) = engine();
        let outcome = engine.ingest(sample_files()).await.unwrap();
        assert_eq!(engine.list().len(), 1);

        engine.delete(outcome.repo_id).unwrap();
        assert!(engine.list().is_empty());
        assert!(matches!(
            engine.delete(outcome.repo_id),
            Err(EngineError::UnknownRepository(_))
        ));
    }

    #[tokio::test]
    async fn test_reingestion_is_deterministic() {
        let (engine, _) = engine();
        let a = engine.ingest(sample_files()).await.unwrap();
        let b = engine.ingest(sample_files()).await.unwrap();
        assert_ne!(a.repo_id, b.repo_id);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.files, b.files);

        let entry_a = engine.entry(a.repo_id).unwrap();
        let entry_b = engine.entry(b.repo_id).unwrap();
        assert_eq!(entry_a.chunks.len(), entry_b.chunks.len());
        for (ca, cb) in entry_a.chunks.iter().zip(entry_b.chunks.iter()) {
            assert_eq!(ca.content, cb.content);
            assert_eq!(ca.start_line, cb.start_line);
        }
    }
}
