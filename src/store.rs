//! In-memory repository store.
//!
//! Repositories are built fully off to the side and inserted in one step,
//! so readers never observe a half-built entry. Entries are shared as
//! `Arc`s; request handlers clone the Arc and drop the map lock before any
//! model call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::index::SimilarityIndex;
use crate::models::{Chunk, ConversationTurn, FileAnalysis, RepoInfo};

/// One ingested repository. Immutable after insertion except for the
/// conversation history, which has its own lock.
pub struct RepoEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub files: Vec<FileAnalysis>,
    pub chunks: Vec<Chunk>,
    pub index: SimilarityIndex,
    pub summary: String,
    pub history: Mutex<Vec<ConversationTurn>>,
}

impl RepoEntry {
    pub fn info(&self) -> RepoInfo {
        RepoInfo {
            id: self.id,
            created_at: self.created_at,
            file_count: self.files.len(),
            chunk_count: self.chunks.len(),
        }
    }
}

#[derive(Default)]
pub struct RepositoryStore {
    repos: RwLock<HashMap<Uuid, Arc<RepoEntry>>>,
}

impl RepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: RepoEntry) -> Arc<RepoEntry> {
        let entry = Arc::new(entry);
        self.repos.write().insert(entry.id, entry.clone());
        entry
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<RepoEntry>> {
        self.repos.read().get(&id).cloned()
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<RepoEntry>> {
        self.repos.write().remove(&id)
    }

    /// Metadata for every stored repository, newest first.
    pub fn list(&self) -> Vec<RepoInfo> {
        let mut infos: Vec<RepoInfo> = self.repos.read().values().map(|e| e.info()).collect();
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        infos
    }

    pub fn len(&self) -> usize {
        self.repos.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.read().is_empty()
    }
}
