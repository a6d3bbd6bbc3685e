//! Code question-answering over uploaded repositories.
//!
//! The pipeline: an uploaded archive is analyzed per file (symbols,
//! dependencies, complexity), cut into symbol-aligned chunks, embedded,
//! and indexed for cosine-similarity search. Questions retrieve the most
//! relevant chunks and go to the configured LLM as one grounded prompt;
//! the same machinery backs repository-wide reviews and documentation
//! generation.

pub mod analyzer;
pub mod api;
pub mod chunker;
pub mod config;
pub mod docs;
pub mod engine;
pub mod error;
pub mod index;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod retriever;
pub mod store;
