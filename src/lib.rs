//! # Skincare RAG
//!
//! Grounded skincare recommendations from a local corpus of dermatology
//! documents.
//!
//! Documents (PDF, DOCX, plain text) are split into overlapping chunks,
//! embedded, and kept in a flat vector index. A questionnaire is turned into
//! a retrieval query; the closest chunks and the profile are rendered into a
//! prompt, and the model's reply is parsed into a structured
//! [`models::Recommendation`]. Every failure path yields a well-formed,
//! clearly marked result.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Documents  │──▶│ Chunk+Embed  │──▶│ Index store  │
//! │ PDF/DOCX/TXT│   │   Indexer    │   │ file/sqlite  │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │
//!                   ┌──────────────┐   ┌──────▼───────┐
//!   UserProfile ───▶│   Pipeline   │◀──│ Arc<Index>   │
//!                   │ query+prompt │   └──────────────┘
//!                   └──────┬───────┘
//!                          ▼
//!                 ┌─────────────────┐
//!                 │ LLM → parse →   │──▶ CLI (skinrag) / HTTP
//!                 │ Recommendation  │
//!                 └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`extract`] | Text extraction from PDF and DOCX |
//! | [`documents`] | Filesystem document source |
//! | [`embedding`] | Embedding providers (local, OpenAI, Ollama) |
//! | [`completion`] | Completion providers (OpenAI-compatible, Anthropic) |
//! | [`http`] | Shared retry policy for remote providers |
//! | [`index`] | Index store selection |
//! | [`store_file`] | Directory-backed index store |
//! | [`sqlite_store`] | SQLite-backed index store |
//! | [`pipeline`] | Index lifecycle and recommendation requests |
//! | [`server`] | HTTP API |
//!
//! The pure building blocks (chunking, prompt, response parsing, the index
//! itself) live in `skincare-rag-core` and are re-exported here.

pub mod completion;
pub mod config;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod index;
pub mod index_cmd;
pub mod logging;
pub mod pipeline;
pub mod recommend;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod store_file;

pub use skincare_rag_core::{chunk, corpus, models, prompt, query, response};
