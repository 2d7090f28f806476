//! # skincare-rag core
//!
//! Runtime-agnostic logic for grounded skincare recommendations: data
//! models, document chunking, the embedding/completion capability traits,
//! the vector index and its store abstraction, query formatting, prompt
//! construction and model-response parsing.
//!
//! This crate performs no network or filesystem I/O. Concrete embedding
//! providers, completion providers and durable index stores live in the
//! `skincare-rag` application crate.

pub mod chunk;
pub mod completion;
pub mod corpus;
pub mod embedding;
pub mod index;
pub mod models;
pub mod prompt;
pub mod query;
pub mod response;
