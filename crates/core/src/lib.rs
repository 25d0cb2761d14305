//! # Apeiron Core
//!
//! Domain types, traits, and error definitions for the Apeiron topic archive.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that the provider, oracle and CLI crates implement against.
//!
//! ## Design Philosophy
//!
//! The generative-text backend is defined as a trait here. Implementations
//! live in `apeiron-providers`. This enables:
//! - Swapping backends via configuration
//! - Easy testing with mock/stub providers
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod topic;

// Re-export key types at crate root for ergonomics
pub use error::{CatalogError, ProviderError};
pub use message::{ChatMessage, ChatRole};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
pub use topic::{CodeSnippet, Difficulty, KeyConcept, Topic, TopicDetail};
