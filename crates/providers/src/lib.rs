//! Generative-text provider implementations for Apeiron.
//!
//! All providers implement the `apeiron_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod gemini;
pub mod openai_compat;
pub mod router;
mod wire;

#[cfg(test)]
mod test_helpers;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::ProviderRouter;
