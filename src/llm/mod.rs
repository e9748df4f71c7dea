//! LLM Provider Clients and Abstractions
//!
//! Every model call in a research run (query analysis, synthesis, section
//! drafting, progress narrative) goes through the [`LLMClient`] trait, so the
//! pipeline can be driven by any provider or by a test double.
//!
//! # Supported Providers
//!
//! Both providers speak the OpenAI chat-completions protocol:
//! - `gemini` - Google Gemini through its OpenAI-compatible endpoint (default)
//! - `openai` - OpenAI or any compatible API
//!
//! # Example
//!
//! ```ignore
//! use deepdive::llm::Provider;
//!
//! let provider = Provider::Gemini {
//!     api_key: std::env::var("GEMINI_API_KEY")?,
//!     api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
//!     model: "gemini-2.5-flash".to_string(),
//!     temperature: Some(0.4),
//! };
//!
//! let client = provider.create_client()?;
//! let response = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// OpenAI-compatible chat completions client.
pub mod openai;

pub use client::{LLMClient, Provider, with_timeout};
