//! # mbote-providers
//!
//! LLM provider implementations for Mbote.

pub mod openai;

pub use openai::OpenAiProvider;
