//! # mbote-core
//!
//! Core types, traits, configuration, and error handling for the Mbote
//! WhatsApp assistant service.

pub mod config;
pub mod context;
pub mod error;
pub mod intent;
pub mod message;
pub mod phone;
pub mod sanitize;
pub mod traits;

pub use config::shellexpand;
