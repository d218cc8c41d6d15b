//! # mbote-memory
//!
//! SQLite-backed record store for Mbote.

pub mod store;

pub use store::Store;
