//! # mbote-channels
//!
//! Messaging delivery channels for Mbote.

pub mod whatsapp;

pub use whatsapp::WhatsAppChannel;
