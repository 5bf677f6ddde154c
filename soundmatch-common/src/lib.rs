//! # SoundMatch Common Library
//!
//! Shared code for the SoundMatch crates:
//! - Error types
//! - Configuration loading (service address, timeouts, logging)
//! - Session event types and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
