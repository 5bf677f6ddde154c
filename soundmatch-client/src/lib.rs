//! soundmatch-client library interface
//!
//! Client-side controller for audio similarity lookups: select a local audio
//! file, upload it to the similarity service, browse the ranked matches and
//! fetch match audio on demand.

pub mod error;
pub mod formatting;
pub mod models;
pub mod services;
pub mod session;

pub use crate::error::{SessionError, SessionResult};
pub use crate::session::SimilaritySession;
