//! Data models for soundmatch-client

pub mod selected_file;
pub mod similarity_match;

pub use selected_file::{is_audio_media_type, SelectedFile};
pub use similarity_match::SimilarityMatch;
