//! Test Helper Utilities
//!
//! Shared utilities for testing soundmatch-client

#![allow(dead_code)]

pub mod fake_service;
pub mod mock_server;

pub use fake_service::FakeSimilarityService;
pub use mock_server::{MockServer, MockServerConfig};

use soundmatch_client::models::SelectedFile;

/// Small in-memory MP3 selection
pub fn mp3_file(name: &str) -> SelectedFile {
    SelectedFile::new(name, "audio/mpeg", b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec())
}

/// Non-audio selection
pub fn pdf_file(name: &str) -> SelectedFile {
    SelectedFile::new(name, "application/pdf", b"%PDF-1.7".to_vec())
}

/// Yield to the scheduler until `condition` holds (bounded)
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
