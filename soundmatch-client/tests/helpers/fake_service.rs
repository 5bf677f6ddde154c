//! In-memory similarity service
//!
//! Records every call and can hold uploads or fetches until the test
//! releases them, which makes in-flight races deterministic.

use async_trait::async_trait;
use soundmatch_client::models::{SelectedFile, SimilarityMatch};
use soundmatch_client::services::{ServiceError, SimilarityService};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub struct FakeSimilarityService {
    matches: Mutex<Result<Vec<SimilarityMatch>, String>>,
    audio: Mutex<HashMap<String, Vec<u8>>>,
    audio_failures: Mutex<HashMap<String, usize>>,
    upload_gate: Option<Arc<Semaphore>>,
    fetch_gate: Option<Arc<Semaphore>>,
    find_calls: AtomicUsize,
    fetch_calls: Mutex<Vec<String>>,
    uploaded_names: Mutex<Vec<String>>,
}

impl FakeSimilarityService {
    pub fn new() -> Self {
        Self {
            matches: Mutex::new(Ok(Vec::new())),
            audio: Mutex::new(HashMap::new()),
            audio_failures: Mutex::new(HashMap::new()),
            upload_gate: None,
            fetch_gate: None,
            find_calls: AtomicUsize::new(0),
            fetch_calls: Mutex::new(Vec::new()),
            uploaded_names: Mutex::new(Vec::new()),
        }
    }

    /// Scenario C response
    pub fn with_scenario_matches() -> Self {
        let service = Self::new();
        service.set_matches(vec![
            SimilarityMatch::new("a/b/Track One.mp3", 0.82),
            SimilarityMatch::new("c/Track2.wav", 0.40),
        ]);
        service.add_audio("a/b/Track One.mp3", vec![1u8; 32]);
        service.add_audio("c/Track2.wav", vec![2u8; 16]);
        service
    }

    /// Uploads wait for [`release_uploads`](Self::release_uploads)
    pub fn hold_uploads(mut self) -> Self {
        self.upload_gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Fetches wait for [`release_fetches`](Self::release_fetches)
    pub fn hold_fetches(mut self) -> Self {
        self.fetch_gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release_uploads(&self, n: usize) {
        if let Some(gate) = &self.upload_gate {
            gate.add_permits(n);
        }
    }

    pub fn release_fetches(&self, n: usize) {
        if let Some(gate) = &self.fetch_gate {
            gate.add_permits(n);
        }
    }

    pub fn set_matches(&self, matches: Vec<SimilarityMatch>) {
        *self.matches.lock().unwrap() = Ok(matches);
    }

    pub fn fail_uploads(&self, reason: &str) {
        *self.matches.lock().unwrap() = Err(reason.to_string());
    }

    pub fn add_audio(&self, path: &str, bytes: Vec<u8>) {
        self.audio.lock().unwrap().insert(path.to_string(), bytes);
    }

    /// The next `times` fetches of `path` fail
    pub fn fail_audio(&self, path: &str, times: usize) {
        self.audio_failures
            .lock()
            .unwrap()
            .insert(path.to_string(), times);
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> Vec<String> {
        self.fetch_calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetch_calls().iter().filter(|p| *p == path).count()
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploaded_names.lock().unwrap().clone()
    }
}

impl Default for FakeSimilarityService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimilarityService for FakeSimilarityService {
    async fn find_similar(
        &self,
        file: &SelectedFile,
    ) -> Result<Vec<SimilarityMatch>, ServiceError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.uploaded_names.lock().unwrap().push(file.name.clone());

        if let Some(gate) = &self.upload_gate {
            gate.acquire().await.unwrap().forget();
        }

        let response = self.matches.lock().unwrap().clone();
        response.map_err(ServiceError::NetworkError)
    }

    async fn fetch_audio(&self, path: &str) -> Result<Vec<u8>, ServiceError> {
        self.fetch_calls.lock().unwrap().push(path.to_string());

        if let Some(gate) = &self.fetch_gate {
            gate.acquire().await.unwrap().forget();
        }

        {
            let mut failures = self.audio_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(path) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ServiceError::ApiError(500, "fetch failed".to_string()));
                }
            }
        }

        self.audio
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ServiceError::ApiError(404, "File not found".to_string()))
    }
}
