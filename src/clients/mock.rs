use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use crate::core::{ImageInput, LowLevelClient};
use crate::error::AIError;

#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(String),
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Control side of a `MockClient`: queue responses, hold requests, inspect calls.
#[derive(Debug)]
pub struct MockHandle {
    queue: Mutex<VecDeque<MockResponse>>,
    by_image: Mutex<HashMap<Bytes, MockResponse>>,
    calls: Mutex<Vec<MockCall>>,
    gate: watch::Sender<bool>,
}

impl MockHandle {
    fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            queue: Mutex::new(VecDeque::new()),
            by_image: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            gate,
        }
    }

    /// Queue a response for the next request that has no image-specific response.
    pub fn add_response(&self, response: MockResponse) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(response);
        }
    }

    /// Answer every request whose image bytes equal `bytes` with `response`.
    pub fn respond_to_image(&self, bytes: impl Into<Bytes>, response: MockResponse) {
        if let Ok(mut m) = self.by_image.lock() {
            m.insert(bytes.into(), response);
        }
    }

    /// Requests block until `release` is called.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn next_response(&self, image: &Bytes) -> Option<MockResponse> {
        if let Some(r) = self.by_image.lock().ok().and_then(|m| m.get(image).cloned()) {
            return Some(r);
        }
        self.queue.lock().ok().and_then(|mut q| q.pop_front())
    }
}

/// Mock client for tests; scripted through its `MockHandle`.
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::new());
        (Self { handle: handle.clone() }, handle)
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, prompt: String, image: ImageInput) -> Result<String, AIError> {
        if let Ok(mut calls) = self.handle.calls.lock() {
            calls.push(MockCall { prompt, mime_type: image.mime_type.clone(), bytes: image.bytes.clone() });
        }

        let mut gate = self.handle.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(AIError::Mock("mock handle dropped".to_string()));
        }

        match self.handle.next_response(&image.bytes) {
            Some(MockResponse::Success(text)) => Ok(text),
            Some(MockResponse::Error(msg)) => Err(AIError::Mock(msg)),
            None => Err(AIError::Mock("no mock response queued".to_string())),
        }
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
