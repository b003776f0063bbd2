//! Mock implementations for testing
//!
//! These mocks drive the assistant without real I/O.

use crate::llm::{CompletionRequest, CompletionResponse, CompletionService, LlmError};
use crate::sources::{HttpFetcher, HttpResponse, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Completion Service
// ============================================================================

/// Completion service that returns queued responses
pub struct MockCompletionService {
    responses: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful text reply
    pub fn queue_text(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(CompletionResponse::text(text)));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockCompletionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Gated Completion Service
// ============================================================================

/// Completion service that blocks each call until the test releases it.
///
/// Used to hold a request in flight while the test resets the session or
/// submits a competing turn.
pub struct GatedCompletionService {
    inner: MockCompletionService,
    entered: Notify,
    release: Notify,
}

impl GatedCompletionService {
    pub fn new() -> Self {
        Self {
            inner: MockCompletionService::new(),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn queue_text(&self, text: impl Into<String>) {
        self.inner.queue_text(text);
    }

    /// Wait until a call is blocked inside `complete`
    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    /// Let one blocked (or the next) call proceed
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl CompletionService for GatedCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.complete(request).await
    }

    fn model_id(&self) -> &str {
        "gated-model"
    }
}

// ============================================================================
// Mock HTTP Fetcher
// ============================================================================

/// A recorded GET
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// HTTP fetcher serving canned pages; unknown URLs fail to connect
#[derive(Default)]
pub struct MockHttpFetcher {
    pages: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<RecordedFetch>>,
}

impl MockHttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, response: HttpResponse) -> Self {
        self.pages.insert(url.into(), response);
        self
    }

    pub fn recorded_requests(&self) -> Vec<RecordedFetch> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpFetcher for MockHttpFetcher {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedFetch {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            timeout,
        });
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Connect(format!("no route to {url}")))
    }
}
