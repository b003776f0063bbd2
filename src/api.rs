//! HTTP API for the consultation front-end
//!
//! Each browser tab owns one session; all chat state lives server-side.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::assistant::{Assistant, SessionRegistry};
use crate::llm::CompletionService;
use crate::sources::HttpFetcher;
use std::sync::Arc;

/// The assistant as wired in production, with type-erased collaborators
pub type SharedAssistant = Assistant<Arc<dyn CompletionService>, Arc<dyn HttpFetcher>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub assistant: Arc<SharedAssistant>,
}

impl AppState {
    pub fn new(assistant: SharedAssistant) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new()),
            assistant: Arc::new(assistant),
        }
    }
}
