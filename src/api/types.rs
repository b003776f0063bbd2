//! API request and response types

use crate::assistant::Screen;
use crate::conversation::Message;
use crate::dialogue::DialogueState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Answer to the consent prompt
#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub accept: bool,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    /// Set when the user answered through the Oui/Non buttons
    #[serde(default)]
    pub yes_no: bool,
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub id: String,
    pub screen: Screen,
}

/// Full view of a session as rendered by the client
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub screen: Screen,
    /// Display transcript without the system preamble
    pub messages: Vec<Message>,
    pub dialogue: DialogueState,
    pub busy: bool,
}

/// Response for screen transitions
#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub screen: Screen,
}

/// Response for a committed chat turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub dialogue: DialogueState,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Whether resubmitting the same request may succeed
    pub retryable: bool,
    /// Delay the upstream service asked for before retrying
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            error: message.into(),
            retryable,
            retry_after_secs: None,
        }
    }
}
