//! Dual transcript conversation store
//!
//! Keeps the transcript shown to the user and the transcript sent to the
//! model side by side. Both always start with the same system preamble and
//! always hold the same number of user/assistant turns; only the content of
//! individual messages may differ.

use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Owns the display and model transcripts of one session.
///
/// Appends are the only mutation besides [`ConversationStore::reset`], and
/// every append touches both transcripts so they cannot drift apart.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    preamble: String,
    display: Vec<Message>,
    model: Vec<Message>,
}

impl ConversationStore {
    pub fn new(preamble: impl Into<String>) -> Self {
        let preamble = preamble.into();
        Self {
            display: vec![Message::system(preamble.clone())],
            model: vec![Message::system(preamble.clone())],
            preamble,
        }
    }

    /// Append a user message; `display` goes to the user-facing transcript,
    /// `model` to the model-facing one.
    pub fn append_user(&mut self, display: impl Into<String>, model: impl Into<String>) {
        self.display.push(Message::user(display));
        self.model.push(Message::user(model));
    }

    /// Append an assistant reply, possibly annotated differently for display.
    pub fn append_assistant(&mut self, display: impl Into<String>, model: impl Into<String>) {
        self.display.push(Message::assistant(display));
        self.model.push(Message::assistant(model));
    }

    /// Append a complete user/assistant exchange in one step.
    pub fn append_exchange(&mut self, user: ExchangeSide, assistant: ExchangeSide) {
        self.append_user(user.display, user.model);
        self.append_assistant(assistant.display, assistant.model);
    }

    /// Drop every turn, keeping only the preamble
    pub fn reset(&mut self) {
        self.display.truncate(1);
        self.model.truncate(1);
        self.display[0] = Message::system(self.preamble.clone());
        self.model[0] = Message::system(self.preamble.clone());
    }

    /// The user-facing transcript, preamble included
    pub fn snapshot(&self) -> &[Message] {
        &self.display
    }

    /// The transcript sent to the completion service
    pub fn model_snapshot(&self) -> &[Message] {
        &self.model
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.display.len()
    }

    /// Number of completed user/assistant exchanges
    pub fn turns(&self) -> usize {
        self.model
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }
}

/// One side of an exchange, as shown to the user and as sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSide {
    pub display: String,
    pub model: String,
}

impl ExchangeSide {
    pub fn new(display: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            model: model.into(),
        }
    }

    /// Same content on both transcripts
    pub fn same(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            display: content.clone(),
            model: content,
        }
    }
}
