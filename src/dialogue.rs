//! Yes/no dialogue state tracking
//!
//! Inspects each assistant reply for closed-question markers so the UI can
//! offer yes/no buttons. This is a substring heuristic, not a parser; free
//! text input stays valid in either mode.

use serde::Serialize;

/// Cue substrings recognised by default (matched against the lower-cased reply)
pub const DEFAULT_YES_NO_CUES: &[&str] = &["oui ?", "non ?", "as-tu", "ressens-tu", "avez-vous"];

/// Input control the UI should present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    #[default]
    Text,
    YesNo,
}

/// Current dialogue sub-state of a session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DialogueState {
    pub mode: InputMode,
    pub pending_question: Option<String>,
}

impl DialogueState {
    pub fn is_yes_no(&self) -> bool {
        self.mode == InputMode::YesNo
    }
}

/// Classifies replies using an injectable cue list
#[derive(Debug, Clone)]
pub struct DialogueStateTracker {
    cues: Vec<String>,
}

impl DialogueStateTracker {
    pub fn new<I, S>(cues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cues: cues.into_iter().map(|c| c.into().to_lowercase()).collect(),
        }
    }

    /// Whether the reply looks like a yes/no question
    pub fn is_yes_no_question(&self, reply: &str) -> bool {
        let lowered = reply.to_lowercase();
        self.cues
            .iter()
            .any(|cue| !cue.is_empty() && lowered.contains(cue.as_str()))
    }

    /// Compute the state that follows `reply`.
    ///
    /// The pending question is the full reply text, verbatim.
    pub fn classify(&self, reply: &str) -> DialogueState {
        if self.is_yes_no_question(reply) {
            DialogueState {
                mode: InputMode::YesNo,
                pending_question: Some(reply.to_string()),
            }
        } else {
            DialogueState::default()
        }
    }

    /// Update `state` in place from the latest reply and return it
    pub fn update<'a>(&self, state: &'a mut DialogueState, reply: &str) -> &'a DialogueState {
        *state = self.classify(reply);
        state
    }
}

impl Default for DialogueStateTracker {
    fn default() -> Self {
        Self::new(DEFAULT_YES_NO_CUES.iter().copied())
    }
}
