//! Assistant orchestration
//!
//! Composes routing, fetching, the completion call and dialogue tracking
//! into one user turn. A turn is admitted under the session lock, runs
//! without holding it, and commits both transcript appends in a single step,
//! so failures and resets never leave half a turn behind.

mod session;

#[cfg(test)]
pub mod testing;

pub use session::{Screen, ScreenError, Session, SessionHandle, SessionRegistry};

use crate::config::AssistantConfig;
use crate::conversation::{ExchangeSide, Message};
use crate::dialogue::{DialogueState, DialogueStateTracker};
use crate::llm::{CompletionRequest, CompletionService, LlmError};
use crate::sources::{ContentFetcher, HttpFetcher, SourceRouter};
use crate::system_prompt::build_system_prompt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Shown when a reply's source URL has no catalog name
const UNKNOWN_SOURCE: &str = "Source inconnue";

/// Why a turn produced no reply. The transcripts are untouched in every case.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("completion service failed: {0}")]
    Service(#[from] LlmError),
    #[error("completion timed out after {after:?}")]
    TimedOut { after: Duration },
    #[error("a reply is already being generated for this session")]
    Busy,
    #[error("session was reset while the reply was in flight")]
    Discarded,
    #[error(transparent)]
    Screen(#[from] ScreenError),
}

impl TurnError {
    /// Whether resubmitting the same utterance may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TurnError::Service(e) => e.kind.is_retryable(),
            TurnError::TimedOut { .. } | TurnError::Busy => true,
            TurnError::Discarded | TurnError::Screen(_) => false,
        }
    }
}

/// The model-facing side of a user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedTurn {
    pub model_content: String,
    /// URL consulted for a text turn; `None` for yes/no answers
    pub source_url: Option<String>,
}

/// A committed reply
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// Reply as appended to the display transcript (with citation when sourced)
    pub text: String,
    /// Human-readable name of the consulted source
    pub source: Option<String>,
    pub dialogue: DialogueState,
}

pub struct Assistant<C, H>
where
    C: CompletionService,
    H: HttpFetcher,
{
    router: SourceRouter,
    fetcher: ContentFetcher<H>,
    completion: C,
    tracker: DialogueStateTracker,
    temperature: f32,
    completion_timeout: Duration,
    preamble: String,
}

impl<C, H> Assistant<C, H>
where
    C: CompletionService,
    H: HttpFetcher,
{
    pub fn new(config: &AssistantConfig, completion: C, http: H) -> Self {
        Self {
            router: SourceRouter::new(config.catalog.clone(), config.routing.clone()),
            fetcher: ContentFetcher::new(http, config.catalog.clone(), config.fetch.clone()),
            completion,
            tracker: DialogueStateTracker::new(config.yes_no_cues.iter().cloned()),
            temperature: config.temperature,
            completion_timeout: config.completion_timeout,
            preamble: build_system_prompt(&config.system_prompt, &config.catalog),
        }
    }

    /// A fresh session seeded with this assistant's preamble
    pub fn new_session(&self) -> Session {
        Session::new(self.preamble.clone())
    }

    /// Build the model-facing content for `utterance`.
    ///
    /// A yes/no answer is paired with the pending question. Anything else,
    /// including a yes/no answer with no question pending, is routed to a
    /// source whose text is embedded with the question.
    pub async fn compose(
        &self,
        utterance: &str,
        is_yes_no_reply: bool,
        pending_question: Option<&str>,
    ) -> ComposedTurn {
        if is_yes_no_reply {
            if let Some(question) = pending_question {
                return ComposedTurn {
                    model_content: format!("Question: {question}\nRéponse: {utterance}"),
                    source_url: None,
                };
            }
            tracing::debug!("Yes/no reply without a pending question, handling as text");
        }

        let url = self.router.select_source(utterance);
        let content = self.fetcher.fetch(url).await;
        ComposedTurn {
            model_content: format!(
                "Question utilisateur: {utterance}\nContenu de la source ({url}):\n{content}"
            ),
            source_url: Some(url.to_string()),
        }
    }

    /// Run one user turn against `session`.
    ///
    /// On success both transcripts gain the user message and the reply, and
    /// the dialogue state reflects the reply. On any error nothing changes.
    pub async fn handle_user_turn(
        &self,
        session: &Mutex<Session>,
        utterance: &str,
        is_yes_no_reply: bool,
    ) -> Result<TurnReply, TurnError> {
        let (session_id, ticket) = {
            let mut guard = session.lock().await;
            let ticket = guard.begin_turn()?;
            (guard.id().to_string(), ticket)
        };

        let outcome = tokio::select! {
            () = ticket.cancel.cancelled() => Err(TurnError::Discarded),
            result = self.run_turn(&ticket.history, ticket.pending_question.as_deref(), utterance, is_yes_no_reply) => result,
        };

        let mut guard = session.lock().await;
        match outcome {
            Ok((composed, raw)) => {
                let source = composed.source_url.as_deref().map(|url| {
                    self.router
                        .catalog()
                        .name_for(url)
                        .unwrap_or(UNKNOWN_SOURCE)
                        .to_string()
                });
                let reply = match &source {
                    Some(name) => ExchangeSide::new(format!("{raw}\n\n(Source : {name})"), raw),
                    None => ExchangeSide::same(raw),
                };
                let text = reply.display.clone();
                let dialogue = guard.commit_turn(
                    ticket.epoch,
                    ExchangeSide::new(utterance, composed.model_content),
                    reply,
                    &self.tracker,
                )?;
                tracing::info!(
                    session_id = %session_id,
                    source = source.as_deref().unwrap_or("-"),
                    yes_no = dialogue.is_yes_no(),
                    turns = guard.store().turns(),
                    "Turn committed"
                );
                Ok(TurnReply {
                    text,
                    source,
                    dialogue,
                })
            }
            Err(e) => {
                if guard.abandon_turn(ticket.epoch) {
                    tracing::warn!(session_id = %session_id, error = %e, "Turn failed");
                    Err(e)
                } else {
                    tracing::info!(session_id = %session_id, "Dropping reply for a reset session");
                    Err(TurnError::Discarded)
                }
            }
        }
    }

    async fn run_turn(
        &self,
        history: &[Message],
        pending_question: Option<&str>,
        utterance: &str,
        is_yes_no_reply: bool,
    ) -> Result<(ComposedTurn, String), TurnError> {
        let composed = self
            .compose(utterance, is_yes_no_reply, pending_question)
            .await;

        let mut messages = history.to_vec();
        messages.push(Message::user(composed.model_content.clone()));
        let request = CompletionRequest::new(messages, self.temperature);

        let response = tokio::time::timeout(self.completion_timeout, self.completion.complete(&request))
            .await
            .map_err(|_| TurnError::TimedOut {
                after: self.completion_timeout,
            })??;

        Ok((composed, response.text))
    }
}
