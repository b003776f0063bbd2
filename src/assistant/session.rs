//! Per-client session state
//!
//! A session owns its transcripts and dialogue state outright; nothing is
//! shared between sessions. The registry only hands out handles.

use super::TurnError;
use crate::conversation::{ConversationStore, ExchangeSide, Message};
use crate::dialogue::{DialogueState, DialogueStateTracker};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Which screen of the consultation flow the client is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Welcome,
    Consent,
    Chat,
}

impl Screen {
    pub fn as_str(self) -> &'static str {
        match self {
            Screen::Welcome => "welcome",
            Screen::Consent => "consent",
            Screen::Chat => "chat",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot {action} from the {} screen", .from.as_str())]
pub struct ScreenError {
    pub from: Screen,
    pub action: &'static str,
}

/// A turn that has been admitted but not yet committed
#[derive(Debug)]
pub(super) struct TurnTicket {
    pub epoch: u64,
    pub cancel: CancellationToken,
    /// Model transcript at admission time
    pub history: Vec<Message>,
    pub pending_question: Option<String>,
}

pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    screen: Screen,
    store: ConversationStore,
    dialogue: DialogueState,
    /// Bumped on every reset; replies from an older epoch are discarded
    epoch: u64,
    in_flight: Option<CancellationToken>,
}

impl Session {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            screen: Screen::Welcome,
            store: ConversationStore::new(preamble),
            dialogue: DialogueState::default(),
            epoch: 0,
            in_flight: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn dialogue(&self) -> &DialogueState {
        &self.dialogue
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Welcome -> Consent
    pub fn start(&mut self) -> Result<(), ScreenError> {
        match self.screen {
            Screen::Welcome => {
                self.screen = Screen::Consent;
                Ok(())
            }
            from => Err(ScreenError {
                from,
                action: "start a consultation",
            }),
        }
    }

    /// Consent -> Chat when accepted, Consent -> Welcome otherwise
    pub fn consent(&mut self, accept: bool) -> Result<(), ScreenError> {
        if self.screen != Screen::Consent {
            return Err(ScreenError {
                from: self.screen,
                action: "answer the consent prompt",
            });
        }
        self.screen = if accept { Screen::Chat } else { Screen::Welcome };
        Ok(())
    }

    /// Return to the welcome screen with fresh transcripts.
    ///
    /// Takes effect immediately: any in-flight turn is cancelled and its
    /// reply, if it still arrives, is discarded.
    pub fn reset(&mut self) {
        self.epoch += 1;
        if let Some(token) = self.in_flight.take() {
            token.cancel();
            tracing::info!(session_id = %self.id, "Cancelled in-flight turn on reset");
        }
        self.store.reset();
        self.dialogue = DialogueState::default();
        self.screen = Screen::Welcome;
    }

    pub(super) fn begin_turn(&mut self) -> Result<TurnTicket, TurnError> {
        if self.screen != Screen::Chat {
            return Err(TurnError::Screen(ScreenError {
                from: self.screen,
                action: "send a message",
            }));
        }
        if self.in_flight.is_some() {
            return Err(TurnError::Busy);
        }
        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        Ok(TurnTicket {
            epoch: self.epoch,
            cancel,
            history: self.store.model_snapshot().to_vec(),
            pending_question: self.dialogue.pending_question.clone(),
        })
    }

    /// Release the in-flight slot without committing anything.
    ///
    /// Returns false when the ticket is stale (the session was reset).
    pub(super) fn abandon_turn(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Commit a completed exchange to both transcripts and update the
    /// dialogue state from the raw (model side) reply. Stale tickets commit
    /// nothing.
    pub(super) fn commit_turn(
        &mut self,
        epoch: u64,
        user: ExchangeSide,
        assistant: ExchangeSide,
        tracker: &DialogueStateTracker,
    ) -> Result<DialogueState, TurnError> {
        if !self.abandon_turn(epoch) {
            return Err(TurnError::Discarded);
        }
        tracker.update(&mut self.dialogue, &assistant.model);
        self.store.append_exchange(user, assistant);
        Ok(self.dialogue.clone())
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

struct RegistryEntry {
    handle: SessionHandle,
    last_active: Instant,
}

/// All live sessions, keyed by id.
///
/// Every lookup counts as activity; sessions idle for longer than the
/// configured limit are dropped by [`SessionRegistry::start_eviction`].
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, RegistryEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) -> (String, SessionHandle) {
        let id = session.id().to_string();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(
            id.clone(),
            RegistryEntry {
                handle: handle.clone(),
                last_active: Instant::now(),
            },
        );
        (id, handle)
    }

    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_active = Instant::now();
        Some(entry.handle.clone())
    }

    /// Drop a session; an in-flight turn is cancelled
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(entry) => {
                entry.handle.lock().await.reset();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every session untouched for `max_idle`. Sessions that are
    /// locked or have a turn in flight are kept. Returns how many went.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_active) >= max_idle)
            .filter(|(_, entry)| {
                entry
                    .handle
                    .try_lock()
                    .is_ok_and(|session| !session.is_busy())
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(entry) = sessions.remove(id) {
                if let Ok(mut session) = entry.handle.try_lock() {
                    session.reset();
                }
                tracing::info!(session_id = %id, "Evicted idle session");
            }
        }
        expired.len()
    }

    /// Start the background task that evicts idle sessions every `period`
    pub fn start_eviction(self: &Arc<Self>, max_idle: Duration, period: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle(max_idle).await;
                if evicted > 0 {
                    let remaining = registry.len().await;
                    tracing::debug!(evicted, remaining, "Session sweep");
                }
            }
        })
    }
}
