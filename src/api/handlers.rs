//! HTTP request handlers

use super::types::{
    ChatRequest, ChatResponse, ConsentRequest, CreateSessionResponse, ErrorResponse,
    ScreenResponse, SessionResponse, SuccessResponse,
};
use super::AppState;
use crate::assistant::{ScreenError, SessionHandle, TurnError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // Screen flow
        .route("/api/sessions/:id/start", post(start_session))
        .route("/api/sessions/:id/consent", post(answer_consent))
        .route("/api/sessions/:id/reset", post(reset_session))
        // Chat
        .route("/api/sessions/:id/chat", post(send_chat))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn find_session(state: &AppState, id: &str) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Session lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session = state.assistant.new_session();
    let screen = session.screen();
    let (id, _) = state.sessions.insert(session).await;
    tracing::info!(session_id = %id, "Session created");
    Json(CreateSessionResponse { id, screen })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = find_session(&state, &id).await?;
    let session = handle.lock().await;

    Ok(Json(SessionResponse {
        id: session.id().to_string(),
        created_at: session.created_at(),
        screen: session.screen(),
        messages: session.store().snapshot().iter().skip(1).cloned().collect(),
        dialogue: session.dialogue().clone(),
        busy: session.is_busy(),
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.sessions.remove(&id).await {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }
    tracing::info!(session_id = %id, "Session deleted");
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Screen flow
// ============================================================

async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScreenResponse>, AppError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    session.start()?;
    Ok(Json(ScreenResponse {
        screen: session.screen(),
    }))
}

async fn answer_consent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ConsentRequest>,
) -> Result<Json<ScreenResponse>, AppError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    session.consent(req.accept)?;
    tracing::info!(session_id = %id, accepted = req.accept, "Consent answered");
    Ok(Json(ScreenResponse {
        screen: session.screen(),
    }))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScreenResponse>, AppError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    session.reset();
    tracing::info!(session_id = %id, "Session reset");
    Ok(Json(ScreenResponse {
        screen: session.screen(),
    }))
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }
    let ChatRequest { text, yes_no } = req;
    let handle = find_session(&state, &id).await?;

    // Run the turn on its own task so a disconnecting client cannot leave
    // the session stuck in the busy state.
    let assistant = state.assistant.clone();
    let turn = tokio::spawn(async move {
        assistant
            .handle_user_turn(&handle, &text, yes_no)
            .await
    });
    let reply = turn
        .await
        .map_err(|e| AppError::Internal(format!("Turn task failed: {e}")))??;

    Ok(Json(ChatResponse {
        reply: reply.text,
        source: reply.source,
        dialogue: reply.dialogue,
    }))
}

async fn get_version() -> &'static str {
    concat!("symptom ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Turn(TurnError),
    Internal(String),
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        AppError::Turn(e)
    }
}

impl From<ScreenError> for AppError {
    fn from(e: ScreenError) -> Self {
        AppError::Turn(TurnError::Screen(e))
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Turn(TurnError::Service(_)) => StatusCode::BAD_GATEWAY,
            AppError::Turn(TurnError::TimedOut { .. }) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Turn(TurnError::Busy | TurnError::Discarded | TurnError::Screen(_)) => {
                StatusCode::CONFLICT
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Internal(msg) => {
                ErrorResponse::new(msg, false)
            }
            AppError::Turn(e) => {
                let retry_after_secs = match &e {
                    TurnError::Service(llm) => llm.retry_after.map(|d| d.as_secs()),
                    _ => None,
                };
                ErrorResponse {
                    retry_after_secs,
                    ..ErrorResponse::new(e.to_string(), e.is_retryable())
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SharedAssistant;
    use crate::assistant::testing::{MockCompletionService, MockHttpFetcher};
    use crate::assistant::{Assistant, Screen};
    use crate::config::AssistantConfig;
    use crate::conversation::Role;
    use crate::dialogue::InputMode;
    use crate::llm::{CompletionService, LlmError};
    use crate::sources::HttpFetcher;
    use std::sync::Arc;

    fn app_state(llm: Arc<MockCompletionService>) -> AppState {
        let completion: Arc<dyn CompletionService> = llm;
        let http: Arc<dyn HttpFetcher> = Arc::new(MockHttpFetcher::new());
        let assistant: SharedAssistant =
            Assistant::new(&AssistantConfig::default(), completion, http);
        AppState::new(assistant)
    }

    async fn chat_ready(state: &AppState) -> String {
        let Json(created) = create_session(State(state.clone())).await;
        start_session(State(state.clone()), Path(created.id.clone()))
            .await
            .unwrap();
        answer_consent(
            State(state.clone()),
            Path(created.id.clone()),
            Json(ConsentRequest { accept: true }),
        )
        .await
        .unwrap();
        created.id
    }

    fn chat(text: &str, yes_no: bool) -> Json<ChatRequest> {
        Json(ChatRequest {
            text: text.to_string(),
            yes_no,
        })
    }

    #[tokio::test]
    async fn test_screen_flow_through_api() {
        let state = app_state(Arc::new(MockCompletionService::new()));
        let Json(created) = create_session(State(state.clone())).await;
        assert_eq!(created.screen, Screen::Welcome);

        let Json(started) = start_session(State(state.clone()), Path(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(started.screen, Screen::Consent);

        let Json(declined) = answer_consent(
            State(state.clone()),
            Path(created.id.clone()),
            Json(ConsentRequest { accept: false }),
        )
        .await
        .unwrap();
        assert_eq!(declined.screen, Screen::Welcome);

        let err = answer_consent(
            State(state),
            Path(created.id),
            Json(ConsentRequest { accept: true }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_chat_returns_reply_and_hides_preamble() {
        let llm = Arc::new(MockCompletionService::new());
        llm.queue_text("Avez-vous de la fièvre ?");
        let state = app_state(llm);
        let id = chat_ready(&state).await;

        let Json(reply) = send_chat(State(state.clone()), Path(id.clone()), chat("  J'ai mal ", false))
            .await
            .unwrap();
        assert_eq!(reply.source.as_deref(), Some("Mayo Clinic"));
        assert_eq!(reply.dialogue.mode, InputMode::YesNo);

        let Json(view) = get_session(State(state), Path(id)).await.unwrap();
        assert_eq!(view.screen, Screen::Chat);
        assert!(!view.busy);
        let roles: Vec<Role> = view.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant]);
        // Displayed exactly as typed
        assert_eq!(view.messages[0].content, "  J'ai mal ");
        assert_eq!(view.messages[1].content, reply.reply);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let llm = Arc::new(MockCompletionService::new());
        let state = app_state(llm.clone());
        let id = chat_ready(&state).await;

        let err = send_chat(State(state), Path(id), chat("   ", false))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_chat_before_consent_conflicts() {
        let state = app_state(Arc::new(MockCompletionService::new()));
        let Json(created) = create_session(State(state.clone())).await;

        let err = send_chat(State(state), Path(created.id), chat("hello", false))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_service_failure_maps_to_bad_gateway() {
        let llm = Arc::new(MockCompletionService::new());
        llm.queue_error(LlmError::server_error("upstream down").with_status(503));
        let state = app_state(llm);
        let id = chat_ready(&state).await;

        let err = send_chat(State(state.clone()), Path(id.clone()), chat("hello", false))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let Json(view) = get_session(State(state), Path(id)).await.unwrap();
        assert!(view.messages.is_empty());
        assert!(!view.busy);
    }

    #[tokio::test]
    async fn test_reset_and_delete() {
        let llm = Arc::new(MockCompletionService::new());
        llm.queue_text("Bonjour");
        let state = app_state(llm);
        let id = chat_ready(&state).await;
        send_chat(State(state.clone()), Path(id.clone()), chat("hello", false))
            .await
            .unwrap();

        let Json(reset) = reset_session(State(state.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(reset.screen, Screen::Welcome);
        let Json(view) = get_session(State(state.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert!(view.messages.is_empty());

        delete_session(State(state.clone()), Path(id.clone()))
            .await
            .unwrap();
        let err = get_session(State(state), Path(id)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_turn_error_status_mapping() {
        let cases = [
            (TurnError::Busy, StatusCode::CONFLICT),
            (TurnError::Discarded, StatusCode::CONFLICT),
            (
                TurnError::TimedOut {
                    after: std::time::Duration::from_secs(60),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                TurnError::Service(LlmError::auth("bad key")),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(AppError::from(error).into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_rate_limit_body_carries_retry_delay() {
        let error = TurnError::Service(
            LlmError::rate_limit("slow down").with_retry_after(std::time::Duration::from_secs(7)),
        );
        let response = AppError::from(error).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retryable"], true);
        assert_eq!(body["retry_after_secs"], 7);

        let response = AppError::from(TurnError::Busy).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.get("retry_after_secs").is_none());
    }
}
