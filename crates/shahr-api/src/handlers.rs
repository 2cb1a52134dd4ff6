//! Route handler functions for all API endpoints.
//!
//! Each handler extracts parameters via axum extractors, talks to the
//! caller's session controller or the shared services in AppState, and
//! returns JSON responses.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use shahr_chat::{
    Conversation, ConversationId, Message, SessionEvent, SessionSnapshot, SubmitOutcome,
};
use shahr_core::{
    available_modules, AuthResult, Credentials, DocumentRecord, ModuleId, Permission,
    SavedIdentity, User,
};

use crate::auth::{generate_token, AuthContext};
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct DocumentParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SwitchActiveRequest {
    pub conversation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

/// Body of `POST /chat/messages`. Without `text` (or without a body) the
/// current draft is sent.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub text: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub title: String,
    pub description: String,
}

impl From<ModuleId> for ModuleInfo {
    fn from(id: ModuleId) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            description: id.description().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub modules: Vec<ModuleInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
    /// Dashboard header line, `<municipality> - <name>`.
    pub header: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModulesResponse {
    pub modules: Vec<ModuleInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentRecord>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub conversation_id: ConversationId,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub outcome: SubmitOutcome,
}

// =============================================================================
// Public endpoints
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.session_count(),
    })
}

/// POST /login - check credentials, open a session and remember it.
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    if credentials.username.trim().is_empty() {
        return Err(ApiError::BadRequest("username is required".to_string()));
    }

    let user = match state.verifier.verify(&credentials) {
        AuthResult::Authorized(user) => user,
        AuthResult::Rejected => {
            info!(username = %credentials.username.trim(), "Login rejected");
            return Err(ApiError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        }
    };

    let token = generate_token();
    state.start_session(&token, user.clone())?;

    let saved = SavedIdentity {
        token: token.clone(),
        user: user.clone(),
    };
    if let Err(e) = state.identity.save(&saved) {
        warn!(error = %e, "Failed to save identity");
    }

    let modules = available_modules(&user)
        .into_iter()
        .map(ModuleInfo::from)
        .collect();
    Ok(Json(LoginResponse {
        token,
        user,
        modules,
    }))
}

// =============================================================================
// Identity and modules
// =============================================================================

/// POST /logout - drop the session and forget the saved identity.
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<StatusCode, ApiError> {
    state.end_session(&ctx.token)?;
    if let Err(e) = state.identity.clear() {
        warn!(error = %e, "Failed to clear identity");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /me - the logged-in user.
pub async fn me(Extension(ctx): Extension<AuthContext>) -> Json<MeResponse> {
    let user = ctx.session.user;
    Json(MeResponse {
        header: user.header_line(),
        user,
    })
}

/// GET /modules - modules the user may open, in display order.
pub async fn modules(Extension(ctx): Extension<AuthContext>) -> Json<ModulesResponse> {
    Json(ModulesResponse {
        modules: available_modules(&ctx.session.user)
            .into_iter()
            .map(ModuleInfo::from)
            .collect(),
    })
}

/// GET /documents?q= - document catalog, filtered by title or category.
pub async fn documents(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<DocumentParams>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    if !ctx.session.user.has_permission(Permission::Documents) {
        return Err(ApiError::Forbidden(
            "documents permission required".to_string(),
        ));
    }
    let documents = state.catalog.search(params.q.as_deref().unwrap_or(""));
    Ok(Json(DocumentsResponse {
        total: documents.len(),
        documents,
    }))
}

// =============================================================================
// Chat session
// =============================================================================

/// GET /chat/state - status, active conversation, draft and directory.
pub async fn chat_state(
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(ctx.session.handle.snapshot().await?))
}

/// GET /chat/conversations - newest first.
pub async fn list_conversations(
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    Ok(Json(ConversationsResponse {
        conversations: ctx.session.handle.conversations().await?,
    }))
}

/// POST /chat/conversations - new conversation with the greeting, made active.
pub async fn create_conversation(
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = ctx.session.handle.new_conversation().await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// PUT /chat/active - switch the active conversation.
pub async fn switch_active(
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<SwitchActiveRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = &ctx.session.handle;
    handle
        .switch_active(ConversationId::from(body.conversation_id))
        .await?;
    Ok(Json(handle.snapshot().await?))
}

/// GET /chat/conversations/{id}/messages - one thread in append order.
pub async fn conversation_messages(
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let conversation_id = ConversationId::from(id);
    let messages = ctx
        .session
        .handle
        .messages(conversation_id.clone())
        .await?;
    Ok(Json(MessagesResponse {
        conversation_id,
        messages,
    }))
}

/// PUT /chat/draft - replace the input draft.
pub async fn set_draft(
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<DraftRequest>,
) -> Result<StatusCode, ApiError> {
    ctx.session.handle.set_draft(body.text).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /chat/messages - submit a question.
///
/// Always 202: the reply (or the fallback) arrives later as an event.
pub async fn submit_message(
    Extension(ctx): Extension<AuthContext>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body: SubmitRequest = if body.is_empty() {
        SubmitRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };
    let handle = &ctx.session.handle;
    let outcome = match body.text {
        Some(text) => handle.submit(text).await?,
        None => handle.submit_draft().await?,
    };
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { outcome })))
}

/// GET /chat/events - SSE stream of session events.
pub async fn chat_events(
    Extension(ctx): Extension<AuthContext>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send> {
    let rx = ctx.session.handle.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().event(event_name(&event)).data(data)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn event_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::MessageAppended { .. } => "message_appended",
        SessionEvent::ConversationCreated { .. } => "conversation_created",
        SessionEvent::ActiveChanged { .. } => "active_changed",
        SessionEvent::StatusChanged { .. } => "status_changed",
    }
}
