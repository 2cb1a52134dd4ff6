//! Error types for the conversation session.

use crate::types::ConversationId;

/// Errors from the session and its stores.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("conversation not found: {0}")]
    UnknownConversation(ConversationId),
    #[error("conversation already exists: {0}")]
    DuplicateConversation(ConversationId),
    #[error("a query is already in flight")]
    Busy,
    #[error("session controller has shut down")]
    ControllerClosed,
}

/// The one failure kind of a remote query.
///
/// The reason is for logs only; users always see the same fallback reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("query failed: {reason}")]
pub struct QueryFailure {
    pub reason: String,
}

impl QueryFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for QueryFailure {
    fn from(err: reqwest::Error) -> Self {
        QueryFailure::new(err.to_string())
    }
}
