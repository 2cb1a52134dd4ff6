//! Data model of the conversation session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identities
// =============================================================================

/// Opaque, unique conversation identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Allocate a fresh random identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Message identity, unique within its conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// Structured reply of the question-answering service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// The question as echoed by the service.
    pub question: String,
    pub answer: String,
}

/// One immutable turn within a conversation.
///
/// Fields are private; a message is only ever built by the
/// [`MessageStore`](crate::store::MessageStore) when it is appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    body: String,
    sender: Sender,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    search: Option<Answer>,
}

impl Message {
    pub(crate) fn stamp(draft: NewMessage, created_at: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            body: draft.body,
            sender: draft.sender,
            created_at,
            documents: draft.documents,
            search: draft.search,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Cited document file names, in citation order.
    pub fn documents(&self) -> Option<&[String]> {
        self.documents.as_deref()
    }

    pub fn search(&self) -> Option<&Answer> {
        self.search.as_ref()
    }
}

/// Contents of a message before the store assigns its id and timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMessage {
    pub body: String,
    pub sender: Sender,
    pub documents: Option<Vec<String>>,
    pub search: Option<Answer>,
}

impl NewMessage {
    pub fn user(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            sender: Sender::User,
            documents: None,
            search: None,
        }
    }

    pub fn assistant(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            sender: Sender::Assistant,
            documents: None,
            search: None,
        }
    }

    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn with_search(mut self, answer: Answer) -> Self {
        self.search = Some(answer);
        self
    }
}

// =============================================================================
// Conversations
// =============================================================================

/// Directory entry summarizing one conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    /// Summary of the most recent message; empty until one is appended.
    pub last_message: String,
    /// Last activity.
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

// =============================================================================
// Session state
// =============================================================================

/// Whether a query is in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Awaiting,
}

impl SessionStatus {
    pub fn is_loading(self) -> bool {
        self == SessionStatus::Awaiting
    }
}

/// What happened to a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// User message appended and query sent.
    Dispatched,
    /// Empty or whitespace-only text; nothing changed.
    Skipped,
    /// Another query is still in flight; nothing changed.
    Busy,
}

/// Point-in-time view of the session for the UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub active: Option<ConversationId>,
    pub draft: String,
    pub conversations: Vec<Conversation>,
}

/// State changes pushed to observers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    MessageAppended {
        conversation_id: ConversationId,
        message: Message,
    },
    ConversationCreated {
        conversation: Conversation,
    },
    ActiveChanged {
        conversation_id: ConversationId,
    },
    StatusChanged {
        status: SessionStatus,
    },
}
