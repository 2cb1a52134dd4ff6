//! Conversational query session for the Shahr assistant.
//!
//! Keeps several conversation threads, appends messages to the active one,
//! sends each user question to the remote question-answering service and
//! keeps the observable state (status, message list, fallback reply)
//! consistent whatever the network does.

pub mod client;
pub mod controller;
pub mod directory;
pub mod error;
pub mod seed;
pub mod session;
pub mod store;
pub mod types;

pub use client::{HttpQueryClient, QueryClient};
pub use controller::{SessionController, SessionHandle};
pub use directory::ConversationDirectory;
pub use error::{ChatError, QueryFailure};
pub use session::{PendingQuery, Session, Submission};
pub use store::MessageStore;
pub use types::{
    Answer, Conversation, ConversationId, Message, MessageId, NewMessage, Sender, SessionEvent,
    SessionSnapshot, SessionStatus, SubmitOutcome,
};
