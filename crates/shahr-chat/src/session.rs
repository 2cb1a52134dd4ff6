//! Session state machine.
//!
//! `Session` owns the conversation directory, the message store, the
//! in-flight flag and the input draft. Every message goes through
//! [`Session::append`], which writes the store and touches the directory in
//! one step, so the two can never drift apart.
//!
//! States are `Idle` and `Awaiting`. A submission captures its target
//! conversation in a [`PendingQuery`]; the reply is appended to that
//! conversation even if the active pointer has moved since.

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::directory::ConversationDirectory;
use crate::error::{ChatError, QueryFailure};
use crate::seed::{answer_body, GREETING, NEW_CONVERSATION_TITLE, QUERY_FAILURE_BODY};
use crate::store::MessageStore;
use crate::types::{
    Answer, Conversation, ConversationId, Message, NewMessage, SessionSnapshot, SessionStatus,
    SubmitOutcome,
};

/// A dispatched question together with the conversation its reply belongs to.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingQuery {
    target: ConversationId,
    question: String,
}

impl PendingQuery {
    pub fn target(&self) -> &ConversationId {
        &self.target
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}

/// Result of [`Session::begin_submit`].
#[derive(Debug, PartialEq, Eq)]
pub enum Submission {
    /// The user message was appended; send the query and hand the
    /// `PendingQuery` back to [`Session::complete`].
    Dispatched(PendingQuery),
    Skipped,
    Busy,
}

impl Submission {
    pub fn outcome(&self) -> SubmitOutcome {
        match self {
            Submission::Dispatched(_) => SubmitOutcome::Dispatched,
            Submission::Skipped => SubmitOutcome::Skipped,
            Submission::Busy => SubmitOutcome::Busy,
        }
    }
}

/// One user's live conversation session.
#[derive(Debug)]
pub struct Session {
    directory: ConversationDirectory,
    store: MessageStore,
    status: SessionStatus,
    draft: String,
}

impl Session {
    /// A session with a single new conversation holding the greeting.
    pub fn new(summary_max_chars: usize) -> Self {
        let mut session = Self::empty(summary_max_chars);
        session.open_conversation();
        session
    }

    /// A session without conversations, for seeding.
    pub(crate) fn empty(summary_max_chars: usize) -> Self {
        Self {
            directory: ConversationDirectory::new(summary_max_chars),
            store: MessageStore::new(),
            status: SessionStatus::Idle,
            draft: String::new(),
        }
    }

    /// Add a pre-existing conversation with its messages and make it active.
    ///
    /// Moves the active pointer, so it is refused while `Awaiting`.
    pub(crate) fn seed_conversation(
        &mut self,
        id: ConversationId,
        title: &str,
        messages: Vec<(NewMessage, DateTime<Utc>)>,
    ) -> Result<ConversationId, ChatError> {
        if self.status == SessionStatus::Awaiting {
            return Err(ChatError::Busy);
        }
        let created_at = messages.first().map(|(_, at)| *at).unwrap_or_else(Utc::now);
        self.directory.create_with_id(id.clone(), title, created_at)?;
        self.store.register(id.clone());
        for (draft, at) in messages {
            self.append(&id, draft, at)?;
        }
        Ok(id)
    }

    // -- Transitions --

    /// `Idle --submit(text)-->`: validate, append the user message, clear the
    /// draft and enter `Awaiting`.
    pub fn begin_submit(&mut self, text: &str) -> Submission {
        if text.trim().is_empty() {
            return Submission::Skipped;
        }
        if self.status == SessionStatus::Awaiting {
            debug!("Submission rejected: query in flight");
            return Submission::Busy;
        }
        let Some(target) = self.directory.active().cloned() else {
            error!("Submission with no active conversation");
            return Submission::Skipped;
        };

        if let Err(e) = self.append(&target, NewMessage::user(text), Utc::now()) {
            error!(error = %e, "Failed to append user message");
            return Submission::Skipped;
        }
        self.draft.clear();
        self.status = SessionStatus::Awaiting;

        Submission::Dispatched(PendingQuery {
            target,
            question: text.to_string(),
        })
    }

    /// `Awaiting --resolve/reject-->`: append the assistant reply to the
    /// captured target and return to `Idle`.
    ///
    /// A failed query becomes the fixed fallback reply; it is never an error.
    /// The only error is an unknown target, which means the directory and
    /// store are out of sync; the session still returns to `Idle`.
    pub fn complete(
        &mut self,
        pending: PendingQuery,
        outcome: Result<Answer, QueryFailure>,
    ) -> Result<Message, ChatError> {
        self.status = SessionStatus::Idle;

        let reply = match outcome {
            Ok(answer) => NewMessage::assistant(answer_body(&answer.question)).with_search(answer),
            Err(failure) => {
                debug!(reason = %failure.reason, "Query failed; appending fallback reply");
                NewMessage::assistant(QUERY_FAILURE_BODY)
            }
        };
        self.append(&pending.target, reply, Utc::now())
    }

    /// `Idle --newConversation()-->`: new conversation with the greeting,
    /// made active. Rejected while a query is in flight.
    pub fn new_conversation(&mut self) -> Result<Conversation, ChatError> {
        if self.status == SessionStatus::Awaiting {
            return Err(ChatError::Busy);
        }
        Ok(self.open_conversation())
    }

    /// `Idle --switchActive(id)-->`. Rejected while a query is in flight.
    pub fn switch_active(&mut self, conversation_id: &ConversationId) -> Result<(), ChatError> {
        if self.status == SessionStatus::Awaiting {
            return Err(ChatError::Busy);
        }
        self.directory.set_active(conversation_id)
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    // -- Queries --

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.directory.active()
    }

    /// Newest first.
    pub fn conversations(&self) -> &[Conversation] {
        self.directory.list_all()
    }

    pub fn conversation(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.directory.get(conversation_id)
    }

    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.directory.contains(conversation_id)
    }

    pub fn messages(&self, conversation_id: &ConversationId) -> &[Message] {
        self.store.list(conversation_id)
    }

    pub fn active_messages(&self) -> &[Message] {
        match self.directory.active() {
            Some(id) => self.store.list(id),
            None => &[],
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            active: self.directory.active().cloned(),
            draft: self.draft.clone(),
            conversations: self.directory.list_all().to_vec(),
        }
    }

    // -- Private helpers --

    fn open_conversation(&mut self) -> Conversation {
        let conversation = self.directory.create(NEW_CONVERSATION_TITLE);
        self.store.register(conversation.id.clone());
        if let Err(e) = self.append(&conversation.id, NewMessage::assistant(GREETING), Utc::now()) {
            error!(error = %e, "Failed to seed greeting");
        }
        self.directory
            .get(&conversation.id)
            .cloned()
            .unwrap_or(conversation)
    }

    /// The single write path: store append plus directory touch.
    fn append(
        &mut self,
        conversation_id: &ConversationId,
        draft: NewMessage,
        at: DateTime<Utc>,
    ) -> Result<Message, ChatError> {
        if !self.directory.contains(conversation_id) {
            return Err(ChatError::UnknownConversation(conversation_id.clone()));
        }
        let message = self.store.append_at(conversation_id, draft, at)?.clone();
        self.directory
            .touch(conversation_id, message.body(), message.created_at())?;
        Ok(message)
    }
}

// =============================================================================
// Tests
// =============================================================================
