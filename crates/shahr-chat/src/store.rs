//! Append-only message threads, one per conversation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::ChatError;
use crate::types::{ConversationId, Message, NewMessage};

/// Ordered message lists keyed by conversation.
///
/// Messages are never updated or removed. Each appended message is stamped
/// no earlier than its predecessor, so a thread is always in non-decreasing
/// time order.
#[derive(Debug, Default)]
pub struct MessageStore {
    threads: HashMap<ConversationId, Vec<Message>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty thread. Registering an existing id keeps its messages.
    pub fn register(&mut self, conversation_id: ConversationId) {
        self.threads.entry(conversation_id).or_default();
    }

    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.threads.contains_key(conversation_id)
    }

    /// Append at the tail, stamped with the current time.
    pub fn append(
        &mut self,
        conversation_id: &ConversationId,
        draft: NewMessage,
    ) -> Result<&Message, ChatError> {
        self.append_at(conversation_id, draft, Utc::now())
    }

    /// Append at the tail with a requested timestamp, clamped so it never
    /// precedes the previous message.
    pub fn append_at(
        &mut self,
        conversation_id: &ConversationId,
        draft: NewMessage,
        at: DateTime<Utc>,
    ) -> Result<&Message, ChatError> {
        let thread = self
            .threads
            .get_mut(conversation_id)
            .ok_or_else(|| ChatError::UnknownConversation(conversation_id.clone()))?;

        let created_at = match thread.last() {
            Some(last) if last.created_at() > at => last.created_at(),
            _ => at,
        };
        thread.push(Message::stamp(draft, created_at));
        Ok(&thread[thread.len() - 1])
    }

    /// Messages in append order. Empty for a thread with no messages, and for
    /// an id that was never registered.
    pub fn list(&self, conversation_id: &ConversationId) -> &[Message] {
        self.threads
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self, conversation_id: &ConversationId) -> usize {
        self.list(conversation_id).len()
    }
}
