//! Conversation directory: summaries plus the active-conversation pointer.

use chrono::{DateTime, Utc};

use crate::error::ChatError;
use crate::types::{Conversation, ConversationId};

/// Default maximum characters kept in a last-message summary.
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 120;

/// Conversation summaries, newest first, plus the active pointer.
///
/// Once a conversation exists, exactly one is active.
#[derive(Debug)]
pub struct ConversationDirectory {
    conversations: Vec<Conversation>,
    active: Option<ConversationId>,
    summary_max_chars: usize,
}

impl Default for ConversationDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_MAX_CHARS)
    }
}

impl ConversationDirectory {
    pub fn new(summary_max_chars: usize) -> Self {
        Self {
            conversations: Vec::new(),
            active: None,
            summary_max_chars: summary_max_chars.max(1),
        }
    }

    /// Create a conversation with a fresh id, put it on top and make it active.
    pub fn create(&mut self, title: impl Into<String>) -> Conversation {
        self.push_front(ConversationId::generate(), title.into(), Utc::now())
    }

    /// Like [`create`](Self::create) with a caller-chosen id and timestamp,
    /// used for seeding.
    pub(crate) fn create_with_id(
        &mut self,
        id: ConversationId,
        title: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Conversation, ChatError> {
        if self.contains(&id) {
            return Err(ChatError::DuplicateConversation(id));
        }
        Ok(self.push_front(id, title.into(), at))
    }

    fn push_front(&mut self, id: ConversationId, title: String, at: DateTime<Utc>) -> Conversation {
        let conversation = Conversation {
            id: id.clone(),
            title,
            last_message: String::new(),
            updated_at: at,
            message_count: 0,
        };
        self.conversations.insert(0, conversation.clone());
        self.active = Some(id);
        conversation
    }

    /// Record an appended message: new summary, count + 1, timestamp.
    pub fn touch(
        &mut self,
        conversation_id: &ConversationId,
        last_message: &str,
        at: DateTime<Utc>,
    ) -> Result<&Conversation, ChatError> {
        let max = self.summary_max_chars;
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| &c.id == conversation_id)
            .ok_or_else(|| ChatError::UnknownConversation(conversation_id.clone()))?;
        conversation.last_message = summarize(last_message, max);
        conversation.message_count += 1;
        conversation.updated_at = at;
        Ok(conversation)
    }

    /// Move the active pointer. Other conversations are left untouched.
    pub fn set_active(&mut self, conversation_id: &ConversationId) -> Result<(), ChatError> {
        if !self.contains(conversation_id) {
            return Err(ChatError::UnknownConversation(conversation_id.clone()));
        }
        self.active = Some(conversation_id.clone());
        Ok(())
    }

    pub fn active(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.conversations.iter().any(|c| &c.id == conversation_id)
    }

    pub fn get(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == conversation_id)
    }

    /// All conversations, most recently created first.
    pub fn list_all(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

/// Collapse whitespace runs to single spaces and cut to `max` characters,
/// marking the cut with `…`.
fn summarize(body: &str, max: usize) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
