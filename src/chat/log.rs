//! Append-only conversation log with a single mutable in-progress tail.
//!
//! The log is owned exclusively by the session controller; everything
//! else sees it through immutable snapshots.

use super::types::{Author, ChatMessage, MessageStatus};
use crate::{ParleyError, Result};
use tracing::debug;
use uuid::Uuid;

/// Result of applying a fragment (or finalization) to a message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Fragment applied; the message is still in progress.
    Applied,
    /// Fragment applied and the message flipped to complete.
    Completed,
    /// The id is unknown or the message is already complete. Trailing
    /// deliveries after finalization are expected, so this is a no-op.
    Stale,
}

#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its id. Always succeeds.
    pub fn append(
        &mut self,
        author: Author,
        content: impl Into<String>,
        status: MessageStatus,
    ) -> Uuid {
        let message = ChatMessage::new(author, content, status);
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// Create an empty in-progress model message to receive fragments.
    ///
    /// At most one message may be in progress at a time; a second begin
    /// while one exists is a controller bug.
    pub fn begin_model_message(&mut self) -> Result<Uuid> {
        if let Some(open) = self.messages.iter().find(|m| m.is_in_progress()) {
            return Err(ParleyError::InvariantViolation(format!(
                "message {} is still in progress",
                open.id
            )));
        }
        Ok(self.append(Author::Model, "", MessageStatus::InProgress))
    }

    /// Replace the content of the in-progress message identified by `id`.
    /// Used for the first fragment of a stream, whose text must overwrite
    /// the placeholder rather than concatenate onto it.
    pub fn replace_content(&mut self, id: Uuid, content: &str) -> FragmentOutcome {
        match self.in_progress_mut(id) {
            Some(message) => {
                message.raw_content = content.to_string();
                FragmentOutcome::Applied
            }
            None => self.stale(id),
        }
    }

    /// Concatenate a fragment onto the message identified by `id`,
    /// completing it when `is_final` is set.
    pub fn append_fragment(&mut self, id: Uuid, fragment: &str, is_final: bool) -> FragmentOutcome {
        match self.in_progress_mut(id) {
            Some(message) => {
                message.raw_content.push_str(fragment);
                if is_final {
                    message.status = MessageStatus::Complete;
                    FragmentOutcome::Completed
                } else {
                    FragmentOutcome::Applied
                }
            }
            None => self.stale(id),
        }
    }

    /// Flip an in-progress message to complete with whatever content it
    /// has accumulated.
    pub fn finalize(&mut self, id: Uuid) -> FragmentOutcome {
        match self.in_progress_mut(id) {
            Some(message) => {
                message.status = MessageStatus::Complete;
                FragmentOutcome::Completed
            }
            None => self.stale(id),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Immutable ordered copy for observers.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    /// Snapshot ordered newest first, as the rendering layer consumes it.
    pub fn snapshot_newest_first(&self) -> Vec<ChatMessage> {
        let mut messages = self.messages.clone();
        messages.reverse();
        messages
    }

    fn in_progress_mut(&mut self, id: Uuid) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id && m.is_in_progress())
    }

    fn stale(&self, id: Uuid) -> FragmentOutcome {
        debug!(%id, "ignoring fragment for stale message id");
        FragmentOutcome::Stale
    }
}
