use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Turn delimiter opening marker used by the model's prompt template.
pub const START_TURN: &str = "<start_of_turn>";

/// Turn delimiter closing marker used by the model's prompt template.
pub const END_TURN: &str = "<end_of_turn>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    User,
    Model,
}

impl Author {
    /// Author label as it appears inside a prompt turn marker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Author::User => "user",
            Author::Model => "model",
        }
    }
}

/// Lifecycle state of a chat message while/after streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Still receiving fragments; content is mutable.
    InProgress,
    /// Finalized; content never changes again.
    Complete,
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub author: Author,
    pub raw_content: String,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(author: Author, raw_content: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            raw_content: raw_content.into(),
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn is_from_user(&self) -> bool {
        self.author == Author::User
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == MessageStatus::InProgress
    }

    /// Content suitable for display and speech output: trimmed, with any
    /// leaked turn markers stripped.
    pub fn display_text(&self) -> String {
        let trimmed = self.raw_content.trim();
        let trimmed = trimmed.strip_prefix(START_TURN).unwrap_or(trimmed);
        let trimmed = trimmed.strip_suffix(END_TURN).unwrap_or(trimmed);
        trimmed.to_string()
    }
}
