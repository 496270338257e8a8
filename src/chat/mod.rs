pub mod log;
pub mod types;

pub use log::{ConversationLog, FragmentOutcome};
pub use types::{Author, ChatMessage, MessageStatus, END_TURN, START_TURN};
