//! Prompt assembly for the model's turn-delimited template.
//!
//! Each completed message becomes a closed `<start_of_turn>` /
//! `<end_of_turn>` bracketed turn; the new user utterance is appended as
//! an open turn so the runtime treats it as the generation point.

use crate::chat::{ChatMessage, END_TURN, START_TURN};

/// Build the full prompt from the conversation so far plus a new user
/// turn. Pure function of its inputs; in-progress messages are skipped.
pub fn build_prompt(messages: &[ChatMessage], new_user_text: &str) -> String {
    let mut prompt = String::new();
    for message in messages {
        if message.is_in_progress() {
            continue;
        }
        prompt.push_str(START_TURN);
        prompt.push_str(message.author.as_str());
        prompt.push('\n');
        prompt.push_str(&message.display_text());
        prompt.push_str(END_TURN);
        prompt.push('\n');
    }
    prompt.push_str(START_TURN);
    prompt.push_str("user\n");
    prompt.push_str(new_user_text);
    prompt
}
