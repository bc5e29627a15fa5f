//! Text rendering of the chat page.

use super::state::{ChatState, Phase};

pub const TITLE: &str = "WhatsApp AI Bot";

/// Render the page for the current state.
///
/// The "Message Sent" block appears once something was sent; the
/// "Response" block only while a non-empty reply is held.
#[must_use]
pub fn render(state: &ChatState) -> String {
    let mut out = format!("{TITLE}\n");

    if state.shows_sent_block() {
        out.push_str(&format!("\nMessage Sent:\n{}\n", state.sent_message()));
    }

    if state.shows_reply_block() {
        if let Some(reply) = state.reply_text() {
            out.push_str(&format!("\nResponse:\n{reply}\n"));
        }
    }

    match state.phase() {
        Phase::AwaitingReply { .. } => out.push_str("\nWaiting for reply...\n"),
        Phase::Failed { error, .. } => out.push_str(&format!("\nError: {error}\n")),
        Phase::Idle | Phase::HasReply { .. } => {}
    }

    out
}

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;
