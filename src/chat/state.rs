//! Chat page state machine.
//!
//! DESIGN
//! ======
//! Three display values (draft, sent message, reply) plus an explicit
//! phase. Every submit gets a fresh `RequestId`; a completion is applied
//! only if it belongs to the request currently awaited, so a slow reply
//! to a superseded submit can never overwrite a newer one.
//!
//! PHASES
//! ======
//! `Idle` -> `AwaitingReply` -> `HasReply` | `Failed`, and back to
//! `AwaitingReply` on every further submit.

use super::client::{ChatError, ChatReply};

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

/// Identifier of one submit. Strictly increasing within a `ChatState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingReply {
        request: RequestId,
        message: String,
    },
    HasReply {
        message: String,
        reply: Option<String>,
    },
    Failed {
        message: String,
        error: String,
    },
}

/// What a submit hands to the caller: the request to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub request: RequestId,
    pub message: String,
}

/// How a completion was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Replied,
    MissingReply,
    Failed,
    /// A newer submit was made; the completion was dropped.
    Superseded,
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    draft: String,
    sent: String,
    reply: Option<String>,
    phase: Phase,
    last_request: u64,
}

impl ChatState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    #[must_use]
    pub fn sent_message(&self) -> &str {
        &self.sent
    }

    #[must_use]
    pub fn reply_text(&self) -> Option<&str> {
        self.reply.as_deref()
    }

    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The request whose completion would currently be applied.
    #[must_use]
    pub fn pending(&self) -> Option<RequestId> {
        match &self.phase {
            Phase::AwaitingReply { request, .. } => Some(*request),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub fn shows_sent_block(&self) -> bool {
        !self.sent.is_empty()
    }

    #[must_use]
    pub fn shows_reply_block(&self) -> bool {
        self.reply.as_deref().is_some_and(|reply| !reply.is_empty())
    }

    /// Record the draft as sent and start awaiting a reply for it.
    ///
    /// The draft is kept as-is; empty drafts are submitted like any other.
    pub fn submit(&mut self) -> Submission {
        self.last_request += 1;
        let request = RequestId(self.last_request);
        self.sent.clone_from(&self.draft);
        self.phase = Phase::AwaitingReply { request, message: self.draft.clone() };
        Submission { request, message: self.draft.clone() }
    }

    /// Apply the outcome of `request`.
    ///
    /// Outcomes for anything but the pending request leave the state alone.
    /// A failure keeps the previous reply on display.
    pub fn resolve(&mut self, request: RequestId, outcome: Result<ChatReply, ChatError>) -> Resolution {
        let message = match &self.phase {
            Phase::AwaitingReply { request: pending, message } if *pending == request => message.clone(),
            _ => return Resolution::Superseded,
        };

        match outcome {
            Ok(ChatReply { reply: Some(reply), .. }) => {
                self.reply = Some(reply.clone());
                self.phase = Phase::HasReply { message, reply: Some(reply) };
                Resolution::Replied
            }
            Ok(ChatReply { reply: None, .. }) => {
                self.reply = None;
                self.phase = Phase::HasReply { message, reply: None };
                Resolution::MissingReply
            }
            Err(error) => {
                self.phase = Phase::Failed { message, error: error.to_string() };
                Resolution::Failed
            }
        }
    }
}
