//! Interactive chat loop.
//!
//! DESIGN
//! ======
//! The session task is the only owner of `ChatState`. Each submit spawns
//! a request task that holds nothing but the transport; it reports back
//! over an unbounded channel tagged with its `RequestId`. Input lines and
//! completions are multiplexed with `select!`, so a user can submit again
//! while an earlier request is still in flight.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::client::{ChatError, ChatReply, ChatTransport};
use super::state::{ChatState, RequestId, Resolution};
use super::view;

type Completion = (RequestId, Result<ChatReply, ChatError>);

pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    state: ChatState,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ChatSession {
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self { transport, state: ChatState::new(), completions_tx, completions_rx }
    }

    #[must_use]
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Submit `draft` and start its request in the background.
    pub fn submit(&mut self, draft: impl Into<String>) -> RequestId {
        self.state.set_draft(draft);
        let submission = self.state.submit();
        tracing::info!(request = %submission.request, len = submission.message.len(), "message submitted");

        let transport = Arc::clone(&self.transport);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = transport.send(&submission.message).await;
            // The receiver is gone only once the session itself is dropped.
            let _ = tx.send((submission.request, outcome));
        });

        submission.request
    }

    /// Wait for the next request to finish and apply it.
    pub async fn next_completion(&mut self) -> Resolution {
        // The session holds a sender, so the channel never closes under us.
        let Some((request, outcome)) = self.completions_rx.recv().await else {
            return Resolution::Superseded;
        };
        self.apply(request, outcome)
    }

    fn apply(&mut self, request: RequestId, outcome: Result<ChatReply, ChatError>) -> Resolution {
        if let Err(e) = &outcome {
            tracing::warn!(%request, error = %e, "chat request failed");
        }
        let resolution = self.state.resolve(request, outcome);
        if resolution == Resolution::Superseded {
            tracing::debug!(%request, "dropping reply for superseded request");
        }
        resolution
    }

    /// Drive the session from `input` until it ends, rendering to `output`.
    ///
    /// Every line is submitted as a message. At end of input the request
    /// still awaited, if any, is allowed to finish before returning.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from reading input or writing output.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> std::io::Result<ChatState>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        write_view(&mut output, &self.state).await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    self.submit(line);
                    write_view(&mut output, &self.state).await?;
                }
                Some((request, outcome)) = self.completions_rx.recv() => {
                    if self.apply(request, outcome) != Resolution::Superseded {
                        write_view(&mut output, &self.state).await?;
                    }
                }
            }
        }

        while self.state.pending().is_some() {
            if self.next_completion().await != Resolution::Superseded {
                write_view(&mut output, &self.state).await?;
            }
        }

        Ok(self.state)
    }
}

async fn write_view<W: AsyncWrite + Unpin>(output: &mut W, state: &ChatState) -> std::io::Result<()> {
    let rendered = view::render(state);
    output.write_all(rendered.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
