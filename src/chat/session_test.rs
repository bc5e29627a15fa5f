use super::*;
use crate::chat::state::Phase;
use std::sync::Mutex;
use tokio::time::{Duration, timeout};

/// Replies with "<message> reply". Messages starting with `slow` take
/// longer; the message `fail` gets a 500.
struct MockTransport {
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self { calls: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock mutex should lock").clone()
    }
}

#[async_trait::async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, message: &str) -> Result<ChatReply, ChatError> {
        self.calls.lock().expect("mock mutex should lock").push(message.to_owned());
        let delay = if message.starts_with("slow") { 150 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if message == "fail" {
            return Err(ChatError::Status { status: 500, reason: "Internal Server Error".into() });
        }
        Ok(ChatReply { reply: Some(format!("{message} reply")), message_sent: Some(message.to_owned()) })
    }
}

async fn completion(session: &mut ChatSession) -> Resolution {
    timeout(Duration::from_secs(2), session.next_completion())
        .await
        .expect("completion timed out")
}

// =============================================================
// submit / next_completion
// =============================================================

#[tokio::test]
async fn submit_shows_sent_message_immediately() {
    let mut session = ChatSession::new(MockTransport::new());
    let request = session.submit("hello");

    assert_eq!(session.state().sent_message(), "hello");
    assert_eq!(session.state().pending(), Some(request));

    assert_eq!(completion(&mut session).await, Resolution::Replied);
    assert_eq!(session.state().reply_text(), Some("hello reply"));
}

#[tokio::test]
async fn late_reply_for_superseded_request_is_discarded() {
    let transport = MockTransport::new();
    let mut session = ChatSession::new(transport.clone());

    session.submit("slow first");
    session.submit("second");

    assert_eq!(completion(&mut session).await, Resolution::Replied);
    assert_eq!(session.state().reply_text(), Some("second reply"));

    assert_eq!(completion(&mut session).await, Resolution::Superseded);
    assert_eq!(session.state().reply_text(), Some("second reply"));
    assert_eq!(session.state().sent_message(), "second");
    assert_eq!(transport.calls(), vec!["slow first".to_owned(), "second".to_owned()]);
}

#[tokio::test]
async fn early_reply_for_older_request_does_not_win() {
    let mut session = ChatSession::new(MockTransport::new());

    session.submit("quick");
    session.submit("slow latest");

    assert_eq!(completion(&mut session).await, Resolution::Superseded);
    assert!(session.state().reply_text().is_none());

    assert_eq!(completion(&mut session).await, Resolution::Replied);
    assert_eq!(session.state().reply_text(), Some("slow latest reply"));
}

#[tokio::test]
async fn failed_request_surfaces_error() {
    let mut session = ChatSession::new(MockTransport::new());
    session.submit("fail");

    assert_eq!(completion(&mut session).await, Resolution::Failed);
    assert!(matches!(session.state().phase(), Phase::Failed { message, .. } if message == "fail"));
}

// =============================================================
// run
// =============================================================

#[tokio::test]
async fn run_renders_reply_for_each_line() {
    let transport = MockTransport::new();
    let mut output = Vec::new();

    let state = ChatSession::new(transport.clone())
        .run(&b"hello\n"[..], &mut output)
        .await
        .unwrap();

    assert_eq!(state.reply_text(), Some("hello reply"));
    assert_eq!(transport.calls(), vec!["hello".to_owned()]);

    let rendered = String::from_utf8(output).unwrap();
    assert!(rendered.starts_with("WhatsApp AI Bot\n\n"));
    assert!(rendered.contains("Message Sent:\nhello"));
    assert!(rendered.contains("Waiting for reply..."));
    assert!(rendered.ends_with("Response:\nhello reply\n\n"));
}

#[tokio::test]
async fn run_submits_empty_lines() {
    let transport = MockTransport::new();
    let mut output = Vec::new();

    let state = ChatSession::new(transport.clone())
        .run(&b"\n"[..], &mut output)
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec![String::new()]);
    assert_eq!(state.sent_message(), "");
    assert_eq!(state.reply_text(), Some(" reply"));
}

#[tokio::test]
async fn run_waits_for_last_request_after_input_ends() {
    let mut output = Vec::new();

    let state = ChatSession::new(MockTransport::new())
        .run(&b"slow one\nslow two\n"[..], &mut output)
        .await
        .unwrap();

    assert!(state.pending().is_none());
    assert_eq!(state.sent_message(), "slow two");
    assert_eq!(state.reply_text(), Some("slow two reply"));
}

#[tokio::test]
async fn failure_after_reply_keeps_stale_reply() {
    let mut session = ChatSession::new(MockTransport::new());
    session.submit("hi");
    completion(&mut session).await;
    session.submit("fail");
    completion(&mut session).await;

    assert_eq!(session.state().reply_text(), Some("hi reply"));
    let rendered = view::render(session.state());
    assert!(rendered.contains("Response:\nhi reply"));
    assert!(rendered.contains("Error: request rejected: 500 Internal Server Error"));
}

#[tokio::test]
async fn run_with_no_input_renders_title_only() {
    let mut output = Vec::new();
    let state = ChatSession::new(MockTransport::new())
        .run(&b""[..], &mut output)
        .await
        .unwrap();

    assert_eq!(state.phase(), &Phase::Idle);
    assert_eq!(String::from_utf8(output).unwrap(), "WhatsApp AI Bot\n\n");
}
