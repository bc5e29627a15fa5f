//! Chat page: send a message to the remote endpoint, show the reply.
//!
//! DESIGN
//! ======
//! `client` owns the HTTP exchange behind the `ChatTransport` trait,
//! `state` the submit/resolve state machine, `view` the text rendering,
//! and `session` the interactive loop that ties them together.

pub mod client;
pub mod session;
pub mod state;
pub mod view;

pub use client::{ChatClient, ChatError, ChatTransport};
pub use session::ChatSession;
pub use state::{ChatState, Resolution};
