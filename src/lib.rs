//! botchat: terminal chat client for a bot endpoint, plus a shared
//! real-time connection accessor.

pub mod chat;
pub mod config;
pub mod socket;
