//! Chat-completion client
//!
//! Request building and response decoding live in [`types`], the HTTP
//! transport in [`client`], and supersession plus delivery in [`session`].

pub mod client;
pub mod session;
pub mod types;

pub use client::{ChatBackend, HttpChatClient, decode_reply};
pub use session::{BoardUpdate, ChatSession, PendingReply, ReplyBoard, Supersession};
pub use types::{ChatRequest, ChatResponse, Choice, Message, Role};
