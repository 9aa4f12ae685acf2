//! Docchat CLI library: a terminal renderer for document chat sessions.

pub mod chat;

pub use chat::{ChatCommand, ChatConfig, Renderer, run_interactive};
