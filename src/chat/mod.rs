//! 基于检索增强的文档问答会话

pub mod extract;
pub mod manager;
pub mod prompt;
pub mod session;

pub use manager::{ChatFragment, ChatManager, ChatStream};
pub use session::{ChatSession, Exchange};
