pub mod app;
pub mod cache;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod i18n;
pub mod jobs;
pub mod llm;
pub mod render;
pub mod retrieval;
pub mod server;
pub mod store;
pub mod translation;
pub mod utils;

// Re-export commonly used types
pub use app::{Adapters, AppServices};
pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use server::{router, serve};
