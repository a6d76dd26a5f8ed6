pub mod client;
pub mod config;

pub use client::LlmClient;
pub use config::{ServerConfig, ServerFileConfig};
