//! Client for an LLM inference server exposing `/heartbeat` and `/completion`.
//!
//! ```no_run
//! use llm_client::server::{LlmClient, ServerConfig};
//! use llm_client::llm::OutcomeExt;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = LlmClient::new(ServerConfig::new("http://localhost:9292"))?;
//! match client.completion("Who is the creator of Ruby language?").await {
//!     Ok(resp) => println!("{:?}", resp.body()),
//!     Err(resp) => eprintln!("failed with status {}", resp.status()),
//! }
//! let alive = client.heartbeat().await;
//! println!("heartbeat status {}", alive.response().status());
//! # Ok(())
//! # }
//! ```

pub mod server;

pub use llm_core::{llm, log};
