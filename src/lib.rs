//! Typed async client for the OpenStack Mistral workflow service (API v2).
//!
//! Workflows, executions and cron triggers share one generic core:
//!
//! - [`options`] - declarative query string and request body encoding
//! - [`decode`] - typed response extraction, with or without an envelope
//! - [`pagination`] - lazy traversal of linked list responses
//! - [`poll`] - bounded waiting for asynchronous state changes
//!
//! # Example
//!
//! ```no_run
//! use mistral_client::{executions, workflows, PollConfig, ServiceClient};
//!
//! # async fn example() -> mistral_client::Result<()> {
//! let client = ServiceClient::new("http://localhost:8989/v2")?.with_token("token");
//!
//! let definition = std::fs::read_to_string("echo.yaml").unwrap_or_default();
//! let created = workflows::create(&client, &workflows::CreateOpts::new(definition)).await?;
//!
//! let opts = executions::CreateOpts::new(created[0].id.clone());
//! let execution = executions::create(&client, &opts).await?;
//! let finished =
//!     executions::wait_for_success(&client, &execution.id, PollConfig::default()).await?;
//! println!("output: {}", finished.output);
//!
//! let everything = executions::list(&client, &Default::default())?.all_pages().await?;
//! println!("{} executions", everything.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cron_triggers;
pub mod decode;
pub mod error;
pub mod executions;
pub mod options;
pub mod pagination;
pub mod poll;
pub mod resource;
pub mod transport;
pub mod workflows;

pub use error::{Error, Result};
pub use pagination::{Page, Pager};
pub use poll::{poll_until, PollConfig};
pub use transport::{RawResponse, RequestBody, ServiceClient, Transport};
