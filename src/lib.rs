//! # Channel-per-stage streaming pipelines
//!
//! This crate builds chains of concurrent stages connected by unbuffered
//! rendezvous channels. Every source, map and filter stage runs as its own
//! tokio task, pulling from one flow and pushing into the next; a terminal
//! drains the last flow on the caller's task.
//!
//! ## Core Concepts
//!
//! - **Flow**: a point-to-point channel where each send waits for its receive
//! - **Source**: turns a finite sequence or a stream into a flow
//! - **Map / Filter**: transform or thin a flow, preserving order
//! - **Terminal**: `reduce`, `for_each` or `collect`, which drains a flow
//!
//! ## Example
//!
//! ```rust
//! use pipeweld::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let total = from_sequence(0..100)
//!         .filter(|x: &i64| x % 10 == 0)
//!         .map(|x| x + 2)
//!         .reduce(|a, b| a + b)
//!         .await?;
//!
//!     assert_eq!(total, 470);
//!     Ok(())
//! }
//! ```
//!
//! ## Failures
//!
//! A panic inside a user callback stops the stage that ran it. The failure
//! travels down the chain and the terminal returns
//! [`Error::Callback`]. Dropping a flow before it is drained disconnects the
//! stages upstream of it. Each of them notices while sending, while waiting
//! on its input or between discarded values, and exits instead of blocking
//! forever.
//! Cancelling the pipeline's token stops every stage and makes the terminal
//! return [`Error::Cancelled`].

#[macro_use]
mod macros;

pub mod core;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod processors;
pub mod sinks;
pub mod sources;

// Re-export commonly used items
pub mod prelude {
    pub use crate::core::{Flow, FlowSender, StageId, StageKind};
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{Pipeline, PipelineConfig};
    pub use crate::processors::{filter, map};
    pub use crate::sinks::{collect, for_each, reduce};
    pub use crate::sources::{from_sequence, from_stream};
}

// Re-export main types
pub use crate::core::{Flow, FlowSender};
pub use error::{Error, Result};
pub use processors::{filter, map};
pub use sinks::{collect, for_each, reduce};
pub use sources::{from_sequence, from_stream};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
