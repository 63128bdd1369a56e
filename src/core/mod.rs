//! Core building blocks for pipeweld.
//!
//! This module contains the transfer channel that links stages together and
//! the stage identity used in logs and errors.

pub mod flow;
pub mod stage;

// Re-export core items
pub use flow::{Flow, FlowSender};
pub use stage::{StageId, StageKind};
