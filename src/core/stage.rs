//! Stage identity and callback isolation.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{Error, Result};

/// The role a stage plays in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StageKind {
    Source,
    Map,
    Filter,
    Reduce,
    ForEach,
    Collect,
}

impl StageKind {
    /// Short lowercase label, used in logs, metrics and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Source => "source",
            StageKind::Map => "map",
            StageKind::Filter => "filter",
            StageKind::Reduce => "reduce",
            StageKind::ForEach => "for_each",
            StageKind::Collect => "collect",
        }
    }

    /// Terminals drain their input on the caller's task instead of spawning
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageKind::Reduce | StageKind::ForEach | StageKind::Collect
        )
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a stage by its kind and its position in the chain.
///
/// The source sits at index 0 and every stage attached after it takes the
/// next index, so `map#2` is the second stage downstream of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StageId {
    pub kind: StageKind,
    pub index: usize,
}

impl StageId {
    pub fn new(kind: StageKind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.index)
    }
}

/// Run a user callback, turning a panic into [`Error::Callback`].
pub(crate) fn guard<R>(stage: StageId, f: impl FnOnce() -> R) -> Result<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(&*payload);
        log_warn!(%stage, %message, "stage callback panicked");
        crate::metrics::stage_failed(stage.kind);
        Error::callback(stage, message)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
