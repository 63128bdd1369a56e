//! Per-stage counters, recorded through the `metrics` facade when the
//! `metrics` feature is enabled. Without it these are no-ops.

use crate::core::StageKind;

/// Counter of items a stage took from its input flow
pub const ITEMS_IN: &str = "pipeweld_items_in_total";
/// Counter of items a stage handed to its output flow or callback
pub const ITEMS_OUT: &str = "pipeweld_items_out_total";
/// Counter of stages stopped by a panicking callback
pub const STAGE_FAILURES: &str = "pipeweld_stage_failures_total";

pub(crate) fn item_in(kind: StageKind) {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(ITEMS_IN, "stage" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

pub(crate) fn item_out(kind: StageKind) {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(ITEMS_OUT, "stage" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

pub(crate) fn stage_failed(kind: StageKind) {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(STAGE_FAILURES, "stage" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}
