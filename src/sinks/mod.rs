//! Terminal stages.
//!
//! Terminals drain a flow on the caller's task instead of spawning one, and
//! only return once the upstream chain has closed (or failed). Every chain
//! needs exactly one of them at its end.

use crate::core::stage::guard;
use crate::core::{Flow, StageKind};
use crate::error::{Error, Result};

/// Fold `input` with `combine`, seeding the accumulator with the first value.
///
/// This is a left fold in arrival order: for values `a, b, c` the result is
/// `combine(combine(a, b), c)`. A flow that closes before yielding anything
/// gives [`Error::EmptyInput`].
///
/// ```rust
/// use pipeweld::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let joined = reduce(from_sequence(["a", "b", "c"].map(String::from)), |acc, s| acc + &s).await?;
/// assert_eq!(joined, "abc");
///
/// let empty = reduce(from_sequence(Vec::<i32>::new()), |a, b| a + b).await;
/// assert_eq!(empty, Err(Error::EmptyInput));
/// # Ok(())
/// # }
/// ```
pub async fn reduce<I, F>(mut input: Flow<I>, mut combine: F) -> Result<I>
where
    F: FnMut(I, I) -> I,
{
    let stage = input.next_stage(StageKind::Reduce);

    let Some(mut acc) = input.recv().await? else {
        log_debug!(pipeline = %input.pipeline_name(), %stage, "reduce on empty flow");
        return Err(Error::EmptyInput);
    };
    crate::metrics::item_in(StageKind::Reduce);

    while let Some(item) = input.recv().await? {
        crate::metrics::item_in(StageKind::Reduce);
        acc = guard(stage, || combine(acc, item))?;
    }

    log_debug!(pipeline = %input.pipeline_name(), %stage, "stage finished");
    Ok(acc)
}

/// Call `action` once for every value of `input`, in order.
///
/// Returns `Ok(())` once the flow closes.
pub async fn for_each<I, F>(mut input: Flow<I>, mut action: F) -> Result<()>
where
    F: FnMut(I),
{
    let stage = input.next_stage(StageKind::ForEach);

    #[cfg(feature = "tracing")]
    let mut seen = 0usize;
    while let Some(item) = input.recv().await? {
        crate::metrics::item_in(StageKind::ForEach);
        guard(stage, || action(item))?;
        #[cfg(feature = "tracing")]
        {
            seen += 1;
        }
    }

    log_debug!(pipeline = %input.pipeline_name(), %stage, seen, "stage finished");
    Ok(())
}

/// Drain `input` into a vector.
pub async fn collect<I>(mut input: Flow<I>) -> Result<Vec<I>> {
    let mut items = Vec::new();
    while let Some(item) = input.recv().await? {
        crate::metrics::item_in(StageKind::Collect);
        items.push(item);
    }
    Ok(items)
}

impl<I> Flow<I> {
    /// Drain the flow with [`reduce`]
    pub async fn reduce<F>(self, combine: F) -> Result<I>
    where
        F: FnMut(I, I) -> I,
    {
        reduce(self, combine).await
    }

    /// Drain the flow with [`for_each`]
    pub async fn for_each<F>(self, action: F) -> Result<()>
    where
        F: FnMut(I),
    {
        for_each(self, action).await
    }

    /// Drain the flow with [`collect`]
    pub async fn collect(self) -> Result<Vec<I>> {
        collect(self).await
    }
}
