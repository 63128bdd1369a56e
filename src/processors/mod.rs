//! Map and filter stages.
//!
//! Each stage spawns a single task that pulls from its input flow, runs the
//! user callback on one value at a time and pushes into a fresh output flow,
//! so order is preserved end to end.

use crate::core::stage::guard;
use crate::core::{Flow, StageKind};

/// Apply `f` to every value of `input`.
///
/// The output has one value per input value, in the same order, and closes
/// when `input` closes. If `f` panics the stage stops and the terminal
/// downstream reports [`Error::Callback`](crate::Error::Callback).
pub fn map<I, O, F>(input: Flow<I>, mut f: F) -> Flow<O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> O + Send + 'static,
{
    transform(input, StageKind::Map, move |item| Some(f(item)))
}

/// Keep only the values of `input` for which `predicate` holds.
///
/// Rejected values are dropped. The output closes when `input` closes,
/// whether or not anything matched.
pub fn filter<I, F>(input: Flow<I>, mut predicate: F) -> Flow<I>
where
    I: Send + 'static,
    F: FnMut(&I) -> bool + Send + 'static,
{
    transform(input, StageKind::Filter, move |item| {
        if predicate(&item) {
            Some(item)
        } else {
            None
        }
    })
}

impl<I: Send + 'static> Flow<I> {
    /// Attach a [`map`] stage
    pub fn map<O, F>(self, f: F) -> Flow<O>
    where
        O: Send + 'static,
        F: FnMut(I) -> O + Send + 'static,
    {
        map(self, f)
    }

    /// Attach a [`filter`] stage
    pub fn filter<F>(self, predicate: F) -> Flow<I>
    where
        F: FnMut(&I) -> bool + Send + 'static,
    {
        filter(self, predicate)
    }
}

/// Spawn the task behind a map-like stage. `step` returns `None` to drop a
/// value.
fn transform<I, O, F>(mut input: Flow<I>, kind: StageKind, mut step: F) -> Flow<O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> Option<O> + Send + 'static,
{
    let (tx, output) = input.downstream(kind);

    tokio::spawn(async move {
        let stage = tx.stage();
        log_debug!(pipeline = %tx.pipeline_name(), %stage, "stage started");

        #[cfg(feature = "tracing")]
        let (mut received, mut sent) = (0usize, 0usize);
        loop {
            let next = tokio::select! {
                biased;
                _ = tx.closed() => {
                    log_debug!(pipeline = %tx.pipeline_name(), %stage, "output dropped, stage stopped");
                    return;
                }
                next = input.recv() => next,
            };
            let item = match next {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(err) => {
                    log_debug!(%stage, error = %err, "forwarding upstream failure");
                    tx.fail(err).await;
                    return;
                }
            };
            #[cfg(feature = "tracing")]
            {
                received += 1;
            }
            crate::metrics::item_in(kind);

            match guard(stage, || step(item)) {
                Ok(Some(out)) => {
                    if let Err(err) = tx.send(out).await {
                        log_debug!(pipeline = %tx.pipeline_name(), %stage, error = %err, "stage stopped");
                        return;
                    }
                    #[cfg(feature = "tracing")]
                    {
                        sent += 1;
                    }
                    crate::metrics::item_out(kind);
                }
                Ok(None) => log_trace!(%stage, "item dropped"),
                Err(err) => {
                    tx.fail(err).await;
                    return;
                }
            }
        }

        log_debug!(pipeline = %tx.pipeline_name(), %stage, received, sent, "stage finished");
        tx.close();
    });

    output
}
