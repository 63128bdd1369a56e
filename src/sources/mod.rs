//! Source stages.
//!
//! A source turns a finite sequence (or an async stream) into a live flow.
//! It spawns one task that hands each value downstream in order and closes
//! the flow after the last one.

use futures_core::Stream;
use std::sync::Arc;
use tokio_stream::StreamExt;

use crate::core::flow::{self, FlowContext};
use crate::core::{Flow, StageId, StageKind};
use crate::pipeline::Pipeline;

/// Create a flow that yields `values` in order, then closes.
///
/// Returns immediately; the values are sent from a spawned task, each send
/// waiting for the consumer. An empty sequence gives a flow that closes
/// without yielding anything. Must be called within a tokio runtime.
///
/// ```rust
/// use pipeweld::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let items = from_sequence(vec!["a", "b"]).collect().await?;
/// assert_eq!(items, vec!["a", "b"]);
/// # Ok(())
/// # }
/// ```
pub fn from_sequence<I>(values: I) -> Flow<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    Pipeline::new().source(values)
}

/// Create a flow fed by an async stream. Must be called within a tokio
/// runtime.
pub fn from_stream<S>(stream: S) -> Flow<S::Item>
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    Pipeline::new().source_stream(stream)
}

pub(crate) fn feed<S>(ctx: Arc<FlowContext>, stream: S) -> Flow<S::Item>
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    let (tx, output) = flow::channel(ctx, StageId::new(StageKind::Source, 0));

    tokio::spawn(async move {
        #[cfg(feature = "tracing")]
        let stage = tx.stage();
        log_debug!(pipeline = %tx.pipeline_name(), %stage, "stage started");

        tokio::pin!(stream);
        #[cfg(feature = "tracing")]
        let mut sent = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = tx.cancelled() => {
                    log_debug!(pipeline = %tx.pipeline_name(), %stage, sent, "source cancelled");
                    return;
                }
                _ = tx.closed() => {
                    log_debug!(pipeline = %tx.pipeline_name(), %stage, sent, "output dropped, source stopped");
                    return;
                }
                next = stream.next() => next,
            };
            let Some(item) = next else { break };

            if let Err(err) = tx.send(item).await {
                log_debug!(pipeline = %tx.pipeline_name(), %stage, error = %err, "source stopped");
                return;
            }
            #[cfg(feature = "tracing")]
            {
                sent += 1;
            }
            log_trace!(%stage, sent, "item sent");
            crate::metrics::item_out(StageKind::Source);
        }

        log_debug!(pipeline = %tx.pipeline_name(), %stage, sent, "stage finished");
        tx.close();
    });

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_from_sequence_preserves_order() {
        let items = from_sequence(vec![3, 1, 2]).collect().await.unwrap();
        assert_eq!(items, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_empty_sequence_closes() {
        let mut flow = from_sequence(Vec::<i32>::new());
        assert_eq!(flow.recv().await, Ok(None));
    }

    #[tokio::test]
    async fn test_from_stream() {
        let stream = futures::stream::iter(vec!['p', 'q']);
        let items = from_stream(stream).collect().await.unwrap();
        assert_eq!(items, vec!['p', 'q']);
    }

    #[tokio::test]
    async fn test_pending_stream_stops_on_cancel() {
        let flow = from_stream(futures::stream::pending::<u8>());
        let token = flow.cancellation_token();
        token.cancel();
        assert_eq!(flow.collect().await, Err(Error::Cancelled));
    }

    #[tokio::test]
    async fn test_pending_stream_released_when_flow_dropped() {
        let marker = Arc::new(());
        let held = marker.clone();
        let stream = futures::stream::once(async move {
            let _held = held;
            futures::future::pending::<u8>().await
        });

        let flow = from_stream(stream).map(|x| x);
        tokio::task::yield_now().await;
        drop(flow);

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while Arc::strong_count(&marker) > 1 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("source task should drop its stream");
    }

    #[tokio::test]
    async fn test_source_exits_when_flow_dropped() {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let stream = futures::stream::iter(0..1_000).chain(futures::stream::once(async move {
            let _ = done_tx.send(());
            -1
        }));

        let mut flow = from_stream(stream);
        assert_eq!(flow.recv().await, Ok(Some(0)));
        drop(flow);

        // The source never reaches the tail of the stream
        assert!(done_rx.await.is_err());
    }
}
