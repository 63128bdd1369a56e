//! The transfer channel connecting two stages.
//!
//! A flow is a point-to-point rendezvous channel: [`FlowSender::send`] only
//! resolves once the consumer has taken the value out with [`Flow::recv`].
//! Each end has a single owner and neither end is `Clone`, so there is always
//! exactly one producer and one consumer. Closing consumes the sender, which
//! makes "closed at most once" and "nothing sent after close" hold by
//! construction.
//!
//! Internally the handoff uses a one-slot tokio `mpsc` channel to carry the
//! value and a `oneshot` acknowledgement that the receiver fires as it takes
//! the value, which turns the slot into a synchronization point rather than a
//! buffer.

use futures_core::Stream;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::core::stage::{StageId, StageKind};
use crate::error::{Error, Result};

/// State shared by every flow of one pipeline.
#[derive(Debug)]
pub(crate) struct FlowContext {
    pub(crate) name: String,
    pub(crate) token: CancellationToken,
}

enum Message<T> {
    Item(T, oneshot::Sender<()>),
    Failed(Error),
}

/// Create a connected sender/flow pair for the stage `stage`.
pub(crate) fn channel<T>(ctx: Arc<FlowContext>, stage: StageId) -> (FlowSender<T>, Flow<T>) {
    let (tx, rx) = mpsc::channel(1);
    let sender = FlowSender {
        tx,
        ctx: ctx.clone(),
        stage,
    };
    let flow = Flow {
        rx,
        ctx,
        producer: stage,
        done: false,
    };
    (sender, flow)
}

/// The producing end of a flow.
pub struct FlowSender<T> {
    tx: mpsc::Sender<Message<T>>,
    ctx: Arc<FlowContext>,
    stage: StageId,
}

impl<T> FlowSender<T> {
    /// Hand `item` to the consumer, waiting until it has been received.
    ///
    /// Fails with [`Error::Disconnected`] if the consumer dropped its flow and
    /// with [`Error::Cancelled`] if the pipeline was cancelled while waiting.
    pub async fn send(&self, item: T) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let handoff = async {
            self.tx.send(Message::Item(item, ack_tx)).await?;
            ack_rx.await?;
            Ok::<(), Error>(())
        };

        tokio::select! {
            biased;
            _ = self.ctx.token.cancelled() => Err(Error::Cancelled),
            result = handoff => result,
        }
    }

    /// Close the flow. The consumer sees end-of-stream after this.
    ///
    /// Dropping the sender has the same effect.
    pub fn close(self) {
        log_trace!(pipeline = %self.ctx.name, stage = %self.stage, "flow closed");
    }

    /// Close the flow with an error, which the consumer receives in place of
    /// end-of-stream.
    ///
    /// If a previous send was abandoned midway its value still occupies the
    /// slot; the error then waits behind it until the consumer takes it. Gives
    /// up only when the consumer is gone or the pipeline is cancelled, since
    /// nobody is left to observe the error in either case.
    pub async fn fail(self, err: Error) {
        log_debug!(pipeline = %self.ctx.name, stage = %self.stage, error = %err, "flow failed");
        tokio::select! {
            biased;
            _ = self.ctx.token.cancelled() => {}
            _ = self.tx.send(Message::Failed(err)) => {}
        }
    }

    /// The stage that owns this sender
    pub fn stage(&self) -> StageId {
        self.stage
    }

    /// Name of the pipeline this sender belongs to
    pub fn pipeline_name(&self) -> &str {
        &self.ctx.name
    }

    /// Whether the consumer has dropped its end
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has dropped its end
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.ctx.token.cancelled()
    }
}

impl<T> fmt::Debug for FlowSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowSender")
            .field("pipeline", &self.ctx.name)
            .field("stage", &self.stage)
            .finish()
    }
}

/// The consuming end of a flow.
///
/// Stages take their input flow by value, so attaching a stage or a terminal
/// moves the flow into it. Dropping a flow before it is drained disconnects
/// the producer. Stages watch for this while sending, while waiting on their
/// own input and between discarded values, so the producing task exits and
/// drops its input, which releases every stage upstream of it in turn.
pub struct Flow<T> {
    rx: mpsc::Receiver<Message<T>>,
    ctx: Arc<FlowContext>,
    producer: StageId,
    done: bool,
}

impl<T> Flow<T> {
    /// Receive the next value.
    ///
    /// Returns `Ok(Some(value))` for each value in order, `Ok(None)` once the
    /// producer closed the flow, and `Err` if an upstream stage failed or the
    /// pipeline was cancelled. After an error the flow reports `Ok(None)`.
    pub async fn recv(&mut self) -> Result<Option<T>> {
        if self.done {
            return Ok(None);
        }

        let message = tokio::select! {
            biased;
            _ = self.ctx.token.cancelled() => None,
            message = self.rx.recv() => Some(message),
        };

        let Some(message) = message else {
            self.done = true;
            return Err(Error::Cancelled);
        };

        match message {
            Some(Message::Item(item, ack)) => {
                // A dropped ack only means the producer stopped waiting
                let _ = ack.send(());
                Ok(Some(item))
            }
            Some(Message::Failed(err)) => {
                self.done = true;
                Err(err)
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// Turn the flow into a [`Stream`] of results.
    ///
    /// The stream ends when the flow closes, after yielding at most one error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send
    where
        T: Send + 'static,
    {
        futures::stream::unfold(self, |mut flow| async move {
            match flow.recv().await {
                Ok(Some(item)) => Some((Ok(item), flow)),
                Ok(None) => None,
                Err(err) => Some((Err(err), flow)),
            }
        })
    }

    /// The stage producing into this flow
    pub fn producer(&self) -> StageId {
        self.producer
    }

    /// Name of the pipeline this flow belongs to
    pub fn pipeline_name(&self) -> &str {
        &self.ctx.name
    }

    /// A handle on the pipeline's cancellation token.
    ///
    /// Grab this before handing the flow to a terminal to be able to abort
    /// the whole chain from elsewhere.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.token.clone()
    }

    /// Create the flow for a stage attached downstream of this one
    pub(crate) fn downstream<O>(&self, kind: StageKind) -> (FlowSender<O>, Flow<O>) {
        channel(self.ctx.clone(), self.next_stage(kind))
    }

    /// Identity for a stage consuming this flow
    pub(crate) fn next_stage(&self, kind: StageKind) -> StageId {
        StageId::new(kind, self.producer.index + 1)
    }
}

impl<T> fmt::Debug for Flow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("pipeline", &self.ctx.name)
            .field("producer", &self.producer)
            .field("done", &self.done)
            .finish()
    }
}
