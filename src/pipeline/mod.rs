//! Pipeline configuration and entry points.
//!
//! A [`Pipeline`] carries the settings shared by every stage of one chain
//! and starts the chain off with a source. Everything after the source is
//! attached to the returned [`Flow`].

use futures_core::Stream;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::flow::{self, FlowContext};
use crate::core::{Flow, FlowSender, StageId, StageKind};
use crate::sources;

/// Configuration shared by all stages of a pipeline
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Name used in log events and debug output
    pub name: String,
    /// Token that aborts every stage of the pipeline when cancelled. A fresh
    /// token is created when this is `None`.
    pub cancellation_token: Option<CancellationToken>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "pipeline".to_string(),
            cancellation_token: None,
        }
    }
}

/// Builder for a chain of stages.
///
/// ```rust
/// use pipeweld::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let total = Pipeline::new()
///     .name("squares")
///     .source(1..=3)
///     .map(|x: u64| x * x)
///     .reduce(|a, b| a + b)
///     .await?;
/// assert_eq!(total, 14);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline from an existing configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Set the pipeline name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    /// Abort the pipeline when `token` is cancelled
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.config.cancellation_token = Some(token);
        self
    }

    /// Get the current configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start the pipeline from a finite sequence of values.
    ///
    /// Spawns the source task, so this must be called within a tokio runtime.
    pub fn source<I>(self, values: I) -> Flow<I::Item>
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: Send + 'static,
    {
        sources::feed(self.into_context(), tokio_stream::iter(values))
    }

    /// Start the pipeline from an async stream.
    ///
    /// Spawns the source task, so this must be called within a tokio runtime.
    pub fn source_stream<S>(self, stream: S) -> Flow<S::Item>
    where
        S: Stream + Send + 'static,
        S::Item: Send + 'static,
    {
        sources::feed(self.into_context(), stream)
    }

    /// Start the pipeline from a hand-driven sender.
    ///
    /// The caller owns the producing end and must send from a task other than
    /// the one draining the flow, since every send waits for its receive.
    pub fn channel<T>(self) -> (FlowSender<T>, Flow<T>) {
        flow::channel(self.into_context(), StageId::new(StageKind::Source, 0))
    }

    fn into_context(self) -> Arc<FlowContext> {
        let PipelineConfig {
            name,
            cancellation_token,
        } = self.config;
        Arc::new(FlowContext {
            name,
            token: cancellation_token.unwrap_or_else(CancellationToken::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.name, "pipeline");
        assert!(config.cancellation_token.is_none());
    }

    #[test]
    fn test_builder_sets_config() {
        let token = CancellationToken::new();
        let pipeline = Pipeline::new().name("ingest").cancellation_token(token);
        assert_eq!(pipeline.config().name, "ingest");
        assert!(pipeline.config().cancellation_token.is_some());
    }

    #[tokio::test]
    async fn test_flows_carry_pipeline_settings() {
        let token = CancellationToken::new();
        let flow = Pipeline::with_config(PipelineConfig {
            name: "named".to_string(),
            cancellation_token: Some(token.clone()),
        })
        .source(vec![1, 2, 3]);

        assert_eq!(flow.pipeline_name(), "named");
        token.cancel();
        assert!(flow.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_hand_driven_channel() {
        let (tx, flow) = Pipeline::new().name("manual").channel();
        assert_eq!(tx.pipeline_name(), "manual");

        tokio::spawn(async move {
            for word in ["x", "y"] {
                tx.send(word.to_string()).await?;
            }
            tx.close();
            Ok::<_, Error>(())
        });

        let words = flow.collect().await.unwrap();
        assert_eq!(words, vec!["x".to_string(), "y".to_string()]);
    }
}
