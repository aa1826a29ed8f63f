//! The shared result channel.
//!
//! Every clone told to report to the same run holds a [`ResultSink`] handle
//! to one unbounded queue. Sending never blocks and never drops a result
//! while the [`ResultReceiver`] is alive.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::orchestrator::events::ResultEnvelope;
use crate::plugin_manager::{PluginError, Result};
use crate::types::ModuleOutput;

/// Create a connected sink and receiver
pub fn result_channel() -> (ResultSink, ResultReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ResultSink {
            tx,
            correlation_id: None,
        },
        ResultReceiver { rx },
    )
}

/// Write-only handle onto the result channel
#[derive(Debug, Clone)]
pub struct ResultSink {
    tx: UnboundedSender<ResultEnvelope>,
    correlation_id: Option<Uuid>,
}

impl ResultSink {
    /// Handle to the same channel that stamps results with `correlation_id`
    pub fn correlated(&self, correlation_id: Option<Uuid>) -> Self {
        Self {
            tx: self.tx.clone(),
            correlation_id,
        }
    }

    pub fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn send(&self, envelope: ResultEnvelope) -> Result<()> {
        self.tx.send(envelope).map_err(|_| PluginError::SinkClosed)
    }

    pub fn completed(
        &self,
        plugin: &str,
        module: &str,
        target: &str,
        output: ModuleOutput,
    ) -> Result<()> {
        self.send(ResultEnvelope::completed(
            plugin,
            module,
            target,
            output,
            self.correlation_id,
        ))
    }

    pub fn failed(
        &self,
        plugin: &str,
        module: &str,
        target: &str,
        error: &PluginError,
    ) -> Result<()> {
        self.send(ResultEnvelope::failed(
            plugin,
            module,
            target,
            error.to_string(),
            self.correlation_id,
        ))
    }
}

/// Consuming end of the result channel
#[derive(Debug)]
pub struct ResultReceiver {
    rx: UnboundedReceiver<ResultEnvelope>,
}

impl ResultReceiver {
    /// Wait for the next result. `None` once every sink has been dropped.
    pub async fn recv(&mut self) -> Option<ResultEnvelope> {
        self.rx.recv().await
    }

    /// Take a result if one is already queued
    pub fn try_recv(&mut self) -> Option<ResultEnvelope> {
        match self.rx.try_recv() {
            Ok(envelope) => Some(envelope),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Collect results until every sink has been dropped
    pub async fn drain(mut self) -> Vec<ResultEnvelope> {
        let mut results = Vec::new();
        while let Some(envelope) = self.rx.recv().await {
            results.push(envelope);
        }
        results
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<ResultEnvelope> {
        UnboundedReceiverStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::events::Outcome;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_sink_delivers_in_send_order_per_sender() {
        let (sink, receiver) = result_channel();

        for i in 0..3 {
            sink.completed("Echo", "Test", "t", ModuleOutput::Raw(json!(i)))
                .unwrap();
        }
        drop(sink);

        let results = receiver.drain().await;
        let values: Vec<_> = results
            .iter()
            .map(|e| e.output().cloned().unwrap())
            .collect();
        assert_eq!(
            values,
            vec![
                ModuleOutput::Raw(json!(0)),
                ModuleOutput::Raw(json!(1)),
                ModuleOutput::Raw(json!(2)),
            ]
        );
    }

    #[tokio::test]
    async fn test_correlated_sink_stamps_results() {
        let (sink, mut receiver) = result_channel();
        let correlation_id = Uuid::new_v4();
        let tagged = sink.correlated(Some(correlation_id));

        tagged
            .failed("Echo", "Test", "t", &PluginError::Execution("boom".into()))
            .unwrap();

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.metadata.correlation_id, Some(correlation_id));
        assert_eq!(
            envelope.outcome,
            Outcome::Failed {
                error: "Execution failed: boom".to_string()
            }
        );
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (sink, receiver) = result_channel();
        drop(receiver);

        assert!(sink.is_closed());
        let result = sink.completed("Echo", "Test", "t", ModuleOutput::Raw(json!(null)));
        assert!(matches!(result, Err(PluginError::SinkClosed)));
    }

    #[tokio::test]
    async fn test_receiver_stream() {
        let (sink, receiver) = result_channel();
        let producer = sink.clone();
        tokio::spawn(async move {
            producer
                .completed("Echo", "Test", "t", ModuleOutput::Raw(json!("x")))
                .unwrap();
        });
        drop(sink);

        let collected: Vec<_> = receiver.into_stream().collect().await;
        assert_eq!(collected.len(), 1);
    }
}
