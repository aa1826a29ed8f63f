use crate::orchestrator::metadata::EventMetadata;
use crate::types::ModuleOutput;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How one plugin invocation ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The plugin produced a result
    Completed { output: ModuleOutput },
    /// The invocation was aborted
    Failed { error: String },
}

/// A single result travelling from a plugin clone to the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub plugin: String,
    pub module: String,
    pub target: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub metadata: EventMetadata,
}

impl ResultEnvelope {
    pub fn completed(
        plugin: impl Into<String>,
        module: impl Into<String>,
        target: impl Into<String>,
        output: ModuleOutput,
        correlation_id: Option<Uuid>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            module: module.into(),
            target: target.into(),
            outcome: Outcome::Completed { output },
            metadata: EventMetadata::new(correlation_id),
        }
    }

    pub fn failed(
        plugin: impl Into<String>,
        module: impl Into<String>,
        target: impl Into<String>,
        error: impl Into<String>,
        correlation_id: Option<Uuid>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            module: module.into(),
            target: target.into(),
            outcome: Outcome::Failed {
                error: error.into(),
            },
            metadata: EventMetadata::new(correlation_id),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, Outcome::Completed { .. })
    }

    pub fn output(&self) -> Option<&ModuleOutput> {
        match &self.outcome {
            Outcome::Completed { output } => Some(output),
            Outcome::Failed { .. } => None,
        }
    }
}
