use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Metadata attached to every result envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique identifier for this event
    pub event_id: Uuid,

    /// When the event was produced
    pub timestamp: DateTime<Utc>,

    /// Links every result of one run or request
    pub correlation_id: Option<Uuid>,

    /// Additional context for the event
    #[serde(default)]
    pub context: Value,
}

impl EventMetadata {
    pub fn new(correlation_id: Option<Uuid>) -> Self {
        Self::with_context(correlation_id, json!({}))
    }

    pub fn with_context(correlation_id: Option<Uuid>, context: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            correlation_id,
            context,
        }
    }
}
