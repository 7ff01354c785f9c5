// core/src/event_log.rs
use std::sync::Arc;

use serde_json::Value;

use crate::backend::Backend;
use crate::error::EngineError;
use crate::event::{Event, EventType};

/// Append-only facade over the event log. Every append is keyed on a
/// caller-supplied `event_id`; replaying the same id is a no-op that
/// returns the original event, never a duplicate row.
pub struct EventLog {
    backend: Arc<dyn Backend>,
}

impl EventLog {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn append(
        &self,
        event_id: &str,
        event_type: EventType,
        aggregate_type: &str,
        aggregate_id: &str,
        event_data: Value,
        metadata: Value,
    ) -> Result<Event, EngineError> {
        self.backend
            .append_event(
                event_id,
                event_type,
                aggregate_type,
                aggregate_id,
                event_data,
                metadata,
            )
            .await
    }

    pub async fn read_after(&self, sequence_number: i64, limit: i64) -> Result<Vec<Event>, EngineError> {
        self.backend.read_events_after(sequence_number, limit).await
    }
}
