use async_trait::async_trait;
use cqrs_es::{Aggregate, DomainEvent as _, EventEnvelope, Query};
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Flat, serialized form of a committed event.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, new)]
pub struct DomainEvent {
    pub id: String,
    pub aggregate_type: String,
    pub sequence: usize,
    pub event_type: String,
    pub event_version: String,
    pub payload: String,
    pub metadata: String,
}

impl DomainEvent {
    pub fn from_envelope<A: Aggregate>(
        envelope: &EventEnvelope<A>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            envelope.aggregate_id.clone(),
            A::aggregate_type(),
            envelope.sequence,
            envelope.payload.event_type(),
            envelope.payload.event_version(),
            serde_json::to_string(&envelope.payload)?,
            serde_json::to_string(&envelope.metadata)?,
        ))
    }
}

/// Logs every committed event.
#[derive(Debug, Default)]
pub struct AuditLog;

#[async_trait]
impl<A: Aggregate> Query<A> for AuditLog {
    async fn dispatch(&self, aggregate_id: &str, events: &[EventEnvelope<A>]) {
        for envelope in events {
            match DomainEvent::from_envelope(envelope) {
                Ok(event) => tracing::info!(
                    "Received event: {} #{} for {}",
                    event.event_type,
                    event.sequence,
                    event.id
                ),
                Err(e) => tracing::warn!("Unserializable event for {}: {}", aggregate_id, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{Event, OrderSession};
    use chrono::Utc;
    use std::collections::HashMap;

    #[test]
    fn envelope_flattens_to_domain_event() {
        let mut metadata = HashMap::new();
        metadata.insert("command_id".to_string(), "01HX".to_string());
        let envelope = EventEnvelope::<OrderSession> {
            aggregate_id: "session-1".to_string(),
            sequence: 3,
            payload: Event::OrderSubmitted {
                id: "session-1".to_string(),
                updated_at: Utc::now(),
            },
            metadata,
        };

        let event = DomainEvent::from_envelope(&envelope).unwrap();

        assert_eq!(event.aggregate_type, "OrderSession");
        assert_eq!(event.event_type, "OrderSession:OrderSubmitted");
        assert_eq!(event.sequence, 3);
        assert!(event.payload.contains("\"type\":\"OrderSubmitted\""));
        assert!(event.metadata.contains("command_id"));
    }
}
