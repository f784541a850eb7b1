use std::collections::HashMap;
use std::sync::RwLock;

use loomworks_core::{AggregateId, TenantId};
use loomworks_events::EventEnvelope;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use super::error::ProjectionError;

/// Per-stream high-water marks that make projections idempotent under
/// at-least-once delivery.
#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<(TenantId, AggregateId), u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|m| m.get(&(tenant_id, aggregate_id)).copied())
            .unwrap_or(0)
    }

    /// `Ok(false)` for a duplicate the caller should skip, an error for a gap.
    pub fn admit(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        let last = self.last(envelope.tenant_id(), envelope.aggregate_id());
        let seq = envelope.sequence_number();

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(false);
        }
        if seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        Ok(true)
    }

    pub fn advance(&self, envelope: &EventEnvelope<JsonValue>) {
        if let Ok(mut m) = self.inner.write() {
            m.insert(
                (envelope.tenant_id(), envelope.aggregate_id()),
                envelope.sequence_number(),
            );
        }
    }

    pub fn clear(&self) {
        if let Ok(mut m) = self.inner.write() {
            m.clear();
        }
    }
}

pub(crate) fn decode<E: DeserializeOwned>(
    aggregate_type: &'static str,
    envelope: &EventEnvelope<JsonValue>,
) -> Result<E, ProjectionError> {
    serde_json::from_value(envelope.payload().clone()).map_err(|e| ProjectionError::Deserialize {
        aggregate_type,
        message: e.to_string(),
    })
}

/// Event payloads repeat the stream identity; both must agree with the
/// envelope.
pub(crate) fn check_identity(
    envelope: &EventEnvelope<JsonValue>,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
) -> Result<(), ProjectionError> {
    if tenant_id != envelope.tenant_id() {
        return Err(ProjectionError::TenantIsolation(
            "event tenant_id does not match envelope tenant_id".to_string(),
        ));
    }
    if aggregate_id != envelope.aggregate_id() {
        return Err(ProjectionError::TenantIsolation(
            "event aggregate id does not match envelope aggregate_id".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn env(tenant_id: TenantId, aggregate_id: AggregateId, seq: u64) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(Uuid::now_v7(), tenant_id, aggregate_id, "parties.party", seq, JsonValue::Null)
    }

    #[test]
    fn duplicates_are_skipped_and_gaps_rejected() {
        let cursors = StreamCursors::new();
        let t = TenantId::new();
        let a = AggregateId::new();

        assert!(cursors.admit(&env(t, a, 1)).unwrap());
        cursors.advance(&env(t, a, 1));
        assert!(!cursors.admit(&env(t, a, 1)).unwrap());
        assert!(matches!(
            cursors.admit(&env(t, a, 3)),
            Err(ProjectionError::NonMonotonicSequence { last: 1, found: 3 })
        ));
        assert!(cursors.admit(&env(t, a, 2)).unwrap());
    }

    #[test]
    fn streams_start_at_one() {
        let cursors = StreamCursors::new();
        let e = env(TenantId::new(), AggregateId::new(), 2);
        assert!(cursors.admit(&e).is_err());
    }

    proptest! {
        #[test]
        fn redelivery_never_admits_twice(repeats in proptest::collection::vec(1usize..4, 1..20)) {
            let cursors = StreamCursors::new();
            let t = TenantId::new();
            let a = AggregateId::new();
            let mut admitted = 0u64;

            for (i, times) in repeats.iter().enumerate() {
                let e = env(t, a, i as u64 + 1);
                for _ in 0..*times {
                    if cursors.admit(&e).unwrap() {
                        cursors.advance(&e);
                        admitted += 1;
                    }
                }
            }

            prop_assert_eq!(admitted, repeats.len() as u64);
            prop_assert_eq!(cursors.last(t, a), repeats.len() as u64);
        }
    }
}
