//! Start-up rebuild of every read model from the event store.

use thiserror::Error;
use tracing::{info, warn};

use super::{ProjectionError, ProjectionSet};
use crate::event_store::{EventStore, EventStoreError};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("event store error: {0}")]
    EventStore(#[from] EventStoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub events: u64,
    pub failed: u64,
}

/// Clears `projections` and folds the whole log into them in commit order.
///
/// A projection failure skips that envelope and is counted; one bad event
/// must not keep the service from starting.
pub async fn replay<S>(store: &S, projections: &ProjectionSet) -> Result<ReplayReport, ReplayError>
where
    S: EventStore + ?Sized,
{
    let events = store.load_all().await?;
    projections.reset();

    let mut report = ReplayReport::default();
    for stored in events {
        let envelope = stored.to_envelope();
        report.events += 1;
        if let Err(err) = projections.apply(&envelope) {
            report.failed += 1;
            log_failure(&envelope, &err);
        }
    }

    info!(events = report.events, failed = report.failed, "read models rebuilt");
    Ok(report)
}

fn log_failure(envelope: &loomworks_events::EventEnvelope<serde_json::Value>, err: &ProjectionError) {
    warn!(
        tenant_id = %envelope.tenant_id(),
        aggregate_type = envelope.aggregate_type(),
        aggregate_id = %envelope.aggregate_id(),
        sequence_number = envelope.sequence_number(),
        error = %err,
        "replay skipped event"
    );
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use loomworks_core::{AggregateId, ExpectedVersion, TenantId};
    use loomworks_parties::{ContactInfo, PartyEvent, PartyId, PartyKind, PartyRegistered};
    use uuid::Uuid;

    use super::*;
    use crate::event_store::{InMemoryEventStore, UncommittedEvent};

    #[tokio::test]
    async fn rebuild_restores_parties_and_is_repeatable() {
        let store = InMemoryEventStore::new();
        let t = TenantId::new();
        let id = PartyId::new(AggregateId::new());
        let ev = PartyEvent::PartyRegistered(PartyRegistered {
            tenant_id: t,
            party_id: id,
            kind: PartyKind::Customer,
            name: "Asha Rugs".to_string(),
            contact: ContactInfo::default(),
            gstin: None,
            company_name: None,
            customer_type: None,
            occurred_at: Utc::now(),
        });
        let uncommitted = UncommittedEvent::from_typed(t, id.0, "parties.party", Uuid::now_v7(), &ev).unwrap();
        store.append(vec![uncommitted], ExpectedVersion::Exact(0)).await.unwrap();

        let projections = ProjectionSet::new();
        let report = replay(&store, &projections).await.unwrap();
        assert_eq!(report, ReplayReport { events: 1, failed: 0 });
        assert_eq!(projections.parties.get(t, &id).unwrap().name, "Asha Rugs");

        replay(&store, &projections).await.unwrap();
        assert_eq!(projections.parties.list(t, PartyKind::Customer).len(), 1);
    }
}
