use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use loomworks_core::TenantId;
use loomworks_events::EventEnvelope;
use loomworks_parties::{ContactInfo, CustomerType, PartyEvent, PartyId, PartyKind, PartyStatus};

use super::cursor::{StreamCursors, check_identity, decode};
use super::error::ProjectionError;
use crate::read_model::TenantStore;

pub const AGGREGATE_TYPE: &str = "parties.party";

/// Customer/supplier directory row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyReadModel {
    pub id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub gstin: Option<String>,
    pub company_name: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub status: PartyStatus,
    pub suspended_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PartyReadModel {
    /// Case-insensitive match on name, company, email, phone or city.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        [
            Some(self.name.as_str()),
            self.company_name.as_deref(),
            self.contact.email.as_deref(),
            self.contact.phone.as_deref(),
            self.contact.city.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&q))
    }
}

/// Party directory for customers and suppliers.
#[derive(Debug)]
pub struct PartyDirectoryProjection<S>
where
    S: TenantStore<PartyId, PartyReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> PartyDirectoryProjection<S>
where
    S: TenantStore<PartyId, PartyReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, party_id: &PartyId) -> Option<PartyReadModel> {
        self.store.get(tenant_id, party_id)
    }

    /// Parties of one kind, sorted by name.
    pub fn list(&self, tenant_id: TenantId, kind: PartyKind) -> Vec<PartyReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|p| p.kind == kind)
            .collect();
        rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        rows
    }

    pub fn search(&self, tenant_id: TenantId, kind: PartyKind, query: &str) -> Vec<PartyReadModel> {
        self.list(tenant_id, kind)
            .into_iter()
            .filter(|p| p.matches(query))
            .collect()
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let event: PartyEvent = decode(AGGREGATE_TYPE, envelope)?;
        let (tenant_id, party_id) = match &event {
            PartyEvent::PartyRegistered(e) => (e.tenant_id, e.party_id),
            PartyEvent::PartyUpdated(e) => (e.tenant_id, e.party_id),
            PartyEvent::PartySuspended(e) => (e.tenant_id, e.party_id),
            PartyEvent::PartyReactivated(e) => (e.tenant_id, e.party_id),
        };
        check_identity(envelope, tenant_id, party_id.0)?;

        match event {
            PartyEvent::PartyRegistered(e) => {
                self.store.upsert(
                    tenant_id,
                    party_id,
                    PartyReadModel {
                        id: party_id,
                        kind: e.kind,
                        name: e.name,
                        contact: e.contact,
                        gstin: e.gstin,
                        company_name: e.company_name,
                        customer_type: e.customer_type,
                        status: PartyStatus::Active,
                        suspended_reason: None,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            PartyEvent::PartyUpdated(e) => {
                self.store.update(tenant_id, &party_id, &mut |rm| {
                    rm.name = e.name.clone();
                    rm.contact = e.contact.clone();
                    rm.gstin = e.gstin.clone();
                    rm.company_name = e.company_name.clone();
                    rm.customer_type = e.customer_type;
                    rm.updated_at = e.occurred_at;
                });
            }
            PartyEvent::PartySuspended(e) => {
                self.store.update(tenant_id, &party_id, &mut |rm| {
                    rm.status = PartyStatus::Suspended;
                    rm.suspended_reason = e.reason.clone();
                    rm.updated_at = e.occurred_at;
                });
            }
            PartyEvent::PartyReactivated(e) => {
                self.store.update(tenant_id, &party_id, &mut |rm| {
                    rm.status = PartyStatus::Active;
                    rm.suspended_reason = None;
                    rm.updated_at = e.occurred_at;
                });
            }
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    pub fn reset(&self) {
        self.store.clear_all();
        self.cursors.clear();
    }
}
