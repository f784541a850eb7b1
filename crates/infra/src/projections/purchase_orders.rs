use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use loomworks_core::TenantId;
use loomworks_events::EventEnvelope;
use loomworks_parties::PartyId;
use loomworks_purchasing::{LineItem, PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderStatus};

use super::cursor::{StreamCursors, check_identity, decode};
use super::error::ProjectionError;
use crate::read_model::TenantStore;

pub const AGGREGATE_TYPE: &str = "purchasing.order";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOrderReadModel {
    pub id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: PartyId,
    pub status: PurchaseOrderStatus,
    pub lines: Vec<LineItem>,
    /// Paise.
    pub total_cost: u64,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ordered_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct PurchaseOrdersProjection<S>
where
    S: TenantStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> PurchaseOrdersProjection<S>
where
    S: TenantStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, id: &PurchaseOrderId) -> Option<PurchaseOrderReadModel> {
        self.store.get(tenant_id, id)
    }

    /// Newest first, optionally narrowed to one status or supplier.
    pub fn list(
        &self,
        tenant_id: TenantId,
        status: Option<PurchaseOrderStatus>,
        supplier_id: Option<PartyId>,
    ) -> Vec<PurchaseOrderReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|po| {
                status.is_none_or(|s| po.status == s) && supplier_id.is_none_or(|s| po.supplier_id == s)
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.po_number.cmp(&a.po_number)));
        rows
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let event: PurchaseOrderEvent = decode(AGGREGATE_TYPE, envelope)?;
        let (tenant_id, id) = match &event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::PurchaseOrderPlaced(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::GoodsReceived(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => (e.tenant_id, e.order_id),
        };
        check_identity(envelope, tenant_id, id.0)?;

        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                let total_cost = e.lines.iter().map(LineItem::line_cost).sum();
                self.store.upsert(
                    tenant_id,
                    id,
                    PurchaseOrderReadModel {
                        id,
                        po_number: e.po_number,
                        supplier_id: e.supplier_id,
                        status: PurchaseOrderStatus::Draft,
                        lines: e.lines,
                        total_cost,
                        expected_delivery: e.expected_delivery,
                        notes: e.notes,
                        cancel_reason: None,
                        created_at: e.occurred_at,
                        ordered_at: None,
                        received_at: None,
                    },
                );
            }
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.lines.push(e.line.clone());
                    rm.total_cost = rm.lines.iter().map(LineItem::line_cost).sum();
                });
            }
            PurchaseOrderEvent::PurchaseOrderPlaced(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = PurchaseOrderStatus::Ordered;
                    rm.total_cost = e.total_cost;
                    rm.ordered_at = Some(e.occurred_at);
                });
            }
            PurchaseOrderEvent::GoodsReceived(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = PurchaseOrderStatus::Received;
                    rm.received_at = Some(e.occurred_at);
                });
            }
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = PurchaseOrderStatus::Cancelled;
                    rm.cancel_reason = Some(e.reason.clone());
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
