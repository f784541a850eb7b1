use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use loomworks_core::TenantId;
use loomworks_events::EventEnvelope;
use loomworks_parties::PartyId;
use loomworks_sales::{
    OrderEvent, OrderId, OrderLine, OrderStatus, OrderTotals, PaymentStatus, totals_for,
};

use super::cursor::{StreamCursors, check_identity, decode};
use super::error::ProjectionError;
use crate::read_model::TenantStore;

pub const AGGREGATE_TYPE: &str = "sales.order";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderReadModel {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: PartyId,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub payment_status: PaymentStatus,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderReadModel {
    fn refresh_totals(&mut self, paid: u64) {
        self.totals = totals_for(&self.lines, paid);
        self.payment_status = PaymentStatus::for_amounts(self.totals.paid, self.totals.total);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<PartyId>,
}

/// Customer orders with running totals.
#[derive(Debug)]
pub struct OrdersProjection<S>
where
    S: TenantStore<OrderId, OrderReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> OrdersProjection<S>
where
    S: TenantStore<OrderId, OrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, id: &OrderId) -> Option<OrderReadModel> {
        self.store.get(tenant_id, id)
    }

    /// Newest first.
    pub fn list(&self, tenant_id: TenantId, filter: OrderFilter) -> Vec<OrderReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|o| {
                filter.status.is_none_or(|s| o.status == s)
                    && filter.customer_id.is_none_or(|c| o.customer_id == c)
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.order_number.cmp(&a.order_number)));
        rows
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let event: OrderEvent = decode(AGGREGATE_TYPE, envelope)?;
        let (tenant_id, id) = match &event {
            OrderEvent::OrderCreated(e) => (e.tenant_id, e.order_id),
            OrderEvent::LineAdded(e) => (e.tenant_id, e.order_id),
            OrderEvent::LineRemoved(e) => (e.tenant_id, e.order_id),
            OrderEvent::OrderConfirmed(e) => (e.tenant_id, e.order_id),
            OrderEvent::OrderStatusChanged(e) => (e.tenant_id, e.order_id),
            OrderEvent::PaymentRecorded(e) => (e.tenant_id, e.order_id),
            OrderEvent::OrderCancelled(e) => (e.tenant_id, e.order_id),
        };
        check_identity(envelope, tenant_id, id.0)?;

        match event {
            OrderEvent::OrderCreated(e) => {
                let mut rm = OrderReadModel {
                    id,
                    order_number: e.order_number,
                    customer_id: e.customer_id,
                    status: OrderStatus::Pending,
                    lines: e.lines,
                    totals: OrderTotals::default(),
                    payment_status: PaymentStatus::Unpaid,
                    expected_delivery: e.expected_delivery,
                    notes: e.notes,
                    cancel_reason: None,
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                };
                rm.refresh_totals(0);
                self.store.upsert(tenant_id, id, rm);
            }
            OrderEvent::LineAdded(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.lines.push(e.line.clone());
                    rm.refresh_totals(rm.totals.paid);
                    rm.updated_at = e.occurred_at;
                });
            }
            OrderEvent::LineRemoved(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.lines.retain(|l| l.line_no != e.line_no);
                    rm.refresh_totals(rm.totals.paid);
                    rm.updated_at = e.occurred_at;
                });
            }
            OrderEvent::OrderConfirmed(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = OrderStatus::Confirmed;
                    rm.updated_at = e.occurred_at;
                });
            }
            OrderEvent::OrderStatusChanged(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = e.to;
                    rm.updated_at = e.occurred_at;
                });
            }
            OrderEvent::PaymentRecorded(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.refresh_totals(e.paid_total);
                    rm.updated_at = e.occurred_at;
                });
            }
            OrderEvent::OrderCancelled(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = OrderStatus::Cancelled;
                    rm.cancel_reason = Some(e.reason.clone());
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
