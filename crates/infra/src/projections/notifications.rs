//! Notification feed derived from domain events.
//!
//! Every event maps to at most one notification whose id is the event id, so
//! replays and duplicate deliveries cannot produce doubles. Read flags live
//! only in the read model and start over on a rebuild.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use loomworks_core::{AggregateId, TenantId};
use loomworks_events::EventEnvelope;
use loomworks_inventory::RawMaterialEvent;
use loomworks_production::BatchEvent;
use loomworks_purchasing::PurchaseOrderEvent;
use loomworks_reporting::format_inr_paise;
use loomworks_sales::{OrderEvent, OrderStatus};

use super::cursor::{StreamCursors, decode};
use super::error::ProjectionError;
use super::{batches, orders, purchase_orders, raw_materials};
use crate::read_model::TenantStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowStock,
    OutOfStock,
    OrderCreated,
    OrderStatusChanged,
    PaymentReceived,
    OrderCancelled,
    BatchPlanned,
    BatchStarted,
    BatchCompleted,
    BatchCancelled,
    PurchaseOrderPlaced,
    GoodsReceived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub entity_type: String,
    pub entity_id: AggregateId,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationQuery {
    pub unread_only: bool,
    pub limit: Option<usize>,
}

pub struct NotificationsProjection<S>
where
    S: TenantStore<Uuid, Notification>,
{
    store: S,
    cursors: StreamCursors,
    /// Material names, for stock messages on movements that do not carry one.
    material_names: RwLock<HashMap<(TenantId, AggregateId), String>>,
}

impl<S> NotificationsProjection<S>
where
    S: TenantStore<Uuid, Notification>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
            material_names: RwLock::new(HashMap::new()),
        }
    }

    /// Newest first.
    pub fn list(&self, tenant_id: TenantId, query: NotificationQuery) -> Vec<Notification> {
        let mut rows: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|n| !query.unread_only || !n.read)
            .collect();
        // v7 ids break ties between events of the same instant.
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        rows
    }

    pub fn unread_count(&self, tenant_id: TenantId) -> usize {
        self.store.list(tenant_id).iter().filter(|n| !n.read).count()
    }

    /// `false` when the notification does not exist for this tenant.
    pub fn mark_read(&self, tenant_id: TenantId, id: Uuid) -> bool {
        self.store.update(tenant_id, &id, &mut |n| n.read = true)
    }

    /// Returns how many notifications changed.
    pub fn mark_all_read(&self, tenant_id: TenantId) -> usize {
        let unread: Vec<Uuid> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|n| !n.read)
            .map(|n| n.id)
            .collect();
        unread
            .iter()
            .filter(|id| self.store.update(tenant_id, id, &mut |n| n.read = true))
            .count()
    }

    /// Applies one envelope and returns the notification it produced, if any.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<Option<Notification>, ProjectionError> {
        let draft = match envelope.aggregate_type() {
            raw_materials::AGGREGATE_TYPE
            | orders::AGGREGATE_TYPE
            | batches::AGGREGATE_TYPE
            | purchase_orders::AGGREGATE_TYPE => {
                if !self.cursors.admit(envelope)? {
                    return Ok(None);
                }
                self.draft_for(envelope)?
            }
            _ => return Ok(None),
        };
        self.cursors.advance(envelope);

        let Some(draft) = draft else {
            return Ok(None);
        };
        let tenant_id = envelope.tenant_id();
        let notification = Notification {
            id: envelope.event_id(),
            kind: draft.kind,
            severity: draft.severity,
            title: draft.title,
            message: draft.message,
            entity_type: envelope.aggregate_type().to_string(),
            entity_id: envelope.aggregate_id(),
            read: false,
            created_at: draft.at,
        };
        self.store.upsert(tenant_id, notification.id, notification.clone());
        Ok(Some(notification))
    }

    pub fn reset(&self) {
        self.store.clear_all();
        self.cursors.clear();
        if let Ok(mut names) = self.material_names.write() {
            names.clear();
        }
    }

    fn draft_for(&self, envelope: &EventEnvelope<JsonValue>) -> Result<Option<Draft>, ProjectionError> {
        let draft = match envelope.aggregate_type() {
            raw_materials::AGGREGATE_TYPE => {
                let event: RawMaterialEvent = decode(raw_materials::AGGREGATE_TYPE, envelope)?;
                self.material_draft(envelope, event)
            }
            orders::AGGREGATE_TYPE => order_draft(decode(orders::AGGREGATE_TYPE, envelope)?),
            batches::AGGREGATE_TYPE => batch_draft(decode(batches::AGGREGATE_TYPE, envelope)?),
            purchase_orders::AGGREGATE_TYPE => {
                purchase_order_draft(decode(purchase_orders::AGGREGATE_TYPE, envelope)?)
            }
            _ => None,
        };
        Ok(draft)
    }

    fn material_draft(&self, envelope: &EventEnvelope<JsonValue>, event: RawMaterialEvent) -> Option<Draft> {
        let key = (envelope.tenant_id(), envelope.aggregate_id());
        match event {
            RawMaterialEvent::MaterialCreated(e) => {
                self.remember_name(key, e.name);
                None
            }
            RawMaterialEvent::MaterialUpdated(e) => {
                self.remember_name(key, e.name);
                None
            }
            RawMaterialEvent::StockReceived(_) => None,
            RawMaterialEvent::StockConsumed(e) if e.stock_after <= 0.0 => {
                Some(self.out_of_stock(key, e.occurred_at))
            }
            RawMaterialEvent::StockCorrected(e) if e.stock_after <= 0.0 && e.previous_stock > 0.0 => {
                Some(self.out_of_stock(key, e.occurred_at))
            }
            RawMaterialEvent::StockConsumed(_) | RawMaterialEvent::StockCorrected(_) => None,
            // The out-of-stock notice covers an empty bin.
            RawMaterialEvent::LowStockReached(e) if e.stock <= 0.0 => None,
            RawMaterialEvent::LowStockReached(e) => Some(Draft {
                kind: NotificationKind::LowStock,
                severity: Severity::Warning,
                title: format!("Low stock: {}", e.name),
                message: format!(
                    "{} is down to {} {} (reorder level {} {})",
                    e.name, e.stock, e.unit, e.reorder_level, e.unit
                ),
                at: e.occurred_at,
            }),
        }
    }

    fn remember_name(&self, key: (TenantId, AggregateId), name: String) {
        if let Ok(mut names) = self.material_names.write() {
            names.insert(key, name);
        }
    }

    fn out_of_stock(&self, key: (TenantId, AggregateId), at: DateTime<Utc>) -> Draft {
        let name = self
            .material_names
            .read()
            .ok()
            .and_then(|n| n.get(&key).cloned())
            .unwrap_or_else(|| "A raw material".to_string());
        Draft {
            kind: NotificationKind::OutOfStock,
            severity: Severity::Error,
            title: format!("Out of stock: {name}"),
            message: format!("{name} has run out; production using it cannot start"),
            at,
        }
    }
}

struct Draft {
    kind: NotificationKind,
    severity: Severity,
    title: String,
    message: String,
    at: DateTime<Utc>,
}

fn status_label(status: OrderStatus) -> String {
    status.as_str().replace('_', " ")
}

fn order_draft(event: OrderEvent) -> Option<Draft> {
    match event {
        OrderEvent::OrderCreated(e) => Some(Draft {
            kind: NotificationKind::OrderCreated,
            severity: Severity::Info,
            title: format!("New order {}", e.order_number),
            message: format!("Order {} was created with {} line(s)", e.order_number, e.lines.len()),
            at: e.occurred_at,
        }),
        OrderEvent::OrderConfirmed(e) => Some(Draft {
            kind: NotificationKind::OrderStatusChanged,
            severity: Severity::Info,
            title: format!("Order {} confirmed", e.order_number),
            message: format!("Order {} moved from pending to confirmed", e.order_number),
            at: e.occurred_at,
        }),
        OrderEvent::OrderStatusChanged(e) => Some(Draft {
            kind: NotificationKind::OrderStatusChanged,
            severity: if e.to == OrderStatus::Delivered {
                Severity::Success
            } else {
                Severity::Info
            },
            title: format!("Order {} is {}", e.order_number, status_label(e.to)),
            message: format!(
                "Order {} moved from {} to {}",
                e.order_number,
                status_label(e.from),
                status_label(e.to)
            ),
            at: e.occurred_at,
        }),
        OrderEvent::PaymentRecorded(e) => Some(Draft {
            kind: NotificationKind::PaymentReceived,
            severity: Severity::Success,
            title: format!("Payment received for {}", e.order_number),
            message: format!(
                "{} received; {} outstanding",
                format_inr_paise(e.amount as i64),
                format_inr_paise(e.outstanding as i64)
            ),
            at: e.occurred_at,
        }),
        OrderEvent::OrderCancelled(e) => Some(Draft {
            kind: NotificationKind::OrderCancelled,
            severity: Severity::Warning,
            title: format!("Order {} cancelled", e.order_number),
            message: e.reason,
            at: e.occurred_at,
        }),
        OrderEvent::LineAdded(_) | OrderEvent::LineRemoved(_) => None,
    }
}

fn batch_draft(event: BatchEvent) -> Option<Draft> {
    match event {
        BatchEvent::BatchPlanned(e) => Some(Draft {
            kind: NotificationKind::BatchPlanned,
            severity: Severity::Info,
            title: format!("Batch {} planned", e.batch_number),
            message: format!("{} piece(s) planned, priority {}", e.planned_quantity, e.priority),
            at: e.occurred_at,
        }),
        BatchEvent::MachineStarted(e) => Some(Draft {
            kind: NotificationKind::BatchStarted,
            severity: Severity::Info,
            title: format!("Batch {} started", e.batch_number),
            message: match e.operator {
                Some(op) => format!("Running on {} (operator {op})", e.machine),
                None => format!("Running on {}", e.machine),
            },
            at: e.occurred_at,
        }),
        BatchEvent::BatchCompleted(e) => Some(Draft {
            kind: NotificationKind::BatchCompleted,
            severity: Severity::Success,
            title: format!("Batch {} completed", e.batch_number),
            message: format!(
                "{} of {} piece(s) produced, grade {}, yield {}%, wastage {}%",
                e.produced_quantity,
                e.planned_quantity,
                e.quality_grade.as_str(),
                e.yield_percent,
                e.wastage_percent
            ),
            at: e.occurred_at,
        }),
        BatchEvent::BatchCancelled(e) => Some(Draft {
            kind: NotificationKind::BatchCancelled,
            severity: Severity::Warning,
            title: format!("Batch {} cancelled", e.batch_number),
            message: e.reason,
            at: e.occurred_at,
        }),
        BatchEvent::WastageRecorded(_) => None,
    }
}

fn purchase_order_draft(event: PurchaseOrderEvent) -> Option<Draft> {
    match event {
        PurchaseOrderEvent::PurchaseOrderPlaced(e) => Some(Draft {
            kind: NotificationKind::PurchaseOrderPlaced,
            severity: Severity::Info,
            title: format!("Purchase order {} placed", e.po_number),
            message: format!("Ordered for {}", format_inr_paise(e.total_cost as i64)),
            at: e.occurred_at,
        }),
        PurchaseOrderEvent::GoodsReceived(e) => Some(Draft {
            kind: NotificationKind::GoodsReceived,
            severity: Severity::Success,
            title: format!("Goods received for {}", e.po_number),
            message: format!("{} line(s) booked into stock", e.lines.len()),
            at: e.occurred_at,
        }),
        PurchaseOrderEvent::PurchaseOrderCreated(_)
        | PurchaseOrderEvent::PurchaseOrderLineAdded(_)
        | PurchaseOrderEvent::PurchaseOrderCancelled(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use loomworks_inventory::{LowStockReached, MaterialCreated, RawMaterialId, StockConsumed};
    use loomworks_parties::PartyId;
    use loomworks_sales::{OrderCreated, OrderId, OrderStatusChanged};

    use super::*;
    use crate::read_model::InMemoryTenantStore;

    type Feed = NotificationsProjection<Arc<InMemoryTenantStore<Uuid, Notification>>>;

    fn feed() -> Feed {
        NotificationsProjection::new(Arc::new(InMemoryTenantStore::new()))
    }

    fn envelope<E: Serialize>(t: TenantId, id: AggregateId, ty: &str, seq: u64, ev: E) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(Uuid::now_v7(), t, id, ty, seq, serde_json::to_value(ev).unwrap())
    }

    fn order_created(t: TenantId, id: OrderId, at: DateTime<Utc>) -> OrderEvent {
        OrderEvent::OrderCreated(OrderCreated {
            tenant_id: t,
            order_id: id,
            order_number: "SO-20261019-AAAAAA".to_string(),
            customer_id: PartyId::new(AggregateId::new()),
            lines: vec![],
            expected_delivery: None,
            notes: None,
            occurred_at: at,
        })
    }

    #[test]
    fn stock_running_out_names_the_material() {
        let f = feed();
        let t = TenantId::new();
        let m = RawMaterialId::new(AggregateId::new());
        let now = Utc::now();

        let created = RawMaterialEvent::MaterialCreated(MaterialCreated {
            tenant_id: t,
            material_id: m,
            name: "Latex".to_string(),
            category: "Latex".to_string(),
            unit: "kg".to_string(),
            supplier_id: None,
            cost_per_unit: 18_000,
            reorder_level: 5.0,
            stock: 10.0,
            occurred_at: now,
        });
        assert!(f.apply_envelope(&envelope(t, m.0, raw_materials::AGGREGATE_TYPE, 1, created)).unwrap().is_none());

        let consumed = RawMaterialEvent::StockConsumed(StockConsumed {
            tenant_id: t,
            material_id: m,
            quantity: 10.0,
            stock_after: 0.0,
            reference: None,
            occurred_at: now,
        });
        let n = f
            .apply_envelope(&envelope(t, m.0, raw_materials::AGGREGATE_TYPE, 2, consumed))
            .unwrap()
            .unwrap();
        assert_eq!(n.kind, NotificationKind::OutOfStock);
        assert_eq!(n.severity, Severity::Error);
        assert_eq!(n.title, "Out of stock: Latex");

        let low = RawMaterialEvent::LowStockReached(LowStockReached {
            tenant_id: t,
            material_id: m,
            name: "Latex".to_string(),
            unit: "kg".to_string(),
            stock: 0.0,
            reorder_level: 5.0,
            occurred_at: now,
        });
        assert!(f.apply_envelope(&envelope(t, m.0, raw_materials::AGGREGATE_TYPE, 3, low)).unwrap().is_none());
        assert_eq!(f.unread_count(t), 1);
    }

    #[test]
    fn list_is_newest_first_and_read_flags_stick() {
        let f = feed();
        let t = TenantId::new();
        let id = OrderId::new(AggregateId::new());
        let earlier = Utc::now() - Duration::minutes(5);

        f.apply_envelope(&envelope(t, id.0, orders::AGGREGATE_TYPE, 1, order_created(t, id, earlier)))
            .unwrap();
        let changed = OrderEvent::OrderStatusChanged(OrderStatusChanged {
            tenant_id: t,
            order_id: id,
            order_number: "SO-20261019-AAAAAA".to_string(),
            from: OrderStatus::Confirmed,
            to: OrderStatus::InProduction,
            occurred_at: Utc::now(),
        });
        f.apply_envelope(&envelope(t, id.0, orders::AGGREGATE_TYPE, 2, changed)).unwrap();

        let all = f.list(t, NotificationQuery::default());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Order SO-20261019-AAAAAA is in production");
        assert_eq!(all[1].kind, NotificationKind::OrderCreated);

        assert!(f.mark_read(t, all[0].id));
        assert!(!f.mark_read(TenantId::new(), all[1].id));
        let unread = f.list(t, NotificationQuery { unread_only: true, limit: None });
        assert_eq!(unread.len(), 1);

        assert_eq!(f.mark_all_read(t), 1);
        assert_eq!(f.unread_count(t), 0);
        assert_eq!(f.list(t, NotificationQuery { unread_only: false, limit: Some(1) }).len(), 1);
    }

    #[test]
    fn redelivery_does_not_duplicate() {
        let f = feed();
        let t = TenantId::new();
        let id = OrderId::new(AggregateId::new());
        let env = envelope(t, id.0, orders::AGGREGATE_TYPE, 1, order_created(t, id, Utc::now()));

        assert!(f.apply_envelope(&env).unwrap().is_some());
        assert!(f.apply_envelope(&env).unwrap().is_none());
        assert_eq!(f.unread_count(t), 1);
    }

    #[test]
    fn unrelated_streams_are_ignored() {
        let f = feed();
        let env = envelope(TenantId::new(), AggregateId::new(), "parties.party", 1, JsonValue::Null);
        assert!(f.apply_envelope(&env).unwrap().is_none());
    }
}
