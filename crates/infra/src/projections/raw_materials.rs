use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use loomworks_core::TenantId;
use loomworks_events::EventEnvelope;
use loomworks_inventory::{RawMaterialEvent, RawMaterialId, StockStatus};
use loomworks_parties::PartyId;

use super::cursor::{StreamCursors, check_identity, decode};
use super::error::ProjectionError;
use crate::read_model::TenantStore;

pub const AGGREGATE_TYPE: &str = "inventory.material";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialReadModel {
    pub id: RawMaterialId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub supplier_id: Option<PartyId>,
    /// Paise per unit.
    pub cost_per_unit: u64,
    pub reorder_level: f64,
    pub stock: f64,
    pub stock_status: StockStatus,
    pub last_movement_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaterialReadModel {
    fn set_stock(&mut self, stock: f64, at: DateTime<Utc>) {
        self.stock = stock;
        self.stock_status = StockStatus::for_levels(stock, self.reorder_level);
        self.last_movement_at = Some(at);
        self.updated_at = at;
    }

    /// Stock value in paise.
    pub fn stock_value(&self) -> u64 {
        (self.stock.max(0.0) * self.cost_per_unit as f64).round() as u64
    }
}

/// Raw-material stock levels.
#[derive(Debug)]
pub struct RawMaterialsProjection<S>
where
    S: TenantStore<RawMaterialId, MaterialReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> RawMaterialsProjection<S>
where
    S: TenantStore<RawMaterialId, MaterialReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, id: &RawMaterialId) -> Option<MaterialReadModel> {
        self.store.get(tenant_id, id)
    }

    /// Sorted by name; `status` narrows to one stock band.
    pub fn list(&self, tenant_id: TenantId, status: Option<StockStatus>) -> Vec<MaterialReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|m| status.is_none_or(|s| m.stock_status == s))
            .collect();
        rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        rows
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let event: RawMaterialEvent = decode(AGGREGATE_TYPE, envelope)?;
        let (tenant_id, id) = match &event {
            RawMaterialEvent::MaterialCreated(e) => (e.tenant_id, e.material_id),
            RawMaterialEvent::MaterialUpdated(e) => (e.tenant_id, e.material_id),
            RawMaterialEvent::StockReceived(e) => (e.tenant_id, e.material_id),
            RawMaterialEvent::StockConsumed(e) => (e.tenant_id, e.material_id),
            RawMaterialEvent::StockCorrected(e) => (e.tenant_id, e.material_id),
            RawMaterialEvent::LowStockReached(e) => (e.tenant_id, e.material_id),
        };
        check_identity(envelope, tenant_id, id.0)?;

        match event {
            RawMaterialEvent::MaterialCreated(e) => {
                self.store.upsert(
                    tenant_id,
                    id,
                    MaterialReadModel {
                        id,
                        name: e.name,
                        category: e.category,
                        unit: e.unit,
                        supplier_id: e.supplier_id,
                        cost_per_unit: e.cost_per_unit,
                        reorder_level: e.reorder_level,
                        stock: e.stock,
                        stock_status: StockStatus::for_levels(e.stock, e.reorder_level),
                        last_movement_at: None,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            RawMaterialEvent::MaterialUpdated(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.name = e.name.clone();
                    rm.category = e.category.clone();
                    rm.unit = e.unit.clone();
                    rm.supplier_id = e.supplier_id;
                    rm.cost_per_unit = e.cost_per_unit;
                    rm.reorder_level = e.reorder_level;
                    rm.stock_status = StockStatus::for_levels(rm.stock, rm.reorder_level);
                    rm.updated_at = e.occurred_at;
                });
            }
            RawMaterialEvent::StockReceived(e) => {
                self.store
                    .update(tenant_id, &id, &mut |rm| rm.set_stock(e.stock_after, e.occurred_at));
            }
            RawMaterialEvent::StockConsumed(e) => {
                self.store
                    .update(tenant_id, &id, &mut |rm| rm.set_stock(e.stock_after, e.occurred_at));
            }
            RawMaterialEvent::StockCorrected(e) => {
                self.store
                    .update(tenant_id, &id, &mut |rm| rm.set_stock(e.stock_after, e.occurred_at));
            }
            // Notification only; the movement beside it carries the balance.
            RawMaterialEvent::LowStockReached(_) => {}
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    pub fn reset(&self) {
        self.store.clear_all();
        self.cursors.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use loomworks_core::AggregateId;
    use loomworks_inventory::{MaterialCreated, StockConsumed};
    use uuid::Uuid;

    use super::*;
    use crate::read_model::InMemoryTenantStore;

    fn envelope(t: TenantId, id: RawMaterialId, seq: u64, ev: RawMaterialEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(Uuid::now_v7(), t, id.0, AGGREGATE_TYPE, seq, serde_json::to_value(ev).unwrap())
    }

    fn created(t: TenantId, id: RawMaterialId, name: &str, stock: f64) -> RawMaterialEvent {
        RawMaterialEvent::MaterialCreated(MaterialCreated {
            tenant_id: t,
            material_id: id,
            name: name.to_string(),
            category: "Wool".to_string(),
            unit: "kg".to_string(),
            supplier_id: None,
            cost_per_unit: 65_000,
            reorder_level: 50.0,
            stock,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn movements_update_stock_status() {
        let p = RawMaterialsProjection::new(Arc::new(InMemoryTenantStore::new()));
        let t = TenantId::new();
        let id = RawMaterialId::new(AggregateId::new());

        p.apply_envelope(&envelope(t, id, 1, created(t, id, "NZ Wool", 120.0))).unwrap();
        assert_eq!(p.get(t, &id).unwrap().stock_status, StockStatus::InStock);
        assert_eq!(p.get(t, &id).unwrap().stock_value(), 7_800_000);

        p.apply_envelope(&envelope(
            t,
            id,
            2,
            RawMaterialEvent::StockConsumed(StockConsumed {
                tenant_id: t,
                material_id: id,
                quantity: 80.0,
                stock_after: 40.0,
                reference: Some("BATCH-1".to_string()),
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();

        let rm = p.get(t, &id).unwrap();
        assert_eq!(rm.stock, 40.0);
        assert_eq!(rm.stock_status, StockStatus::LowStock);
        assert!(rm.last_movement_at.is_some());
    }

    #[test]
    fn list_filters_by_status() {
        let p = RawMaterialsProjection::new(Arc::new(InMemoryTenantStore::new()));
        let t = TenantId::new();
        for (name, stock) in [("Latex", 0.0), ("Jute", 10.0), ("Silk", 200.0)] {
            let id = RawMaterialId::new(AggregateId::new());
            p.apply_envelope(&envelope(t, id, 1, created(t, id, name, stock))).unwrap();
        }

        assert_eq!(p.list(t, None).len(), 3);
        let out: Vec<_> = p
            .list(t, Some(StockStatus::OutOfStock))
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(out, vec!["Latex"]);
        assert_eq!(p.list(t, Some(StockStatus::LowStock))[0].name, "Jute");
        assert!(p.list(TenantId::new(), None).is_empty());
    }
}
