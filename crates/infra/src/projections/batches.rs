use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use loomworks_core::{AggregateId, TenantId};
use loomworks_events::EventEnvelope;
use loomworks_production::{BatchEvent, BatchId, BatchStatus, WastageEntry, wastage_percent};
use loomworks_products::{MaterialRequirement, ProductId, QualityGrade};

use super::cursor::{StreamCursors, check_identity, decode};
use super::error::ProjectionError;
use crate::read_model::TenantStore;

pub const AGGREGATE_TYPE: &str = "production.batch";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReadModel {
    pub id: BatchId,
    pub batch_number: String,
    pub product_id: ProductId,
    pub order_id: Option<AggregateId>,
    pub planned_quantity: u32,
    pub sqm_per_unit: f64,
    pub total_sqm: f64,
    pub material_plan: Vec<MaterialRequirement>,
    pub priority: String,
    pub planned_start: Option<NaiveDate>,
    pub status: BatchStatus,
    pub machine: Option<String>,
    pub operator: Option<String>,
    pub consumed: Vec<MaterialRequirement>,
    pub wastage: Vec<WastageEntry>,
    pub produced_quantity: u32,
    pub quality_grade: Option<QualityGrade>,
    pub yield_percent: Option<f64>,
    pub wastage_percent: f64,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchReadModel {
    fn refresh_wastage_percent(&mut self) {
        let consumed: f64 = self.consumed.iter().map(|c| c.quantity).sum();
        let wasted: f64 = self.wastage.iter().map(|w| w.quantity).sum();
        self.wastage_percent = wastage_percent(wasted, consumed);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchFilter {
    pub status: Option<BatchStatus>,
    pub product_id: Option<ProductId>,
    pub order_id: Option<AggregateId>,
}

/// Production board: one row per batch.
#[derive(Debug)]
pub struct ProductionBatchesProjection<S>
where
    S: TenantStore<BatchId, BatchReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> ProductionBatchesProjection<S>
where
    S: TenantStore<BatchId, BatchReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, id: &BatchId) -> Option<BatchReadModel> {
        self.store.get(tenant_id, id)
    }

    /// Newest first.
    pub fn list(&self, tenant_id: TenantId, filter: BatchFilter) -> Vec<BatchReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|b| {
                filter.status.is_none_or(|s| b.status == s)
                    && filter.product_id.is_none_or(|p| b.product_id == p)
                    && filter.order_id.is_none_or(|o| b.order_id == Some(o))
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.batch_number.cmp(&a.batch_number)));
        rows
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let event: BatchEvent = decode(AGGREGATE_TYPE, envelope)?;
        let (tenant_id, id) = match &event {
            BatchEvent::BatchPlanned(e) => (e.tenant_id, e.batch_id),
            BatchEvent::MachineStarted(e) => (e.tenant_id, e.batch_id),
            BatchEvent::WastageRecorded(e) => (e.tenant_id, e.batch_id),
            BatchEvent::BatchCompleted(e) => (e.tenant_id, e.batch_id),
            BatchEvent::BatchCancelled(e) => (e.tenant_id, e.batch_id),
        };
        check_identity(envelope, tenant_id, id.0)?;

        match event {
            BatchEvent::BatchPlanned(e) => {
                self.store.upsert(
                    tenant_id,
                    id,
                    BatchReadModel {
                        id,
                        batch_number: e.batch_number,
                        product_id: e.product_id,
                        order_id: e.order_id,
                        planned_quantity: e.planned_quantity,
                        sqm_per_unit: e.sqm_per_unit,
                        total_sqm: e.sqm_per_unit * f64::from(e.planned_quantity),
                        material_plan: e.material_plan,
                        priority: e.priority,
                        planned_start: e.planned_start,
                        status: BatchStatus::Planning,
                        machine: None,
                        operator: None,
                        consumed: vec![],
                        wastage: vec![],
                        produced_quantity: 0,
                        quality_grade: None,
                        yield_percent: None,
                        wastage_percent: 0.0,
                        cancel_reason: None,
                        created_at: e.occurred_at,
                        started_at: None,
                        completed_at: None,
                    },
                );
            }
            BatchEvent::MachineStarted(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = BatchStatus::Machine;
                    rm.machine = Some(e.machine.clone());
                    rm.operator = e.operator.clone();
                    rm.consumed = e.consumed.clone();
                    rm.started_at = Some(e.occurred_at);
                    rm.refresh_wastage_percent();
                });
            }
            BatchEvent::WastageRecorded(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = BatchStatus::Wastage;
                    rm.wastage.extend(e.entries.iter().cloned());
                    rm.refresh_wastage_percent();
                });
            }
            BatchEvent::BatchCompleted(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = BatchStatus::Completed;
                    rm.produced_quantity = e.produced_quantity;
                    rm.quality_grade = Some(e.quality_grade);
                    rm.yield_percent = Some(e.yield_percent);
                    rm.wastage_percent = e.wastage_percent;
                    rm.completed_at = Some(e.occurred_at);
                });
            }
            BatchEvent::BatchCancelled(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = BatchStatus::Cancelled;
                    rm.cancel_reason = Some(e.reason.clone());
                    rm.completed_at = Some(e.occurred_at);
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use loomworks_inventory::RawMaterialId;
    use loomworks_production::{BatchPlanned, MachineStarted, WastageRecorded};
    use uuid::Uuid;

    use super::*;
    use crate::read_model::InMemoryTenantStore;

    fn envelope(t: TenantId, id: BatchId, seq: u64, ev: BatchEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(Uuid::now_v7(), t, id.0, AGGREGATE_TYPE, seq, serde_json::to_value(ev).unwrap())
    }

    #[test]
    fn tracks_stage_and_wastage() {
        let p = ProductionBatchesProjection::new(Arc::new(InMemoryTenantStore::new()));
        let t = TenantId::new();
        let id = BatchId::new(AggregateId::new());
        let wool = RawMaterialId::new(AggregateId::new());
        let plan = vec![MaterialRequirement { material_id: wool, quantity: 20.0 }];

        p.apply_envelope(&envelope(
            t,
            id,
            1,
            BatchEvent::BatchPlanned(BatchPlanned {
                tenant_id: t,
                batch_id: id,
                batch_number: "BATCH-20261019-ABC123".to_string(),
                product_id: ProductId::new(AggregateId::new()),
                order_id: None,
                planned_quantity: 4,
                sqm_per_unit: 2.5,
                material_plan: plan.clone(),
                priority: "normal".to_string(),
                planned_start: None,
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();
        assert_eq!(p.get(t, &id).unwrap().total_sqm, 10.0);

        p.apply_envelope(&envelope(
            t,
            id,
            2,
            BatchEvent::MachineStarted(MachineStarted {
                tenant_id: t,
                batch_id: id,
                batch_number: "BATCH-20261019-ABC123".to_string(),
                machine: "Loom 1".to_string(),
                operator: Some("Ravi".to_string()),
                consumed: plan,
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();
        p.apply_envelope(&envelope(
            t,
            id,
            3,
            BatchEvent::WastageRecorded(WastageRecorded {
                tenant_id: t,
                batch_id: id,
                entries: vec![WastageEntry {
                    material_id: wool,
                    quantity: 1.0,
                    reason: "Cutting Waste".to_string(),
                }],
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();

        let rm = p.get(t, &id).unwrap();
        assert_eq!(rm.status, BatchStatus::Wastage);
        assert_eq!(rm.machine.as_deref(), Some("Loom 1"));
        assert!((rm.wastage_percent - 5.0).abs() < 1e-9);
        assert_eq!(
            p.list(t, BatchFilter { status: Some(BatchStatus::Wastage), ..BatchFilter::default() }).len(),
            1
        );
    }
}
