use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use loomworks_core::{AggregateId, TenantId};
use loomworks_events::EventEnvelope;
use loomworks_products::{
    Dimensions, IndividualProductEvent, IndividualProductId, PieceStatus, ProductId, QualityGrade,
    serial_from_scan,
};

use super::cursor::{StreamCursors, check_identity, decode};
use super::error::ProjectionError;
use crate::read_model::TenantStore;

pub const AGGREGATE_TYPE: &str = "products.piece";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieceReadModel {
    pub id: IndividualProductId,
    pub product_id: ProductId,
    pub batch_id: Option<AggregateId>,
    pub serial_number: String,
    pub qr_code: String,
    pub quality_grade: QualityGrade,
    pub actual_dimensions: Option<Dimensions>,
    pub status: PieceStatus,
    pub order_id: Option<AggregateId>,
    pub damage_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PieceFilter {
    pub product_id: Option<ProductId>,
    pub status: Option<PieceStatus>,
    pub batch_id: Option<AggregateId>,
    pub order_id: Option<AggregateId>,
}

impl PieceFilter {
    fn accepts(&self, p: &PieceReadModel) -> bool {
        self.product_id.is_none_or(|id| p.product_id == id)
            && self.status.is_none_or(|s| p.status == s)
            && self.batch_id.is_none_or(|id| p.batch_id == Some(id))
            && self.order_id.is_none_or(|id| p.order_id == Some(id))
    }
}

/// Tagged pieces, searchable by serial.
#[derive(Debug)]
pub struct IndividualProductsProjection<S>
where
    S: TenantStore<IndividualProductId, PieceReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> IndividualProductsProjection<S>
where
    S: TenantStore<IndividualProductId, PieceReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, id: &IndividualProductId) -> Option<PieceReadModel> {
        self.store.get(tenant_id, id)
    }

    /// Accepts either a bare serial or a scanned QR payload.
    pub fn find_by_serial(&self, tenant_id: TenantId, scanned: &str) -> Option<PieceReadModel> {
        let serial = serial_from_scan(scanned).to_ascii_uppercase();
        self.store
            .list(tenant_id)
            .into_iter()
            .find(|p| p.serial_number == serial)
    }

    /// Sorted by serial number.
    pub fn list(&self, tenant_id: TenantId, filter: PieceFilter) -> Vec<PieceReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|p| filter.accepts(p))
            .collect();
        rows.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
        rows
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let event: IndividualProductEvent = decode(AGGREGATE_TYPE, envelope)?;
        let (tenant_id, id) = match &event {
            IndividualProductEvent::PieceRegistered(e) => (e.tenant_id, e.piece_id),
            IndividualProductEvent::PieceReserved(e) => (e.tenant_id, e.piece_id),
            IndividualProductEvent::PieceReleased(e) => (e.tenant_id, e.piece_id),
            IndividualProductEvent::PieceSold(e) => (e.tenant_id, e.piece_id),
            IndividualProductEvent::PieceDamaged(e) => (e.tenant_id, e.piece_id),
        };
        check_identity(envelope, tenant_id, id.0)?;

        match event {
            IndividualProductEvent::PieceRegistered(e) => {
                self.store.upsert(
                    tenant_id,
                    id,
                    PieceReadModel {
                        id,
                        product_id: e.product_id,
                        batch_id: e.batch_id,
                        serial_number: e.serial_number,
                        qr_code: e.qr_code,
                        quality_grade: e.quality_grade,
                        actual_dimensions: e.actual_dimensions,
                        status: PieceStatus::Available,
                        order_id: None,
                        damage_reason: None,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            IndividualProductEvent::PieceReserved(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = PieceStatus::Reserved;
                    rm.order_id = Some(e.order_id);
                    rm.updated_at = e.occurred_at;
                });
            }
            IndividualProductEvent::PieceReleased(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = PieceStatus::Available;
                    rm.order_id = None;
                    rm.updated_at = e.occurred_at;
                });
            }
            IndividualProductEvent::PieceSold(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = PieceStatus::Sold;
                    rm.order_id = Some(e.order_id);
                    rm.updated_at = e.occurred_at;
                });
            }
            IndividualProductEvent::PieceDamaged(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = PieceStatus::Damaged;
                    rm.damage_reason = Some(e.reason.clone());
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
