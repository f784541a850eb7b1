//! Read-model builders.
//!
//! Projections consume committed envelopes (JSON payloads) and keep
//! query-optimized, tenant-partitioned views. They are:
//! - **Rebuildable**: reconstructed from `EventStore::load_all` at start-up
//! - **Tenant-isolated**: payload and envelope identity must agree
//! - **Idempotent**: per-stream cursors drop redelivered envelopes

mod cursor;
mod error;

pub mod batches;
pub mod individual_products;
pub mod notifications;
pub mod orders;
pub mod parties;
pub mod products;
pub mod purchase_orders;
pub mod raw_materials;
pub mod replay;

use std::sync::Arc;

use serde_json::Value as JsonValue;
use uuid::Uuid;

use loomworks_events::EventEnvelope;
use loomworks_inventory::RawMaterialId;
use loomworks_parties::PartyId;
use loomworks_production::BatchId;
use loomworks_products::{IndividualProductId, ProductId};
use loomworks_purchasing::PurchaseOrderId;
use loomworks_sales::OrderId;

use crate::read_model::InMemoryTenantStore;

pub use batches::{BatchFilter, BatchReadModel, ProductionBatchesProjection};
pub use cursor::StreamCursors;
pub use error::ProjectionError;
pub use individual_products::{IndividualProductsProjection, PieceFilter, PieceReadModel};
pub use notifications::{
    Notification, NotificationKind, NotificationQuery, NotificationsProjection, Severity,
};
pub use orders::{OrderFilter, OrderReadModel, OrdersProjection};
pub use parties::{PartyDirectoryProjection, PartyReadModel};
pub use products::{ProductCatalogProjection, ProductReadModel};
pub use purchase_orders::{PurchaseOrderReadModel, PurchaseOrdersProjection};
pub use raw_materials::{MaterialReadModel, RawMaterialsProjection};
pub use replay::{ReplayError, ReplayReport, replay};

type Store<K, V> = Arc<InMemoryTenantStore<K, V>>;

/// Every read model the service answers queries from.
pub struct ProjectionSet {
    pub parties: PartyDirectoryProjection<Store<PartyId, PartyReadModel>>,
    pub raw_materials: RawMaterialsProjection<Store<RawMaterialId, MaterialReadModel>>,
    pub products: ProductCatalogProjection<Store<ProductId, ProductReadModel>>,
    pub pieces: IndividualProductsProjection<Store<IndividualProductId, PieceReadModel>>,
    pub batches: ProductionBatchesProjection<Store<BatchId, BatchReadModel>>,
    pub orders: OrdersProjection<Store<OrderId, OrderReadModel>>,
    pub purchase_orders: PurchaseOrdersProjection<Store<PurchaseOrderId, PurchaseOrderReadModel>>,
    pub notifications: NotificationsProjection<Store<Uuid, Notification>>,
}

impl Default for ProjectionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionSet {
    pub fn new() -> Self {
        Self {
            parties: PartyDirectoryProjection::new(Arc::new(InMemoryTenantStore::new())),
            raw_materials: RawMaterialsProjection::new(Arc::new(InMemoryTenantStore::new())),
            products: ProductCatalogProjection::new(Arc::new(InMemoryTenantStore::new())),
            pieces: IndividualProductsProjection::new(Arc::new(InMemoryTenantStore::new())),
            batches: ProductionBatchesProjection::new(Arc::new(InMemoryTenantStore::new())),
            orders: OrdersProjection::new(Arc::new(InMemoryTenantStore::new())),
            purchase_orders: PurchaseOrdersProjection::new(Arc::new(InMemoryTenantStore::new())),
            notifications: NotificationsProjection::new(Arc::new(InMemoryTenantStore::new())),
        }
    }

    /// Routes one envelope to its aggregate's projection and to the
    /// notification feed. Returns the notification it raised, if any.
    pub fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<Option<Notification>, ProjectionError> {
        match envelope.aggregate_type() {
            parties::AGGREGATE_TYPE => self.parties.apply_envelope(envelope)?,
            raw_materials::AGGREGATE_TYPE => self.raw_materials.apply_envelope(envelope)?,
            products::AGGREGATE_TYPE => self.products.apply_envelope(envelope)?,
            individual_products::AGGREGATE_TYPE => self.pieces.apply_envelope(envelope)?,
            batches::AGGREGATE_TYPE => self.batches.apply_envelope(envelope)?,
            orders::AGGREGATE_TYPE => self.orders.apply_envelope(envelope)?,
            purchase_orders::AGGREGATE_TYPE => self.purchase_orders.apply_envelope(envelope)?,
            _ => {}
        }
        self.notifications.apply_envelope(envelope)
    }

    pub fn reset(&self) {
        self.parties.reset();
        self.raw_materials.reset();
        self.products.reset();
        self.pieces.reset();
        self.batches.reset();
        self.orders.reset();
        self.purchase_orders.reset();
        self.notifications.reset();
    }
}
