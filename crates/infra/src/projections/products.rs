use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use loomworks_core::TenantId;
use loomworks_events::EventEnvelope;
use loomworks_products::{Dimensions, ProductEvent, ProductId, ProductStatus, Recipe};

use super::cursor::{StreamCursors, check_identity, decode};
use super::error::ProjectionError;
use crate::read_model::TenantStore;

pub const AGGREGATE_TYPE: &str = "products.product";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReadModel {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub color: Option<String>,
    pub pattern: Option<String>,
    pub dimensions: Dimensions,
    pub sqm_per_unit: f64,
    /// Paise, GST-inclusive.
    pub selling_price: u64,
    pub gst_rate: f64,
    pub description: Option<String>,
    pub recipe: Recipe,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product catalogue.
#[derive(Debug)]
pub struct ProductCatalogProjection<S>
where
    S: TenantStore<ProductId, ProductReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> ProductCatalogProjection<S>
where
    S: TenantStore<ProductId, ProductReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, id: &ProductId) -> Option<ProductReadModel> {
        self.store.get(tenant_id, id)
    }

    /// SKUs are stored upper-case; the lookup normalizes its input the same way.
    pub fn find_by_sku(&self, tenant_id: TenantId, sku: &str) -> Option<ProductReadModel> {
        let wanted = sku.trim().to_ascii_uppercase();
        self.store.list(tenant_id).into_iter().find(|p| p.sku == wanted)
    }

    pub fn list(&self, tenant_id: TenantId, include_archived: bool) -> Vec<ProductReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|p| include_archived || p.status == ProductStatus::Active)
            .collect();
        rows.sort_by(|a, b| a.sku.cmp(&b.sku));
        rows
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let event: ProductEvent = decode(AGGREGATE_TYPE, envelope)?;
        let (tenant_id, id) = match &event {
            ProductEvent::ProductCreated(e) => (e.tenant_id, e.product_id),
            ProductEvent::ProductUpdated(e) => (e.tenant_id, e.product_id),
            ProductEvent::RecipeSet(e) => (e.tenant_id, e.product_id),
            ProductEvent::ProductArchived(e) => (e.tenant_id, e.product_id),
        };
        check_identity(envelope, tenant_id, id.0)?;

        match event {
            ProductEvent::ProductCreated(e) => {
                self.store.upsert(
                    tenant_id,
                    id,
                    ProductReadModel {
                        id,
                        sku: e.sku,
                        name: e.name,
                        category: e.category,
                        color: e.color,
                        pattern: e.pattern,
                        sqm_per_unit: e.dimensions.sqm(),
                        dimensions: e.dimensions,
                        selling_price: e.selling_price,
                        gst_rate: e.gst_rate,
                        description: e.description,
                        recipe: e.recipe,
                        status: ProductStatus::Active,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            ProductEvent::ProductUpdated(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.name = e.name.clone();
                    rm.category = e.category.clone();
                    rm.color = e.color.clone();
                    rm.pattern = e.pattern.clone();
                    rm.dimensions = e.dimensions;
                    rm.sqm_per_unit = e.dimensions.sqm();
                    rm.selling_price = e.selling_price;
                    rm.gst_rate = e.gst_rate;
                    rm.description = e.description.clone();
                    rm.updated_at = e.occurred_at;
                });
            }
            ProductEvent::RecipeSet(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.recipe = e.recipe.clone();
                    rm.updated_at = e.occurred_at;
                });
            }
            ProductEvent::ProductArchived(e) => {
                self.store.update(tenant_id, &id, &mut |rm| {
                    rm.status = ProductStatus::Archived;
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use loomworks_core::AggregateId;
    use loomworks_pricing::LengthUnit;
    use loomworks_products::{ProductArchived, ProductCreated};
    use uuid::Uuid;

    use super::*;
    use crate::read_model::InMemoryTenantStore;

    fn envelope(t: TenantId, id: ProductId, seq: u64, ev: ProductEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(Uuid::now_v7(), t, id.0, AGGREGATE_TYPE, seq, serde_json::to_value(ev).unwrap())
    }

    fn created(t: TenantId, id: ProductId, sku: &str) -> ProductEvent {
        ProductEvent::ProductCreated(ProductCreated {
            tenant_id: t,
            product_id: id,
            sku: sku.to_string(),
            name: "Persian Medallion".to_string(),
            category: "Hand Tufted".to_string(),
            color: Some("Maroon".to_string()),
            pattern: Some("Persian".to_string()),
            dimensions: Dimensions {
                length: 200.0,
                width: 300.0,
                unit: LengthUnit::Cm,
            },
            selling_price: 1_800_000,
            gst_rate: 12.0,
            description: None,
            recipe: Recipe::default(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn archived_products_drop_out_of_default_listing() {
        let p = ProductCatalogProjection::new(Arc::new(InMemoryTenantStore::new()));
        let t = TenantId::new();
        let id = ProductId::new(AggregateId::new());

        p.apply_envelope(&envelope(t, id, 1, created(t, id, "PM-200X300"))).unwrap();
        assert!((p.get(t, &id).unwrap().sqm_per_unit - 6.0).abs() < 1e-9);
        assert!(p.find_by_sku(t, " pm-200x300 ").is_some());

        p.apply_envelope(&envelope(
            t,
            id,
            2,
            ProductEvent::ProductArchived(ProductArchived {
                tenant_id: t,
                product_id: id,
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();

        assert!(p.list(t, false).is_empty());
        assert_eq!(p.list(t, true).len(), 1);
    }
}
