//! Demo tenant data, written as ordinary commands so the API rebuilds it into
//! read models on its next start.

use chrono::Utc;
use serde_json::Value as JsonValue;

use loomworks_core::{AggregateId, TenantId, document_number};
use loomworks_events::{EventEnvelope, InMemoryEventBus};
use loomworks_infra::{
    CommandDispatcher, DispatchError,
    event_store::EventStore,
    projections::{parties, purchase_orders, raw_materials},
};
use loomworks_inventory::{CreateMaterial, RawMaterial, RawMaterialCommand, RawMaterialId};
use loomworks_parties::{ContactInfo, Party, PartyCommand, PartyId, PartyKind, RegisterParty};
use loomworks_purchasing::{
    CreatePurchaseOrder, NewPurchaseLine, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId,
};
use loomworks_reporting::ist;

type Dispatcher<S> = CommandDispatcher<S, InMemoryEventBus<EventEnvelope<JsonValue>>>;

struct DemoSupplier {
    name: &'static str,
    city: &'static str,
    state: &'static str,
    gstin: &'static str,
}

struct DemoMaterial {
    name: &'static str,
    category: &'static str,
    unit: &'static str,
    /// Paise per unit.
    cost_per_unit: u64,
    reorder_level: f64,
    opening_stock: f64,
    /// Index into [`SUPPLIERS`].
    supplier: usize,
}

const SUPPLIERS: &[DemoSupplier] = &[
    DemoSupplier {
        name: "Bikaner Wool Traders",
        city: "Bikaner",
        state: "Rajasthan",
        gstin: "08AABCB1234F1Z5",
    },
    DemoSupplier {
        name: "Panipat Backing Mills",
        city: "Panipat",
        state: "Haryana",
        gstin: "06AACCP5678K1Z2",
    },
];

const MATERIALS: &[DemoMaterial] = &[
    DemoMaterial {
        name: "New Zealand Wool Yarn",
        category: "Wool",
        unit: "kg",
        cost_per_unit: 68_000,
        reorder_level: 50.0,
        opening_stock: 220.0,
        supplier: 0,
    },
    DemoMaterial {
        name: "Viscose Silk Yarn",
        category: "Silk",
        unit: "kg",
        cost_per_unit: 95_000,
        reorder_level: 20.0,
        opening_stock: 15.0,
        supplier: 0,
    },
    DemoMaterial {
        name: "Cotton Backing Cloth",
        category: "Backing Cloth",
        unit: "m",
        cost_per_unit: 14_500,
        reorder_level: 100.0,
        opening_stock: 340.0,
        supplier: 1,
    },
    DemoMaterial {
        name: "Natural Latex",
        category: "Latex",
        unit: "litre",
        cost_per_unit: 21_000,
        reorder_level: 40.0,
        opening_stock: 0.0,
        supplier: 1,
    },
];

#[derive(Debug)]
pub struct DemoSummary {
    pub suppliers: usize,
    pub materials: usize,
    pub po_number: String,
}

/// Registers the demo suppliers and materials, then drafts a purchase order
/// restocking every material that starts at or below its reorder level.
pub async fn seed<S: EventStore>(store: S, tenant_id: TenantId) -> Result<DemoSummary, DispatchError> {
    let dispatcher: Dispatcher<S> = CommandDispatcher::new(store, InMemoryEventBus::new());

    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for supplier in SUPPLIERS {
        let party_id = PartyId::new(AggregateId::new());
        dispatcher
            .dispatch(
                tenant_id,
                party_id.0,
                parties::AGGREGATE_TYPE,
                PartyCommand::RegisterParty(RegisterParty {
                    tenant_id,
                    party_id,
                    kind: PartyKind::Supplier,
                    name: supplier.name.to_string(),
                    contact: Some(ContactInfo {
                        city: Some(supplier.city.to_string()),
                        state: Some(supplier.state.to_string()),
                        ..ContactInfo::default()
                    }),
                    gstin: Some(supplier.gstin.to_string()),
                    company_name: Some(supplier.name.to_string()),
                    customer_type: None,
                    occurred_at: Utc::now(),
                }),
                |_, id| Party::empty(PartyId::new(id)),
            )
            .await?;
        supplier_ids.push(party_id);
    }

    let mut restock = Vec::new();
    for material in MATERIALS {
        let material_id = RawMaterialId::new(AggregateId::new());
        dispatcher
            .dispatch(
                tenant_id,
                material_id.0,
                raw_materials::AGGREGATE_TYPE,
                RawMaterialCommand::CreateMaterial(CreateMaterial {
                    tenant_id,
                    material_id,
                    name: material.name.to_string(),
                    category: material.category.to_string(),
                    unit: material.unit.to_string(),
                    supplier_id: supplier_ids.get(material.supplier).copied(),
                    cost_per_unit: material.cost_per_unit,
                    reorder_level: material.reorder_level,
                    opening_stock: material.opening_stock,
                    occurred_at: Utc::now(),
                }),
                |_, id| RawMaterial::empty(RawMaterialId::new(id)),
            )
            .await?;
        if material.opening_stock <= material.reorder_level {
            restock.push(NewPurchaseLine {
                material_id,
                quantity: material.reorder_level * 2.0,
                unit_cost: material.cost_per_unit,
            });
        }
    }

    let order_id = PurchaseOrderId::new(AggregateId::new());
    let po_number = document_number("PO", Utc::now().with_timezone(&ist()).date_naive(), &order_id.0);
    let supplier_id = supplier_ids
        .first()
        .copied()
        .ok_or_else(|| DispatchError::Validation("no demo supplier".to_string()))?;
    dispatcher
        .dispatch(
            tenant_id,
            order_id.0,
            purchase_orders::AGGREGATE_TYPE,
            PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                tenant_id,
                order_id,
                po_number: po_number.clone(),
                supplier_id,
                lines: restock,
                expected_delivery: None,
                notes: Some("Demo restock".to_string()),
                occurred_at: Utc::now(),
            }),
            |_, id| PurchaseOrder::empty(PurchaseOrderId::new(id)),
        )
        .await?;

    Ok(DemoSummary {
        suppliers: SUPPLIERS.len(),
        materials: MATERIALS.len(),
        po_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomworks_infra::event_store::InMemoryEventStore;
    use loomworks_purchasing::PurchaseOrderEvent;

    #[test]
    fn every_material_points_at_a_demo_supplier() {
        assert!(MATERIALS.iter().all(|m| m.supplier < SUPPLIERS.len()));
    }

    #[tokio::test]
    async fn seeds_a_draft_po_for_materials_below_reorder() {
        let store = std::sync::Arc::new(InMemoryEventStore::new());
        let tenant_id = TenantId::new();

        let summary = seed(store.clone(), tenant_id).await.unwrap();
        assert_eq!(summary.suppliers, 2);
        assert_eq!(summary.materials, 4);
        assert!(summary.po_number.starts_with("PO-"));

        let events = store.load_all().await.unwrap();
        let po_events: Vec<_> = events
            .iter()
            .filter(|e| e.aggregate_type == purchase_orders::AGGREGATE_TYPE)
            .collect();
        assert_eq!(po_events.len(), 1);
        let created: PurchaseOrderEvent = serde_json::from_value(po_events[0].payload.clone()).unwrap();
        match created {
            // Silk and latex start at or below their reorder level.
            PurchaseOrderEvent::PurchaseOrderCreated(e) => assert_eq!(e.lines.len(), 2),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
