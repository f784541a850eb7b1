//! Full pipeline: Command → EventStore → EventBus → Projection → ReadModel.
//!
//! Verifies:
//! - Commands produce events that update read models
//! - Rejected commands commit nothing
//! - Tenant isolation is preserved
//! - A replay reproduces the live read models

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value as JsonValue;

use loomworks_core::{AggregateId, TenantId};
use loomworks_events::{EventEnvelope, InMemoryEventBus};
use loomworks_inventory::{
    ConsumeStock, CreateMaterial, RawMaterial, RawMaterialCommand, RawMaterialId, ReceiveStock,
    StockStatus,
};
use loomworks_parties::{Party, PartyCommand, PartyId, PartyKind, RegisterParty};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::{EventStore, InMemoryEventStore};
use crate::projections::{NotificationKind, NotificationQuery, ProjectionSet, replay};
use crate::workers::{ProjectionWorker, WorkerHandle};

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

struct Harness {
    dispatcher: CommandDispatcher<Arc<InMemoryEventStore>, Bus>,
    store: Arc<InMemoryEventStore>,
    projections: Arc<ProjectionSet>,
    worker: Option<WorkerHandle>,
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(w) = self.worker.take() {
            w.shutdown();
        }
    }
}

fn setup() -> Harness {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let projections = Arc::new(ProjectionSet::new());

    // Subscribed before anything is published.
    let sink = projections.clone();
    let worker = ProjectionWorker::spawn("test-projections", bus.clone(), None, move |env| {
        sink.apply(&env).map(|_| ())
    })
    .unwrap();

    Harness {
        dispatcher: CommandDispatcher::new(store.clone(), bus),
        store,
        projections,
        worker: Some(worker),
    }
}

async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..50 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn create_material(h: &Harness, t: TenantId, name: &str, opening: f64) -> RawMaterialId {
    let id = RawMaterialId::new(AggregateId::new());
    h.dispatcher
        .dispatch(
            t,
            id.0,
            "inventory.material",
            RawMaterialCommand::CreateMaterial(CreateMaterial {
                tenant_id: t,
                material_id: id,
                name: name.to_string(),
                category: "Yarn".to_string(),
                unit: "kg".to_string(),
                supplier_id: None,
                cost_per_unit: 42_000,
                reorder_level: 20.0,
                opening_stock: opening,
                occurred_at: Utc::now(),
            }),
            |_, id| RawMaterial::empty(RawMaterialId::new(id)),
        )
        .await
        .unwrap();
    id
}

async fn consume(h: &Harness, t: TenantId, id: RawMaterialId, quantity: f64) -> Result<usize, DispatchError> {
    h.dispatcher
        .dispatch(
            t,
            id.0,
            "inventory.material",
            RawMaterialCommand::ConsumeStock(ConsumeStock {
                tenant_id: t,
                material_id: id,
                quantity,
                reference: Some("BATCH-TEST".to_string()),
                occurred_at: Utc::now(),
            }),
            |_, id| RawMaterial::empty(RawMaterialId::new(id)),
        )
        .await
        .map(|events| events.len())
}

#[tokio::test]
async fn stock_movements_reach_the_read_model() {
    let h = setup();
    let t = TenantId::new();
    let id = create_material(&h, t, "Acrylic Yarn", 10.0).await;

    let committed = h
        .dispatcher
        .dispatch(
            t,
            id.0,
            "inventory.material",
            RawMaterialCommand::ReceiveStock(ReceiveStock {
                tenant_id: t,
                material_id: id,
                quantity: 40.0,
                reference: Some("PO-1".to_string()),
                occurred_at: Utc::now(),
            }),
            |_, id| RawMaterial::empty(RawMaterialId::new(id)),
        )
        .await
        .unwrap();
    assert_eq!(committed[0].sequence_number, 2);

    assert!(eventually(|| h.projections.raw_materials.get(t, &id).is_some_and(|m| m.stock == 50.0)).await);
    assert_eq!(
        h.projections.raw_materials.get(t, &id).unwrap().stock_status,
        StockStatus::InStock
    );
}

#[tokio::test]
async fn dropping_below_reorder_level_raises_a_notification() {
    let h = setup();
    let t = TenantId::new();
    let id = create_material(&h, t, "Backing Cloth", 50.0).await;

    // StockConsumed + LowStockReached.
    assert_eq!(consume(&h, t, id, 35.0).await.unwrap(), 2);

    assert!(eventually(|| h.projections.notifications.unread_count(t) == 1).await);
    let feed = h.projections.notifications.list(t, NotificationQuery::default());
    assert_eq!(feed[0].kind, NotificationKind::LowStock);
    assert_eq!(feed[0].entity_id, id.0);
}

#[tokio::test]
async fn rejected_commands_commit_nothing() {
    let h = setup();
    let t = TenantId::new();
    let id = create_material(&h, t, "Latex", 5.0).await;

    let err = consume(&h, t, id, 6.0).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvariantViolation(_)));
    assert_eq!(h.store.load_stream(t, id.0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn load_sees_committed_state_without_the_read_model() {
    let h = setup();
    let t = TenantId::new();
    let id = create_material(&h, t, "Jute", 30.0).await;
    consume(&h, t, id, 12.5).await.unwrap();

    let material = h
        .dispatcher
        .load(t, id.0, |_, id| RawMaterial::empty(RawMaterialId::new(id)))
        .await
        .unwrap();
    assert!(material.is_created());
    assert_eq!(material.stock(), 17.5);

    let missing = h
        .dispatcher
        .load(t, AggregateId::new(), |_, id| RawMaterial::empty(RawMaterialId::new(id)))
        .await
        .unwrap();
    assert!(!missing.is_created());
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let h = setup();
    let t = TenantId::new();
    let id = PartyId::new(AggregateId::new());
    let register = || {
        PartyCommand::RegisterParty(RegisterParty {
            tenant_id: t,
            party_id: id,
            kind: PartyKind::Supplier,
            name: "Kashi Yarns".to_string(),
            contact: None,
            gstin: None,
            company_name: None,
            customer_type: None,
            occurred_at: Utc::now(),
        })
    };

    h.dispatcher
        .dispatch(t, id.0, "parties.party", register(), |_, id| Party::empty(PartyId::new(id)))
        .await
        .unwrap();
    let err = h
        .dispatcher
        .dispatch(t, id.0, "parties.party", register(), |_, id| Party::empty(PartyId::new(id)))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Conflict(_)));
}

#[tokio::test]
async fn tenants_are_isolated() {
    let h = setup();
    let a = TenantId::new();
    let b = TenantId::new();
    let id = create_material(&h, a, "Silk", 30.0).await;

    // Same aggregate id under another tenant is a separate, empty stream.
    let err = consume(&h, b, id, 1.0).await.unwrap_err();
    assert!(matches!(err, DispatchError::NotFound));

    assert!(eventually(|| h.projections.raw_materials.get(a, &id).is_some()).await);
    assert!(h.projections.raw_materials.get(b, &id).is_none());
    assert!(h.projections.raw_materials.list(b, None).is_empty());
}

#[tokio::test]
async fn replay_matches_live_read_models() {
    let h = setup();
    let t = TenantId::new();
    let id = create_material(&h, t, "Jute", 100.0).await;
    consume(&h, t, id, 30.0).await.unwrap();
    assert!(eventually(|| h.projections.raw_materials.get(t, &id).is_some_and(|m| m.stock == 70.0)).await);

    let rebuilt = ProjectionSet::new();
    let report = replay(&*h.store, &rebuilt).await.unwrap();
    assert_eq!(report.events, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(
        rebuilt.raw_materials.get(t, &id),
        h.projections.raw_materials.get(t, &id)
    );
}
