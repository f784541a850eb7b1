//! Operations that touch more than one aggregate.
//!
//! Each step is its own command against its own stream. Inputs are read
//! with [`AppServices::load`] so a decision never rests on a read model
//! that has not caught up yet.

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use loomworks_core::{AggregateId, DomainError, TenantId, document_number, document_suffix};
use loomworks_infra::{
    command_dispatcher::DispatchError,
    event_store::StoredEvent,
    projections::{
        PieceFilter, batches, individual_products, orders, purchase_orders, raw_materials,
    },
};
use loomworks_inventory::{ConsumeStock, RawMaterial, RawMaterialCommand, RawMaterialId, ReceiveStock};
use loomworks_parties::{Party, PartyId, PartyKind};
use loomworks_production::{
    BatchCommand, BatchId, BatchStatus, CompleteBatch, PlanBatch, ProductionBatch, StartMachine,
};
use loomworks_products::{
    IndividualProduct, IndividualProductCommand, IndividualProductId, PieceStatus, Product,
    ProductId, QualityGrade, RegisterPiece, ReleasePiece, ReservePiece, SellPiece,
};
use loomworks_purchasing::{
    AddLine as AddPurchaseLine, CreatePurchaseOrder, NewPurchaseLine, PurchaseOrder,
    PurchaseOrderCommand, PurchaseOrderId, ReceiveGoods,
};
use loomworks_reporting::ist;
use loomworks_sales::{
    AddLine as AddOrderLine, CancelOrder, ChangeStatus, CreateOrder, NewOrderLine, Order,
    OrderCommand, OrderId, OrderStatus,
};

use crate::app::dto::{
    CreateOrderRequest, CreatePurchaseOrderRequest, OrderLineRequest, PlanBatchRequest,
    PurchaseLineRequest,
};
use crate::app::services::AppServices;

type Events = Vec<StoredEvent>;

/// Document numbers carry the business-day date in IST.
fn today() -> NaiveDate {
    Utc::now().with_timezone(&ist()).date_naive()
}

/// Serial for the `index`-th piece (1-based) of a batch:
/// `{SKU}-{batch suffix}-{index:03}`.
pub fn piece_serial(sku: &str, batch_number: &str, index: u32) -> String {
    format!(
        "{}-{}-{index:03}",
        sku.replace('_', "-"),
        document_suffix(batch_number).to_ascii_uppercase()
    )
}

// -------------------------
// Loaders
// -------------------------

async fn load_party(services: &AppServices, t: TenantId, id: PartyId) -> Result<Party, DispatchError> {
    services.load(t, id.0, |_, id| Party::empty(PartyId::new(id))).await
}

async fn load_product(services: &AppServices, t: TenantId, id: ProductId) -> Result<Product, DispatchError> {
    services.load(t, id.0, |_, id| Product::empty(ProductId::new(id))).await
}

async fn load_material(
    services: &AppServices,
    t: TenantId,
    id: RawMaterialId,
) -> Result<RawMaterial, DispatchError> {
    services.load(t, id.0, |_, id| RawMaterial::empty(RawMaterialId::new(id))).await
}

async fn load_batch(services: &AppServices, t: TenantId, id: BatchId) -> Result<ProductionBatch, DispatchError> {
    let batch = services
        .load(t, id.0, |_, id| ProductionBatch::empty(BatchId::new(id)))
        .await?;
    if batch.tenant_id().is_none() {
        return Err(DispatchError::NotFound);
    }
    Ok(batch)
}

/// Party referenced from a document: must exist with the right role and
/// still be allowed to trade.
async fn trading_party(
    services: &AppServices,
    t: TenantId,
    id: PartyId,
    kind: PartyKind,
) -> Result<Party, DispatchError> {
    let party = load_party(services, t, id).await?;
    if !party.is_created() {
        return Err(DomainError::validation(format!("unknown {} {id}", kind.as_str())).into());
    }
    if party.kind() != kind {
        return Err(DomainError::validation(format!("{} is not a {}", party.name(), kind.as_str())).into());
    }
    if !party.can_transact() {
        return Err(DomainError::invariant(format!("{} {} is suspended", kind.as_str(), party.name())).into());
    }
    Ok(party)
}

async fn sellable_product(services: &AppServices, t: TenantId, id: ProductId) -> Result<Product, DispatchError> {
    let product = load_product(services, t, id).await?;
    if !product.is_created() {
        return Err(DomainError::validation(format!("unknown product {id}")).into());
    }
    if !product.can_be_sold() {
        return Err(DomainError::invariant(format!("product {} is archived", product.sku())).into());
    }
    Ok(product)
}

// -------------------------
// Sales orders
// -------------------------

async fn resolve_order_line(
    services: &AppServices,
    t: TenantId,
    line: &OrderLineRequest,
) -> Result<NewOrderLine, DispatchError> {
    let product = sellable_product(services, t, line.product_id).await?;
    Ok(NewOrderLine {
        product_id: line.product_id,
        quantity: line.quantity,
        unit_price: line.unit_price.unwrap_or(product.selling_price()),
        gst_rate: line.gst_rate.unwrap_or(product.gst_rate()),
    })
}

pub async fn create_order(
    services: &AppServices,
    tenant_id: TenantId,
    req: CreateOrderRequest,
) -> Result<(OrderId, Events), DispatchError> {
    trading_party(services, tenant_id, req.customer_id, PartyKind::Customer).await?;

    let mut lines = Vec::with_capacity(req.lines.len());
    for line in &req.lines {
        lines.push(resolve_order_line(services, tenant_id, line).await?);
    }

    let order_id = OrderId::new(AggregateId::new());
    let events = services
        .dispatch(
            tenant_id,
            order_id.0,
            orders::AGGREGATE_TYPE,
            OrderCommand::CreateOrder(CreateOrder {
                tenant_id,
                order_id,
                order_number: document_number("ORD", today(), &order_id.0),
                customer_id: req.customer_id,
                lines,
                expected_delivery: req.expected_delivery,
                notes: req.notes,
                occurred_at: Utc::now(),
            }),
            |_, id| Order::empty(OrderId::new(id)),
        )
        .await?;
    Ok((order_id, events))
}

pub async fn add_order_line(
    services: &AppServices,
    tenant_id: TenantId,
    order_id: OrderId,
    line: &OrderLineRequest,
) -> Result<Events, DispatchError> {
    let line = resolve_order_line(services, tenant_id, line).await?;
    services
        .dispatch(
            tenant_id,
            order_id.0,
            orders::AGGREGATE_TYPE,
            OrderCommand::AddLine(AddOrderLine {
                tenant_id,
                order_id,
                line,
                occurred_at: Utc::now(),
            }),
            |_, id| Order::empty(OrderId::new(id)),
        )
        .await
}

/// Status change plus piece bookkeeping: dispatching an order sells the
/// pieces reserved for it.
pub async fn change_order_status(
    services: &AppServices,
    tenant_id: TenantId,
    order_id: OrderId,
    status: OrderStatus,
) -> Result<Events, DispatchError> {
    let events = services
        .dispatch(
            tenant_id,
            order_id.0,
            orders::AGGREGATE_TYPE,
            OrderCommand::ChangeStatus(ChangeStatus {
                tenant_id,
                order_id,
                status,
                occurred_at: Utc::now(),
            }),
            |_, id| Order::empty(OrderId::new(id)),
        )
        .await?;

    if status == OrderStatus::Dispatched {
        for piece_id in reserved_pieces(services, tenant_id, order_id) {
            services
                .dispatch(
                    tenant_id,
                    piece_id.0,
                    individual_products::AGGREGATE_TYPE,
                    IndividualProductCommand::SellPiece(SellPiece {
                        tenant_id,
                        piece_id,
                        order_id: order_id.0,
                        occurred_at: Utc::now(),
                    }),
                    |_, id| IndividualProduct::empty(IndividualProductId::new(id)),
                )
                .await?;
        }
    }
    Ok(events)
}

/// Cancels the order and returns its reserved pieces to stock.
pub async fn cancel_order(
    services: &AppServices,
    tenant_id: TenantId,
    order_id: OrderId,
    reason: String,
) -> Result<Events, DispatchError> {
    let events = services
        .dispatch(
            tenant_id,
            order_id.0,
            orders::AGGREGATE_TYPE,
            OrderCommand::CancelOrder(CancelOrder {
                tenant_id,
                order_id,
                reason,
                occurred_at: Utc::now(),
            }),
            |_, id| Order::empty(OrderId::new(id)),
        )
        .await?;

    for piece_id in reserved_pieces(services, tenant_id, order_id) {
        services
            .dispatch(
                tenant_id,
                piece_id.0,
                individual_products::AGGREGATE_TYPE,
                IndividualProductCommand::ReleasePiece(ReleasePiece {
                    tenant_id,
                    piece_id,
                    occurred_at: Utc::now(),
                }),
                |_, id| IndividualProduct::empty(IndividualProductId::new(id)),
            )
            .await?;
    }
    Ok(events)
}

/// Pieces are reserved when their batch completes, long before the order
/// moves on, so the read model is current enough here.
fn reserved_pieces(services: &AppServices, tenant_id: TenantId, order_id: OrderId) -> Vec<IndividualProductId> {
    services
        .projections()
        .pieces
        .list(
            tenant_id,
            PieceFilter {
                order_id: Some(order_id.0),
                status: Some(PieceStatus::Reserved),
                ..PieceFilter::default()
            },
        )
        .into_iter()
        .map(|p| p.id)
        .collect()
}

// -------------------------
// Purchase orders
// -------------------------

async fn resolve_purchase_line(
    services: &AppServices,
    t: TenantId,
    line: &PurchaseLineRequest,
) -> Result<NewPurchaseLine, DispatchError> {
    let material = load_material(services, t, line.material_id).await?;
    if !material.is_created() {
        return Err(DomainError::validation(format!("unknown raw material {}", line.material_id)).into());
    }
    Ok(NewPurchaseLine {
        material_id: line.material_id,
        quantity: line.quantity,
        unit_cost: line.unit_cost.unwrap_or(material.cost_per_unit()),
    })
}

/// Creates the order with all of its lines in one append.
pub async fn create_purchase_order(
    services: &AppServices,
    tenant_id: TenantId,
    req: CreatePurchaseOrderRequest,
) -> Result<(PurchaseOrderId, Events), DispatchError> {
    trading_party(services, tenant_id, req.supplier_id, PartyKind::Supplier).await?;

    let mut lines = Vec::with_capacity(req.lines.len());
    for line in &req.lines {
        lines.push(resolve_purchase_line(services, tenant_id, line).await?);
    }

    let order_id = PurchaseOrderId::new(AggregateId::new());
    let events = services
        .dispatch(
            tenant_id,
            order_id.0,
            purchase_orders::AGGREGATE_TYPE,
            PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                tenant_id,
                order_id,
                po_number: document_number("PO", today(), &order_id.0),
                supplier_id: req.supplier_id,
                lines,
                expected_delivery: req.expected_delivery,
                notes: req.notes,
                occurred_at: Utc::now(),
            }),
            |_, id| PurchaseOrder::empty(PurchaseOrderId::new(id)),
        )
        .await?;
    Ok((order_id, events))
}

pub async fn add_purchase_line(
    services: &AppServices,
    tenant_id: TenantId,
    order_id: PurchaseOrderId,
    line: &PurchaseLineRequest,
) -> Result<Events, DispatchError> {
    let line = resolve_purchase_line(services, tenant_id, line).await?;
    services
        .dispatch(
            tenant_id,
            order_id.0,
            purchase_orders::AGGREGATE_TYPE,
            PurchaseOrderCommand::AddLine(AddPurchaseLine {
                tenant_id,
                order_id,
                material_id: line.material_id,
                quantity: line.quantity,
                unit_cost: line.unit_cost,
                occurred_at: Utc::now(),
            }),
            |_, id| PurchaseOrder::empty(PurchaseOrderId::new(id)),
        )
        .await
}

/// Marks the order received, then books every line into stock with the PO
/// number as the movement reference.
pub async fn receive_purchase_order(
    services: &AppServices,
    tenant_id: TenantId,
    order_id: PurchaseOrderId,
) -> Result<Events, DispatchError> {
    let po = services
        .load(tenant_id, order_id.0, |_, id| PurchaseOrder::empty(PurchaseOrderId::new(id)))
        .await?;
    if po.tenant_id().is_none() {
        return Err(DispatchError::NotFound);
    }

    let mut events = services
        .dispatch(
            tenant_id,
            order_id.0,
            purchase_orders::AGGREGATE_TYPE,
            PurchaseOrderCommand::ReceiveGoods(ReceiveGoods {
                tenant_id,
                order_id,
                occurred_at: Utc::now(),
            }),
            |_, id| PurchaseOrder::empty(PurchaseOrderId::new(id)),
        )
        .await?;

    for line in po.lines() {
        let received = receive_stock(services, tenant_id, line.material_id, line.quantity, po.po_number().to_string())
            .await
            .inspect_err(|e| {
                error!(po = po.po_number(), material = %line.material_id, error = %e, "stock booking failed after receipt");
            })?;
        events.extend(received);
    }
    info!(po = po.po_number(), lines = po.lines().len(), "purchase order received into stock");
    Ok(events)
}

async fn receive_stock(
    services: &AppServices,
    tenant_id: TenantId,
    material_id: RawMaterialId,
    quantity: f64,
    reference: String,
) -> Result<Events, DispatchError> {
    services
        .dispatch(
            tenant_id,
            material_id.0,
            raw_materials::AGGREGATE_TYPE,
            RawMaterialCommand::ReceiveStock(ReceiveStock {
                tenant_id,
                material_id,
                quantity,
                reference: Some(reference),
                occurred_at: Utc::now(),
            }),
            |_, id| RawMaterial::empty(RawMaterialId::new(id)),
        )
        .await
}

// -------------------------
// Production
// -------------------------

/// Plans a batch with its material plan taken from the product recipe.
pub async fn plan_batch(
    services: &AppServices,
    tenant_id: TenantId,
    order_id: Option<OrderId>,
    req: PlanBatchRequest,
) -> Result<(BatchId, Events), DispatchError> {
    let product = sellable_product(services, tenant_id, req.product_id).await?;
    if product.recipe().is_empty() {
        return Err(DomainError::invariant(format!("product {} has no recipe", product.sku())).into());
    }

    if let Some(order_id) = order_id {
        let order = services
            .load(tenant_id, order_id.0, |_, id| Order::empty(OrderId::new(id)))
            .await?;
        if order.tenant_id().is_none() {
            return Err(DomainError::validation(format!("unknown order {}", order_id.0)).into());
        }
        if order.status() == OrderStatus::Cancelled {
            return Err(DomainError::invariant(format!("order {} is cancelled", order.order_number())).into());
        }
    }

    let total_sqm = f64::from(req.planned_quantity) * product.sqm_per_unit();
    let batch_id = BatchId::new(AggregateId::new());
    let events = services
        .dispatch(
            tenant_id,
            batch_id.0,
            batches::AGGREGATE_TYPE,
            BatchCommand::PlanBatch(PlanBatch {
                tenant_id,
                batch_id,
                batch_number: document_number("BATCH", today(), &batch_id.0),
                product_id: req.product_id,
                order_id: order_id.map(|o| o.0),
                planned_quantity: req.planned_quantity,
                sqm_per_unit: product.sqm_per_unit(),
                material_plan: product.recipe().requirements(total_sqm),
                priority: req.priority.unwrap_or_else(|| "normal".to_string()),
                planned_start: req.planned_start,
                occurred_at: Utc::now(),
            }),
            |_, id| ProductionBatch::empty(BatchId::new(id)),
        )
        .await?;
    Ok((batch_id, events))
}

/// Moves a planned batch onto a loom. The whole material plan is drawn
/// from stock first; a later failure puts back what was already drawn.
pub async fn start_batch(
    services: &AppServices,
    tenant_id: TenantId,
    batch_id: BatchId,
    machine: String,
    operator: Option<String>,
) -> Result<Events, DispatchError> {
    let batch = load_batch(services, tenant_id, batch_id).await?;
    if batch.status() != BatchStatus::Planning {
        return Err(DomainError::invariant(format!(
            "batch {} is in {} stage",
            batch.batch_number(),
            batch.status().as_str()
        ))
        .into());
    }

    let mut shortages = Vec::new();
    for need in batch.material_plan() {
        let material = load_material(services, tenant_id, need.material_id).await?;
        if !material.is_created() {
            return Err(DomainError::validation(format!("unknown raw material {}", need.material_id)).into());
        }
        if material.stock() < need.quantity {
            shortages.push(format!(
                "{} (need {:.3} {}, have {:.3})",
                material.name(),
                need.quantity,
                material.unit(),
                material.stock()
            ));
        }
    }
    if !shortages.is_empty() {
        return Err(DomainError::invariant(format!("insufficient stock: {}", shortages.join(", "))).into());
    }

    let reference = batch.batch_number().to_string();
    let mut events = Vec::new();
    let mut drawn: Vec<(RawMaterialId, f64)> = Vec::new();
    for need in batch.material_plan() {
        let consumed = services
            .dispatch(
                tenant_id,
                need.material_id.0,
                raw_materials::AGGREGATE_TYPE,
                RawMaterialCommand::ConsumeStock(ConsumeStock {
                    tenant_id,
                    material_id: need.material_id,
                    quantity: need.quantity,
                    reference: Some(reference.clone()),
                    occurred_at: Utc::now(),
                }),
                |_, id| RawMaterial::empty(RawMaterialId::new(id)),
            )
            .await;
        match consumed {
            Ok(e) => {
                events.extend(e);
                drawn.push((need.material_id, need.quantity));
            }
            Err(e) => {
                put_back(services, tenant_id, &reference, &drawn).await;
                return Err(e);
            }
        }
    }

    let started = services
        .dispatch(
            tenant_id,
            batch_id.0,
            batches::AGGREGATE_TYPE,
            BatchCommand::StartMachine(StartMachine {
                tenant_id,
                batch_id,
                machine,
                operator,
                occurred_at: Utc::now(),
            }),
            |_, id| ProductionBatch::empty(BatchId::new(id)),
        )
        .await;
    match started {
        Ok(e) => {
            events.extend(e);
            Ok(events)
        }
        Err(e) => {
            put_back(services, tenant_id, &reference, &drawn).await;
            Err(e)
        }
    }
}

async fn put_back(services: &AppServices, tenant_id: TenantId, batch_number: &str, drawn: &[(RawMaterialId, f64)]) {
    if drawn.is_empty() {
        return;
    }
    warn!(batch = batch_number, materials = drawn.len(), "returning drawn stock");
    let reference = format!("{batch_number} reversal");
    for (material_id, quantity) in drawn {
        if let Err(e) = receive_stock(services, tenant_id, *material_id, *quantity, reference.clone()).await {
            error!(batch = batch_number, material = %material_id, quantity, error = %e, "stock reversal failed");
        }
    }
}

/// Completes the batch and registers one tagged piece per produced unit.
/// Pieces of a batch made for an order are reserved for it.
pub async fn complete_batch(
    services: &AppServices,
    tenant_id: TenantId,
    batch_id: BatchId,
    produced_quantity: u32,
    quality_grade: QualityGrade,
) -> Result<(Events, Vec<IndividualProductId>), DispatchError> {
    let batch = load_batch(services, tenant_id, batch_id).await?;
    let product_id = batch.product_id().ok_or(DispatchError::NotFound)?;

    let mut events = services
        .dispatch(
            tenant_id,
            batch_id.0,
            batches::AGGREGATE_TYPE,
            BatchCommand::CompleteBatch(CompleteBatch {
                tenant_id,
                batch_id,
                produced_quantity,
                quality_grade,
                occurred_at: Utc::now(),
            }),
            |_, id| ProductionBatch::empty(BatchId::new(id)),
        )
        .await?;

    let product = load_product(services, tenant_id, product_id).await?;
    let mut pieces = Vec::with_capacity(produced_quantity as usize);
    for index in 1..=produced_quantity {
        let piece_id = IndividualProductId::new(AggregateId::new());
        events.extend(
            services
                .dispatch(
                    tenant_id,
                    piece_id.0,
                    individual_products::AGGREGATE_TYPE,
                    IndividualProductCommand::RegisterPiece(RegisterPiece {
                        tenant_id,
                        piece_id,
                        product_id,
                        batch_id: Some(batch_id.0),
                        serial_number: piece_serial(product.sku(), batch.batch_number(), index),
                        quality_grade,
                        actual_dimensions: None,
                        occurred_at: Utc::now(),
                    }),
                    |_, id| IndividualProduct::empty(IndividualProductId::new(id)),
                )
                .await?,
        );

        if let Some(order_id) = batch.order_id() {
            events.extend(
                services
                    .dispatch(
                        tenant_id,
                        piece_id.0,
                        individual_products::AGGREGATE_TYPE,
                        IndividualProductCommand::ReservePiece(ReservePiece {
                            tenant_id,
                            piece_id,
                            order_id,
                            occurred_at: Utc::now(),
                        }),
                        |_, id| IndividualProduct::empty(IndividualProductId::new(id)),
                    )
                    .await?,
            );
        }
        pieces.push(piece_id);
    }

    info!(batch = batch.batch_number(), pieces = pieces.len(), "batch completed");
    Ok((events, pieces))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use loomworks_core::ExpectedVersion;
    use loomworks_infra::dropdowns::InMemoryDropdownStore;
    use loomworks_infra::event_store::{EventStore, EventStoreError, InMemoryEventStore, UncommittedEvent};
    use loomworks_inventory::CreateMaterial;
    use loomworks_products::MaterialRequirement;

    use super::*;
    use crate::app::services::assemble;

    /// In-memory store whose batch appends can be switched off.
    struct BatchOutageStore {
        inner: InMemoryEventStore,
        reject_batches: AtomicBool,
    }

    #[async_trait]
    impl EventStore for BatchOutageStore {
        async fn append(
            &self,
            events: Vec<UncommittedEvent>,
            expected_version: ExpectedVersion,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            let batch_append = events.iter().any(|e| e.aggregate_type == batches::AGGREGATE_TYPE);
            if batch_append && self.reject_batches.load(Ordering::SeqCst) {
                return Err(EventStoreError::Backend("batch stream unavailable".to_string()));
            }
            self.inner.append(events, expected_version).await
        }

        async fn load_stream(
            &self,
            tenant_id: TenantId,
            aggregate_id: AggregateId,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_stream(tenant_id, aggregate_id).await
        }

        async fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_all().await
        }
    }

    #[tokio::test]
    async fn failed_machine_start_returns_drawn_stock() {
        let store = Arc::new(BatchOutageStore {
            inner: InMemoryEventStore::new(),
            reject_batches: AtomicBool::new(false),
        });
        let services = assemble(store.clone(), Arc::new(InMemoryDropdownStore::new()), 12.0)
            .await
            .unwrap();
        let tenant_id = TenantId::new();

        let wool = RawMaterialId::new(AggregateId::new());
        services
            .dispatch(
                tenant_id,
                wool.0,
                raw_materials::AGGREGATE_TYPE,
                RawMaterialCommand::CreateMaterial(CreateMaterial {
                    tenant_id,
                    material_id: wool,
                    name: "Wool".to_string(),
                    category: "Yarn".to_string(),
                    unit: "kg".to_string(),
                    supplier_id: None,
                    cost_per_unit: 42_000,
                    reorder_level: 2.0,
                    opening_stock: 10.0,
                    occurred_at: Utc::now(),
                }),
                |_, id| RawMaterial::empty(RawMaterialId::new(id)),
            )
            .await
            .unwrap();

        let batch_id = BatchId::new(AggregateId::new());
        services
            .dispatch(
                tenant_id,
                batch_id.0,
                batches::AGGREGATE_TYPE,
                BatchCommand::PlanBatch(PlanBatch {
                    tenant_id,
                    batch_id,
                    batch_number: "BATCH-20261019-abc123".to_string(),
                    product_id: ProductId::new(AggregateId::new()),
                    order_id: None,
                    planned_quantity: 1,
                    sqm_per_unit: 3.0,
                    material_plan: vec![MaterialRequirement { material_id: wool, quantity: 4.5 }],
                    priority: "normal".to_string(),
                    planned_start: None,
                    occurred_at: Utc::now(),
                }),
                |_, id| ProductionBatch::empty(BatchId::new(id)),
            )
            .await
            .unwrap();

        // Stock check passes, wool is drawn, then the batch append fails.
        store.reject_batches.store(true, Ordering::SeqCst);
        let result = start_batch(&services, tenant_id, batch_id, "Loom 1".to_string(), None).await;
        assert!(result.is_err());

        let material = load_material(&services, tenant_id, wool).await.unwrap();
        assert_eq!(material.stock(), 10.0);
        // Created, consumed, then received back.
        assert_eq!(store.inner.load_stream(tenant_id, wool.0).await.unwrap().len(), 3);

        let batch = load_batch(&services, tenant_id, batch_id).await.unwrap();
        assert_eq!(batch.status(), BatchStatus::Planning);
    }

    #[test]
    fn piece_serial_uses_sku_and_batch_suffix() {
        assert_eq!(
            piece_serial("CRP_PERSIAN_5X8", "BATCH-20240105-a1b2c3", 7),
            "CRP-PERSIAN-5X8-A1B2C3-007"
        );
    }

    #[test]
    fn serials_within_a_batch_differ_by_index() {
        let a = piece_serial("RUG-01", "BATCH-20240105-00ff00", 1);
        let b = piece_serial("RUG-01", "BATCH-20240105-00ff00", 2);
        assert_ne!(a, b);
        assert!(a.ends_with("-001"));
    }
}
