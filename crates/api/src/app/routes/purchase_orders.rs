use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use chrono::Utc;

use loomworks_auth::{Area, Permission};
use loomworks_infra::{event_store::StoredEvent, projections::purchase_orders::AGGREGATE_TYPE};
use loomworks_parties::PartyId;
use loomworks_purchasing::{
    CancelPurchaseOrder, PlaceOrder, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId,
    PurchaseOrderStatus,
};

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{
    CmdAuth, authorized, committed, items, ok, parse_id, parse_optional_id, require,
};
use crate::app::{dto, services::AppServices, workflows};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_order))
        .route("/:id", get(get_purchase_order))
        .route("/:id/lines", post(add_line))
        .route("/:id/place", post(place_order))
        .route("/:id/receive", post(receive_order))
        .route("/:id/cancel", post(cancel_order))
}

fn purchase_order_id(raw: &str) -> Result<PurchaseOrderId, Response> {
    parse_id(raw, "purchase order").map(PurchaseOrderId::new)
}

async fn dispatch(
    services: &AppServices,
    tenant: &TenantContext,
    order_id: PurchaseOrderId,
    cmd: PurchaseOrderCommand,
) -> Result<Vec<StoredEvent>, Response> {
    services
        .dispatch::<PurchaseOrder>(tenant.tenant_id(), order_id.0, AGGREGATE_TYPE, cmd, |_, id| {
            PurchaseOrder::empty(PurchaseOrderId::new(id))
        })
        .await
        .map_err(errors::dispatch_error_to_response)
}

pub async fn list_purchase_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::PurchaseOrderListQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::PurchaseOrders))?;
    let status = match q.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            PurchaseOrderStatus::parse(raw)
                .ok_or_else(|| errors::bad_request(format!("unknown purchase order status '{raw}'")))?,
        ),
        None => None,
    };
    let supplier_id = parse_optional_id(q.supplier_id.as_deref(), "supplier")?.map(PartyId::new);
    Ok(items(
        services
            .projections()
            .purchase_orders
            .list(tenant.tenant_id(), status, supplier_id),
    ))
}

pub async fn create_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreatePurchaseOrderRequest>,
) -> ApiResult {
    let body = authorized(&tenant, &principal, body, Permission::write(Area::PurchaseOrders))?;
    let (order_id, events) = workflows::create_purchase_order(&services, tenant.tenant_id(), body)
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::CREATED, order_id.0, &events))
}

pub async fn get_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::PurchaseOrders))?;
    let order_id = purchase_order_id(&id)?;
    let projections = services.projections();

    let po = projections
        .purchase_orders
        .get(tenant.tenant_id(), &order_id)
        .ok_or_else(|| errors::not_found("purchase order"))?;
    let supplier_name = projections
        .parties
        .get(tenant.tenant_id(), &po.supplier_id)
        .map(|p| p.name);

    let mut body = serde_json::to_value(&po).unwrap_or_default();
    body["supplier_name"] = serde_json::json!(supplier_name);
    Ok(ok(body))
}

pub async fn add_line(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PurchaseLineRequest>,
) -> ApiResult {
    let order_id = purchase_order_id(&id)?;
    let body = authorized(&tenant, &principal, body, Permission::write(Area::PurchaseOrders))?;
    let events = workflows::add_purchase_line(&services, tenant.tenant_id(), order_id, &body)
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let order_id = purchase_order_id(&id)?;
    let cmd = PurchaseOrderCommand::PlaceOrder(PlaceOrder {
        tenant_id: tenant.tenant_id(),
        order_id,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::PurchaseOrders))?;

    let events = dispatch(&services, &tenant, order_id, cmd).await?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}

/// Receiving also books every line into raw-material stock.
pub async fn receive_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let order_id = purchase_order_id(&id)?;
    let guard = CmdAuth {
        inner: order_id,
        required: vec![Permission::write(Area::PurchaseOrders), Permission::write(Area::Inventory)],
    };
    crate::authz::authorize_command(&tenant, &principal, &guard).map_err(errors::forbidden)?;

    let events = workflows::receive_purchase_order(&services, tenant.tenant_id(), order_id)
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelRequest>,
) -> ApiResult {
    let order_id = purchase_order_id(&id)?;
    let cmd = PurchaseOrderCommand::CancelPurchaseOrder(CancelPurchaseOrder {
        tenant_id: tenant.tenant_id(),
        order_id,
        reason: body.reason,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::PurchaseOrders))?;

    let events = dispatch(&services, &tenant, order_id, cmd).await?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}
