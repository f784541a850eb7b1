use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
};
use chrono::Utc;

use loomworks_auth::{Area, Permission};
use loomworks_infra::{
    event_store::StoredEvent,
    projections::{OrderFilter, PieceFilter, orders::AGGREGATE_TYPE},
};
use loomworks_parties::PartyId;
use loomworks_sales::{
    ConfirmOrder, Order, OrderCommand, OrderId, OrderStatus, RecordPayment, RemoveLine,
};

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{
    authorized, committed, items, ok, parse_id, parse_optional_id, require,
};
use crate::app::{dto, services::AppServices, workflows};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/lines", post(add_line))
        .route("/:id/lines/:line_no", delete(remove_line))
        .route("/:id/confirm", post(confirm_order))
        .route("/:id/status", post(change_status))
        .route("/:id/payments", post(record_payment))
        .route("/:id/cancel", post(cancel_order))
}

fn order_id(raw: &str) -> Result<OrderId, Response> {
    parse_id(raw, "order").map(OrderId::new)
}

async fn dispatch(
    services: &AppServices,
    tenant: &TenantContext,
    order_id: OrderId,
    cmd: OrderCommand,
) -> Result<Vec<StoredEvent>, Response> {
    services
        .dispatch::<Order>(tenant.tenant_id(), order_id.0, AGGREGATE_TYPE, cmd, |_, id| {
            Order::empty(OrderId::new(id))
        })
        .await
        .map_err(errors::dispatch_error_to_response)
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::OrderListQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Orders))?;
    let status = match q.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            OrderStatus::parse(raw)
                .ok_or_else(|| errors::bad_request(format!("unknown order status '{raw}'")))?,
        ),
        None => None,
    };
    let filter = OrderFilter {
        status,
        customer_id: parse_optional_id(q.customer_id.as_deref(), "customer")?.map(PartyId::new),
    };
    Ok(items(services.projections().orders.list(tenant.tenant_id(), filter)))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> ApiResult {
    let body = authorized(&tenant, &principal, body, Permission::write(Area::Orders))?;
    let (order_id, events) = workflows::create_order(&services, tenant.tenant_id(), body)
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::CREATED, order_id.0, &events))
}

/// Order row plus its customer's name and the pieces allocated to it.
pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Orders))?;
    let order_id = order_id(&id)?;
    let projections = services.projections();

    let order = projections
        .orders
        .get(tenant.tenant_id(), &order_id)
        .ok_or_else(|| errors::not_found("order"))?;
    let customer_name = projections
        .parties
        .get(tenant.tenant_id(), &order.customer_id)
        .map(|p| p.name);
    let pieces = projections.pieces.list(
        tenant.tenant_id(),
        PieceFilter {
            order_id: Some(order_id.0),
            ..PieceFilter::default()
        },
    );

    let mut body = serde_json::to_value(&order).unwrap_or_default();
    body["customer_name"] = serde_json::json!(customer_name);
    body["pieces"] = serde_json::json!(pieces);
    Ok(ok(body))
}

pub async fn add_line(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::OrderLineRequest>,
) -> ApiResult {
    let order_id = order_id(&id)?;
    let body = authorized(&tenant, &principal, body, Permission::write(Area::Orders))?;
    let events = workflows::add_order_line(&services, tenant.tenant_id(), order_id, &body)
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}

pub async fn remove_line(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, line_no)): Path<(String, u32)>,
) -> ApiResult {
    let order_id = order_id(&id)?;
    let cmd = OrderCommand::RemoveLine(RemoveLine {
        tenant_id: tenant.tenant_id(),
        order_id,
        line_no,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Orders))?;

    let events = dispatch(&services, &tenant, order_id, cmd).await?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}

pub async fn confirm_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let order_id = order_id(&id)?;
    let cmd = OrderCommand::ConfirmOrder(ConfirmOrder {
        tenant_id: tenant.tenant_id(),
        order_id,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Orders))?;

    let events = dispatch(&services, &tenant, order_id, cmd).await?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}

pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeStatusRequest>,
) -> ApiResult {
    let order_id = order_id(&id)?;
    let body = authorized(&tenant, &principal, body, Permission::write(Area::Orders))?;
    let status = OrderStatus::parse(&body.status)
        .ok_or_else(|| errors::bad_request(format!("unknown order status '{}'", body.status)))?;

    let events = workflows::change_order_status(&services, tenant.tenant_id(), order_id, status)
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}

pub async fn record_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RecordPaymentRequest>,
) -> ApiResult {
    let order_id = order_id(&id)?;
    let cmd = OrderCommand::RecordPayment(RecordPayment {
        tenant_id: tenant.tenant_id(),
        order_id,
        amount: body.amount,
        method: body.method,
        reference: body.reference,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Orders))?;

    let events = dispatch(&services, &tenant, order_id, cmd).await?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelRequest>,
) -> ApiResult {
    let order_id = order_id(&id)?;
    let body = authorized(&tenant, &principal, body, Permission::write(Area::Orders))?;
    let events = workflows::cancel_order(&services, tenant.tenant_id(), order_id, body.reason)
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::OK, order_id.0, &events))
}
