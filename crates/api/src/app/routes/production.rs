use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use loomworks_auth::{Area, Permission};
use loomworks_infra::projections::{BatchFilter, batches::AGGREGATE_TYPE};
use loomworks_masterdata::DropdownCategory;
use loomworks_production::{
    BatchCommand, BatchId, BatchStatus, CancelBatch, ProductionBatch, RecordWastage,
};
use loomworks_products::ProductId;
use loomworks_sales::OrderId;

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{
    authorized, check_dropdown_value, committed, items, ok, parse_id, parse_optional_id, require,
};
use crate::app::{dto, services::AppServices, workflows};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_batches).post(plan_batch))
        .route("/:id", get(get_batch))
        .route("/:id/start", post(start_batch))
        .route("/:id/wastage", post(record_wastage))
        .route("/:id/complete", post(complete_batch))
        .route("/:id/cancel", post(cancel_batch))
}

fn batch_id(raw: &str) -> Result<BatchId, axum::response::Response> {
    parse_id(raw, "batch").map(BatchId::new)
}

pub async fn list_batches(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::BatchListQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Production))?;
    let status = match q.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            BatchStatus::parse(raw)
                .ok_or_else(|| errors::bad_request(format!("unknown batch status '{raw}'")))?,
        ),
        None => None,
    };
    let filter = BatchFilter {
        status,
        product_id: parse_optional_id(q.product_id.as_deref(), "product")?.map(ProductId::new),
        order_id: parse_optional_id(q.order_id.as_deref(), "order")?,
    };
    Ok(items(services.projections().batches.list(tenant.tenant_id(), filter)))
}

pub async fn plan_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::PlanBatchRequest>,
) -> ApiResult {
    let body = authorized(&tenant, &principal, body, Permission::write(Area::Production))?;
    let order_id = parse_optional_id(body.order_id.as_deref(), "order")?.map(OrderId::new);
    if let Some(priority) = &body.priority {
        check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::Priority, priority).await?;
    }

    let (batch_id, events) = workflows::plan_batch(&services, tenant.tenant_id(), order_id, body)
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::CREATED, batch_id.0, &events))
}

pub async fn get_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Production))?;
    let batch_id = batch_id(&id)?;
    services
        .projections()
        .batches
        .get(tenant.tenant_id(), &batch_id)
        .map(ok)
        .ok_or_else(|| errors::not_found("batch"))
}

/// Draws the material plan from stock and puts the batch on a loom.
pub async fn start_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::StartMachineRequest>,
) -> ApiResult {
    let batch_id = batch_id(&id)?;
    let body = authorized(&tenant, &principal, body, Permission::write(Area::Production))?;
    check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::Machine, &body.machine).await?;

    let events = workflows::start_batch(&services, tenant.tenant_id(), batch_id, body.machine, body.operator)
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::OK, batch_id.0, &events))
}

pub async fn record_wastage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RecordWastageRequest>,
) -> ApiResult {
    let batch_id = batch_id(&id)?;
    let cmd = BatchCommand::RecordWastage(RecordWastage {
        tenant_id: tenant.tenant_id(),
        batch_id,
        entries: body.entries,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Production))?;

    if let BatchCommand::RecordWastage(c) = &cmd {
        for entry in &c.entries {
            check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::WastageReason, &entry.reason)
                .await?;
        }
    }

    let events = services
        .dispatch::<ProductionBatch>(tenant.tenant_id(), batch_id.0, AGGREGATE_TYPE, cmd, |_, id| {
            ProductionBatch::empty(BatchId::new(id))
        })
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::OK, batch_id.0, &events))
}

/// Completes the batch and answers with the registered piece ids.
pub async fn complete_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CompleteBatchRequest>,
) -> ApiResult {
    let batch_id = batch_id(&id)?;
    let body = authorized(&tenant, &principal, body, Permission::write(Area::Production))?;

    let (events, pieces) = workflows::complete_batch(
        &services,
        tenant.tenant_id(),
        batch_id,
        body.produced_quantity,
        body.quality_grade,
    )
    .await
    .map_err(errors::dispatch_error_to_response)?;

    Ok(ok(serde_json::json!({
        "id": batch_id.0.to_string(),
        "events_committed": events.len(),
        "pieces": pieces.iter().map(|p| p.0.to_string()).collect::<Vec<_>>(),
    })))
}

pub async fn cancel_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelRequest>,
) -> ApiResult {
    let batch_id = batch_id(&id)?;
    let cmd = BatchCommand::CancelBatch(CancelBatch {
        tenant_id: tenant.tenant_id(),
        batch_id,
        reason: body.reason,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Production))?;

    let events = services
        .dispatch::<ProductionBatch>(tenant.tenant_id(), batch_id.0, AGGREGATE_TYPE, cmd, |_, id| {
            ProductionBatch::empty(BatchId::new(id))
        })
        .await
        .map_err(errors::dispatch_error_to_response)?;
    Ok(committed(StatusCode::OK, batch_id.0, &events))
}
