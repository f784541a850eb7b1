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
use loomworks_infra::{
    event_store::StoredEvent,
    projections::{PieceFilter, individual_products::AGGREGATE_TYPE},
};
use loomworks_products::{
    IndividualProduct, IndividualProductCommand, IndividualProductId, MarkPieceDamaged,
    PieceStatus, ProductId, ReleasePiece,
};

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{
    authorized, committed, items, ok, parse_id, parse_optional_id, require,
};
use crate::app::{dto, services::AppServices};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_pieces))
        .route("/serial/:serial", get(get_piece_by_serial))
        .route("/:id", get(get_piece))
        .route("/:id/damaged", post(mark_damaged))
        .route("/:id/release", post(release_piece))
}

async fn dispatch(
    services: &AppServices,
    tenant: &TenantContext,
    piece_id: IndividualProductId,
    cmd: IndividualProductCommand,
) -> Result<Vec<StoredEvent>, Response> {
    services
        .dispatch::<IndividualProduct>(tenant.tenant_id(), piece_id.0, AGGREGATE_TYPE, cmd, |_, id| {
            IndividualProduct::empty(IndividualProductId::new(id))
        })
        .await
        .map_err(errors::dispatch_error_to_response)
}

pub async fn list_pieces(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::PieceListQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Products))?;
    let status = match q.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            PieceStatus::parse(raw)
                .ok_or_else(|| errors::bad_request(format!("unknown piece status '{raw}'")))?,
        ),
        None => None,
    };
    let filter = PieceFilter {
        product_id: parse_optional_id(q.product_id.as_deref(), "product")?.map(ProductId::new),
        status,
        batch_id: parse_optional_id(q.batch_id.as_deref(), "batch")?,
        order_id: parse_optional_id(q.order_id.as_deref(), "order")?,
    };
    Ok(items(services.projections().pieces.list(tenant.tenant_id(), filter)))
}

pub async fn get_piece(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Products))?;
    let piece_id = IndividualProductId::new(parse_id(&id, "piece")?);
    services
        .projections()
        .pieces
        .get(tenant.tenant_id(), &piece_id)
        .map(ok)
        .ok_or_else(|| errors::not_found("piece"))
}

/// Accepts a bare serial or the scanned QR payload.
pub async fn get_piece_by_serial(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(serial): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Products))?;
    services
        .projections()
        .pieces
        .find_by_serial(tenant.tenant_id(), &serial)
        .map(ok)
        .ok_or_else(|| errors::not_found("piece"))
}

pub async fn mark_damaged(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::MarkDamagedRequest>,
) -> ApiResult {
    let piece_id = IndividualProductId::new(parse_id(&id, "piece")?);
    let cmd = IndividualProductCommand::MarkPieceDamaged(MarkPieceDamaged {
        tenant_id: tenant.tenant_id(),
        piece_id,
        reason: body.reason,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Products))?;

    let events = dispatch(&services, &tenant, piece_id, cmd).await?;
    Ok(committed(StatusCode::OK, piece_id.0, &events))
}

pub async fn release_piece(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let piece_id = IndividualProductId::new(parse_id(&id, "piece")?);
    let cmd = IndividualProductCommand::ReleasePiece(ReleasePiece {
        tenant_id: tenant.tenant_id(),
        piece_id,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Products))?;

    let events = dispatch(&services, &tenant, piece_id, cmd).await?;
    Ok(committed(StatusCode::OK, piece_id.0, &events))
}
