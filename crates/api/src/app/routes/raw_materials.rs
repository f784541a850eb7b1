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
use loomworks_core::AggregateId;
use loomworks_infra::{event_store::StoredEvent, projections::raw_materials::AGGREGATE_TYPE};
use loomworks_inventory::{
    ConsumeStock, CorrectStock, CreateMaterial, RawMaterial, RawMaterialCommand, RawMaterialId,
    ReceiveStock, StockStatus, UpdateMaterial,
};
use loomworks_masterdata::DropdownCategory;

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{
    authorized, check_dropdown_value, committed, items, ok, parse_id, require,
};
use crate::app::{dto, services::AppServices};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_materials).post(create_material))
        .route("/:id", get(get_material).patch(update_material))
        .route("/:id/receive", post(receive_stock))
        .route("/:id/consume", post(consume_stock))
        .route("/:id/correct", post(correct_stock))
}

async fn dispatch(
    services: &AppServices,
    tenant: &TenantContext,
    material_id: RawMaterialId,
    cmd: RawMaterialCommand,
) -> Result<Vec<StoredEvent>, Response> {
    services
        .dispatch::<RawMaterial>(tenant.tenant_id(), material_id.0, AGGREGATE_TYPE, cmd, |_, id| {
            RawMaterial::empty(RawMaterialId::new(id))
        })
        .await
        .map_err(errors::dispatch_error_to_response)
}

pub async fn list_materials(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::MaterialListQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Inventory))?;
    let status = match q.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            StockStatus::parse(raw)
                .ok_or_else(|| errors::bad_request(format!("unknown stock status '{raw}'")))?,
        ),
        None => None,
    };
    Ok(items(services.projections().raw_materials.list(tenant.tenant_id(), status)))
}

pub async fn create_material(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateMaterialRequest>,
) -> ApiResult {
    let material_id = RawMaterialId::new(AggregateId::new());
    let cmd = RawMaterialCommand::CreateMaterial(CreateMaterial {
        tenant_id: tenant.tenant_id(),
        material_id,
        name: body.name,
        category: body.category,
        unit: body.unit,
        supplier_id: body.supplier_id,
        cost_per_unit: body.cost_per_unit,
        reorder_level: body.reorder_level,
        opening_stock: body.opening_stock,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Inventory))?;

    if let RawMaterialCommand::CreateMaterial(c) = &cmd {
        check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::MaterialCategory, &c.category).await?;
        check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::Unit, &c.unit).await?;
    }

    let events = dispatch(&services, &tenant, material_id, cmd).await?;
    Ok(committed(StatusCode::CREATED, material_id.0, &events))
}

pub async fn get_material(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Inventory))?;
    let material_id = RawMaterialId::new(parse_id(&id, "raw material")?);

    let material = services
        .projections()
        .raw_materials
        .get(tenant.tenant_id(), &material_id)
        .ok_or_else(|| errors::not_found("raw material"))?;
    let stock_value = material.stock_value();

    let mut body = serde_json::to_value(&material).unwrap_or_default();
    body["stock_value"] = serde_json::json!(stock_value);
    Ok(ok(body))
}

pub async fn update_material(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateMaterialRequest>,
) -> ApiResult {
    let material_id = RawMaterialId::new(parse_id(&id, "raw material")?);
    let cmd = RawMaterialCommand::UpdateMaterial(UpdateMaterial {
        tenant_id: tenant.tenant_id(),
        material_id,
        name: body.name,
        category: body.category,
        unit: body.unit,
        supplier_id: body.supplier_id,
        cost_per_unit: body.cost_per_unit,
        reorder_level: body.reorder_level,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Inventory))?;

    if let RawMaterialCommand::UpdateMaterial(c) = &cmd {
        if let Some(category) = &c.category {
            check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::MaterialCategory, category).await?;
        }
        if let Some(unit) = &c.unit {
            check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::Unit, unit).await?;
        }
    }

    let events = dispatch(&services, &tenant, material_id, cmd).await?;
    Ok(committed(StatusCode::OK, material_id.0, &events))
}

pub async fn receive_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::StockMovementRequest>,
) -> ApiResult {
    let material_id = RawMaterialId::new(parse_id(&id, "raw material")?);
    let cmd = RawMaterialCommand::ReceiveStock(ReceiveStock {
        tenant_id: tenant.tenant_id(),
        material_id,
        quantity: body.quantity,
        reference: body.reference,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Inventory))?;

    let events = dispatch(&services, &tenant, material_id, cmd).await?;
    Ok(committed(StatusCode::OK, material_id.0, &events))
}

pub async fn consume_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::StockMovementRequest>,
) -> ApiResult {
    let material_id = RawMaterialId::new(parse_id(&id, "raw material")?);
    let cmd = RawMaterialCommand::ConsumeStock(ConsumeStock {
        tenant_id: tenant.tenant_id(),
        material_id,
        quantity: body.quantity,
        reference: body.reference,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Inventory))?;

    let events = dispatch(&services, &tenant, material_id, cmd).await?;
    Ok(committed(StatusCode::OK, material_id.0, &events))
}

pub async fn correct_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CorrectStockRequest>,
) -> ApiResult {
    let material_id = RawMaterialId::new(parse_id(&id, "raw material")?);
    let cmd = RawMaterialCommand::CorrectStock(CorrectStock {
        tenant_id: tenant.tenant_id(),
        material_id,
        new_stock: body.new_stock,
        reason: body.reason,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Inventory))?;

    let events = dispatch(&services, &tenant, material_id, cmd).await?;
    Ok(committed(StatusCode::OK, material_id.0, &events))
}
