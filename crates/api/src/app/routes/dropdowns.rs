//! Dropdown options are plain records; every mutation answers with the
//! refreshed list of the category it touched.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, patch, post},
};
use tracing::info;

use loomworks_auth::{Area, Permission};
use loomworks_core::TenantId;
use loomworks_masterdata::{DropdownCategory, DropdownOption, DropdownOptionId, DropdownPatch, NewDropdownOption};

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{authorized, ok, parse_id, require};
use crate::app::{dto, services::AppServices};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_options).post(create_option))
        .route("/seed", post(seed_defaults))
        .route("/:id", patch(update_option).delete(delete_option))
}

async fn category_list(
    services: &AppServices,
    tenant_id: TenantId,
    category: Option<DropdownCategory>,
) -> Result<Vec<DropdownOption>, Response> {
    services
        .dropdowns()
        .list(tenant_id, category)
        .await
        .map_err(errors::dropdown_error_to_response)
}

fn changed(option: &DropdownOption, items: Vec<DropdownOption>) -> Response {
    ok(serde_json::json!({
        "option": option,
        "category": option.category,
        "items": items,
    }))
}

pub async fn list_options(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::DropdownListQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Dropdowns))?;
    let category = match q.category.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(raw.parse::<DropdownCategory>().map_err(errors::domain_error_to_response)?),
        None => None,
    };
    let items = category_list(&services, tenant.tenant_id(), category).await?;
    Ok(ok(serde_json::json!({ "items": items })))
}

pub async fn create_option(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewDropdownOption>,
) -> ApiResult {
    let body = authorized(&tenant, &principal, body, Permission::write(Area::Dropdowns))?;
    let created = services
        .dropdowns()
        .create(tenant.tenant_id(), body)
        .await
        .map_err(errors::dropdown_error_to_response)?;

    let items = category_list(&services, tenant.tenant_id(), Some(created.category)).await?;
    Ok(changed(&created, items))
}

pub async fn update_option(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<DropdownPatch>,
) -> ApiResult {
    let option_id = DropdownOptionId::new(parse_id(&id, "dropdown option")?);
    let body = authorized(&tenant, &principal, body, Permission::write(Area::Dropdowns))?;
    if body.is_empty() {
        return Err(errors::bad_request("nothing to update"));
    }

    let updated = services
        .dropdowns()
        .update(tenant.tenant_id(), option_id, body)
        .await
        .map_err(errors::dropdown_error_to_response)?;

    let items = category_list(&services, tenant.tenant_id(), Some(updated.category)).await?;
    Ok(changed(&updated, items))
}

pub async fn delete_option(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let option_id = DropdownOptionId::new(parse_id(&id, "dropdown option")?);
    let option_id = authorized(&tenant, &principal, option_id, Permission::write(Area::Dropdowns))?;

    let removed = services
        .dropdowns()
        .delete(tenant.tenant_id(), option_id)
        .await
        .map_err(errors::dropdown_error_to_response)?;

    let items = category_list(&services, tenant.tenant_id(), Some(removed.category)).await?;
    Ok(changed(&removed, items))
}

/// Adds the built-in options the tenant does not have yet.
pub async fn seed_defaults(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&tenant, &principal, Permission::write(Area::Dropdowns))?;
    let added = services
        .dropdowns()
        .seed_defaults(tenant.tenant_id())
        .await
        .map_err(errors::dropdown_error_to_response)?;
    info!(tenant_id = %tenant.tenant_id(), added, "seeded default dropdown options");

    let items = category_list(&services, tenant.tenant_id(), None).await?;
    Ok(ok(serde_json::json!({ "added": added, "items": items })))
}
