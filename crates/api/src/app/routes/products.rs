use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;

use loomworks_auth::{Area, Permission};
use loomworks_core::{AggregateId, TenantId};
use loomworks_infra::{
    event_store::StoredEvent,
    projections::{ProductReadModel, products::AGGREGATE_TYPE},
};
use loomworks_inventory::RawMaterialId;
use loomworks_masterdata::DropdownCategory;
use loomworks_products::{
    ArchiveProduct, CreateProduct, Product, ProductCommand, ProductId, Recipe, SetRecipe,
    UpdateProduct, normalize_sku,
};

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{
    authorized, check_dropdown_value, committed, items, ok, parse_id, require,
};
use crate::app::{dto, services::AppServices};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).patch(update_product))
        .route("/:id/recipe", axum::routing::put(set_recipe))
        .route("/:id/archive", post(archive_product))
        .route("/:id/requirements", get(material_requirements))
}

async fn dispatch(
    services: &AppServices,
    tenant: &TenantContext,
    product_id: ProductId,
    cmd: ProductCommand,
) -> Result<Vec<StoredEvent>, Response> {
    services
        .dispatch::<Product>(tenant.tenant_id(), product_id.0, AGGREGATE_TYPE, cmd, |_, id| {
            Product::empty(ProductId::new(id))
        })
        .await
        .map_err(errors::dispatch_error_to_response)
}

fn find_product(services: &AppServices, tenant: &TenantContext, id: &str) -> Result<ProductReadModel, Response> {
    let product_id = ProductId::new(parse_id(id, "product")?);
    services
        .projections()
        .products
        .get(tenant.tenant_id(), &product_id)
        .ok_or_else(|| errors::not_found("product"))
}

/// Product row plus what its recipe costs at current material prices.
#[derive(Debug, Serialize)]
struct ProductView {
    #[serde(flatten)]
    product: ProductReadModel,
    /// Paise; `None` while any recipe material has no known cost.
    recipe_cost_per_sqm: Option<u64>,
    recipe_cost_per_unit: Option<u64>,
}

fn product_view(services: &AppServices, tenant_id: TenantId, product: ProductReadModel) -> ProductView {
    let materials = &services.projections().raw_materials;
    let cost = if product.recipe.is_empty() {
        None
    } else {
        product
            .recipe
            .cost_per_sqm(|m| materials.get(tenant_id, &m).map(|r| r.cost_per_unit))
            .ok()
    };
    ProductView {
        recipe_cost_per_unit: cost.map(|c| (c as f64 * product.sqm_per_unit).round() as u64),
        recipe_cost_per_sqm: cost,
        product,
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::ProductListQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Products))?;
    Ok(items(
        services
            .projections()
            .products
            .list(tenant.tenant_id(), q.include_archived),
    ))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> ApiResult {
    let sku = normalize_sku(&body.sku).map_err(errors::domain_error_to_response)?;
    let recipe = if body.recipe.is_empty() {
        None
    } else {
        Some(Recipe::new(body.recipe).map_err(errors::domain_error_to_response)?)
    };

    let product_id = ProductId::new(AggregateId::new());
    let cmd = ProductCommand::CreateProduct(CreateProduct {
        tenant_id: tenant.tenant_id(),
        product_id,
        sku,
        name: body.name,
        category: body.category,
        color: body.color,
        pattern: body.pattern,
        dimensions: body.dimensions,
        selling_price: body.selling_price,
        gst_rate: body.gst_rate.unwrap_or(services.default_gst_rate()),
        description: body.description,
        recipe,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Products))?;

    if let ProductCommand::CreateProduct(c) = &cmd {
        if services.projections().products.find_by_sku(tenant.tenant_id(), &c.sku).is_some() {
            return Err(errors::json_error(
                StatusCode::CONFLICT,
                "conflict",
                format!("SKU {} is already in use", c.sku),
            ));
        }
        check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::ProductCategory, &c.category).await?;
        if let Some(color) = &c.color {
            check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::Color, color).await?;
        }
        if let Some(pattern) = &c.pattern {
            check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::Pattern, pattern).await?;
        }
        if let Some(recipe) = &c.recipe {
            ensure_materials_exist(&services, tenant.tenant_id(), recipe)?;
        }
    }

    let events = dispatch(&services, &tenant, product_id, cmd).await?;
    Ok(committed(StatusCode::CREATED, product_id.0, &events))
}

fn ensure_materials_exist(services: &AppServices, tenant_id: TenantId, recipe: &Recipe) -> Result<(), Response> {
    let materials = &services.projections().raw_materials;
    let missing: Vec<RawMaterialId> = recipe
        .lines()
        .iter()
        .map(|l| l.material_id)
        .filter(|m| materials.get(tenant_id, m).is_none())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    let ids: Vec<String> = missing.iter().map(ToString::to_string).collect();
    Err(errors::bad_request(format!("unknown raw material(s): {}", ids.join(", "))))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Products))?;
    let product = find_product(&services, &tenant, &id)?;
    Ok(ok(product_view(&services, tenant.tenant_id(), product)))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> ApiResult {
    let product_id = ProductId::new(parse_id(&id, "product")?);
    let cmd = ProductCommand::UpdateProduct(UpdateProduct {
        tenant_id: tenant.tenant_id(),
        product_id,
        name: body.name,
        category: body.category,
        color: body.color,
        pattern: body.pattern,
        dimensions: body.dimensions,
        selling_price: body.selling_price,
        gst_rate: body.gst_rate,
        description: body.description,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Products))?;

    if let ProductCommand::UpdateProduct(c) = &cmd {
        if let Some(category) = &c.category {
            check_dropdown_value(&services, tenant.tenant_id(), DropdownCategory::ProductCategory, category).await?;
        }
    }

    let events = dispatch(&services, &tenant, product_id, cmd).await?;
    Ok(committed(StatusCode::OK, product_id.0, &events))
}

pub async fn set_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetRecipeRequest>,
) -> ApiResult {
    let product_id = ProductId::new(parse_id(&id, "product")?);
    let recipe = Recipe::new(body.lines).map_err(errors::domain_error_to_response)?;

    let cmd = ProductCommand::SetRecipe(SetRecipe {
        tenant_id: tenant.tenant_id(),
        product_id,
        recipe,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Products))?;

    if let ProductCommand::SetRecipe(c) = &cmd {
        ensure_materials_exist(&services, tenant.tenant_id(), &c.recipe)?;
    }

    let events = dispatch(&services, &tenant, product_id, cmd).await?;
    Ok(committed(StatusCode::OK, product_id.0, &events))
}

pub async fn archive_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let product_id = ProductId::new(parse_id(&id, "product")?);
    let cmd = ProductCommand::ArchiveProduct(ArchiveProduct {
        tenant_id: tenant.tenant_id(),
        product_id,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(Area::Products))?;

    let events = dispatch(&services, &tenant, product_id, cmd).await?;
    Ok(committed(StatusCode::OK, product_id.0, &events))
}

#[derive(Debug, Serialize)]
struct RequirementRow {
    material_id: RawMaterialId,
    name: Option<String>,
    unit: Option<String>,
    required: f64,
    available: f64,
    shortfall: f64,
}

/// Material needed for `quantity` units, set against current stock.
pub async fn material_requirements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(q): Query<dto::RequirementsQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Products))?;
    if q.quantity == 0 {
        return Err(errors::bad_request("quantity must be at least 1"));
    }
    let product = find_product(&services, &tenant, &id)?;
    let total_sqm = f64::from(q.quantity) * product.sqm_per_unit;

    let materials = &services.projections().raw_materials;
    let rows: Vec<RequirementRow> = product
        .recipe
        .requirements(total_sqm)
        .into_iter()
        .map(|req| {
            let material = materials.get(tenant.tenant_id(), &req.material_id);
            let available = material.as_ref().map_or(0.0, |m| m.stock);
            RequirementRow {
                material_id: req.material_id,
                name: material.as_ref().map(|m| m.name.clone()),
                unit: material.as_ref().map(|m| m.unit.clone()),
                required: req.quantity,
                available,
                shortfall: loomworks_inventory::round_quantity((req.quantity - available).max(0.0)),
            }
        })
        .collect();

    let can_produce = rows.iter().all(|r| r.shortfall == 0.0);
    Ok(ok(serde_json::json!({
        "product_id": product.id,
        "quantity": q.quantity,
        "total_sqm": total_sqm,
        "can_produce": can_produce,
        "items": rows,
    })))
}
