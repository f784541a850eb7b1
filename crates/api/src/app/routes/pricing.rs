use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    routing::post,
};

use loomworks_auth::{Area, Permission};
use loomworks_pricing::{LengthUnit, PricingCalculator, back_calculate_gst, convert};

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{ok, require};
use crate::app::{dto, services::AppServices};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/calculate", post(calculate))
        .route("/convert", post(convert_length))
        .route("/gst", post(split_gst))
}

pub async fn calculate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CalculateRequest>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Pricing))?;
    let mut input = body.input;

    if let (None, Some(product_id)) = (input.cost_per_sqm, body.product_id) {
        let projections = services.projections();
        let product = projections
            .products
            .get(tenant.tenant_id(), &product_id)
            .ok_or_else(|| errors::not_found("product"))?;
        // Recipe costs are paise; the calculator works in rupees.
        input.cost_per_sqm = product
            .recipe
            .cost_per_sqm(|m| {
                projections
                    .raw_materials
                    .get(tenant.tenant_id(), &m)
                    .map(|r| r.cost_per_unit)
            })
            .ok()
            .filter(|_| !product.recipe.is_empty())
            .map(|paise| paise as f64 / 100.0);
    }

    let breakdown = PricingCalculator::new()
        .calculate(&input)
        .map_err(errors::pricing_error_to_response)?;
    Ok(ok(breakdown))
}

pub async fn convert_length(
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::ConvertRequest>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Pricing))?;
    let from: LengthUnit = body.from.parse().map_err(errors::pricing_error_to_response)?;
    let to: LengthUnit = body.to.parse().map_err(errors::pricing_error_to_response)?;
    if !body.value.is_finite() {
        return Err(errors::bad_request("value must be a finite number"));
    }

    Ok(ok(serde_json::json!({
        "value": body.value,
        "from": from,
        "to": to,
        "result": (convert(body.value, from, to) * 10_000.0).round() / 10_000.0,
    })))
}

/// Splits a GST-inclusive amount into base and tax.
pub async fn split_gst(
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::GstRequest>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Pricing))?;
    let breakdown = back_calculate_gst(body.amount, body.gst_rate).map_err(errors::pricing_error_to_response)?;
    Ok(ok(breakdown))
}
