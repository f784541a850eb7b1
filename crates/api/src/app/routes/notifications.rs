use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    routing::{get, post},
};
use uuid::Uuid;

use loomworks_auth::{Area, Permission};
use loomworks_infra::projections::NotificationQuery;

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{items, ok, require};
use crate::app::{dto, services::AppServices};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::NotificationListQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Notifications))?;
    let query = NotificationQuery {
        unread_only: q.unread_only,
        limit: q.limit,
    };
    Ok(items(services.projections().notifications.list(tenant.tenant_id(), query)))
}

pub async fn unread_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(Area::Notifications))?;
    let count = services.projections().notifications.unread_count(tenant.tenant_id());
    Ok(ok(serde_json::json!({ "count": count })))
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, Permission::write(Area::Notifications))?;
    let id: Uuid = id.parse().map_err(|_| errors::invalid_id("notification"))?;
    if !services.projections().notifications.mark_read(tenant.tenant_id(), id) {
        return Err(errors::not_found("notification"));
    }
    Ok(ok(serde_json::json!({ "id": id.to_string(), "read": true })))
}

pub async fn mark_all_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&tenant, &principal, Permission::write(Area::Notifications))?;
    let marked = services.projections().notifications.mark_all_read(tenant.tenant_id());
    Ok(ok(serde_json::json!({ "marked": marked })))
}
