use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use loomworks_auth::{CommandAuthorization, Permission};
use loomworks_core::{AggregateId, TenantId};
use loomworks_infra::event_store::StoredEvent;
use loomworks_masterdata::DropdownCategory;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Returns the command back once the caller holds `required`.
pub fn authorized<C>(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    command: C,
    required: Permission,
) -> Result<C, Response> {
    let cmd_auth = CmdAuth {
        inner: command,
        required: vec![required],
    };
    crate::authz::authorize_command(tenant, principal, &cmd_auth).map_err(errors::forbidden)?;
    Ok(cmd_auth.inner)
}

/// Guard for reads and non-command mutations.
pub fn require(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    permission: Permission,
) -> Result<(), Response> {
    crate::authz::require(tenant, principal, &permission).map_err(errors::forbidden)
}

pub fn parse_id(raw: &str, what: &str) -> Result<AggregateId, Response> {
    raw.parse().map_err(|_| errors::invalid_id(what))
}

pub fn parse_optional_id(raw: Option<&str>, what: &str) -> Result<Option<AggregateId>, Response> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| parse_id(s, what))
        .transpose()
}

pub fn committed(status: StatusCode, id: AggregateId, events: &[StoredEvent]) -> Response {
    (
        status,
        Json(serde_json::json!({
            "id": id.to_string(),
            "events_committed": events.len(),
        })),
    )
        .into_response()
}

pub fn ok<T: Serialize>(value: T) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

pub fn items<T: Serialize>(items: Vec<T>) -> Response {
    ok(serde_json::json!({ "items": items }))
}

/// Rejects `value` when the tenant has configured options for `category`
/// and none of the active ones match. Unconfigured categories accept
/// free text.
pub async fn check_dropdown_value(
    services: &AppServices,
    tenant_id: TenantId,
    category: DropdownCategory,
    value: &str,
) -> Result<(), Response> {
    let options = services
        .dropdowns()
        .list(tenant_id, Some(category))
        .await
        .map_err(errors::dropdown_error_to_response)?;

    let active: Vec<_> = options.iter().filter(|o| o.active).collect();
    if active.is_empty() || active.iter().any(|o| o.has_value(value)) {
        return Ok(());
    }
    Err(errors::bad_request(format!(
        "'{}' is not a configured {} option",
        value.trim(),
        category
    )))
}
