//! Customers and suppliers share one router; the nest layers the
//! [`PartyKind`] it serves.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use loomworks_auth::{Area, Permission};
use loomworks_core::AggregateId;
use loomworks_infra::projections::parties::AGGREGATE_TYPE;
use loomworks_parties::{
    Party, PartyCommand, PartyId, PartyKind, ReactivateParty, RegisterParty, SuspendParty,
    UpdateDetails,
};

use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{authorized, committed, items, ok, parse_id, require};
use crate::app::{dto, services::AppServices};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_parties).post(create_party))
        .route("/:id", get(get_party).patch(update_party))
        .route("/:id/suspend", post(suspend_party))
        .route("/:id/reactivate", post(reactivate_party))
}

fn area(kind: PartyKind) -> Area {
    match kind {
        PartyKind::Customer => Area::Customers,
        PartyKind::Supplier => Area::Suppliers,
    }
}

async fn dispatch(
    services: &AppServices,
    tenant: &TenantContext,
    party_id: PartyId,
    cmd: PartyCommand,
) -> Result<Vec<loomworks_infra::event_store::StoredEvent>, axum::response::Response> {
    services
        .dispatch::<Party>(tenant.tenant_id(), party_id.0, AGGREGATE_TYPE, cmd, |_, id| {
            Party::empty(PartyId::new(id))
        })
        .await
        .map_err(errors::dispatch_error_to_response)
}

/// Committed party of `kind`; a party of the other kind is reported missing so
/// one kind's permissions never reach the other.
async fn load_of_kind(
    services: &AppServices,
    tenant: &TenantContext,
    party_id: PartyId,
    kind: PartyKind,
) -> Result<Party, axum::response::Response> {
    let party = services
        .load(tenant.tenant_id(), party_id.0, |_, id| Party::empty(PartyId::new(id)))
        .await
        .map_err(errors::dispatch_error_to_response)?;
    if !party.is_created() || party.kind() != kind {
        return Err(errors::not_found(kind.as_str()));
    }
    Ok(party)
}

pub async fn list_parties(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(q): Query<dto::SearchQuery>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(area(kind)))?;
    let rows = match q.search.as_deref() {
        Some(search) => services.projections().parties.search(tenant.tenant_id(), kind, search),
        None => services.projections().parties.list(tenant.tenant_id(), kind),
    };
    Ok(items(rows))
}

pub async fn create_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreatePartyRequest>,
) -> ApiResult {
    let party_id = PartyId::new(AggregateId::new());
    let cmd = PartyCommand::RegisterParty(RegisterParty {
        tenant_id: tenant.tenant_id(),
        party_id,
        kind,
        name: body.name,
        contact: Some(body.contact),
        gstin: body.gstin,
        company_name: body.company_name,
        customer_type: body.customer_type,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(area(kind)))?;

    let events = dispatch(&services, &tenant, party_id, cmd).await?;
    Ok(committed(StatusCode::CREATED, party_id.0, &events))
}

pub async fn get_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&tenant, &principal, Permission::read(area(kind)))?;
    let party_id = PartyId::new(parse_id(&id, kind.as_str())?);

    services
        .projections()
        .parties
        .get(tenant.tenant_id(), &party_id)
        .filter(|p| p.kind == kind)
        .map(ok)
        .ok_or_else(|| errors::not_found(kind.as_str()))
}

pub async fn update_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdatePartyRequest>,
) -> ApiResult {
    require(&tenant, &principal, Permission::write(area(kind)))?;
    let party_id = PartyId::new(parse_id(&id, kind.as_str())?);
    let current = load_of_kind(&services, &tenant, party_id, kind).await?;

    // Contact fields arrive one by one; merge them onto the committed contact.
    let contact = body
        .has_contact_changes()
        .then(|| body.merged_contact(current.contact()));

    let cmd = PartyCommand::UpdateDetails(UpdateDetails {
        tenant_id: tenant.tenant_id(),
        party_id,
        name: body.name,
        contact,
        gstin: body.gstin,
        company_name: body.company_name,
        customer_type: body.customer_type,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(area(kind)))?;

    let events = dispatch(&services, &tenant, party_id, cmd).await?;
    Ok(committed(StatusCode::OK, party_id.0, &events))
}

pub async fn suspend_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::SuspendPartyRequest>>,
) -> ApiResult {
    let party_id = PartyId::new(parse_id(&id, kind.as_str())?);
    let reason = body.and_then(|Json(b)| b.reason);

    let cmd = PartyCommand::SuspendParty(SuspendParty {
        tenant_id: tenant.tenant_id(),
        party_id,
        reason,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(area(kind)))?;
    load_of_kind(&services, &tenant, party_id, kind).await?;

    let events = dispatch(&services, &tenant, party_id, cmd).await?;
    Ok(committed(StatusCode::OK, party_id.0, &events))
}

pub async fn reactivate_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<PartyKind>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let party_id = PartyId::new(parse_id(&id, kind.as_str())?);

    let cmd = PartyCommand::ReactivateParty(ReactivateParty {
        tenant_id: tenant.tenant_id(),
        party_id,
        occurred_at: Utc::now(),
    });
    let cmd = authorized(&tenant, &principal, cmd, Permission::write(area(kind)))?;
    load_of_kind(&services, &tenant, party_id, kind).await?;

    let events = dispatch(&services, &tenant, party_id, cmd).await?;
    Ok(committed(StatusCode::OK, party_id.0, &events))
}
