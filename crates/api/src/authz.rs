//! API-side authorization guard.
//!
//! Enforced at the request boundary (before reading a model or dispatching a
//! command), keeping domain aggregates and infra auth-agnostic.

use loomworks_auth::{
    AuthzError, CommandAuthorization, Permission, Principal, TenantMembership, authorize,
};

use crate::context::{PrincipalContext, TenantContext};

fn principal(tenant: &TenantContext, principal: &PrincipalContext) -> Principal {
    Principal {
        principal_id: principal.principal_id(),
        active_tenant_id: tenant.tenant_id(),
        membership: TenantMembership::from_roles(tenant.tenant_id(), principal.roles().to_vec()),
    }
}

/// Check every permission a command declares.
pub fn authorize_command<C: CommandAuthorization>(
    tenant: &TenantContext,
    principal_ctx: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = principal(tenant, principal_ctx);
    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }
    Ok(())
}

/// Check a single permission (reads, and mutations that are not commands).
pub fn require(
    tenant: &TenantContext,
    principal_ctx: &PrincipalContext,
    permission: &Permission,
) -> Result<(), AuthzError> {
    authorize(&principal(tenant, principal_ctx), permission)
}

#[cfg(test)]
mod tests {
    use loomworks_auth::{Area, PrincipalId, Role};
    use loomworks_core::TenantId;

    use super::*;

    fn ctx(role: &'static str) -> (TenantContext, PrincipalContext) {
        (
            TenantContext::new(TenantId::new()),
            PrincipalContext::new(PrincipalId::new(), vec![Role::new(role)]),
        )
    }

    #[test]
    fn viewer_reads_but_cannot_write() {
        let (t, p) = ctx("viewer");
        assert!(require(&t, &p, &Permission::read(Area::Orders)).is_ok());
        assert!(matches!(
            require(&t, &p, &Permission::write(Area::Orders)),
            Err(AuthzError::Forbidden(_))
        ));
    }

    #[test]
    fn sales_cannot_touch_production() {
        let (t, p) = ctx("sales");
        assert!(require(&t, &p, &Permission::write(Area::Orders)).is_ok());
        assert!(require(&t, &p, &Permission::write(Area::Production)).is_err());
    }

    #[test]
    fn unknown_role_gets_nothing() {
        let (t, p) = ctx("intern");
        assert!(require(&t, &p, &Permission::read(Area::Pricing)).is_err());
    }
}
