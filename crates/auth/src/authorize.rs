use std::collections::HashSet;

use thiserror::Error;

use loomworks_core::TenantId;

use crate::{Permission, PrincipalId, TenantMembership};

/// Caller identity resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Permissions a command needs before it may be dispatched.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Pure permission check; no IO.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let held: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if held.contains("*") || held.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Area, Role};

    fn principal(roles: Vec<Role>) -> Principal {
        let tenant = TenantId::new();
        Principal {
            principal_id: PrincipalId::new(),
            active_tenant_id: tenant,
            membership: TenantMembership::from_roles(tenant, roles),
        }
    }

    #[test]
    fn wildcard_allows_anything() {
        let p = principal(vec![Role::ADMIN]);
        assert!(authorize(&p, &Permission::write(Area::Dropdowns)).is_ok());
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let p = principal(vec![Role::VIEWER]);
        assert_eq!(
            authorize(&p, &Permission::write(Area::Orders)),
            Err(AuthzError::Forbidden("orders.write".into()))
        );
    }

    #[test]
    fn membership_in_another_tenant_is_rejected() {
        let mut p = principal(vec![Role::ADMIN]);
        p.active_tenant_id = TenantId::new();
        assert_eq!(
            authorize(&p, &Permission::read(Area::Customers)),
            Err(AuthzError::TenantMismatch)
        );
    }
}
