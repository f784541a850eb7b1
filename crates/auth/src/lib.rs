//! `loomworks-auth`: token validation and role-based access checks.
//!
//! No HTTP or storage here; the API layer extracts the bearer token and asks
//! this crate who the caller is and what they may do.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::Permission;
pub use policy::{Access, Area, permissions_for_role, permissions_for_roles};
pub use principal::{PrincipalId, TenantMembership};
pub use roles::Role;
