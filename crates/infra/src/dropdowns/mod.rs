//! Storage for configurable dropdown options.
//!
//! Options are plain tenant-scoped records, not event streams: they are
//! edited in place and have no history worth replaying.

mod in_memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use loomworks_core::{DomainError, TenantId};
use loomworks_masterdata::{
    DropdownCategory, DropdownOption, DropdownOptionId, DropdownPatch, NewDropdownOption,
};

pub use in_memory::InMemoryDropdownStore;
pub use postgres::PostgresDropdownStore;

#[derive(Debug, Error)]
pub enum DropdownStoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("'{value}' already exists in {category}")]
    Duplicate {
        category: DropdownCategory,
        value: String,
    },

    #[error("dropdown option not found")]
    NotFound,

    #[error("dropdown storage error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait DropdownStore: Send + Sync {
    /// Sorted by category, sort order, then label.
    async fn list(
        &self,
        tenant_id: TenantId,
        category: Option<DropdownCategory>,
    ) -> Result<Vec<DropdownOption>, DropdownStoreError>;

    async fn create(
        &self,
        tenant_id: TenantId,
        option: NewDropdownOption,
    ) -> Result<DropdownOption, DropdownStoreError>;

    async fn update(
        &self,
        tenant_id: TenantId,
        id: DropdownOptionId,
        patch: DropdownPatch,
    ) -> Result<DropdownOption, DropdownStoreError>;

    /// Returns the removed option.
    async fn delete(
        &self,
        tenant_id: TenantId,
        id: DropdownOptionId,
    ) -> Result<DropdownOption, DropdownStoreError>;

    /// Inserts every default whose value is not present yet; returns how
    /// many were added. Existing options are left untouched.
    async fn seed_defaults(&self, tenant_id: TenantId) -> Result<usize, DropdownStoreError>;

    /// Removes every option of the tenant; returns how many were deleted.
    async fn clear(&self, tenant_id: TenantId) -> Result<usize, DropdownStoreError>;
}

#[async_trait]
impl<S> DropdownStore for std::sync::Arc<S>
where
    S: DropdownStore + ?Sized,
{
    async fn list(
        &self,
        tenant_id: TenantId,
        category: Option<DropdownCategory>,
    ) -> Result<Vec<DropdownOption>, DropdownStoreError> {
        (**self).list(tenant_id, category).await
    }

    async fn create(
        &self,
        tenant_id: TenantId,
        option: NewDropdownOption,
    ) -> Result<DropdownOption, DropdownStoreError> {
        (**self).create(tenant_id, option).await
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        id: DropdownOptionId,
        patch: DropdownPatch,
    ) -> Result<DropdownOption, DropdownStoreError> {
        (**self).update(tenant_id, id, patch).await
    }

    async fn delete(
        &self,
        tenant_id: TenantId,
        id: DropdownOptionId,
    ) -> Result<DropdownOption, DropdownStoreError> {
        (**self).delete(tenant_id, id).await
    }

    async fn seed_defaults(&self, tenant_id: TenantId) -> Result<usize, DropdownStoreError> {
        (**self).seed_defaults(tenant_id).await
    }

    async fn clear(&self, tenant_id: TenantId) -> Result<usize, DropdownStoreError> {
        (**self).clear(tenant_id).await
    }
}
