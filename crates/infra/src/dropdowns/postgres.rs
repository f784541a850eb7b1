use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use loomworks_core::{AggregateId, TenantId};
use loomworks_masterdata::{
    DropdownCategory, DropdownOption, DropdownOptionId, DropdownPatch, NewDropdownOption,
    default_options, sort_options,
};

use super::{DropdownStore, DropdownStoreError};

const DROPDOWN_SCHEMA: &str = include_str!("../../migrations/0002_dropdown_options.sql");

/// `dropdown_options` table. Case-insensitive uniqueness per tenant and
/// category is enforced by a unique index on `LOWER(value)`.
#[derive(Debug, Clone)]
pub struct PostgresDropdownStore {
    pool: Arc<PgPool>,
}

impl PostgresDropdownStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), DropdownStoreError> {
        sqlx::raw_sql(DROPDOWN_SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| backend("ensure_schema", e))?;
        Ok(())
    }

    async fn fetch(
        &self,
        tenant_id: TenantId,
        id: DropdownOptionId,
    ) -> Result<DropdownOption, DropdownStoreError> {
        let row = sqlx::query_as::<_, DropdownRow>(
            r#"
            SELECT id, tenant_id, category, value, label, sort_order, active
            FROM dropdown_options
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.0.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| backend("fetch", e))?;

        row.ok_or(DropdownStoreError::NotFound)?.try_into()
    }
}

#[async_trait]
impl DropdownStore for PostgresDropdownStore {
    #[instrument(skip(self), err)]
    async fn list(
        &self,
        tenant_id: TenantId,
        category: Option<DropdownCategory>,
    ) -> Result<Vec<DropdownOption>, DropdownStoreError> {
        let rows = sqlx::query_as::<_, DropdownRow>(
            r#"
            SELECT id, tenant_id, category, value, label, sort_order, active
            FROM dropdown_options
            WHERE tenant_id = $1 AND ($2::TEXT IS NULL OR category = $2)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(category.map(DropdownCategory::as_str))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| backend("list", e))?;

        let mut options = rows
            .into_iter()
            .map(DropdownOption::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        sort_options(&mut options);
        Ok(options)
    }

    #[instrument(skip(self), err)]
    async fn create(
        &self,
        tenant_id: TenantId,
        option: NewDropdownOption,
    ) -> Result<DropdownOption, DropdownStoreError> {
        let option = option.into_option(tenant_id, DropdownOptionId::new(AggregateId::new()))?;
        sqlx::query(
            r#"
            INSERT INTO dropdown_options (id, tenant_id, category, value, label, sort_order, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(option.id.0.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(option.category.as_str())
        .bind(&option.value)
        .bind(&option.label)
        .bind(option.sort_order)
        .bind(option.active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_write_error("create", e, &option))?;
        Ok(option)
    }

    #[instrument(skip(self), err)]
    async fn update(
        &self,
        tenant_id: TenantId,
        id: DropdownOptionId,
        patch: DropdownPatch,
    ) -> Result<DropdownOption, DropdownStoreError> {
        let current = self.fetch(tenant_id, id).await?;
        let next = patch.apply_to(&current)?;
        sqlx::query(
            r#"
            UPDATE dropdown_options
            SET value = $3, label = $4, sort_order = $5, active = $6, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.0.as_uuid())
        .bind(&next.value)
        .bind(&next.label)
        .bind(next.sort_order)
        .bind(next.active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_write_error("update", e, &next))?;
        Ok(next)
    }

    #[instrument(skip(self), err)]
    async fn delete(
        &self,
        tenant_id: TenantId,
        id: DropdownOptionId,
    ) -> Result<DropdownOption, DropdownStoreError> {
        let current = self.fetch(tenant_id, id).await?;
        sqlx::query("DELETE FROM dropdown_options WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.0.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| backend("delete", e))?;
        Ok(current)
    }

    #[instrument(skip(self), err)]
    async fn seed_defaults(&self, tenant_id: TenantId) -> Result<usize, DropdownStoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| backend("begin_transaction", e))?;
        let mut added = 0usize;
        for new in default_options() {
            let option = new.into_option(tenant_id, DropdownOptionId::new(AggregateId::new()))?;
            let result = sqlx::query(
                r#"
                INSERT INTO dropdown_options (id, tenant_id, category, value, label, sort_order, active)
                VALUES ($1, $2, $3, $4, $5, $6, TRUE)
                ON CONFLICT (tenant_id, category, LOWER(value)) DO NOTHING
                "#,
            )
            .bind(option.id.0.as_uuid())
            .bind(tenant_id.as_uuid())
            .bind(option.category.as_str())
            .bind(&option.value)
            .bind(&option.label)
            .bind(option.sort_order)
            .execute(&mut *tx)
            .await
            .map_err(|e| backend("seed_defaults", e))?;
            added += result.rows_affected() as usize;
        }
        tx.commit().await.map_err(|e| backend("commit", e))?;
        Ok(added)
    }

    #[instrument(skip(self), err)]
    async fn clear(&self, tenant_id: TenantId) -> Result<usize, DropdownStoreError> {
        let result = sqlx::query("DELETE FROM dropdown_options WHERE tenant_id = $1")
            .bind(tenant_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| backend("clear", e))?;
        Ok(result.rows_affected() as usize)
    }
}

fn backend(operation: &str, err: sqlx::Error) -> DropdownStoreError {
    DropdownStoreError::Backend(format!("sqlx error in {operation}: {err}"))
}

fn map_write_error(operation: &str, err: sqlx::Error, option: &DropdownOption) -> DropdownStoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return DropdownStoreError::Duplicate {
                category: option.category,
                value: option.value.clone(),
            };
        }
    }
    backend(operation, err)
}

#[derive(Debug, FromRow)]
struct DropdownRow {
    id: Uuid,
    tenant_id: Uuid,
    category: String,
    value: String,
    label: String,
    sort_order: i32,
    active: bool,
}

impl TryFrom<DropdownRow> for DropdownOption {
    type Error = DropdownStoreError;

    fn try_from(row: DropdownRow) -> Result<Self, Self::Error> {
        Ok(DropdownOption {
            id: DropdownOptionId::new(AggregateId::from_uuid(row.id)),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            category: row.category.parse()?,
            value: row.value,
            label: row.label,
            sort_order: row.sort_order,
            active: row.active,
        })
    }
}
