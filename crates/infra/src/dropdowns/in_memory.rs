use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use loomworks_core::{AggregateId, TenantId};
use loomworks_masterdata::{
    DropdownCategory, DropdownOption, DropdownOptionId, DropdownPatch, NewDropdownOption,
    default_options, sort_options,
};

use super::{DropdownStore, DropdownStoreError};

#[derive(Debug, Default)]
pub struct InMemoryDropdownStore {
    inner: RwLock<HashMap<TenantId, Vec<DropdownOption>>>,
}

impl InMemoryDropdownStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> DropdownStoreError {
    DropdownStoreError::Backend("dropdown lock poisoned".to_string())
}

fn ensure_unique(
    existing: &[DropdownOption],
    candidate: &DropdownOption,
) -> Result<(), DropdownStoreError> {
    let clash = existing
        .iter()
        .any(|o| o.id != candidate.id && o.category == candidate.category && o.has_value(&candidate.value));
    if clash {
        return Err(DropdownStoreError::Duplicate {
            category: candidate.category,
            value: candidate.value.clone(),
        });
    }
    Ok(())
}

#[async_trait]
impl DropdownStore for InMemoryDropdownStore {
    async fn list(
        &self,
        tenant_id: TenantId,
        category: Option<DropdownCategory>,
    ) -> Result<Vec<DropdownOption>, DropdownStoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut rows: Vec<_> = map
            .get(&tenant_id)
            .into_iter()
            .flatten()
            .filter(|o| category.is_none_or(|c| o.category == c))
            .cloned()
            .collect();
        sort_options(&mut rows);
        Ok(rows)
    }

    async fn create(
        &self,
        tenant_id: TenantId,
        option: NewDropdownOption,
    ) -> Result<DropdownOption, DropdownStoreError> {
        let option = option.into_option(tenant_id, DropdownOptionId::new(AggregateId::new()))?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let rows = map.entry(tenant_id).or_default();
        ensure_unique(rows, &option)?;
        rows.push(option.clone());
        Ok(option)
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        id: DropdownOptionId,
        patch: DropdownPatch,
    ) -> Result<DropdownOption, DropdownStoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let rows = map.get_mut(&tenant_id).ok_or(DropdownStoreError::NotFound)?;
        let idx = rows
            .iter()
            .position(|o| o.id == id)
            .ok_or(DropdownStoreError::NotFound)?;
        let next = patch.apply_to(&rows[idx])?;
        ensure_unique(rows, &next)?;
        rows[idx] = next.clone();
        Ok(next)
    }

    async fn delete(
        &self,
        tenant_id: TenantId,
        id: DropdownOptionId,
    ) -> Result<DropdownOption, DropdownStoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let rows = map.get_mut(&tenant_id).ok_or(DropdownStoreError::NotFound)?;
        let idx = rows
            .iter()
            .position(|o| o.id == id)
            .ok_or(DropdownStoreError::NotFound)?;
        Ok(rows.remove(idx))
    }

    async fn seed_defaults(&self, tenant_id: TenantId) -> Result<usize, DropdownStoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let rows = map.entry(tenant_id).or_default();
        let mut added = 0;
        for new in default_options() {
            let option = new.into_option(tenant_id, DropdownOptionId::new(AggregateId::new()))?;
            if ensure_unique(rows, &option).is_ok() {
                rows.push(option);
                added += 1;
            }
        }
        Ok(added)
    }

    async fn clear(&self, tenant_id: TenantId) -> Result<usize, DropdownStoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(&tenant_id).map(|rows| rows.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colour(value: &str) -> NewDropdownOption {
        NewDropdownOption::new(DropdownCategory::Color, value, 0)
    }

    #[tokio::test]
    async fn values_are_unique_per_category_ignoring_case() {
        let store = InMemoryDropdownStore::new();
        let t = TenantId::new();

        store.create(t, colour("Ivory")).await.unwrap();
        let err = store.create(t, colour(" ivory ")).await.unwrap_err();
        assert!(matches!(err, DropdownStoreError::Duplicate { .. }));

        store
            .create(t, NewDropdownOption::new(DropdownCategory::Pattern, "Ivory", 0))
            .await
            .unwrap();
        store.create(TenantId::new(), colour("Ivory")).await.unwrap();
    }

    #[tokio::test]
    async fn update_and_delete() {
        let store = InMemoryDropdownStore::new();
        let t = TenantId::new();
        let red = store.create(t, colour("Red")).await.unwrap();
        let blue = store.create(t, colour("Blue")).await.unwrap();

        let clash = DropdownPatch {
            value: Some("red".to_string()),
            ..DropdownPatch::default()
        };
        assert!(matches!(
            store.update(t, blue.id, clash).await,
            Err(DropdownStoreError::Duplicate { .. })
        ));

        let relabel = DropdownPatch {
            label: Some("Crimson".to_string()),
            sort_order: Some(-1),
            ..DropdownPatch::default()
        };
        let updated = store.update(t, red.id, relabel).await.unwrap();
        assert_eq!(updated.label, "Crimson");

        let listed = store.list(t, Some(DropdownCategory::Color)).await.unwrap();
        assert_eq!(listed[0].id, red.id);

        store.delete(t, blue.id).await.unwrap();
        assert!(matches!(store.delete(t, blue.id).await, Err(DropdownStoreError::NotFound)));
        assert!(matches!(
            store.delete(TenantId::new(), red.id).await,
            Err(DropdownStoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn seeding_is_idempotent_and_keeps_edits() {
        let store = InMemoryDropdownStore::new();
        let t = TenantId::new();
        let custom = store.create(t, colour("Red")).await.unwrap();

        let first = store.seed_defaults(t).await.unwrap();
        assert_eq!(first, default_options().len() - 1);
        assert_eq!(store.seed_defaults(t).await.unwrap(), 0);

        let colours = store.list(t, Some(DropdownCategory::Color)).await.unwrap();
        assert!(colours.iter().any(|o| o.id == custom.id));

        assert_eq!(store.clear(t).await.unwrap(), default_options().len());
        assert!(store.list(t, None).await.unwrap().is_empty());
    }
}
