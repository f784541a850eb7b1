use core::str::FromStr;

use serde::{Deserialize, Serialize};

use loomworks_core::{AggregateId, DomainError, TenantId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DropdownOptionId(pub AggregateId);

impl DropdownOptionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DropdownOptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropdownCategory {
    Color,
    Pattern,
    Unit,
    MaterialCategory,
    ProductCategory,
    QualityGrade,
    Machine,
    WastageReason,
    Priority,
}

impl DropdownCategory {
    pub const ALL: [DropdownCategory; 9] = [
        DropdownCategory::Color,
        DropdownCategory::Pattern,
        DropdownCategory::Unit,
        DropdownCategory::MaterialCategory,
        DropdownCategory::ProductCategory,
        DropdownCategory::QualityGrade,
        DropdownCategory::Machine,
        DropdownCategory::WastageReason,
        DropdownCategory::Priority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DropdownCategory::Color => "color",
            DropdownCategory::Pattern => "pattern",
            DropdownCategory::Unit => "unit",
            DropdownCategory::MaterialCategory => "material_category",
            DropdownCategory::ProductCategory => "product_category",
            DropdownCategory::QualityGrade => "quality_grade",
            DropdownCategory::Machine => "machine",
            DropdownCategory::WastageReason => "wastage_reason",
            DropdownCategory::Priority => "priority",
        }
    }
}

impl core::fmt::Display for DropdownCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DropdownCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let key = match key.as_str() {
            "colour" => "color",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| DomainError::validation(format!("unknown dropdown category '{}'", s.trim())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub id: DropdownOptionId,
    pub tenant_id: TenantId,
    pub category: DropdownCategory,
    pub value: String,
    pub label: String,
    pub sort_order: i32,
    pub active: bool,
}

impl DropdownOption {
    /// Case-insensitive match on the stored value.
    pub fn has_value(&self, value: &str) -> bool {
        self.value.eq_ignore_ascii_case(value.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDropdownOption {
    pub category: DropdownCategory,
    pub value: String,
    /// Defaults to the value.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl NewDropdownOption {
    pub fn new(category: DropdownCategory, value: impl Into<String>, sort_order: i32) -> Self {
        Self {
            category,
            value: value.into(),
            label: None,
            sort_order,
        }
    }

    /// Validates and builds the stored record.
    pub fn into_option(
        self,
        tenant_id: TenantId,
        id: DropdownOptionId,
    ) -> Result<DropdownOption, DomainError> {
        let value = normalize_value(&self.value)?;
        let label = match self.label.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => value.clone(),
        };
        Ok(DropdownOption {
            id,
            tenant_id,
            category: self.category,
            value,
            label,
            sort_order: self.sort_order,
            active: true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownPatch {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl DropdownPatch {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.label.is_none() && self.sort_order.is_none() && self.active.is_none()
    }

    /// Returns the patched copy; uniqueness is checked by the store.
    pub fn apply_to(&self, option: &DropdownOption) -> Result<DropdownOption, DomainError> {
        let mut next = option.clone();
        if let Some(value) = &self.value {
            next.value = normalize_value(value)?;
        }
        if let Some(label) = &self.label {
            let label = label.trim();
            next.label = if label.is_empty() {
                next.value.clone()
            } else {
                label.to_string()
            };
        }
        if let Some(sort_order) = self.sort_order {
            next.sort_order = sort_order;
        }
        if let Some(active) = self.active {
            next.active = active;
        }
        Ok(next)
    }
}

pub const VALUE_MAX_LEN: usize = 60;

/// Trims and checks a dropdown value.
pub fn normalize_value(value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation("dropdown value cannot be empty"));
    }
    if value.chars().count() > VALUE_MAX_LEN {
        return Err(DomainError::validation(format!(
            "dropdown value must be at most {VALUE_MAX_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

/// Category, then sort order, then label (case-insensitive).
pub fn sort_options(options: &mut [DropdownOption]) {
    options.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then(a.sort_order.cmp(&b.sort_order))
            .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(category: DropdownCategory, label: &str, sort_order: i32) -> DropdownOption {
        NewDropdownOption {
            category,
            value: label.to_string(),
            label: None,
            sort_order,
        }
        .into_option(TenantId::new(), DropdownOptionId::new(AggregateId::new()))
        .unwrap()
    }

    #[test]
    fn category_parses_aliases() {
        assert_eq!("Colour".parse::<DropdownCategory>().unwrap(), DropdownCategory::Color);
        assert_eq!(
            "wastage-reason".parse::<DropdownCategory>().unwrap(),
            DropdownCategory::WastageReason
        );
        assert!("flavour".parse::<DropdownCategory>().is_err());
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&DropdownCategory::MaterialCategory).unwrap();
        assert_eq!(json, "\"material_category\"");
    }

    #[test]
    fn blank_value_is_rejected() {
        let err = NewDropdownOption::new(DropdownCategory::Color, "   ", 0)
            .into_option(TenantId::new(), DropdownOptionId::new(AggregateId::new()))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn label_defaults_to_value() {
        let o = option(DropdownCategory::Color, "  Ivory ", 1);
        assert_eq!(o.value, "Ivory");
        assert_eq!(o.label, "Ivory");
        assert!(o.active);
        assert!(o.has_value("ivory"));
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let o = option(DropdownCategory::Machine, "Loom 1", 3);
        let patched = DropdownPatch {
            label: Some("Loom 1 (Tufting)".to_string()),
            active: Some(false),
            ..DropdownPatch::default()
        }
        .apply_to(&o)
        .unwrap();
        assert_eq!(patched.value, "Loom 1");
        assert_eq!(patched.label, "Loom 1 (Tufting)");
        assert_eq!(patched.sort_order, 3);
        assert!(!patched.active);
    }

    #[test]
    fn sort_by_order_then_label() {
        let mut options = vec![
            option(DropdownCategory::Pattern, "Persian", 2),
            option(DropdownCategory::Color, "red", 1),
            option(DropdownCategory::Color, "Beige", 1),
            option(DropdownCategory::Color, "Black", 0),
        ];
        sort_options(&mut options);
        let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Black", "Beige", "red", "Persian"]);
    }
}
