use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomworks_core::validation::{validate_name, validate_percentage, validate_positive};
use loomworks_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use loomworks_events::Event;
use loomworks_pricing::{LengthUnit, area_sqm};

use crate::recipe::Recipe;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Archived,
}

/// Nominal size of one piece.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub unit: LengthUnit,
}

impl Dimensions {
    pub fn sqm(&self) -> f64 {
        area_sqm(self.length, self.width, self.unit)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_positive("length", self.length)?;
        validate_positive("width", self.width)
    }

    /// `5 x 8 ft`
    pub fn label(&self) -> String {
        format!("{} x {} {}", self.length, self.width, self.unit)
    }
}

/// A catalogue design (e.g. "Kashmiri Medallion 5x8").
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    tenant_id: Option<TenantId>,
    sku: String,
    name: String,
    category: String,
    color: Option<String>,
    pattern: Option<String>,
    dimensions: Dimensions,
    selling_price: u64,
    gst_rate: f64,
    description: Option<String>,
    recipe: Recipe,
    status: ProductStatus,
    version: u64,
    created: bool,
}

impl Product {
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            tenant_id: None,
            sku: String::new(),
            name: String::new(),
            category: String::new(),
            color: None,
            pattern: None,
            dimensions: Dimensions {
                length: 0.0,
                width: 0.0,
                unit: LengthUnit::default(),
            },
            selling_price: 0,
            gst_rate: 0.0,
            description: None,
            recipe: Recipe::default(),
            status: ProductStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Paise per piece, GST-inclusive.
    pub fn selling_price(&self) -> u64 {
        self.selling_price
    }

    pub fn gst_rate(&self) -> f64 {
        self.gst_rate
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn sqm_per_unit(&self) -> f64 {
        self.dimensions.sqm()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Archived designs cannot be planned or sold.
    pub fn can_be_sold(&self) -> bool {
        self.created && self.status == ProductStatus::Active
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Uniqueness of `sku` per tenant is checked by the caller against the read
/// model before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub color: Option<String>,
    pub pattern: Option<String>,
    pub dimensions: Dimensions,
    pub selling_price: u64,
    pub gst_rate: f64,
    pub description: Option<String>,
    pub recipe: Option<Recipe>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub name: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub pattern: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub selling_price: Option<u64>,
    pub gst_rate: Option<f64>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecipe {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub recipe: Recipe,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    UpdateProduct(UpdateProduct),
    SetRecipe(SetRecipe),
    ArchiveProduct(ArchiveProduct),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub color: Option<String>,
    pub pattern: Option<String>,
    pub dimensions: Dimensions,
    pub selling_price: u64,
    pub gst_rate: f64,
    pub description: Option<String>,
    pub recipe: Recipe,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    pub color: Option<String>,
    pub pattern: Option<String>,
    pub dimensions: Dimensions,
    pub selling_price: u64,
    pub gst_rate: f64,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSet {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub recipe: Recipe,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductArchived {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductUpdated(ProductUpdated),
    RecipeSet(RecipeSet),
    ProductArchived(ProductArchived),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductUpdated(_) => "products.product.updated",
            ProductEvent::RecipeSet(_) => "products.product.recipe_set",
            ProductEvent::ProductArchived(_) => "products.product.archived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductUpdated(e) => e.occurred_at,
            ProductEvent::RecipeSet(e) => e.occurred_at,
            ProductEvent::ProductArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.tenant_id = Some(e.tenant_id);
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.color = e.color.clone();
                self.pattern = e.pattern.clone();
                self.dimensions = e.dimensions;
                self.selling_price = e.selling_price;
                self.gst_rate = e.gst_rate;
                self.description = e.description.clone();
                self.recipe = e.recipe.clone();
                self.status = ProductStatus::Active;
                self.created = true;
            }
            ProductEvent::ProductUpdated(e) => {
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.color = e.color.clone();
                self.pattern = e.pattern.clone();
                self.dimensions = e.dimensions;
                self.selling_price = e.selling_price;
                self.gst_rate = e.gst_rate;
                self.description = e.description.clone();
            }
            ProductEvent::RecipeSet(e) => {
                self.recipe = e.recipe.clone();
            }
            ProductEvent::ProductArchived(_) => {
                self.status = ProductStatus::Archived;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::UpdateProduct(cmd) => self.handle_update(cmd),
            ProductCommand::SetRecipe(cmd) => self.handle_set_recipe(cmd),
            ProductCommand::ArchiveProduct(cmd) => self.handle_archive(cmd),
        }
    }
}

/// Upper-case, trimmed; letters, digits, `-` and `_` only.
pub fn normalize_sku(sku: &str) -> Result<String, DomainError> {
    let sku = sku.trim().to_ascii_uppercase();
    if sku.is_empty() {
        return Err(DomainError::validation("SKU cannot be empty"));
    }
    if sku.len() > 40 {
        return Err(DomainError::validation("SKU must be at most 40 characters"));
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DomainError::validation(
            "SKU may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(sku)
}

fn optional_text(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn required_category(v: &str) -> Result<String, DomainError> {
    let v = v.trim();
    if v.is_empty() {
        return Err(DomainError::validation("category is required"));
    }
    Ok(v.to_string())
}

impl Product {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_editable(&self, tenant_id: TenantId, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_product_id(product_id)?;
        if self.status == ProductStatus::Archived {
            return Err(DomainError::invariant("archived products cannot be changed"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        self.ensure_product_id(cmd.product_id)?;

        let sku = normalize_sku(&cmd.sku)?;
        validate_name("name", &cmd.name)?;
        let category = required_category(&cmd.category)?;
        cmd.dimensions.validate()?;
        validate_percentage("gst_rate", cmd.gst_rate)?;

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            sku,
            name: cmd.name.trim().to_string(),
            category,
            color: optional_text(cmd.color.as_deref()),
            pattern: optional_text(cmd.pattern.as_deref()),
            dimensions: cmd.dimensions,
            selling_price: cmd.selling_price,
            gst_rate: cmd.gst_rate,
            description: optional_text(cmd.description.as_deref()),
            recipe: cmd.recipe.clone().unwrap_or_default(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_editable(cmd.tenant_id, cmd.product_id)?;

        let name = cmd.name.as_deref().unwrap_or(&self.name);
        validate_name("name", name)?;
        let category = required_category(cmd.category.as_deref().unwrap_or(&self.category))?;
        let dimensions = cmd.dimensions.unwrap_or(self.dimensions);
        dimensions.validate()?;
        let gst_rate = cmd.gst_rate.unwrap_or(self.gst_rate);
        validate_percentage("gst_rate", gst_rate)?;

        Ok(vec![ProductEvent::ProductUpdated(ProductUpdated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            name: name.trim().to_string(),
            category,
            color: optional_text(cmd.color.as_deref().or(self.color.as_deref())),
            pattern: optional_text(cmd.pattern.as_deref().or(self.pattern.as_deref())),
            dimensions,
            selling_price: cmd.selling_price.unwrap_or(self.selling_price),
            gst_rate,
            description: optional_text(cmd.description.as_deref().or(self.description.as_deref())),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_recipe(&self, cmd: &SetRecipe) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_editable(cmd.tenant_id, cmd.product_id)?;

        // Re-check in case the recipe arrived through deserialization.
        let recipe = Recipe::new(cmd.recipe.lines().to_vec())?;

        Ok(vec![ProductEvent::RecipeSet(RecipeSet {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            recipe,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_product_id(cmd.product_id)?;

        if self.status == ProductStatus::Archived {
            return Err(DomainError::conflict("product is already archived"));
        }

        Ok(vec![ProductEvent::ProductArchived(ProductArchived {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::RecipeLine;
    use loomworks_events::execute;
    use loomworks_inventory::RawMaterialId;
    use proptest::prelude::*;

    fn create_cmd(tenant_id: TenantId, product_id: ProductId) -> CreateProduct {
        CreateProduct {
            tenant_id,
            product_id,
            sku: " km-58-red ".to_string(),
            name: "Kashmiri Medallion".to_string(),
            category: "Hand Knotted".to_string(),
            color: Some("Red".to_string()),
            pattern: Some("Medallion".to_string()),
            dimensions: Dimensions {
                length: 5.0,
                width: 8.0,
                unit: LengthUnit::Ft,
            },
            selling_price: 4_480_000,
            gst_rate: 12.0,
            description: None,
            recipe: None,
            occurred_at: Utc::now(),
        }
    }

    fn created() -> (Product, TenantId, ProductId) {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new(AggregateId::new());
        let mut p = Product::empty(product_id);
        execute(&mut p, &ProductCommand::CreateProduct(create_cmd(tenant_id, product_id))).unwrap();
        (p, tenant_id, product_id)
    }

    fn archive(p: &mut Product, tenant_id: TenantId, product_id: ProductId) {
        execute(
            p,
            &ProductCommand::ArchiveProduct(ArchiveProduct {
                tenant_id,
                product_id,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
    }

    #[test]
    fn create_normalizes_sku() {
        let (p, _, _) = created();
        assert_eq!(p.sku(), "KM-58-RED");
        assert!(p.can_be_sold());
        assert!((p.sqm_per_unit() - 3.716_12).abs() < 1e-5);
    }

    #[test]
    fn sku_with_spaces_inside_is_rejected() {
        assert!(normalize_sku("KM 58").is_err());
        assert!(normalize_sku("").is_err());
    }

    #[test]
    fn zero_width_is_rejected() {
        let product_id = ProductId::new(AggregateId::new());
        let mut cmd = create_cmd(TenantId::new(), product_id);
        cmd.dimensions.width = 0.0;
        let err = Product::empty(product_id)
            .handle(&ProductCommand::CreateProduct(cmd))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("width must be greater than zero"));
    }

    #[test]
    fn set_recipe_replaces_lines() {
        let (mut p, tenant_id, product_id) = created();
        let wool = RawMaterialId::new(AggregateId::new());
        let recipe = Recipe::new(vec![RecipeLine {
            material_id: wool,
            quantity_per_sqm: 3.2,
        }])
        .unwrap();

        execute(
            &mut p,
            &ProductCommand::SetRecipe(SetRecipe {
                tenant_id,
                product_id,
                recipe: recipe.clone(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        assert_eq!(p.recipe(), &recipe);
        assert_eq!(p.version(), 2);
    }

    #[test]
    fn archived_product_cannot_be_updated_or_sold() {
        let (mut p, tenant_id, product_id) = created();
        archive(&mut p, tenant_id, product_id);

        assert!(!p.can_be_sold());
        let err = p
            .handle(&ProductCommand::UpdateProduct(UpdateProduct {
                tenant_id,
                product_id,
                name: Some("Renamed".to_string()),
                category: None,
                color: None,
                pattern: None,
                dimensions: None,
                selling_price: None,
                gst_rate: None,
                description: None,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let again = p.handle(&ProductCommand::ArchiveProduct(ArchiveProduct {
            tenant_id,
            product_id,
            occurred_at: Utc::now(),
        }));
        assert!(matches!(again, Err(DomainError::Conflict(_))));
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let (mut p, tenant_id, product_id) = created();
        execute(
            &mut p,
            &ProductCommand::UpdateProduct(UpdateProduct {
                tenant_id,
                product_id,
                name: None,
                category: None,
                color: None,
                pattern: None,
                dimensions: None,
                selling_price: Some(5_040_000),
                gst_rate: None,
                description: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(p.selling_price(), 5_040_000);
        assert_eq!(p.color(), Some("Red"));
        assert_eq!(p.gst_rate(), 12.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 500, ..ProptestConfig::default() })]

        #[test]
        fn handle_is_deterministic(
            sku in "[A-Z0-9]{1,20}",
            name in "[A-Za-z][A-Za-z0-9 ]{1,60}[a-z]"
        ) {
            let tenant_id = TenantId::new();
            let product_id = ProductId::new(AggregateId::new());
            let mut cmd = create_cmd(tenant_id, product_id);
            cmd.sku = sku;
            cmd.name = name;
            let cmd = ProductCommand::CreateProduct(cmd);

            let p = Product::empty(product_id);
            let before = p.clone();
            let first = p.handle(&cmd);
            let second = p.handle(&cmd);
            prop_assert_eq!(&p, &before);
            prop_assert_eq!(first, second);
        }
    }
}
