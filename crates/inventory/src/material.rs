use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomworks_core::validation::{validate_name, validate_non_negative, validate_positive};
use loomworks_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use loomworks_events::Event;
use loomworks_parties::PartyId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMaterialId(pub AggregateId);

impl RawMaterialId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RawMaterialId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    pub fn for_levels(stock: f64, reorder_level: f64) -> Self {
        if stock <= 0.0 {
            StockStatus::OutOfStock
        } else if stock <= reorder_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::InStock => "in_stock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "out_of_stock" => Some(StockStatus::OutOfStock),
            "low_stock" => Some(StockStatus::LowStock),
            "in_stock" => Some(StockStatus::InStock),
            _ => None,
        }
    }
}

/// Stock quantities are kept to three decimals (grams, millimetres).
pub fn round_quantity(q: f64) -> f64 {
    (q * 1000.0).round() / 1000.0
}

/// A raw material (yarn, backing cloth, dye, latex, ...) held in stock.
///
/// `unit` and `category` are dropdown values; they are not checked against
/// the dropdown table here.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMaterial {
    id: RawMaterialId,
    tenant_id: Option<TenantId>,
    name: String,
    category: String,
    unit: String,
    supplier_id: Option<PartyId>,
    cost_per_unit: u64,
    reorder_level: f64,
    stock: f64,
    version: u64,
    created: bool,
}

impl RawMaterial {
    pub fn empty(id: RawMaterialId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            category: String::new(),
            unit: String::new(),
            supplier_id: None,
            cost_per_unit: 0,
            reorder_level: 0.0,
            stock: 0.0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RawMaterialId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn supplier_id(&self) -> Option<PartyId> {
        self.supplier_id
    }

    /// Paise per unit.
    pub fn cost_per_unit(&self) -> u64 {
        self.cost_per_unit
    }

    pub fn reorder_level(&self) -> f64 {
        self.reorder_level
    }

    pub fn stock(&self) -> f64 {
        self.stock
    }

    pub fn stock_status(&self) -> StockStatus {
        StockStatus::for_levels(self.stock, self.reorder_level)
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for RawMaterial {
    type Id = RawMaterialId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMaterial {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub supplier_id: Option<PartyId>,
    pub cost_per_unit: u64,
    pub reorder_level: f64,
    pub opening_stock: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Partial update of the descriptive fields. Stock is only changed through
/// movements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMaterial {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub supplier_id: Option<PartyId>,
    pub cost_per_unit: Option<u64>,
    pub reorder_level: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub quantity: f64,
    /// PO number or free text.
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeStock {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub quantity: f64,
    /// Batch number or free text.
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Physical count correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectStock {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub new_stock: f64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawMaterialCommand {
    CreateMaterial(CreateMaterial),
    UpdateMaterial(UpdateMaterial),
    ReceiveStock(ReceiveStock),
    ConsumeStock(ConsumeStock),
    CorrectStock(CorrectStock),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialCreated {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub supplier_id: Option<PartyId>,
    pub cost_per_unit: u64,
    pub reorder_level: f64,
    pub stock: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialUpdated {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub supplier_id: Option<PartyId>,
    pub cost_per_unit: u64,
    pub reorder_level: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReceived {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub quantity: f64,
    pub stock_after: f64,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockConsumed {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub quantity: f64,
    pub stock_after: f64,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockCorrected {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub previous_stock: f64,
    pub stock_after: f64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Emitted alongside a movement that takes stock from above the reorder level
/// to at or below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockReached {
    pub tenant_id: TenantId,
    pub material_id: RawMaterialId,
    pub name: String,
    pub unit: String,
    pub stock: f64,
    pub reorder_level: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawMaterialEvent {
    MaterialCreated(MaterialCreated),
    MaterialUpdated(MaterialUpdated),
    StockReceived(StockReceived),
    StockConsumed(StockConsumed),
    StockCorrected(StockCorrected),
    LowStockReached(LowStockReached),
}

impl Event for RawMaterialEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RawMaterialEvent::MaterialCreated(_) => "inventory.material.created",
            RawMaterialEvent::MaterialUpdated(_) => "inventory.material.updated",
            RawMaterialEvent::StockReceived(_) => "inventory.material.stock_received",
            RawMaterialEvent::StockConsumed(_) => "inventory.material.stock_consumed",
            RawMaterialEvent::StockCorrected(_) => "inventory.material.stock_corrected",
            RawMaterialEvent::LowStockReached(_) => "inventory.material.low_stock_reached",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RawMaterialEvent::MaterialCreated(e) => e.occurred_at,
            RawMaterialEvent::MaterialUpdated(e) => e.occurred_at,
            RawMaterialEvent::StockReceived(e) => e.occurred_at,
            RawMaterialEvent::StockConsumed(e) => e.occurred_at,
            RawMaterialEvent::StockCorrected(e) => e.occurred_at,
            RawMaterialEvent::LowStockReached(e) => e.occurred_at,
        }
    }
}

impl Aggregate for RawMaterial {
    type Command = RawMaterialCommand;
    type Event = RawMaterialEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RawMaterialEvent::MaterialCreated(e) => {
                self.id = e.material_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.unit = e.unit.clone();
                self.supplier_id = e.supplier_id;
                self.cost_per_unit = e.cost_per_unit;
                self.reorder_level = e.reorder_level;
                self.stock = e.stock;
                self.created = true;
            }
            RawMaterialEvent::MaterialUpdated(e) => {
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.unit = e.unit.clone();
                self.supplier_id = e.supplier_id;
                self.cost_per_unit = e.cost_per_unit;
                self.reorder_level = e.reorder_level;
            }
            RawMaterialEvent::StockReceived(e) => self.stock = e.stock_after,
            RawMaterialEvent::StockConsumed(e) => self.stock = e.stock_after,
            RawMaterialEvent::StockCorrected(e) => self.stock = e.stock_after,
            RawMaterialEvent::LowStockReached(_) => {}
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RawMaterialCommand::CreateMaterial(cmd) => self.handle_create(cmd),
            RawMaterialCommand::UpdateMaterial(cmd) => self.handle_update(cmd),
            RawMaterialCommand::ReceiveStock(cmd) => self.handle_receive(cmd),
            RawMaterialCommand::ConsumeStock(cmd) => self.handle_consume(cmd),
            RawMaterialCommand::CorrectStock(cmd) => self.handle_correct(cmd),
        }
    }
}

fn required_text(field: &str, value: &str) -> Result<String, DomainError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

impl RawMaterial {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_material_id(&self, material_id: RawMaterialId) -> Result<(), DomainError> {
        if self.id != material_id {
            return Err(DomainError::invariant("material_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(
        &self,
        tenant_id: TenantId,
        material_id: RawMaterialId,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_material_id(material_id)
    }

    fn low_stock_crossing(
        &self,
        tenant_id: TenantId,
        stock_after: f64,
        occurred_at: DateTime<Utc>,
    ) -> Option<RawMaterialEvent> {
        let crossed = self.stock > self.reorder_level && stock_after <= self.reorder_level;
        crossed.then(|| {
            RawMaterialEvent::LowStockReached(LowStockReached {
                tenant_id,
                material_id: self.id,
                name: self.name.clone(),
                unit: self.unit.clone(),
                stock: stock_after,
                reorder_level: self.reorder_level,
                occurred_at,
            })
        })
    }

    fn handle_create(&self, cmd: &CreateMaterial) -> Result<Vec<RawMaterialEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("material already exists"));
        }
        self.ensure_material_id(cmd.material_id)?;

        validate_name("name", &cmd.name)?;
        let category = required_text("category", &cmd.category)?;
        let unit = required_text("unit", &cmd.unit)?;
        validate_non_negative("reorder_level", cmd.reorder_level)?;
        validate_non_negative("opening_stock", cmd.opening_stock)?;

        Ok(vec![RawMaterialEvent::MaterialCreated(MaterialCreated {
            tenant_id: cmd.tenant_id,
            material_id: cmd.material_id,
            name: cmd.name.trim().to_string(),
            category,
            unit,
            supplier_id: cmd.supplier_id,
            cost_per_unit: cmd.cost_per_unit,
            reorder_level: round_quantity(cmd.reorder_level),
            stock: round_quantity(cmd.opening_stock),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateMaterial) -> Result<Vec<RawMaterialEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.material_id)?;

        let name = cmd.name.as_deref().unwrap_or(&self.name);
        validate_name("name", name)?;
        let category = required_text("category", cmd.category.as_deref().unwrap_or(&self.category))?;
        let unit = required_text("unit", cmd.unit.as_deref().unwrap_or(&self.unit))?;
        let reorder_level = cmd.reorder_level.unwrap_or(self.reorder_level);
        validate_non_negative("reorder_level", reorder_level)?;

        Ok(vec![RawMaterialEvent::MaterialUpdated(MaterialUpdated {
            tenant_id: cmd.tenant_id,
            material_id: cmd.material_id,
            name: name.trim().to_string(),
            category,
            unit,
            supplier_id: cmd.supplier_id.or(self.supplier_id),
            cost_per_unit: cmd.cost_per_unit.unwrap_or(self.cost_per_unit),
            reorder_level: round_quantity(reorder_level),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<RawMaterialEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.material_id)?;
        let quantity = round_quantity(cmd.quantity);
        validate_positive("quantity", quantity)?;
        Ok(vec![RawMaterialEvent::StockReceived(StockReceived {
            tenant_id: cmd.tenant_id,
            material_id: cmd.material_id,
            quantity,
            stock_after: round_quantity(self.stock + quantity),
            reference: cmd.reference.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_consume(&self, cmd: &ConsumeStock) -> Result<Vec<RawMaterialEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.material_id)?;
        let quantity = round_quantity(cmd.quantity);
        validate_positive("quantity", quantity)?;
        if quantity > self.stock {
            return Err(DomainError::invariant(format!(
                "insufficient stock of {}: requested {} {}, available {} {}",
                self.name, quantity, self.unit, self.stock, self.unit
            )));
        }

        let stock_after = round_quantity(self.stock - quantity);
        let mut events = vec![RawMaterialEvent::StockConsumed(StockConsumed {
            tenant_id: cmd.tenant_id,
            material_id: cmd.material_id,
            quantity,
            stock_after,
            reference: cmd.reference.clone(),
            occurred_at: cmd.occurred_at,
        })];
        events.extend(self.low_stock_crossing(cmd.tenant_id, stock_after, cmd.occurred_at));
        Ok(events)
    }

    fn handle_correct(&self, cmd: &CorrectStock) -> Result<Vec<RawMaterialEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.material_id)?;
        validate_non_negative("new_stock", cmd.new_stock)?;
        let reason = required_text("reason", &cmd.reason)?;

        let stock_after = round_quantity(cmd.new_stock);
        let mut events = vec![RawMaterialEvent::StockCorrected(StockCorrected {
            tenant_id: cmd.tenant_id,
            material_id: cmd.material_id,
            previous_stock: self.stock,
            stock_after,
            reason,
            occurred_at: cmd.occurred_at,
        })];
        events.extend(self.low_stock_crossing(cmd.tenant_id, stock_after, cmd.occurred_at));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomworks_events::execute;
    use proptest::prelude::*;

    fn created(opening_stock: f64, reorder_level: f64) -> (RawMaterial, TenantId, RawMaterialId) {
        let tenant_id = TenantId::new();
        let material_id = RawMaterialId::new(AggregateId::new());
        let mut m = RawMaterial::empty(material_id);
        execute(
            &mut m,
            &RawMaterialCommand::CreateMaterial(CreateMaterial {
                tenant_id,
                material_id,
                name: "New Zealand Wool".to_string(),
                category: "Yarn".to_string(),
                unit: "kg".to_string(),
                supplier_id: None,
                cost_per_unit: 85_000,
                reorder_level,
                opening_stock,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        (m, tenant_id, material_id)
    }

    fn consume(tenant_id: TenantId, material_id: RawMaterialId, quantity: f64) -> RawMaterialCommand {
        RawMaterialCommand::ConsumeStock(ConsumeStock {
            tenant_id,
            material_id,
            quantity,
            reference: Some("BATCH-20261019-a1b2c3".to_string()),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn stock_status_thresholds() {
        assert_eq!(StockStatus::for_levels(0.0, 10.0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::for_levels(10.0, 10.0), StockStatus::LowStock);
        assert_eq!(StockStatus::for_levels(10.5, 10.0), StockStatus::InStock);
        assert_eq!(StockStatus::parse("LOW_STOCK"), Some(StockStatus::LowStock));
        assert_eq!(StockStatus::parse("plenty"), None);
    }

    #[test]
    fn create_sets_opening_stock() {
        let (m, _, _) = created(120.0, 25.0);
        assert_eq!(m.stock(), 120.0);
        assert_eq!(m.stock_status(), StockStatus::InStock);
        assert_eq!(m.version(), 1);
    }

    #[test]
    fn blank_unit_is_rejected() {
        let material_id = RawMaterialId::new(AggregateId::new());
        let err = RawMaterial::empty(material_id)
            .handle(&RawMaterialCommand::CreateMaterial(CreateMaterial {
                tenant_id: TenantId::new(),
                material_id,
                name: "Latex".to_string(),
                category: "Chemicals".to_string(),
                unit: "  ".to_string(),
                supplier_id: None,
                cost_per_unit: 0,
                reorder_level: 0.0,
                opening_stock: 0.0,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("unit is required"));
    }

    #[test]
    fn receive_adds_to_stock() {
        let (mut m, tenant_id, material_id) = created(10.0, 5.0);
        let events = execute(
            &mut m,
            &RawMaterialCommand::ReceiveStock(ReceiveStock {
                tenant_id,
                material_id,
                quantity: 40.25,
                reference: Some("PO-20261019-0f0f0f".to_string()),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(m.stock(), 50.25);
    }

    #[test]
    fn consuming_more_than_available_is_rejected() {
        let (m, tenant_id, material_id) = created(10.0, 5.0);
        let err = m.handle(&consume(tenant_id, material_id, 10.5)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(msg) if msg.contains("insufficient stock")));
    }

    #[test]
    fn quantity_below_rounding_precision_is_rejected() {
        let (m, tenant_id, material_id) = created(10.0, 5.0);
        let err = m.handle(&consume(tenant_id, material_id, 0.0004)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let receive = RawMaterialCommand::ReceiveStock(ReceiveStock {
            tenant_id,
            material_id,
            quantity: 0.0004,
            reference: None,
            occurred_at: Utc::now(),
        });
        assert!(matches!(m.handle(&receive), Err(DomainError::Validation(_))));

        // Rounds up to a single gram, which is still a real movement.
        assert_eq!(m.handle(&consume(tenant_id, material_id, 0.0006)).unwrap().len(), 1);
    }

    #[test]
    fn crossing_reorder_level_emits_low_stock_once() {
        let (mut m, tenant_id, material_id) = created(30.0, 20.0);

        let events = execute(&mut m, &consume(tenant_id, material_id, 12.0)).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            RawMaterialEvent::LowStockReached(e) if e.stock == 18.0 && e.reorder_level == 20.0
        ));
        assert_eq!(m.stock_status(), StockStatus::LowStock);

        // Already below the threshold: no second alert.
        let events = execute(&mut m, &consume(tenant_id, material_id, 3.0)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(m.stock(), 15.0);
    }

    #[test]
    fn correction_records_previous_stock() {
        let (mut m, tenant_id, material_id) = created(30.0, 20.0);
        let events = execute(
            &mut m,
            &RawMaterialCommand::CorrectStock(CorrectStock {
                tenant_id,
                material_id,
                new_stock: 0.0,
                reason: "water damage".to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        assert!(matches!(&events[0], RawMaterialEvent::StockCorrected(e) if e.previous_stock == 30.0));
        assert_eq!(m.stock_status(), StockStatus::OutOfStock);
    }

    #[test]
    fn update_keeps_stock() {
        let (mut m, tenant_id, material_id) = created(30.0, 20.0);
        execute(
            &mut m,
            &RawMaterialCommand::UpdateMaterial(UpdateMaterial {
                tenant_id,
                material_id,
                name: None,
                category: None,
                unit: None,
                supplier_id: None,
                cost_per_unit: Some(90_000),
                reorder_level: Some(35.0),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(m.stock(), 30.0);
        assert_eq!(m.cost_per_unit(), 90_000);
        assert_eq!(m.stock_status(), StockStatus::LowStock);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 500, ..ProptestConfig::default() })]

        #[test]
        fn stock_never_goes_negative(moves in proptest::collection::vec((any::<bool>(), 1u32..5_000), 1..40)) {
            let (mut m, tenant_id, material_id) = created(100.0, 10.0);
            for (receive, milli) in moves {
                let quantity = f64::from(milli) / 100.0;
                let cmd = if receive {
                    RawMaterialCommand::ReceiveStock(ReceiveStock {
                        tenant_id,
                        material_id,
                        quantity,
                        reference: None,
                        occurred_at: Utc::now(),
                    })
                } else {
                    consume(tenant_id, material_id, quantity)
                };
                let before = m.version();
                match execute(&mut m, &cmd) {
                    Ok(events) => prop_assert_eq!(m.version(), before + events.len() as u64),
                    Err(_) => prop_assert_eq!(m.version(), before),
                }
                prop_assert!(m.stock() >= 0.0);
            }
        }
    }
}
