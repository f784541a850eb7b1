use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use loomworks_core::validation::validate_positive;
use loomworks_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use loomworks_events::Event;
use loomworks_inventory::{RawMaterialId, round_quantity};
use loomworks_products::{MaterialRequirement, ProductId, QualityGrade};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub AggregateId);

impl BatchId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BatchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Production stage. A batch walks `Planning → Machine → Wastage → Completed`;
/// the wastage stage may be skipped when nothing was wasted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Planning,
    Machine,
    Wastage,
    Completed,
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Planning => "planning",
            BatchStatus::Machine => "machine",
            BatchStatus::Wastage => "wastage",
            BatchStatus::Completed => "completed",
            BatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planning" => Some(BatchStatus::Planning),
            "machine" => Some(BatchStatus::Machine),
            "wastage" => Some(BatchStatus::Wastage),
            "completed" => Some(BatchStatus::Completed),
            "cancelled" => Some(BatchStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WastageEntry {
    pub material_id: RawMaterialId,
    pub quantity: f64,
    /// Dropdown value from the `wastage_reason` category.
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductionBatch {
    id: BatchId,
    tenant_id: Option<TenantId>,
    batch_number: String,
    product_id: Option<ProductId>,
    order_id: Option<AggregateId>,
    planned_quantity: u32,
    sqm_per_unit: f64,
    material_plan: Vec<MaterialRequirement>,
    priority: String,
    planned_start: Option<NaiveDate>,
    status: BatchStatus,
    machine: Option<String>,
    operator: Option<String>,
    wastage: Vec<WastageEntry>,
    produced_quantity: u32,
    quality_grade: Option<QualityGrade>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
    version: u64,
    created: bool,
}

impl ProductionBatch {
    pub fn empty(id: BatchId) -> Self {
        Self {
            id,
            tenant_id: None,
            batch_number: String::new(),
            product_id: None,
            order_id: None,
            planned_quantity: 0,
            sqm_per_unit: 0.0,
            material_plan: Vec::new(),
            priority: String::new(),
            planned_start: None,
            status: BatchStatus::Planning,
            machine: None,
            operator: None,
            wastage: Vec::new(),
            produced_quantity: 0,
            quality_grade: None,
            started_at: None,
            completed_at: None,
            cancel_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> BatchId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn batch_number(&self) -> &str {
        &self.batch_number
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn order_id(&self) -> Option<AggregateId> {
        self.order_id
    }

    pub fn planned_quantity(&self) -> u32 {
        self.planned_quantity
    }

    pub fn sqm_per_unit(&self) -> f64 {
        self.sqm_per_unit
    }

    pub fn total_sqm(&self) -> f64 {
        self.sqm_per_unit * f64::from(self.planned_quantity)
    }

    pub fn material_plan(&self) -> &[MaterialRequirement] {
        &self.material_plan
    }

    pub fn priority(&self) -> &str {
        &self.priority
    }

    pub fn planned_start(&self) -> Option<NaiveDate> {
        self.planned_start
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn machine(&self) -> Option<&str> {
        self.machine.as_deref()
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn wastage(&self) -> &[WastageEntry] {
        &self.wastage
    }

    pub fn produced_quantity(&self) -> u32 {
        self.produced_quantity
    }

    pub fn quality_grade(&self) -> Option<QualityGrade> {
        self.quality_grade
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// Material drawn from stock when the machine stage started.
    pub fn consumed_total(&self) -> f64 {
        if self.started_at.is_none() {
            return 0.0;
        }
        self.material_plan.iter().map(|r| r.quantity).sum()
    }

    pub fn wasted_total(&self) -> f64 {
        self.wastage.iter().map(|w| w.quantity).sum()
    }

    pub fn yield_percent(&self) -> f64 {
        yield_percent(self.produced_quantity, self.planned_quantity)
    }

    pub fn wastage_percent(&self) -> f64 {
        wastage_percent(self.wasted_total(), self.consumed_total())
    }
}

/// `produced / planned × 100`, 0 when nothing was planned.
pub fn yield_percent(produced: u32, planned: u32) -> f64 {
    if planned == 0 {
        return 0.0;
    }
    round2(f64::from(produced) / f64::from(planned) * 100.0)
}

/// `wasted / consumed × 100`, 0 when nothing was consumed.
pub fn wastage_percent(wasted: f64, consumed: f64) -> f64 {
    if consumed <= 0.0 {
        return 0.0;
    }
    round2(wasted / consumed * 100.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl AggregateRoot for ProductionBatch {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// The caller computes `material_plan` from the product recipe for
/// `planned_quantity × sqm_per_unit` square metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanBatch {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub product_id: ProductId,
    pub order_id: Option<AggregateId>,
    pub planned_quantity: u32,
    pub sqm_per_unit: f64,
    pub material_plan: Vec<MaterialRequirement>,
    pub priority: String,
    pub planned_start: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartMachine {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub machine: String,
    pub operator: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordWastage {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub entries: Vec<WastageEntry>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteBatch {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub produced_quantity: u32,
    pub quality_grade: QualityGrade,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBatch {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchCommand {
    PlanBatch(PlanBatch),
    StartMachine(StartMachine),
    RecordWastage(RecordWastage),
    CompleteBatch(CompleteBatch),
    CancelBatch(CancelBatch),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPlanned {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub product_id: ProductId,
    pub order_id: Option<AggregateId>,
    pub planned_quantity: u32,
    pub sqm_per_unit: f64,
    pub material_plan: Vec<MaterialRequirement>,
    pub priority: String,
    pub planned_start: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// The planned materials were drawn from stock at this point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStarted {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub machine: String,
    pub operator: Option<String>,
    pub consumed: Vec<MaterialRequirement>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WastageRecorded {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub entries: Vec<WastageEntry>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCompleted {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub product_id: ProductId,
    pub order_id: Option<AggregateId>,
    pub planned_quantity: u32,
    pub produced_quantity: u32,
    pub quality_grade: QualityGrade,
    pub yield_percent: f64,
    pub wastage_percent: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCancelled {
    pub tenant_id: TenantId,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub stage: BatchStatus,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchEvent {
    BatchPlanned(BatchPlanned),
    MachineStarted(MachineStarted),
    WastageRecorded(WastageRecorded),
    BatchCompleted(BatchCompleted),
    BatchCancelled(BatchCancelled),
}

impl Event for BatchEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BatchEvent::BatchPlanned(_) => "production.batch.planned",
            BatchEvent::MachineStarted(_) => "production.batch.machine_started",
            BatchEvent::WastageRecorded(_) => "production.batch.wastage_recorded",
            BatchEvent::BatchCompleted(_) => "production.batch.completed",
            BatchEvent::BatchCancelled(_) => "production.batch.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BatchEvent::BatchPlanned(e) => e.occurred_at,
            BatchEvent::MachineStarted(e) => e.occurred_at,
            BatchEvent::WastageRecorded(e) => e.occurred_at,
            BatchEvent::BatchCompleted(e) => e.occurred_at,
            BatchEvent::BatchCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ProductionBatch {
    type Command = BatchCommand;
    type Event = BatchEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BatchEvent::BatchPlanned(e) => {
                self.id = e.batch_id;
                self.tenant_id = Some(e.tenant_id);
                self.batch_number = e.batch_number.clone();
                self.product_id = Some(e.product_id);
                self.order_id = e.order_id;
                self.planned_quantity = e.planned_quantity;
                self.sqm_per_unit = e.sqm_per_unit;
                self.material_plan = e.material_plan.clone();
                self.priority = e.priority.clone();
                self.planned_start = e.planned_start;
                self.status = BatchStatus::Planning;
                self.created = true;
            }
            BatchEvent::MachineStarted(e) => {
                self.status = BatchStatus::Machine;
                self.machine = Some(e.machine.clone());
                self.operator = e.operator.clone();
                self.started_at = Some(e.occurred_at);
            }
            BatchEvent::WastageRecorded(e) => {
                self.status = BatchStatus::Wastage;
                self.wastage.extend(e.entries.iter().cloned());
            }
            BatchEvent::BatchCompleted(e) => {
                self.status = BatchStatus::Completed;
                self.produced_quantity = e.produced_quantity;
                self.quality_grade = Some(e.quality_grade);
                self.completed_at = Some(e.occurred_at);
            }
            BatchEvent::BatchCancelled(e) => {
                self.status = BatchStatus::Cancelled;
                self.cancel_reason = Some(e.reason.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            BatchCommand::PlanBatch(cmd) => self.handle_plan(cmd),
            BatchCommand::StartMachine(cmd) => self.handle_start(cmd),
            BatchCommand::RecordWastage(cmd) => self.handle_wastage(cmd),
            BatchCommand::CompleteBatch(cmd) => self.handle_complete(cmd),
            BatchCommand::CancelBatch(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl ProductionBatch {
    fn ensure_existing(&self, tenant_id: TenantId, batch_id: BatchId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != batch_id {
            return Err(DomainError::invariant("batch_id mismatch"));
        }
        Ok(())
    }

    fn ensure_stage(&self, allowed: &[BatchStatus], action: &str) -> Result<(), DomainError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(DomainError::invariant(format!(
            "cannot {action} batch {} in the {} stage",
            self.batch_number,
            self.status.as_str()
        )))
    }

    fn handle_plan(&self, cmd: &PlanBatch) -> Result<Vec<BatchEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("batch already exists"));
        }
        if self.id != cmd.batch_id {
            return Err(DomainError::invariant("batch_id mismatch"));
        }
        if cmd.batch_number.trim().is_empty() {
            return Err(DomainError::validation("batch number cannot be empty"));
        }
        if cmd.planned_quantity == 0 {
            return Err(DomainError::validation(
                "planned quantity must be at least 1",
            ));
        }
        validate_positive("sqm_per_unit", cmd.sqm_per_unit)?;
        if cmd.material_plan.is_empty() {
            return Err(DomainError::invariant(
                "the product has no recipe; set one before planning production",
            ));
        }

        let priority = match cmd.priority.trim() {
            "" => "normal".to_string(),
            p => p.to_ascii_lowercase(),
        };

        Ok(vec![BatchEvent::BatchPlanned(BatchPlanned {
            tenant_id: cmd.tenant_id,
            batch_id: cmd.batch_id,
            batch_number: cmd.batch_number.trim().to_string(),
            product_id: cmd.product_id,
            order_id: cmd.order_id,
            planned_quantity: cmd.planned_quantity,
            sqm_per_unit: cmd.sqm_per_unit,
            material_plan: cmd.material_plan.clone(),
            priority,
            planned_start: cmd.planned_start,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start(&self, cmd: &StartMachine) -> Result<Vec<BatchEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.batch_id)?;
        self.ensure_stage(&[BatchStatus::Planning], "start")?;

        let machine = cmd.machine.trim();
        if machine.is_empty() {
            return Err(DomainError::validation("machine is required"));
        }

        Ok(vec![BatchEvent::MachineStarted(MachineStarted {
            tenant_id: cmd.tenant_id,
            batch_id: cmd.batch_id,
            batch_number: self.batch_number.clone(),
            machine: machine.to_string(),
            operator: cmd
                .operator
                .as_deref()
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string),
            consumed: self.material_plan.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_wastage(&self, cmd: &RecordWastage) -> Result<Vec<BatchEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.batch_id)?;
        self.ensure_stage(&[BatchStatus::Machine, BatchStatus::Wastage], "record wastage for")?;

        if cmd.entries.is_empty() {
            return Err(DomainError::validation("at least one wastage entry is required"));
        }

        let mut entries = Vec::with_capacity(cmd.entries.len());
        for entry in &cmd.entries {
            let quantity = round_quantity(entry.quantity);
            validate_positive("wastage quantity", quantity)?;
            let planned = self
                .material_plan
                .iter()
                .find(|r| r.material_id == entry.material_id)
                .ok_or_else(|| {
                    DomainError::invariant(format!(
                        "material {} is not part of batch {}",
                        entry.material_id, self.batch_number
                    ))
                })?;
            let already: f64 = self
                .wastage
                .iter()
                .chain(entries.iter())
                .filter(|w| w.material_id == entry.material_id)
                .map(|w| w.quantity)
                .sum();
            if already + quantity > planned.quantity + 1e-9 {
                return Err(DomainError::invariant(format!(
                    "wastage of material {} exceeds the {} consumed",
                    entry.material_id, planned.quantity
                )));
            }
            let reason = entry.reason.trim();
            if reason.is_empty() {
                return Err(DomainError::validation("wastage reason is required"));
            }
            entries.push(WastageEntry {
                material_id: entry.material_id,
                quantity,
                reason: reason.to_string(),
            });
        }

        Ok(vec![BatchEvent::WastageRecorded(WastageRecorded {
            tenant_id: cmd.tenant_id,
            batch_id: cmd.batch_id,
            entries,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteBatch) -> Result<Vec<BatchEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.batch_id)?;
        self.ensure_stage(&[BatchStatus::Machine, BatchStatus::Wastage], "complete")?;

        if cmd.produced_quantity == 0 || cmd.produced_quantity > self.planned_quantity {
            return Err(DomainError::validation(format!(
                "produced quantity must be between 1 and {}",
                self.planned_quantity
            )));
        }
        let product_id = self.product_id.ok_or_else(DomainError::not_found)?;

        Ok(vec![BatchEvent::BatchCompleted(BatchCompleted {
            tenant_id: cmd.tenant_id,
            batch_id: cmd.batch_id,
            batch_number: self.batch_number.clone(),
            product_id,
            order_id: self.order_id,
            planned_quantity: self.planned_quantity,
            produced_quantity: cmd.produced_quantity,
            quality_grade: cmd.quality_grade,
            yield_percent: yield_percent(cmd.produced_quantity, self.planned_quantity),
            wastage_percent: self.wastage_percent(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelBatch) -> Result<Vec<BatchEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.batch_id)?;
        self.ensure_stage(&[BatchStatus::Planning, BatchStatus::Machine], "cancel")?;

        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("a cancellation reason is required"));
        }

        Ok(vec![BatchEvent::BatchCancelled(BatchCancelled {
            tenant_id: cmd.tenant_id,
            batch_id: cmd.batch_id,
            batch_number: self.batch_number.clone(),
            stage: self.status,
            reason: reason.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomworks_events::execute;
    use proptest::prelude::*;

    struct Fixture {
        batch: ProductionBatch,
        tenant_id: TenantId,
        batch_id: BatchId,
        wool: RawMaterialId,
    }

    fn planned(quantity: u32) -> Fixture {
        let tenant_id = TenantId::new();
        let batch_id = BatchId::new(AggregateId::new());
        let wool = RawMaterialId::new(AggregateId::new());
        let mut batch = ProductionBatch::empty(batch_id);
        execute(
            &mut batch,
            &BatchCommand::PlanBatch(PlanBatch {
                tenant_id,
                batch_id,
                batch_number: "BATCH-20261019-c0ffee".to_string(),
                product_id: ProductId::new(AggregateId::new()),
                order_id: None,
                planned_quantity: quantity,
                sqm_per_unit: 6.0,
                material_plan: vec![MaterialRequirement {
                    material_id: wool,
                    quantity: 2.5 * 6.0 * f64::from(quantity),
                }],
                priority: "HIGH".to_string(),
                planned_start: NaiveDate::from_ymd_opt(2026, 10, 20),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        Fixture {
            batch,
            tenant_id,
            batch_id,
            wool,
        }
    }

    fn start(f: &mut Fixture) {
        execute(
            &mut f.batch,
            &BatchCommand::StartMachine(StartMachine {
                tenant_id: f.tenant_id,
                batch_id: f.batch_id,
                machine: "Loom 3".to_string(),
                operator: Some("Ravi".to_string()),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
    }

    fn complete(f: &Fixture, produced: u32) -> BatchCommand {
        BatchCommand::CompleteBatch(CompleteBatch {
            tenant_id: f.tenant_id,
            batch_id: f.batch_id,
            produced_quantity: produced,
            quality_grade: QualityGrade::A,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn plan_lowercases_priority() {
        let f = planned(4);
        assert_eq!(f.batch.priority(), "high");
        assert_eq!(f.batch.status(), BatchStatus::Planning);
        assert_eq!(f.batch.total_sqm(), 24.0);
        assert_eq!(f.batch.consumed_total(), 0.0);
    }

    #[test]
    fn plan_without_recipe_is_rejected() {
        let batch_id = BatchId::new(AggregateId::new());
        let err = ProductionBatch::empty(batch_id)
            .handle(&BatchCommand::PlanBatch(PlanBatch {
                tenant_id: TenantId::new(),
                batch_id,
                batch_number: "BATCH-1".to_string(),
                product_id: ProductId::new(AggregateId::new()),
                order_id: None,
                planned_quantity: 1,
                sqm_per_unit: 1.0,
                material_plan: Vec::new(),
                priority: String::new(),
                planned_start: None,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn cannot_complete_from_planning() {
        let f = planned(4);
        let err = f.batch.handle(&complete(&f, 4)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(m) if m.contains("planning stage")));
    }

    #[test]
    fn full_walk_through_stages() {
        let mut f = planned(4);
        start(&mut f);
        assert_eq!(f.batch.status(), BatchStatus::Machine);
        assert_eq!(f.batch.consumed_total(), 60.0);

        execute(
            &mut f.batch,
            &BatchCommand::RecordWastage(RecordWastage {
                tenant_id: f.tenant_id,
                batch_id: f.batch_id,
                entries: vec![WastageEntry {
                    material_id: f.wool,
                    quantity: 3.0,
                    reason: "Yarn breakage".to_string(),
                }],
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(f.batch.status(), BatchStatus::Wastage);

        let cmd = complete(&f, 3);
        let events = execute(&mut f.batch, &cmd).unwrap();
        match &events[0] {
            BatchEvent::BatchCompleted(e) => {
                assert_eq!(e.yield_percent, 75.0);
                assert_eq!(e.wastage_percent, 5.0);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(f.batch.status(), BatchStatus::Completed);
        assert_eq!(f.batch.produced_quantity(), 3);
    }

    #[test]
    fn wastage_of_unplanned_material_is_rejected() {
        let mut f = planned(1);
        start(&mut f);
        let err = f
            .batch
            .handle(&BatchCommand::RecordWastage(RecordWastage {
                tenant_id: f.tenant_id,
                batch_id: f.batch_id,
                entries: vec![WastageEntry {
                    material_id: RawMaterialId::new(AggregateId::new()),
                    quantity: 1.0,
                    reason: "spill".to_string(),
                }],
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn wastage_that_rounds_to_zero_is_rejected() {
        let mut f = planned(1);
        start(&mut f);
        let err = f
            .batch
            .handle(&BatchCommand::RecordWastage(RecordWastage {
                tenant_id: f.tenant_id,
                batch_id: f.batch_id,
                entries: vec![WastageEntry {
                    material_id: f.wool,
                    quantity: 0.0004,
                    reason: "lint".to_string(),
                }],
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn overproduction_is_rejected() {
        let mut f = planned(2);
        start(&mut f);
        assert!(matches!(
            f.batch.handle(&complete(&f, 3)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn cancel_only_before_wastage() {
        let mut f = planned(2);
        start(&mut f);
        let cancel = BatchCommand::CancelBatch(CancelBatch {
            tenant_id: f.tenant_id,
            batch_id: f.batch_id,
            reason: "loom breakdown".to_string(),
            occurred_at: Utc::now(),
        });
        let events = f.batch.handle(&cancel).unwrap();
        assert!(matches!(&events[0], BatchEvent::BatchCancelled(e) if e.stage == BatchStatus::Machine));

        let cmd = complete(&f, 2);
        execute(&mut f.batch, &cmd).unwrap();
        assert!(f.batch.handle(&cancel).is_err());
    }

    #[test]
    fn metric_helpers_guard_zero() {
        assert_eq!(yield_percent(5, 0), 0.0);
        assert_eq!(wastage_percent(1.0, 0.0), 0.0);
        assert_eq!(wastage_percent(1.0, 3.0), 33.33);
    }

    proptest! {
        #[test]
        fn yield_is_within_bounds(planned_qty in 1u32..500, produced_frac in 0.0f64..=1.0) {
            let produced = ((f64::from(planned_qty) * produced_frac).round() as u32).max(1);
            let y = yield_percent(produced, planned_qty);
            prop_assert!(y > 0.0 && y <= 100.0);
        }
    }
}
