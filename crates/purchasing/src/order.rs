use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use loomworks_core::validation::validate_positive;
use loomworks_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use loomworks_events::Event;
use loomworks_inventory::{RawMaterialId, round_quantity};
use loomworks_parties::PartyId;

/// Purchase order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Ordered,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Ordered => "ordered",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(PurchaseOrderStatus::Draft),
            "ordered" => Some(PurchaseOrderStatus::Ordered),
            "received" => Some(PurchaseOrderStatus::Received),
            "cancelled" => Some(PurchaseOrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Purchase order line. `unit_cost` is paise per material unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub line_no: u32,
    pub material_id: RawMaterialId,
    pub quantity: f64,
    pub unit_cost: u64,
}

impl LineItem {
    pub fn line_cost(&self) -> u64 {
        (self.quantity * self.unit_cost as f64).round() as u64
    }
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    tenant_id: Option<TenantId>,
    po_number: String,
    supplier_id: Option<PartyId>,
    status: PurchaseOrderStatus,
    lines: Vec<LineItem>,
    expected_delivery: Option<NaiveDate>,
    notes: Option<String>,
    received_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            po_number: String::new(),
            supplier_id: None,
            status: PurchaseOrderStatus::Draft,
            lines: Vec::new(),
            expected_delivery: None,
            notes: None,
            received_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn po_number(&self) -> &str {
        &self.po_number
    }

    pub fn supplier_id(&self) -> Option<PartyId> {
        self.supplier_id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn expected_delivery(&self) -> Option<NaiveDate> {
        self.expected_delivery
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    /// Σ quantity × unit cost, rounded to paise per line.
    pub fn total_cost(&self) -> u64 {
        self.lines.iter().map(LineItem::line_cost).sum()
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Line input for [`CreatePurchaseOrder`]; the aggregate assigns line numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPurchaseLine {
    pub material_id: RawMaterialId,
    pub quantity: f64,
    pub unit_cost: u64,
}

/// Creates the order together with its opening lines; one bad line rejects
/// the whole command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: PartyId,
    pub lines: Vec<NewPurchaseLine>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Only allowed in Draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddLine {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub material_id: RawMaterialId,
    pub quantity: f64,
    pub unit_cost: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Sends the order to the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveGoods {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPurchaseOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    AddLine(AddLine),
    PlaceOrder(PlaceOrder),
    ReceiveGoods(ReceiveGoods),
    CancelPurchaseOrder(CancelPurchaseOrder),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: PartyId,
    #[serde(default)]
    pub lines: Vec<LineItem>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderLineAdded {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line: LineItem,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderPlaced {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: PartyId,
    pub total_cost: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Carries the received lines so stock can be booked in for every material
/// without reloading the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsReceived {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: PartyId,
    pub lines: Vec<LineItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCancelled {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub po_number: String,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    PurchaseOrderLineAdded(PurchaseOrderLineAdded),
    PurchaseOrderPlaced(PurchaseOrderPlaced),
    GoodsReceived(GoodsReceived),
    PurchaseOrderCancelled(PurchaseOrderCancelled),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::PurchaseOrderLineAdded(_) => "purchasing.order.line_added",
            PurchaseOrderEvent::PurchaseOrderPlaced(_) => "purchasing.order.placed",
            PurchaseOrderEvent::GoodsReceived(_) => "purchasing.order.goods_received",
            PurchaseOrderEvent::PurchaseOrderCancelled(_) => "purchasing.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderPlaced(e) => e.occurred_at,
            PurchaseOrderEvent::GoodsReceived(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.po_number = e.po_number.clone();
                self.supplier_id = Some(e.supplier_id);
                self.status = PurchaseOrderStatus::Draft;
                self.lines = e.lines.clone();
                self.expected_delivery = e.expected_delivery;
                self.notes = e.notes.clone();
                self.created = true;
            }
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            PurchaseOrderEvent::PurchaseOrderPlaced(_) => {
                self.status = PurchaseOrderStatus::Ordered;
            }
            PurchaseOrderEvent::GoodsReceived(e) => {
                self.status = PurchaseOrderStatus::Received;
                self.received_at = Some(e.occurred_at);
            }
            PurchaseOrderEvent::PurchaseOrderCancelled(_) => {
                self.status = PurchaseOrderStatus::Cancelled;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PurchaseOrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            PurchaseOrderCommand::ReceiveGoods(cmd) => self.handle_receive(cmd),
            PurchaseOrderCommand::CancelPurchaseOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_order_id(order_id)
    }

    fn supplier(&self) -> Result<PartyId, DomainError> {
        self.supplier_id.ok_or_else(DomainError::not_found)
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }
        self.ensure_order_id(cmd.order_id)?;
        if cmd.po_number.trim().is_empty() {
            return Err(DomainError::validation("PO number cannot be empty"));
        }

        let mut lines: Vec<LineItem> = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            let item = line_item(&lines, line.material_id, line.quantity, line.unit_cost)?;
            lines.push(item);
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(
            PurchaseOrderCreated {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                po_number: cmd.po_number.trim().to_string(),
                supplier_id: cmd.supplier_id,
                lines,
                expected_delivery: cmd.expected_delivery,
                notes: cmd
                    .notes
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(
                "cannot modify purchase order once it is placed",
            ));
        }
        let line = line_item(&self.lines, cmd.material_id, cmd.quantity, cmd.unit_cost)?;

        Ok(vec![PurchaseOrderEvent::PurchaseOrderLineAdded(
            PurchaseOrderLineAdded {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                line,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(
                "only draft purchase orders can be placed",
            ));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot place purchase order without lines",
            ));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderPlaced(
            PurchaseOrderPlaced {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                po_number: self.po_number.clone(),
                supplier_id: self.supplier()?,
                total_cost: self.total_cost(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_receive(&self, cmd: &ReceiveGoods) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Ordered {
            return Err(DomainError::invariant(
                "cannot receive goods for purchase order that is not ordered",
            ));
        }

        Ok(vec![PurchaseOrderEvent::GoodsReceived(GoodsReceived {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            po_number: self.po_number.clone(),
            supplier_id: self.supplier()?,
            lines: self.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(
        &self,
        cmd: &CancelPurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if !matches!(
            self.status,
            PurchaseOrderStatus::Draft | PurchaseOrderStatus::Ordered
        ) {
            return Err(DomainError::invariant(format!(
                "cannot cancel a purchase order that is {}",
                self.status.as_str()
            )));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCancelled(
            PurchaseOrderCancelled {
                tenant_id: cmd.tenant_id,
                order_id: cmd.order_id,
                po_number: self.po_number.clone(),
                reason: cmd.reason.trim().to_string(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

/// Next line after `existing`: positive rounded quantity, non-zero cost, one
/// line per material.
fn line_item(
    existing: &[LineItem],
    material_id: RawMaterialId,
    quantity: f64,
    unit_cost: u64,
) -> Result<LineItem, DomainError> {
    let quantity = round_quantity(quantity);
    validate_positive("quantity", quantity)?;
    if unit_cost == 0 {
        return Err(DomainError::validation("unit_cost must be positive"));
    }
    if existing.iter().any(|l| l.material_id == material_id) {
        return Err(DomainError::validation(format!(
            "material {material_id} is already on this purchase order"
        )));
    }

    Ok(LineItem {
        line_no: existing.len() as u32 + 1,
        material_id,
        quantity,
        unit_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomworks_events::execute;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn material() -> RawMaterialId {
        RawMaterialId::new(AggregateId::new())
    }

    struct Fixture {
        po: PurchaseOrder,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    }

    fn draft() -> Fixture {
        let tenant_id = TenantId::new();
        let order_id = PurchaseOrderId::new(AggregateId::new());
        let mut po = PurchaseOrder::empty(order_id);
        execute(
            &mut po,
            &PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                tenant_id,
                order_id,
                po_number: " PO-20261019-0a1b2c ".to_string(),
                supplier_id: PartyId::new(AggregateId::new()),
                lines: Vec::new(),
                expected_delivery: None,
                notes: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        Fixture {
            po,
            tenant_id,
            order_id,
        }
    }

    fn add_line(f: &Fixture, material_id: RawMaterialId, quantity: f64, unit_cost: u64) -> PurchaseOrderCommand {
        PurchaseOrderCommand::AddLine(AddLine {
            tenant_id: f.tenant_id,
            order_id: f.order_id,
            material_id,
            quantity,
            unit_cost,
            occurred_at: test_time(),
        })
    }

    fn place(f: &Fixture) -> PurchaseOrderCommand {
        PurchaseOrderCommand::PlaceOrder(PlaceOrder {
            tenant_id: f.tenant_id,
            order_id: f.order_id,
            occurred_at: test_time(),
        })
    }

    fn receive(f: &Fixture) -> PurchaseOrderCommand {
        PurchaseOrderCommand::ReceiveGoods(ReceiveGoods {
            tenant_id: f.tenant_id,
            order_id: f.order_id,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn create_trims_po_number() {
        let f = draft();
        assert_eq!(f.po.po_number(), "PO-20261019-0a1b2c");
        assert_eq!(f.po.status(), PurchaseOrderStatus::Draft);
    }

    #[test]
    fn total_cost_sums_lines() {
        let mut f = draft();
        let cmd = add_line(&f, material(), 12.5, 450_00);
        execute(&mut f.po, &cmd).unwrap();
        let cmd = add_line(&f, material(), 3.0, 99);
        execute(&mut f.po, &cmd).unwrap();
        assert_eq!(f.po.total_cost(), 5_625_00 + 297);
    }

    #[test]
    fn cannot_place_without_lines() {
        let f = draft();
        let err = f.po.handle(&place(&f)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cannot_receive_draft() {
        let mut f = draft();
        let cmd = add_line(&f, material(), 1.0, 100);
        execute(&mut f.po, &cmd).unwrap();
        match f.po.handle(&receive(&f)).unwrap_err() {
            DomainError::InvariantViolation(msg) if msg.contains("not ordered") => {}
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn full_lifecycle_emits_received_lines() {
        let mut f = draft();
        let wool = material();
        let cmd = add_line(&f, wool, 40.0, 650_00);
        execute(&mut f.po, &cmd).unwrap();
        let cmd = place(&f);
        execute(&mut f.po, &cmd).unwrap();
        assert_eq!(f.po.status(), PurchaseOrderStatus::Ordered);

        let cmd = add_line(&f, material(), 1.0, 1);
        assert!(f.po.handle(&cmd).is_err());

        let cmd = receive(&f);
        let events = execute(&mut f.po, &cmd).unwrap();
        match &events[0] {
            PurchaseOrderEvent::GoodsReceived(e) => {
                assert_eq!(e.lines.len(), 1);
                assert_eq!(e.lines[0].material_id, wool);
                assert_eq!(e.lines[0].quantity, 40.0);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(f.po.status(), PurchaseOrderStatus::Received);
        assert!(f.po.received_at().is_some());
    }

    #[test]
    fn duplicate_material_is_rejected() {
        let mut f = draft();
        let wool = material();
        let cmd = add_line(&f, wool, 1.0, 100);
        execute(&mut f.po, &cmd).unwrap();
        assert!(matches!(
            f.po.handle(&add_line(&f, wool, 2.0, 100)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn received_order_cannot_be_cancelled() {
        let mut f = draft();
        let cmd = add_line(&f, material(), 1.0, 100);
        execute(&mut f.po, &cmd).unwrap();
        let cmd = place(&f);
        execute(&mut f.po, &cmd).unwrap();
        let cmd = receive(&f);
        execute(&mut f.po, &cmd).unwrap();

        let cancel = PurchaseOrderCommand::CancelPurchaseOrder(CancelPurchaseOrder {
            tenant_id: f.tenant_id,
            order_id: f.order_id,
            reason: "late".to_string(),
            occurred_at: test_time(),
        });
        assert!(matches!(
            f.po.handle(&cancel),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn tenant_mismatch_is_rejected() {
        let f = draft();
        let cmd = PurchaseOrderCommand::PlaceOrder(PlaceOrder {
            tenant_id: TenantId::new(),
            order_id: f.order_id,
            occurred_at: test_time(),
        });
        assert!(matches!(
            f.po.handle(&cmd),
            Err(DomainError::InvariantViolation(m)) if m == "tenant mismatch"
        ));
    }

    fn create_with_lines(lines: Vec<NewPurchaseLine>) -> (PurchaseOrder, PurchaseOrderCommand) {
        let order_id = PurchaseOrderId::new(AggregateId::new());
        let cmd = PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
            tenant_id: TenantId::new(),
            order_id,
            po_number: "PO-20261019-7f3e21".to_string(),
            supplier_id: PartyId::new(AggregateId::new()),
            lines,
            expected_delivery: None,
            notes: None,
            occurred_at: test_time(),
        });
        (PurchaseOrder::empty(order_id), cmd)
    }

    #[test]
    fn create_carries_opening_lines() {
        let wool = material();
        let latex = material();
        let (mut po, cmd) = create_with_lines(vec![
            NewPurchaseLine { material_id: wool, quantity: 50.0, unit_cost: 680_00 },
            NewPurchaseLine { material_id: latex, quantity: 12.25, unit_cost: 210_00 },
        ]);
        let events = execute(&mut po, &cmd).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(po.version(), 1);
        assert_eq!(po.lines().len(), 2);
        assert_eq!(po.lines()[0].line_no, 1);
        assert_eq!(po.lines()[1].line_no, 2);
        assert_eq!(po.lines()[1].material_id, latex);
        assert_eq!(po.total_cost(), 50 * 680_00 + 2_572_50);
    }

    #[test]
    fn create_with_a_bad_line_emits_nothing() {
        let wool = material();
        let (po, cmd) = create_with_lines(vec![
            NewPurchaseLine { material_id: wool, quantity: 50.0, unit_cost: 680_00 },
            NewPurchaseLine { material_id: material(), quantity: -1.0, unit_cost: 680_00 },
        ]);
        assert!(matches!(po.handle(&cmd), Err(DomainError::Validation(_))));

        let (po, cmd) = create_with_lines(vec![
            NewPurchaseLine { material_id: wool, quantity: 5.0, unit_cost: 100 },
            NewPurchaseLine { material_id: wool, quantity: 6.0, unit_cost: 100 },
        ]);
        assert!(matches!(po.handle(&cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn quantity_that_rounds_to_zero_is_rejected() {
        let f = draft();
        assert!(matches!(
            f.po.handle(&add_line(&f, material(), 0.0004, 100)),
            Err(DomainError::Validation(_))
        ));
    }

    proptest! {
        #[test]
        fn version_counts_applied_events(n in 1usize..10) {
            let mut f = draft();
            for _ in 0..n {
                let cmd = add_line(&f, material(), 1.0, 10);
                execute(&mut f.po, &cmd).unwrap();
            }
            prop_assert_eq!(f.po.version(), n as u64 + 1);
            prop_assert_eq!(f.po.lines().len(), n);
        }
    }
}
