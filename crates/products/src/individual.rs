//! Physically tagged pieces.
//!
//! Each finished carpet coming off a batch gets its own stream, a serial
//! number and a QR payload so it can be scanned through dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomworks_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use loomworks_events::Event;

use crate::product::{Dimensions, ProductId};

pub const QR_PREFIX: &str = "loomworks:ip:";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndividualProductId(pub AggregateId);

impl IndividualProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for IndividualProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityGrade {
    #[default]
    A,
    B,
    C,
}

impl QualityGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityGrade::A => "A",
            QualityGrade::B => "B",
            QualityGrade::C => "C",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(QualityGrade::A),
            "B" => Some(QualityGrade::B),
            "C" => Some(QualityGrade::C),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceStatus {
    Available,
    Reserved,
    Sold,
    Damaged,
}

impl PieceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PieceStatus::Available => "available",
            PieceStatus::Reserved => "reserved",
            PieceStatus::Sold => "sold",
            PieceStatus::Damaged => "damaged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Some(PieceStatus::Available),
            "reserved" => Some(PieceStatus::Reserved),
            "sold" => Some(PieceStatus::Sold),
            "damaged" => Some(PieceStatus::Damaged),
            _ => None,
        }
    }
}

pub fn qr_payload(serial: &str) -> String {
    format!("{QR_PREFIX}{serial}")
}

/// Serial from a scanned QR payload, or the input itself when it is already a
/// bare serial.
pub fn serial_from_scan(scanned: &str) -> &str {
    let s = scanned.trim();
    s.strip_prefix(QR_PREFIX).unwrap_or(s)
}

fn validate_serial(serial: &str) -> Result<String, DomainError> {
    let s = serial.trim().to_ascii_uppercase();
    if s.is_empty() {
        return Err(DomainError::validation("serial number cannot be empty"));
    }
    if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(DomainError::validation(
            "serial number may only contain letters, digits and '-'",
        ));
    }
    Ok(s)
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndividualProduct {
    id: IndividualProductId,
    tenant_id: Option<TenantId>,
    product_id: Option<ProductId>,
    batch_id: Option<AggregateId>,
    serial_number: String,
    qr_code: String,
    quality_grade: QualityGrade,
    actual_dimensions: Option<Dimensions>,
    status: PieceStatus,
    order_id: Option<AggregateId>,
    version: u64,
    created: bool,
}

impl IndividualProduct {
    pub fn empty(id: IndividualProductId) -> Self {
        Self {
            id,
            tenant_id: None,
            product_id: None,
            batch_id: None,
            serial_number: String::new(),
            qr_code: String::new(),
            quality_grade: QualityGrade::default(),
            actual_dimensions: None,
            status: PieceStatus::Available,
            order_id: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> IndividualProductId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn batch_id(&self) -> Option<AggregateId> {
        self.batch_id
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn qr_code(&self) -> &str {
        &self.qr_code
    }

    pub fn quality_grade(&self) -> QualityGrade {
        self.quality_grade
    }

    pub fn actual_dimensions(&self) -> Option<Dimensions> {
        self.actual_dimensions
    }

    pub fn status(&self) -> PieceStatus {
        self.status
    }

    pub fn order_id(&self) -> Option<AggregateId> {
        self.order_id
    }
}

impl AggregateRoot for IndividualProduct {
    type Id = IndividualProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPiece {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub product_id: ProductId,
    pub batch_id: Option<AggregateId>,
    pub serial_number: String,
    pub quality_grade: QualityGrade,
    pub actual_dimensions: Option<Dimensions>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservePiece {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub order_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePiece {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellPiece {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub order_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPieceDamaged {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndividualProductCommand {
    RegisterPiece(RegisterPiece),
    ReservePiece(ReservePiece),
    ReleasePiece(ReleasePiece),
    SellPiece(SellPiece),
    MarkPieceDamaged(MarkPieceDamaged),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceRegistered {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub product_id: ProductId,
    pub batch_id: Option<AggregateId>,
    pub serial_number: String,
    pub qr_code: String,
    pub quality_grade: QualityGrade,
    pub actual_dimensions: Option<Dimensions>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceReserved {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub order_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceReleased {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceSold {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub order_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceDamaged {
    pub tenant_id: TenantId,
    pub piece_id: IndividualProductId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndividualProductEvent {
    PieceRegistered(PieceRegistered),
    PieceReserved(PieceReserved),
    PieceReleased(PieceReleased),
    PieceSold(PieceSold),
    PieceDamaged(PieceDamaged),
}

impl Event for IndividualProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IndividualProductEvent::PieceRegistered(_) => "products.piece.registered",
            IndividualProductEvent::PieceReserved(_) => "products.piece.reserved",
            IndividualProductEvent::PieceReleased(_) => "products.piece.released",
            IndividualProductEvent::PieceSold(_) => "products.piece.sold",
            IndividualProductEvent::PieceDamaged(_) => "products.piece.damaged",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            IndividualProductEvent::PieceRegistered(e) => e.occurred_at,
            IndividualProductEvent::PieceReserved(e) => e.occurred_at,
            IndividualProductEvent::PieceReleased(e) => e.occurred_at,
            IndividualProductEvent::PieceSold(e) => e.occurred_at,
            IndividualProductEvent::PieceDamaged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for IndividualProduct {
    type Command = IndividualProductCommand;
    type Event = IndividualProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            IndividualProductEvent::PieceRegistered(e) => {
                self.id = e.piece_id;
                self.tenant_id = Some(e.tenant_id);
                self.product_id = Some(e.product_id);
                self.batch_id = e.batch_id;
                self.serial_number = e.serial_number.clone();
                self.qr_code = e.qr_code.clone();
                self.quality_grade = e.quality_grade;
                self.actual_dimensions = e.actual_dimensions;
                self.status = PieceStatus::Available;
                self.created = true;
            }
            IndividualProductEvent::PieceReserved(e) => {
                self.status = PieceStatus::Reserved;
                self.order_id = Some(e.order_id);
            }
            IndividualProductEvent::PieceReleased(_) => {
                self.status = PieceStatus::Available;
                self.order_id = None;
            }
            IndividualProductEvent::PieceSold(e) => {
                self.status = PieceStatus::Sold;
                self.order_id = Some(e.order_id);
            }
            IndividualProductEvent::PieceDamaged(_) => {
                self.status = PieceStatus::Damaged;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            IndividualProductCommand::RegisterPiece(cmd) => self.handle_register(cmd),
            IndividualProductCommand::ReservePiece(cmd) => self.handle_reserve(cmd),
            IndividualProductCommand::ReleasePiece(cmd) => self.handle_release(cmd),
            IndividualProductCommand::SellPiece(cmd) => self.handle_sell(cmd),
            IndividualProductCommand::MarkPieceDamaged(cmd) => self.handle_damaged(cmd),
        }
    }
}

impl IndividualProduct {
    fn ensure_existing(
        &self,
        tenant_id: TenantId,
        piece_id: IndividualProductId,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != piece_id {
            return Err(DomainError::invariant("piece_id mismatch"));
        }
        Ok(())
    }

    fn transition_error(&self, action: &str) -> DomainError {
        DomainError::invariant(format!(
            "cannot {action} piece {} while it is {}",
            self.serial_number,
            self.status.as_str()
        ))
    }

    fn handle_register(&self, cmd: &RegisterPiece) -> Result<Vec<IndividualProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("piece already registered"));
        }
        if self.id != cmd.piece_id {
            return Err(DomainError::invariant("piece_id mismatch"));
        }
        let serial_number = validate_serial(&cmd.serial_number)?;
        if let Some(d) = &cmd.actual_dimensions {
            d.validate()?;
        }

        Ok(vec![IndividualProductEvent::PieceRegistered(PieceRegistered {
            tenant_id: cmd.tenant_id,
            piece_id: cmd.piece_id,
            product_id: cmd.product_id,
            batch_id: cmd.batch_id,
            qr_code: qr_payload(&serial_number),
            serial_number,
            quality_grade: cmd.quality_grade,
            actual_dimensions: cmd.actual_dimensions,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reserve(&self, cmd: &ReservePiece) -> Result<Vec<IndividualProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.piece_id)?;
        if self.status != PieceStatus::Available {
            return Err(self.transition_error("reserve"));
        }
        Ok(vec![IndividualProductEvent::PieceReserved(PieceReserved {
            tenant_id: cmd.tenant_id,
            piece_id: cmd.piece_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &ReleasePiece) -> Result<Vec<IndividualProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.piece_id)?;
        if self.status != PieceStatus::Reserved {
            return Err(self.transition_error("release"));
        }
        Ok(vec![IndividualProductEvent::PieceReleased(PieceReleased {
            tenant_id: cmd.tenant_id,
            piece_id: cmd.piece_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Available pieces can be sold directly; reserved ones only to the order
    /// holding them.
    fn handle_sell(&self, cmd: &SellPiece) -> Result<Vec<IndividualProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.piece_id)?;
        match self.status {
            PieceStatus::Available => {}
            PieceStatus::Reserved if self.order_id == Some(cmd.order_id) => {}
            PieceStatus::Reserved => {
                return Err(DomainError::invariant(format!(
                    "piece {} is reserved for another order",
                    self.serial_number
                )));
            }
            _ => return Err(self.transition_error("sell")),
        }
        Ok(vec![IndividualProductEvent::PieceSold(PieceSold {
            tenant_id: cmd.tenant_id,
            piece_id: cmd.piece_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_damaged(&self, cmd: &MarkPieceDamaged) -> Result<Vec<IndividualProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.piece_id)?;
        if !matches!(self.status, PieceStatus::Available | PieceStatus::Reserved) {
            return Err(self.transition_error("mark damaged"));
        }
        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("a damage reason is required"));
        }
        Ok(vec![IndividualProductEvent::PieceDamaged(PieceDamaged {
            tenant_id: cmd.tenant_id,
            piece_id: cmd.piece_id,
            reason: reason.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomworks_events::execute;

    fn registered() -> (IndividualProduct, TenantId, IndividualProductId) {
        let tenant_id = TenantId::new();
        let piece_id = IndividualProductId::new(AggregateId::new());
        let mut piece = IndividualProduct::empty(piece_id);
        execute(
            &mut piece,
            &IndividualProductCommand::RegisterPiece(RegisterPiece {
                tenant_id,
                piece_id,
                product_id: ProductId::new(AggregateId::new()),
                batch_id: Some(AggregateId::new()),
                serial_number: "km-58-red-a1b2c3-001".to_string(),
                quality_grade: QualityGrade::A,
                actual_dimensions: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        (piece, tenant_id, piece_id)
    }

    #[test]
    fn register_derives_qr_payload() {
        let (piece, _, _) = registered();
        assert_eq!(piece.serial_number(), "KM-58-RED-A1B2C3-001");
        assert_eq!(piece.qr_code(), "loomworks:ip:KM-58-RED-A1B2C3-001");
        assert_eq!(serial_from_scan(piece.qr_code()), piece.serial_number());
        assert_eq!(serial_from_scan(" KM-1 "), "KM-1");
        assert_eq!(piece.status(), PieceStatus::Available);
    }

    #[test]
    fn reserve_release_sell() {
        let (mut piece, tenant_id, piece_id) = registered();
        let order = AggregateId::new();

        execute(
            &mut piece,
            &IndividualProductCommand::ReservePiece(ReservePiece {
                tenant_id,
                piece_id,
                order_id: order,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(piece.status(), PieceStatus::Reserved);

        let other_order = piece.handle(&IndividualProductCommand::SellPiece(SellPiece {
            tenant_id,
            piece_id,
            order_id: AggregateId::new(),
            occurred_at: Utc::now(),
        }));
        assert!(matches!(other_order, Err(DomainError::InvariantViolation(_))));

        execute(
            &mut piece,
            &IndividualProductCommand::ReleasePiece(ReleasePiece {
                tenant_id,
                piece_id,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(piece.status(), PieceStatus::Available);
        assert_eq!(piece.order_id(), None);

        execute(
            &mut piece,
            &IndividualProductCommand::SellPiece(SellPiece {
                tenant_id,
                piece_id,
                order_id: order,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(piece.status(), PieceStatus::Sold);
    }

    #[test]
    fn sold_piece_cannot_be_damaged() {
        let (mut piece, tenant_id, piece_id) = registered();
        execute(
            &mut piece,
            &IndividualProductCommand::SellPiece(SellPiece {
                tenant_id,
                piece_id,
                order_id: AggregateId::new(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let err = piece
            .handle(&IndividualProductCommand::MarkPieceDamaged(MarkPieceDamaged {
                tenant_id,
                piece_id,
                reason: "torn fringe".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(m) if m.contains("while it is sold")));
    }

    #[test]
    fn release_requires_reservation() {
        let (piece, tenant_id, piece_id) = registered();
        assert!(piece
            .handle(&IndividualProductCommand::ReleasePiece(ReleasePiece {
                tenant_id,
                piece_id,
                occurred_at: Utc::now(),
            }))
            .is_err());
    }

    #[test]
    fn grade_and_status_parse() {
        assert_eq!(QualityGrade::parse("b"), Some(QualityGrade::B));
        assert_eq!(QualityGrade::parse("D"), None);
        assert_eq!(PieceStatus::parse("Reserved"), Some(PieceStatus::Reserved));
    }
}
