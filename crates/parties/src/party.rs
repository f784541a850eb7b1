use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomworks_core::validation::{
    validate_email, validate_gstin, validate_name, validate_phone, validate_pincode,
};
use loomworks_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use loomworks_events::Event;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub AggregateId);

impl PartyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyStatus {
    Active,
    Suspended,
}

/// Only meaningful for customers; suppliers carry `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Individual,
    Business,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

impl ContactInfo {
    /// Trim every field and drop the ones left empty.
    fn normalized(&self) -> Self {
        fn clean(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
        Self {
            email: clean(&self.email).map(|e| e.to_lowercase()),
            phone: clean(&self.phone),
            address: clean(&self.address),
            city: clean(&self.city),
            state: clean(&self.state),
            pincode: clean(&self.pincode),
        }
    }

    fn validate(&self) -> Result<(), DomainError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(pincode) = &self.pincode {
            validate_pincode(pincode)?;
        }
        Ok(())
    }
}

/// A customer or supplier the company trades with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    id: PartyId,
    tenant_id: Option<TenantId>,
    kind: PartyKind,
    name: String,
    contact: ContactInfo,
    gstin: Option<String>,
    company_name: Option<String>,
    customer_type: Option<CustomerType>,
    status: PartyStatus,
    version: u64,
    created: bool,
}

impl Party {
    pub fn empty(id: PartyId) -> Self {
        Self {
            id,
            tenant_id: None,
            kind: PartyKind::Customer,
            name: String::new(),
            contact: ContactInfo::default(),
            gstin: None,
            company_name: None,
            customer_type: None,
            status: PartyStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn gstin(&self) -> Option<&str> {
        self.gstin.as_deref()
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    pub fn customer_type(&self) -> Option<CustomerType> {
        self.customer_type
    }

    pub fn status(&self) -> PartyStatus {
        self.status
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Suspended parties cannot receive new orders or purchase orders.
    pub fn can_transact(&self) -> bool {
        self.status == PartyStatus::Active
    }
}

impl AggregateRoot for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParty {
    pub tenant_id: TenantId,
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub contact: Option<ContactInfo>,
    pub gstin: Option<String>,
    pub company_name: Option<String>,
    /// Defaults to `Individual` for customers; ignored for suppliers.
    pub customer_type: Option<CustomerType>,
    pub occurred_at: DateTime<Utc>,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub tenant_id: TenantId,
    pub party_id: PartyId,
    pub name: Option<String>,
    pub contact: Option<ContactInfo>,
    pub gstin: Option<String>,
    pub company_name: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendParty {
    pub tenant_id: TenantId,
    pub party_id: PartyId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateParty {
    pub tenant_id: TenantId,
    pub party_id: PartyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyCommand {
    RegisterParty(RegisterParty),
    UpdateDetails(UpdateDetails),
    SuspendParty(SuspendParty),
    ReactivateParty(ReactivateParty),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRegistered {
    pub tenant_id: TenantId,
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub contact: ContactInfo,
    pub gstin: Option<String>,
    pub company_name: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub occurred_at: DateTime<Utc>,
}

/// Carries the full post-update details, not a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyUpdated {
    pub tenant_id: TenantId,
    pub party_id: PartyId,
    pub name: String,
    pub contact: ContactInfo,
    pub gstin: Option<String>,
    pub company_name: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySuspended {
    pub tenant_id: TenantId,
    pub party_id: PartyId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyReactivated {
    pub tenant_id: TenantId,
    pub party_id: PartyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyEvent {
    PartyRegistered(PartyRegistered),
    PartyUpdated(PartyUpdated),
    PartySuspended(PartySuspended),
    PartyReactivated(PartyReactivated),
}

impl Event for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::PartyRegistered(_) => "parties.party.registered",
            PartyEvent::PartyUpdated(_) => "parties.party.updated",
            PartyEvent::PartySuspended(_) => "parties.party.suspended",
            PartyEvent::PartyReactivated(_) => "parties.party.reactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartyEvent::PartyRegistered(e) => e.occurred_at,
            PartyEvent::PartyUpdated(e) => e.occurred_at,
            PartyEvent::PartySuspended(e) => e.occurred_at,
            PartyEvent::PartyReactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Party {
    type Command = PartyCommand;
    type Event = PartyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartyEvent::PartyRegistered(e) => {
                self.id = e.party_id;
                self.tenant_id = Some(e.tenant_id);
                self.kind = e.kind;
                self.name = e.name.clone();
                self.contact = e.contact.clone();
                self.gstin = e.gstin.clone();
                self.company_name = e.company_name.clone();
                self.customer_type = e.customer_type;
                self.status = PartyStatus::Active;
                self.created = true;
            }
            PartyEvent::PartyUpdated(e) => {
                self.name = e.name.clone();
                self.contact = e.contact.clone();
                self.gstin = e.gstin.clone();
                self.company_name = e.company_name.clone();
                self.customer_type = e.customer_type;
            }
            PartyEvent::PartySuspended(_) => {
                self.status = PartyStatus::Suspended;
            }
            PartyEvent::PartyReactivated(_) => {
                self.status = PartyStatus::Active;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartyCommand::RegisterParty(cmd) => self.handle_register(cmd),
            PartyCommand::UpdateDetails(cmd) => self.handle_update(cmd),
            PartyCommand::SuspendParty(cmd) => self.handle_suspend(cmd),
            PartyCommand::ReactivateParty(cmd) => self.handle_reactivate(cmd),
        }
    }
}

/// Validated, normalized snapshot of the editable details.
struct Details {
    name: String,
    contact: ContactInfo,
    gstin: Option<String>,
    company_name: Option<String>,
    customer_type: Option<CustomerType>,
}

fn checked_details(
    kind: PartyKind,
    name: &str,
    contact: &ContactInfo,
    gstin: Option<&str>,
    company_name: Option<&str>,
    customer_type: Option<CustomerType>,
) -> Result<Details, DomainError> {
    validate_name("name", name)?;

    let contact = contact.normalized();
    contact.validate()?;

    let gstin = gstin
        .map(|g| g.trim().to_ascii_uppercase())
        .filter(|g| !g.is_empty());
    if let Some(g) = &gstin {
        validate_gstin(g)?;
    }

    let company_name = company_name
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let customer_type = match kind {
        PartyKind::Customer => Some(customer_type.unwrap_or(CustomerType::Individual)),
        PartyKind::Supplier => None,
    };
    if customer_type == Some(CustomerType::Business) && company_name.is_none() {
        return Err(DomainError::validation(
            "business customers require a company name",
        ));
    }

    Ok(Details {
        name: name.trim().to_string(),
        contact,
        gstin,
        company_name,
        customer_type,
    })
}

impl Party {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_party_id(&self, party_id: PartyId) -> Result<(), DomainError> {
        if self.id != party_id {
            return Err(DomainError::invariant("party_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, party_id: PartyId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_party_id(party_id)
    }

    fn handle_register(&self, cmd: &RegisterParty) -> Result<Vec<PartyEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("party already exists"));
        }
        self.ensure_party_id(cmd.party_id)?;

        let d = checked_details(
            cmd.kind,
            &cmd.name,
            &cmd.contact.clone().unwrap_or_default(),
            cmd.gstin.as_deref(),
            cmd.company_name.as_deref(),
            cmd.customer_type,
        )?;

        Ok(vec![PartyEvent::PartyRegistered(PartyRegistered {
            tenant_id: cmd.tenant_id,
            party_id: cmd.party_id,
            kind: cmd.kind,
            name: d.name,
            contact: d.contact,
            gstin: d.gstin,
            company_name: d.company_name,
            customer_type: d.customer_type,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateDetails) -> Result<Vec<PartyEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.party_id)?;

        let d = checked_details(
            self.kind,
            cmd.name.as_deref().unwrap_or(&self.name),
            cmd.contact.as_ref().unwrap_or(&self.contact),
            cmd.gstin.as_deref().or(self.gstin.as_deref()),
            cmd.company_name.as_deref().or(self.company_name.as_deref()),
            cmd.customer_type.or(self.customer_type),
        )?;

        Ok(vec![PartyEvent::PartyUpdated(PartyUpdated {
            tenant_id: cmd.tenant_id,
            party_id: cmd.party_id,
            name: d.name,
            contact: d.contact,
            gstin: d.gstin,
            company_name: d.company_name,
            customer_type: d.customer_type,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendParty) -> Result<Vec<PartyEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.party_id)?;

        if self.status == PartyStatus::Suspended {
            return Err(DomainError::conflict("party is already suspended"));
        }

        Ok(vec![PartyEvent::PartySuspended(PartySuspended {
            tenant_id: cmd.tenant_id,
            party_id: cmd.party_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(&self, cmd: &ReactivateParty) -> Result<Vec<PartyEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.party_id)?;

        if self.status == PartyStatus::Active {
            return Err(DomainError::conflict("party is already active"));
        }

        Ok(vec![PartyEvent::PartyReactivated(PartyReactivated {
            tenant_id: cmd.tenant_id,
            party_id: cmd.party_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomworks_events::execute;
    use proptest::prelude::*;

    fn register(tenant_id: TenantId, party_id: PartyId, kind: PartyKind) -> RegisterParty {
        RegisterParty {
            tenant_id,
            party_id,
            kind,
            name: "Sharma Rugs".to_string(),
            contact: Some(ContactInfo {
                email: Some(" Orders@SharmaRugs.in ".to_string()),
                phone: Some("+91 98765 43210".to_string()),
                city: Some("Bhadohi".to_string()),
                pincode: Some("221401".to_string()),
                ..ContactInfo::default()
            }),
            gstin: Some("09aapfu0939f1zv".to_string()),
            company_name: None,
            customer_type: None,
            occurred_at: Utc::now(),
        }
    }

    fn registered(kind: PartyKind) -> (Party, TenantId, PartyId) {
        let tenant_id = TenantId::new();
        let party_id = PartyId::new(AggregateId::new());
        let mut party = Party::empty(party_id);
        execute(
            &mut party,
            &PartyCommand::RegisterParty(register(tenant_id, party_id, kind)),
        )
        .unwrap();
        (party, tenant_id, party_id)
    }

    #[test]
    fn register_normalizes_contact_and_gstin() {
        let (party, tenant_id, _) = registered(PartyKind::Customer);

        assert_eq!(party.tenant_id(), Some(tenant_id));
        assert_eq!(party.contact().email.as_deref(), Some("orders@sharmarugs.in"));
        assert_eq!(party.gstin(), Some("09AAPFU0939F1ZV"));
        assert_eq!(party.customer_type(), Some(CustomerType::Individual));
        assert_eq!(party.version(), 1);
    }

    #[test]
    fn supplier_has_no_customer_type() {
        let (party, _, _) = registered(PartyKind::Supplier);
        assert_eq!(party.customer_type(), None);
    }

    #[test]
    fn name_under_two_characters_is_rejected() {
        let party_id = PartyId::new(AggregateId::new());
        let mut cmd = register(TenantId::new(), party_id, PartyKind::Customer);
        cmd.name = "A".to_string();

        let err = Party::empty(party_id)
            .handle(&PartyCommand::RegisterParty(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn invalid_phone_is_rejected() {
        let party_id = PartyId::new(AggregateId::new());
        let mut cmd = register(TenantId::new(), party_id, PartyKind::Customer);
        cmd.contact.as_mut().unwrap().phone = Some("12345".to_string());

        assert!(Party::empty(party_id)
            .handle(&PartyCommand::RegisterParty(cmd))
            .is_err());
    }

    #[test]
    fn business_customer_needs_company_name() {
        let party_id = PartyId::new(AggregateId::new());
        let mut cmd = register(TenantId::new(), party_id, PartyKind::Customer);
        cmd.customer_type = Some(CustomerType::Business);

        let err = Party::empty(party_id)
            .handle(&PartyCommand::RegisterParty(cmd.clone()))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("business customers require a company name")
        );

        cmd.company_name = Some("Sharma Carpets Pvt Ltd".to_string());
        assert!(Party::empty(party_id)
            .handle(&PartyCommand::RegisterParty(cmd))
            .is_ok());
    }

    #[test]
    fn register_twice_conflicts() {
        let (party, tenant_id, party_id) = registered(PartyKind::Customer);
        let err = party
            .handle(&PartyCommand::RegisterParty(register(
                tenant_id,
                party_id,
                PartyKind::Customer,
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let (mut party, tenant_id, party_id) = registered(PartyKind::Customer);

        execute(
            &mut party,
            &PartyCommand::UpdateDetails(UpdateDetails {
                tenant_id,
                party_id,
                name: Some("Sharma Rugs & Co".to_string()),
                contact: None,
                gstin: None,
                company_name: None,
                customer_type: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        assert_eq!(party.name(), "Sharma Rugs & Co");
        assert_eq!(party.contact().city.as_deref(), Some("Bhadohi"));
        assert_eq!(party.gstin(), Some("09AAPFU0939F1ZV"));
    }

    #[test]
    fn update_from_another_tenant_is_rejected() {
        let (party, _, party_id) = registered(PartyKind::Customer);
        let err = party
            .handle(&PartyCommand::UpdateDetails(UpdateDetails {
                tenant_id: TenantId::new(),
                party_id,
                name: Some("Hijack".to_string()),
                contact: None,
                gstin: None,
                company_name: None,
                customer_type: None,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::invariant("tenant mismatch"));
    }

    #[test]
    fn update_on_missing_party_is_not_found() {
        let party_id = PartyId::new(AggregateId::new());
        let err = Party::empty(party_id)
            .handle(&PartyCommand::SuspendParty(SuspendParty {
                tenant_id: TenantId::new(),
                party_id,
                reason: None,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn suspend_and_reactivate_cycle() {
        let (mut party, tenant_id, party_id) = registered(PartyKind::Supplier);
        let suspend = PartyCommand::SuspendParty(SuspendParty {
            tenant_id,
            party_id,
            reason: Some("quality issues".to_string()),
            occurred_at: Utc::now(),
        });
        let reactivate = PartyCommand::ReactivateParty(ReactivateParty {
            tenant_id,
            party_id,
            occurred_at: Utc::now(),
        });

        assert!(matches!(party.handle(&reactivate), Err(DomainError::Conflict(_))));

        execute(&mut party, &suspend).unwrap();
        assert!(!party.can_transact());
        assert!(matches!(party.handle(&suspend), Err(DomainError::Conflict(_))));

        execute(&mut party, &reactivate).unwrap();
        assert!(party.can_transact());
        assert_eq!(party.version(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn handle_is_pure_and_replay_matches(name in "[A-Za-z][A-Za-z ]{1,40}[A-Za-z]") {
            let tenant_id = TenantId::new();
            let party_id = PartyId::new(AggregateId::new());
            let mut cmd = register(tenant_id, party_id, PartyKind::Customer);
            cmd.name = name;
            let cmd = PartyCommand::RegisterParty(cmd);

            let party = Party::empty(party_id);
            let first = party.handle(&cmd).unwrap();
            let second = party.handle(&cmd).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(party.version(), 0);

            let mut a = Party::empty(party_id);
            let mut b = Party::empty(party_id);
            for e in &first {
                a.apply(e);
                b.apply(e);
            }
            prop_assert_eq!(a, b);
        }
    }
}
