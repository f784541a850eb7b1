//! Customers and suppliers (event-sourced).
//!
//! Pure decision logic only; persistence and HTTP live in `loomworks-infra`
//! and `loomworks-api`.

pub mod party;

pub use party::{
    ContactInfo, CustomerType, Party, PartyCommand, PartyEvent, PartyId, PartyKind,
    PartyReactivated, PartyRegistered, PartyStatus, PartySuspended, PartyUpdated, ReactivateParty,
    RegisterParty, SuspendParty, UpdateDetails,
};
