//! `loomworks-core`: domain building blocks shared by every business area.
//!
//! Pure primitives only: identifiers, the aggregate contract, the domain
//! error model, document numbering and the form-level validation rules
//! applied to user input.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod numbering;
pub mod validation;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, TenantId, UserId};
pub use numbering::{document_number, document_suffix};
