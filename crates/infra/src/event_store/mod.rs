//! Append-only event store boundary.
//!
//! The store is the source of truth. Read models are derived from it and may
//! be thrown away and rebuilt with [`EventStore::load_all`].

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
