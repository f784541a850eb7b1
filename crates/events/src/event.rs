use chrono::{DateTime, Utc};

/// A recorded business fact (customer registered, stock received, batch
/// completed, ...).
///
/// Events are never edited after they are appended; schema changes bump
/// `version`.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted type name, `<area>.<record>.<fact>` (e.g. `inventory.material.stock_received`).
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    /// Business time the fact happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}
