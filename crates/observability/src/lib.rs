//! Process-wide logging setup shared by the binaries.

pub mod tracing;

pub use tracing::{LogFormat, UnknownLogFormat};

/// Install the global subscriber in the requested format.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
