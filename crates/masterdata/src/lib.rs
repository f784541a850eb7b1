//! Configurable dropdown options (colours, patterns, units, machines, ...).
//!
//! Options are plain tenant-scoped records rather than event streams; storage
//! lives in `loomworks-infra::dropdowns`.

pub mod defaults;
pub mod option;

pub use defaults::default_options;
pub use option::{
    DropdownCategory, DropdownOption, DropdownOptionId, DropdownPatch, NewDropdownOption,
    normalize_value, sort_options,
};
