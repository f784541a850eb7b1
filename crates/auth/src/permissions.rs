use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::policy::{Access, Area};

/// Permission string of the form `<area>.<access>` (e.g. `orders.write`), or
/// the wildcard `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn of(area: Area, access: Access) -> Self {
        Self(Cow::Owned(format!("{}.{}", area.as_str(), access.as_str())))
    }

    pub fn read(area: Area) -> Self {
        Self::of(area, Access::Read)
    }

    pub fn write(area: Area) -> Self {
        Self::of(area, Access::Write)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
