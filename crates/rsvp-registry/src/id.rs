//! Response identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle correlating a request with its eventual response.
///
/// The value `0` is reserved as [`ResponseId::NONE`]: allocation never
/// issues it, so it can travel on the wire to mean "no response expected".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(u64);

impl ResponseId {
    /// Sentinel for "no response expected"; never allocated.
    pub const NONE: ResponseId = ResponseId(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }

    pub const fn is_some(self) -> bool {
        !self.is_none()
    }
}

impl Default for ResponseId {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<u64> for ResponseId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ResponseId> for u64 {
    fn from(id: ResponseId) -> Self {
        id.0
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
