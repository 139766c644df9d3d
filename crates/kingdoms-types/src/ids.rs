//! Type-safe identifier for kingdoms.
//!
//! Kingdom names are chosen by the operator and need not be unique, so the
//! war scheduler reports its winner by [`KingdomId`]. IDs use UUID v7
//! (time-ordered) so that two kingdoms created in sequence sort in creation
//! order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a kingdom taking part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KingdomId(pub Uuid);

impl KingdomId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for KingdomId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for KingdomId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for KingdomId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<KingdomId> for Uuid {
    fn from(id: KingdomId) -> Self {
        id.0
    }
}
