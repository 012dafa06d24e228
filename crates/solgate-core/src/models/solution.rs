//! Solution (tenant) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::{SolutionName, StoreIds, derive_store_ids};

/// A provisioned tenant.
///
/// Store identifiers are not part of the record; they are derived from
/// `name` on demand via [`Solution::store_ids`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Globally unique, immutable once created.
    pub name: SolutionName,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once deprovisioning has removed the tenant stores.
    pub deprovisioned_at: Option<DateTime<Utc>>,
}

impl Solution {
    pub fn store_ids(&self) -> StoreIds {
        derive_store_ids(&self.name)
    }

    /// Registered but neither activated nor deprovisioned, i.e. a
    /// provisioning run that has not finished.
    pub fn is_pending(&self) -> bool {
        !self.active && self.deprovisioned_at.is_none()
    }
}

/// Fields required to register a new solution.
#[derive(Debug, Clone)]
pub struct CreateSolution {
    pub name: SolutionName,
    pub created_at: DateTime<Utc>,
}
