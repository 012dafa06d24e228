//! Solution registry: name validation and store-id derivation.
//!
//! Store identifiers are never persisted. They are a pure function of
//! the solution name:
//!
//! - ERP store: `erp_<name>_db`
//! - application store: `app_<name>_db`
//! - system store: the constant [`SYSTEM_STORE_ID`], shared by all
//!   tenants and never tenant-writable.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SolgateError;

/// Identifier of the shared platform store.
pub const SYSTEM_STORE_ID: &str = "system_db";

/// Minimum accepted name length.
pub const MIN_NAME_LEN: usize = 2;
/// Maximum accepted name length.
pub const MAX_NAME_LEN: usize = 40;

/// Names that may never be used for a tenant.
const RESERVED_NAMES: &[&str] = &["system", SYSTEM_STORE_ID];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidNameError {
    #[error("name must be between {MIN_NAME_LEN} and {MAX_NAME_LEN} characters")]
    Length,
    #[error("name must start with a lowercase letter")]
    LeadingCharacter,
    #[error("name may only contain lowercase letters, digits and underscores")]
    Character,
    #[error("name is reserved")]
    Reserved,
}

/// Check a candidate solution name.
///
/// Accepted names match `[a-z][a-z0-9_]*`, are between
/// [`MIN_NAME_LEN`] and [`MAX_NAME_LEN`] characters long and are not a
/// reserved system identifier.
pub fn validate_name(name: &str) -> Result<(), InvalidNameError> {
    if name.len() < MIN_NAME_LEN || name.len() > MAX_NAME_LEN {
        return Err(InvalidNameError::Length);
    }
    let mut chars = name.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_lowercase()) {
        return Err(InvalidNameError::LeadingCharacter);
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(InvalidNameError::Character);
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(InvalidNameError::Reserved);
    }
    Ok(())
}

/// A validated solution (tenant) name.
///
/// Only obtainable through [`SolutionName::parse`], so holding one is
/// proof that [`validate_name`] accepted it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SolutionName(String);

impl SolutionName {
    pub fn parse(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SolutionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SolutionName {
    type Error = InvalidNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SolutionName> for String {
    fn from(value: SolutionName) -> Self {
        value.0
    }
}

impl AsRef<str> for SolutionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A physical store a data operation can be routed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreId {
    System,
    App(SolutionName),
    Erp(SolutionName),
}

impl StoreId {
    pub fn is_system(&self) -> bool {
        matches!(self, StoreId::System)
    }

    /// The owning solution, `None` for the system store.
    pub fn solution(&self) -> Option<&SolutionName> {
        match self {
            StoreId::System => None,
            StoreId::App(name) | StoreId::Erp(name) => Some(name),
        }
    }

    /// Physical identifier, e.g. `erp_acme_db`.
    pub fn physical(&self) -> String {
        match self {
            StoreId::System => SYSTEM_STORE_ID.to_string(),
            StoreId::App(name) => format!("app_{name}_db"),
            StoreId::Erp(name) => format!("erp_{name}_db"),
        }
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.physical())
    }
}

impl Serialize for StoreId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.physical())
    }
}

/// The three stores derived from one solution name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreIds {
    pub erp: StoreId,
    pub app: StoreId,
    pub system: StoreId,
}

impl StoreIds {
    /// Tenant-owned stores, in provisioning order.
    pub fn tenant_stores(&self) -> [&StoreId; 2] {
        [&self.app, &self.erp]
    }
}

/// Derive the store triple for a solution. Pure and total.
pub fn derive_store_ids(name: &SolutionName) -> StoreIds {
    StoreIds {
        erp: StoreId::Erp(name.clone()),
        app: StoreId::App(name.clone()),
        system: StoreId::System,
    }
}

impl From<InvalidNameError> for SolgateError {
    fn from(err: InvalidNameError) -> Self {
        SolgateError::InvalidName {
            name: String::new(),
            reason: err.to_string(),
        }
    }
}

/// Parse a name, keeping the rejected input in the resulting error.
pub fn parse_name(name: &str) -> Result<SolutionName, SolgateError> {
    SolutionName::parse(name).map_err(|e| SolgateError::InvalidName {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
