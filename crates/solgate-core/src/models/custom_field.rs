//! Schema-fallback side-store entries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::SolutionName;

/// Field name to value, as submitted by clients and returned on read.
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// A field the primary ERP store does not know about, kept aside.
///
/// `(solution_name, model_name, record_id, field_name)` identifies an
/// entry; a later write to the same key replaces `field_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldRecord {
    pub solution_name: SolutionName,
    pub model_name: String,
    pub record_id: String,
    pub field_name: String,
    pub field_value: serde_json::Value,
    pub written_at: DateTime<Utc>,
}
