//! Schema fallback store.
//!
//! Writes to ERP models go through here. Each submitted field is checked
//! against the model's schema in the tenant's ERP store: known fields are
//! written to the primary store unchanged, unknown ones are kept in the
//! custom field side-store under `(solution, model, record, field)`.
//! Reads merge both, primary values winning on collision.

use std::sync::Arc;

use serde::Serialize;
use solgate_core::clock::{Clock, SystemClock};
use solgate_core::context::{OperationDescriptor, RequestContext};
use solgate_core::error::{SolgateError, SolgateResult};
use solgate_core::models::custom_field::{CustomFieldRecord, FieldMap};
use solgate_core::registry::{SolutionName, StoreId};
use solgate_core::repository::{CustomFieldRepository, ErpGateway, SolutionRepository};
use tracing::{debug, info};

use crate::error::WriteError;
use crate::router::TenantRouter;

/// Where each submitted field ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub written_to_primary: Vec<String>,
    pub diverted: Vec<String>,
}

pub struct SchemaFallbackStore<S, E, C>
where
    S: SolutionRepository,
    E: ErpGateway,
    C: CustomFieldRepository,
{
    router: TenantRouter<S>,
    erp: E,
    custom_fields: C,
    clock: Arc<dyn Clock>,
}

impl<S, E, C> SchemaFallbackStore<S, E, C>
where
    S: SolutionRepository,
    E: ErpGateway,
    C: CustomFieldRepository,
{
    pub fn new(router: TenantRouter<S>, erp: E, custom_fields: C) -> Self {
        Self {
            router,
            erp,
            custom_fields,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn erp(&self) -> &E {
        &self.erp
    }

    /// Write `fields` to `model_name`/`record_id` for the tenant bound to
    /// `ctx`.
    ///
    /// Diverted fields are stored before the primary write. On
    /// [`WriteError::Primary`] they are therefore already kept and read
    /// back by [`read`](Self::read); on [`WriteError::SideStore`] nothing
    /// reached the primary store. Repeating the whole write is safe.
    pub async fn write(
        &self,
        ctx: &RequestContext,
        model_name: &str,
        record_id: &str,
        fields: FieldMap,
    ) -> Result<WriteOutcome, WriteError> {
        let (store, solution) = self
            .resolve(ctx, model_name)
            .await
            .map_err(WriteError::Rejected)?;

        let mut primary = FieldMap::new();
        let mut diverted = FieldMap::new();
        for (field, value) in fields {
            let known = self
                .erp
                .has_field(&store, model_name, &field)
                .await
                .map_err(|e| WriteError::Primary(e.to_string()))?;
            if known {
                primary.insert(field, value);
            } else {
                diverted.insert(field, value);
            }
        }

        let outcome = WriteOutcome {
            written_to_primary: primary.keys().cloned().collect(),
            diverted: diverted.keys().cloned().collect(),
        };

        let written_at = self.clock.now();
        for (field_name, field_value) in diverted {
            self.custom_fields
                .upsert(CustomFieldRecord {
                    solution_name: solution.clone(),
                    model_name: model_name.to_string(),
                    record_id: record_id.to_string(),
                    field_name,
                    field_value,
                    written_at,
                })
                .await
                .map_err(|e| WriteError::SideStore(e.to_string()))?;
        }

        if !primary.is_empty() {
            self.erp
                .write(&store, model_name, record_id, primary)
                .await
                .map_err(|e| WriteError::Primary(e.to_string()))?;
        }

        if !outcome.diverted.is_empty() {
            info!(
                solution = %solution,
                model = model_name,
                record_id,
                diverted = ?outcome.diverted,
                "Fields unknown to the primary schema kept as custom fields"
            );
        }
        Ok(outcome)
    }

    /// Read a record, merging custom fields under the primary values.
    ///
    /// A record missing from the primary store but holding custom fields
    /// reads as just those fields.
    pub async fn read(
        &self,
        ctx: &RequestContext,
        model_name: &str,
        record_id: &str,
    ) -> SolgateResult<FieldMap> {
        let (store, solution) = self.resolve(ctx, model_name).await?;

        let primary = match self.erp.read(&store, model_name, record_id).await {
            Ok(fields) => Some(fields),
            Err(SolgateError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        let custom = self
            .custom_fields
            .list_for_record(&solution, model_name, record_id)
            .await?;

        if primary.is_none() && custom.is_empty() {
            return Err(SolgateError::NotFound {
                entity: model_name.to_string(),
                id: record_id.to_string(),
            });
        }

        let mut merged = primary.unwrap_or_default();
        for entry in custom {
            merged.entry(entry.field_name).or_insert(entry.field_value);
        }
        debug!(solution = %solution, model = model_name, record_id, "Record read");
        Ok(merged)
    }

    async fn resolve(
        &self,
        ctx: &RequestContext,
        model_name: &str,
    ) -> SolgateResult<(StoreId, SolutionName)> {
        let descriptor = OperationDescriptor::ErpModel {
            model: model_name.to_string(),
        };
        let store = self.router.route(ctx, &descriptor).await?;
        let solution = store
            .solution()
            .cloned()
            .ok_or_else(|| {
                SolgateError::Internal("ERP operation routed to the system store".into())
            })?;
        Ok((store, solution))
    }
}
