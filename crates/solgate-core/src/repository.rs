//! Repository and collaborator trait definitions.
//!
//! All operations are async and go to the authoritative store on every
//! call; implementations must not cache results across requests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SolgateResult;
use crate::models::{
    custom_field::{CustomFieldRecord, FieldMap},
    handshake::{CreateHandshake, Handshake},
    solution::{CreateSolution, Solution},
};
use crate::registry::{SolutionName, StoreId};

// ---------------------------------------------------------------------------
// Control-plane persistence
// ---------------------------------------------------------------------------

pub trait SolutionRepository: Send + Sync {
    /// Register a solution as inactive. Fails with `AlreadyExists` if the
    /// name is taken, including by a concurrent caller.
    fn create(&self, input: CreateSolution) -> impl Future<Output = SolgateResult<Solution>> + Send;
    fn get(&self, name: &SolutionName) -> impl Future<Output = SolgateResult<Solution>> + Send;
    /// Activate a pending solution. Fails with `Conflict` if the record
    /// is gone or already active or deprovisioned.
    fn activate(
        &self,
        name: &SolutionName,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SolgateResult<Solution>> + Send;
    /// Mark inactive and record when the tenant stores were removed.
    fn mark_deprovisioned(
        &self,
        name: &SolutionName,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SolgateResult<Solution>> + Send;
    /// Delete a registration that never completed. Active and
    /// deprovisioned records are left untouched.
    fn delete(&self, name: &SolutionName) -> impl Future<Output = SolgateResult<()>> + Send;
    /// Solutions whose provisioning started before `before` and never
    /// completed.
    fn list_pending(
        &self,
        before: DateTime<Utc>,
    ) -> impl Future<Output = SolgateResult<Vec<Solution>>> + Send;
}

pub trait HandshakeRepository: Send + Sync {
    fn create(
        &self,
        input: CreateHandshake,
    ) -> impl Future<Output = SolgateResult<Handshake>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SolgateResult<Handshake>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = SolgateResult<Handshake>> + Send;
    /// Set `revoked_at` unless already set. Returns the stored record.
    fn revoke(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SolgateResult<Handshake>> + Send;
    /// Revoke every live handshake bound to `name`; returns the count.
    fn revoke_for_solution(
        &self,
        name: &SolutionName,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SolgateResult<u64>> + Send;
    /// Delete records expired or revoked before `before`.
    fn purge(&self, before: DateTime<Utc>) -> impl Future<Output = SolgateResult<u64>> + Send;
}

pub trait CustomFieldRepository: Send + Sync {
    /// Insert or replace the entry for the record's composite key.
    fn upsert(&self, record: CustomFieldRecord) -> impl Future<Output = SolgateResult<()>> + Send;
    fn list_for_record(
        &self,
        solution: &SolutionName,
        model_name: &str,
        record_id: &str,
    ) -> impl Future<Output = SolgateResult<Vec<CustomFieldRecord>>> + Send;
}

// ---------------------------------------------------------------------------
// Physical stores
// ---------------------------------------------------------------------------

/// Creates and removes tenant stores.
///
/// Both operations are idempotent. Implementations must refuse
/// [`StoreId::System`].
pub trait StoreProvisioner: Send + Sync {
    fn create_store(&self, store: &StoreId) -> impl Future<Output = SolgateResult<()>> + Send;
    fn drop_store(&self, store: &StoreId) -> impl Future<Output = SolgateResult<()>> + Send;
    fn store_exists(&self, store: &StoreId) -> impl Future<Output = SolgateResult<bool>> + Send;
}

/// The external ERP backend, reached only through a resolved store.
pub trait ErpGateway: Send + Sync {
    /// Whether `field_name` belongs to `model_name`'s schema.
    fn has_field(
        &self,
        store: &StoreId,
        model_name: &str,
        field_name: &str,
    ) -> impl Future<Output = SolgateResult<bool>> + Send;
    fn write(
        &self,
        store: &StoreId,
        model_name: &str,
        record_id: &str,
        fields: FieldMap,
    ) -> impl Future<Output = SolgateResult<()>> + Send;
    fn read(
        &self,
        store: &StoreId,
        model_name: &str,
        record_id: &str,
    ) -> impl Future<Output = SolgateResult<FieldMap>> + Send;
}
