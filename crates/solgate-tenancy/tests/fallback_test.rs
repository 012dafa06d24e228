//! Integration tests for the schema fallback store with a fake ERP backend
//! and in-memory SurrealDB for the registry and side-store.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use solgate_core::context::RequestContext;
use solgate_core::error::{SolgateError, SolgateResult};
use solgate_core::models::custom_field::FieldMap;
use solgate_core::models::handshake::Handshake;
use solgate_core::registry::{SolutionName, StoreId};
use solgate_core::repository::{ErpGateway, SolutionRepository};
use solgate_db::repository::{SurrealCustomFieldRepository, SurrealSolutionRepository};
use solgate_tenancy::{
    SchemaFallbackStore, SolutionLifecycleManager, TenancyConfig, TenantRouter, WriteError,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tokio::task::JoinSet;
use uuid::Uuid;

/// In-memory ERP: a per-model schema and records keyed by store.
#[derive(Default)]
struct FakeErp {
    schema: Mutex<HashMap<String, BTreeSet<String>>>,
    records: Mutex<HashMap<(String, String, String), FieldMap>>,
    primary_writes: Mutex<Vec<FieldMap>>,
    fail_writes: bool,
}

impl FakeErp {
    fn with_model(model: &str, fields: &[&str]) -> Self {
        let erp = Self::default();
        erp.add_fields(model, fields);
        erp
    }

    fn add_fields(&self, model: &str, fields: &[&str]) {
        self.schema
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .extend(fields.iter().map(|f| f.to_string()));
    }

    fn write_count(&self) -> usize {
        self.primary_writes.lock().unwrap().len()
    }
}

impl ErpGateway for FakeErp {
    async fn has_field(
        &self,
        _store: &StoreId,
        model_name: &str,
        field_name: &str,
    ) -> SolgateResult<bool> {
        Ok(self
            .schema
            .lock()
            .unwrap()
            .get(model_name)
            .is_some_and(|fields| fields.contains(field_name)))
    }

    async fn write(
        &self,
        store: &StoreId,
        model_name: &str,
        record_id: &str,
        fields: FieldMap,
    ) -> SolgateResult<()> {
        if self.fail_writes {
            return Err(SolgateError::Database("erp unavailable".into()));
        }
        self.primary_writes.lock().unwrap().push(fields.clone());
        self.records
            .lock()
            .unwrap()
            .entry((store.physical(), model_name.into(), record_id.into()))
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn read(
        &self,
        store: &StoreId,
        model_name: &str,
        record_id: &str,
    ) -> SolgateResult<FieldMap> {
        self.records
            .lock()
            .unwrap()
            .get(&(store.physical(), model_name.into(), record_id.into()))
            .cloned()
            .ok_or_else(|| SolgateError::NotFound {
                entity: model_name.into(),
                id: record_id.into(),
            })
    }
}

type Store =
    SchemaFallbackStore<SurrealSolutionRepository<Db>, FakeErp, SurrealCustomFieldRepository<Db>>;

async fn setup(erp: FakeErp) -> (Surreal<Db>, Store) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("system_db").await.unwrap();
    solgate_db::run_migrations(&db).await.unwrap();

    let manager = SolutionLifecycleManager::new(
        SurrealSolutionRepository::new(db.clone()),
        solgate_db::repository::SurrealStoreProvisioner::new(db.clone()),
        solgate_db::repository::SurrealHandshakeRepository::new(db.clone()),
        TenancyConfig::default(),
    );
    manager.provision("acme").await.unwrap();
    manager.provision("globex").await.unwrap();

    let store = SchemaFallbackStore::new(
        TenantRouter::new(SurrealSolutionRepository::new(db.clone()), Duration::from_secs(2)),
        erp,
        SurrealCustomFieldRepository::new(db.clone()),
    );
    (db, store)
}

fn ctx(solution: Option<&str>) -> RequestContext {
    let now = Utc::now();
    RequestContext::bind(&Handshake {
        id: Uuid::new_v4(),
        token_hash: String::new(),
        secret_hash: String::new(),
        solution_name: solution.map(|s| SolutionName::parse(s).unwrap()),
        permissions: BTreeSet::new(),
        issued_at: now,
        expires_at: now + chrono::Duration::hours(1),
        revoked_at: None,
    })
}

fn fields(pairs: &[(&str, serde_json::Value)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn mixed_write_splits_and_read_merges() {
    let (_db, store) = setup(FakeErp::with_model("invoice", &["amount", "due"])).await;
    let acme = ctx(Some("acme"));

    let outcome = store
        .write(
            &acme,
            "invoice",
            "42",
            fields(&[
                ("amount", json!(100)),
                ("due", json!("2026-01-01")),
                ("priority", json!("high")),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.written_to_primary, vec!["amount", "due"]);
    assert_eq!(outcome.diverted, vec!["priority"]);

    let primary = store_writes(&store);
    assert_eq!(primary.len(), 1);
    assert!(!primary[0].contains_key("priority"), "unknown field leaked to primary");

    let record = store.read(&acme, "invoice", "42").await.unwrap();
    assert_eq!(record.get("amount"), Some(&json!(100)));
    assert_eq!(record.get("priority"), Some(&json!("high")));
}

fn store_writes(store: &Store) -> Vec<FieldMap> {
    store.erp().primary_writes.lock().unwrap().clone()
}

#[tokio::test]
async fn only_unknown_fields_skip_the_primary_store() {
    let (_db, store) = setup(FakeErp::with_model("invoice", &["amount"])).await;
    let acme = ctx(Some("acme"));

    let outcome = store
        .write(&acme, "invoice", "7", fields(&[("color", json!("red"))]))
        .await
        .unwrap();
    assert!(outcome.written_to_primary.is_empty());
    assert_eq!(outcome.diverted, vec!["color"]);
    assert_eq!(store.erp().write_count(), 0);

    let record = store.read(&acme, "invoice", "7").await.unwrap();
    assert_eq!(record, fields(&[("color", json!("red"))]));
}

#[tokio::test]
async fn primary_value_wins_on_collision() {
    let (_db, store) = setup(FakeErp::with_model("invoice", &["amount"])).await;
    let acme = ctx(Some("acme"));

    store
        .write(&acme, "invoice", "42", fields(&[("color", json!("red"))]))
        .await
        .unwrap();

    // The ERP schema later learns the field.
    store.erp().add_fields("invoice", &["color"]);
    store
        .write(&acme, "invoice", "42", fields(&[("color", json!("blue"))]))
        .await
        .unwrap();

    let record = store.read(&acme, "invoice", "42").await.unwrap();
    assert_eq!(record.get("color"), Some(&json!("blue")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_custom_field_writes_all_succeed_and_last_wins() {
    let (_db, store) = setup(FakeErp::with_model("invoice", &[])).await;
    let store = Arc::new(store);
    let acme = ctx(Some("acme"));

    for round in 0..10 {
        let record_id = format!("r{round}");
        let mut joins = JoinSet::new();
        for writer in 0..8 {
            let store = Arc::clone(&store);
            let acme = acme.clone();
            let record_id = record_id.clone();
            joins.spawn(async move {
                store
                    .write(&acme, "invoice", &record_id, fields(&[("note", json!(writer))]))
                    .await
            });
        }
        while let Some(joined) = joins.join_next().await {
            let outcome = joined.unwrap().unwrap();
            assert_eq!(outcome.diverted, vec!["note"]);
        }

        let record = store.read(&acme, "invoice", &record_id).await.unwrap();
        assert_eq!(record.len(), 1);
        let note = record.get("note").and_then(|v| v.as_i64()).unwrap();
        assert!((0..8).contains(&note), "unexpected value {note}");
    }

    store
        .write(&acme, "invoice", "r0", fields(&[("note", json!("final"))]))
        .await
        .unwrap();
    let record = store.read(&acme, "invoice", "r0").await.unwrap();
    assert_eq!(record.get("note"), Some(&json!("final")));
}

#[tokio::test]
async fn tenants_never_see_each_other() {
    let (_db, store) = setup(FakeErp::with_model("invoice", &["amount"])).await;

    store
        .write(
            &ctx(Some("acme")),
            "invoice",
            "42",
            fields(&[("amount", json!(1)), ("secret_note", json!("acme only"))]),
        )
        .await
        .unwrap();

    let err = store
        .read(&ctx(Some("globex")), "invoice", "42")
        .await
        .unwrap_err();
    assert!(matches!(err, SolgateError::NotFound { .. }));
}

#[tokio::test]
async fn system_context_is_rejected() {
    let (_db, store) = setup(FakeErp::with_model("invoice", &["amount"])).await;

    let err = store
        .write(&ctx(None), "invoice", "42", fields(&[("amount", json!(1))]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WriteError::Rejected(SolgateError::MissingTenantContext { .. })
    ));
    assert_eq!(store.erp().write_count(), 0);
}

#[tokio::test]
async fn inactive_solution_is_rejected() {
    let (db, store) = setup(FakeErp::with_model("invoice", &["amount"])).await;
    SurrealSolutionRepository::new(db.clone())
        .mark_deprovisioned(&SolutionName::parse("acme").unwrap(), Utc::now())
        .await
        .unwrap();

    let err = store
        .write(&ctx(Some("acme")), "invoice", "42", fields(&[("amount", json!(1))]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WriteError::Rejected(SolgateError::InactiveSolution { .. })
    ));
}

#[tokio::test]
async fn primary_failure_is_a_write_error() {
    let erp = FakeErp {
        fail_writes: true,
        ..FakeErp::with_model("invoice", &["amount"])
    };
    let (_db, store) = setup(erp).await;
    let acme = ctx(Some("acme"));

    let err = store
        .write(
            &acme,
            "invoice",
            "42",
            fields(&[("amount", json!(1)), ("color", json!("red"))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WriteError::Primary(_)));
    assert!(SolgateError::from(err).class().is_retryable());

    // Diverted fields are kept before the primary write is attempted.
    let record = store.read(&acme, "invoice", "42").await.unwrap();
    assert_eq!(record, fields(&[("color", json!("red"))]));
}

#[tokio::test]
async fn reading_a_missing_record_is_not_found() {
    let (_db, store) = setup(FakeErp::with_model("invoice", &["amount"])).await;
    let err = store
        .read(&ctx(Some("acme")), "invoice", "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, SolgateError::NotFound { .. }));
}
