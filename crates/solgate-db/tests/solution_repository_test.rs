//! Integration tests for the Solution repository using in-memory SurrealDB.

use chrono::{Duration, Utc};
use solgate_core::error::SolgateError;
use solgate_core::models::solution::CreateSolution;
use solgate_core::registry::SolutionName;
use solgate_core::repository::SolutionRepository;
use solgate_db::repository::SurrealSolutionRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("system_db").await.unwrap();
    solgate_db::run_migrations(&db).await.unwrap();
    db
}

fn name(raw: &str) -> SolutionName {
    SolutionName::parse(raw).unwrap()
}

#[tokio::test]
async fn create_registers_inactive_solution() {
    let repo = SurrealSolutionRepository::new(setup().await);
    let now = Utc::now();

    let solution = repo
        .create(CreateSolution {
            name: name("acme"),
            created_at: now,
        })
        .await
        .unwrap();

    assert_eq!(solution.name.as_str(), "acme");
    assert!(!solution.active);
    assert!(solution.deprovisioned_at.is_none());
    assert!(solution.is_pending());

    let fetched = repo.get(&name("acme")).await.unwrap();
    assert_eq!(fetched.name, solution.name);
}

#[tokio::test]
async fn duplicate_name_conflicts() {
    let repo = SurrealSolutionRepository::new(setup().await);
    let input = CreateSolution {
        name: name("acme"),
        created_at: Utc::now(),
    };

    repo.create(input.clone()).await.unwrap();
    let err = repo.create(input).await.unwrap_err();
    assert!(matches!(err, SolgateError::AlreadyExists { .. }), "{err:?}");
}

#[tokio::test]
async fn get_unknown_is_not_found() {
    let repo = SurrealSolutionRepository::new(setup().await);
    let err = repo.get(&name("ghost")).await.unwrap_err();
    assert!(matches!(err, SolgateError::NotFound { .. }));
}

#[tokio::test]
async fn activate_then_deprovision() {
    let repo = SurrealSolutionRepository::new(setup().await);
    let now = Utc::now();
    repo.create(CreateSolution {
        name: name("acme"),
        created_at: now,
    })
    .await
    .unwrap();

    let active = repo.activate(&name("acme"), now).await.unwrap();
    assert!(active.active);
    assert!(!active.is_pending());

    let later = now + Duration::minutes(5);
    let gone = repo.mark_deprovisioned(&name("acme"), later).await.unwrap();
    assert!(!gone.active);
    assert!(gone.deprovisioned_at.is_some());
    assert!(!gone.is_pending());
}

#[tokio::test]
async fn activate_unknown_conflicts() {
    let repo = SurrealSolutionRepository::new(setup().await);
    let err = repo.activate(&name("ghost"), Utc::now()).await.unwrap_err();
    assert!(matches!(err, SolgateError::Conflict { .. }), "{err:?}");
    assert!(repo.get(&name("ghost")).await.is_err());
}

#[tokio::test]
async fn activate_never_revives_a_deprovisioned_solution() {
    let repo = SurrealSolutionRepository::new(setup().await);
    let now = Utc::now();
    repo.create(CreateSolution {
        name: name("acme"),
        created_at: now,
    })
    .await
    .unwrap();
    repo.mark_deprovisioned(&name("acme"), now).await.unwrap();

    let err = repo.activate(&name("acme"), now).await.unwrap_err();
    assert!(matches!(err, SolgateError::Conflict { .. }), "{err:?}");

    let stored = repo.get(&name("acme")).await.unwrap();
    assert!(!stored.active);
    assert!(stored.deprovisioned_at.is_some());
}

#[tokio::test]
async fn activate_twice_conflicts() {
    let repo = SurrealSolutionRepository::new(setup().await);
    let now = Utc::now();
    repo.create(CreateSolution {
        name: name("acme"),
        created_at: now,
    })
    .await
    .unwrap();
    repo.activate(&name("acme"), now).await.unwrap();

    let err = repo.activate(&name("acme"), now).await.unwrap_err();
    assert!(matches!(err, SolgateError::Conflict { .. }), "{err:?}");
}

#[tokio::test]
async fn list_pending_returns_only_stale_unfinished() {
    let repo = SurrealSolutionRepository::new(setup().await);
    let now = Utc::now();
    let old = now - Duration::hours(1);

    for (raw, created_at) in [("stale", old), ("fresh", now), ("done", old)] {
        repo.create(CreateSolution {
            name: name(raw),
            created_at,
        })
        .await
        .unwrap();
    }
    repo.activate(&name("done"), old).await.unwrap();

    let pending = repo
        .list_pending(now - Duration::minutes(15))
        .await
        .unwrap();
    let names: Vec<&str> = pending.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["stale"]);
}

#[tokio::test]
async fn delete_removes_record() {
    let repo = SurrealSolutionRepository::new(setup().await);
    repo.create(CreateSolution {
        name: name("acme"),
        created_at: Utc::now(),
    })
    .await
    .unwrap();

    repo.delete(&name("acme")).await.unwrap();
    assert!(repo.get(&name("acme")).await.is_err());

    // Deleting again is harmless.
    repo.delete(&name("acme")).await.unwrap();
}

#[tokio::test]
async fn delete_keeps_finished_records() {
    let repo = SurrealSolutionRepository::new(setup().await);
    let now = Utc::now();
    for raw in ["live", "gone"] {
        repo.create(CreateSolution {
            name: name(raw),
            created_at: now,
        })
        .await
        .unwrap();
    }
    repo.activate(&name("live"), now).await.unwrap();
    repo.mark_deprovisioned(&name("gone"), now).await.unwrap();

    repo.delete(&name("live")).await.unwrap();
    repo.delete(&name("gone")).await.unwrap();

    assert!(repo.get(&name("live")).await.unwrap().active);
    assert!(repo.get(&name("gone")).await.unwrap().deprovisioned_at.is_some());
}
