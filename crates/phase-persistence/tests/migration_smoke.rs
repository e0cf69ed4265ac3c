//! Idempotencia de migraciones: correr el runner N veces converge al mismo
//! esquema que correrlo una vez.

use phase_core::{NewRun, PipelineStore};
use phase_persistence::migrations::run_pending_migrations;
use phase_persistence::{open_pool, SqliteStore};

#[test]
fn migrations_run_any_number_of_times() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("tracker.db");

    let pool = open_pool(&db).expect("pool + first migration");
    {
        let mut conn = pool.get().expect("conn");
        for _ in 0..3 {
            run_pending_migrations(&mut conn).expect("idempotent migration");
        }
    }

    // El esquema queda usable tras las repeticiones.
    let store = SqliteStore::from_pool(pool);
    let run = store.create_run(NewRun { id: Some("run-mig".to_string()),
                                        industry: "Energy Services".to_string(),
                                        country: "Vietnam".to_string(),
                                        client_context: None,
                                        target_stage: Some("3".to_string()) })
                   .expect("insert after repeated migrations");
    assert_eq!(run.id, "run-mig");
}

#[test]
fn reopening_the_same_path_reuses_the_pool() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("tracker.db");

    let first = SqliteStore::open(&db).expect("open");
    first.create_run(NewRun { id: Some("run-pool".to_string()),
                              industry: "Energy Services".to_string(),
                              country: "Vietnam".to_string(),
                              client_context: None,
                              target_stage: None })
         .expect("create");

    // Segunda apertura: mismo pool, mismos datos visibles.
    let second = SqliteStore::open(&db).expect("reopen");
    let run = second.get_run("run-pool").expect("query").expect("row");
    assert_eq!(run.country, "Vietnam");
    assert_eq!(run.target_stage, "9"); // default cuando no se pide target
}
