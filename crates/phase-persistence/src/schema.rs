//! Esquema Diesel (declarado manualmente; reemplazable con `diesel
//! print-schema`).
//!
//! Tablas:
//! - `runs`: entidad raíz, una fila por run.
//! - `stage_attempts`: un intento por ejecución de etapa, único por
//!   `(run_id, stage, attempt)`.
//! - `artifacts`: clave natural `(run_id, stage, attempt, filename)`.
//! - `events`: log append-only por run.
//! - `run_locks`: a lo sumo una fila por `run_id`.
//!
//! Los timestamps son TEXT ISO-8601 UTC de ancho fijo; el orden
//! lexicográfico coincide con el cronológico (los deletes por expiración de
//! `run_locks` dependen de eso).

diesel::table! {
    runs (id) {
        id -> Text,
        industry -> Text,
        country -> Text,
        client_context -> Nullable<Text>,
        target_stage -> Text,
        status -> Text,
        created_at -> Text,
        updated_at -> Text,
        finished_at -> Nullable<Text>,
        error -> Nullable<Text>,
    }
}

diesel::table! {
    stage_attempts (id) {
        id -> BigInt,
        run_id -> Text,
        stage -> Text,
        attempt -> Integer,
        status -> Text,
        started_at -> Text,
        finished_at -> Nullable<Text>,
        duration_ms -> Nullable<BigInt>,
        error -> Nullable<Text>,
    }
}

diesel::table! {
    artifacts (run_id, stage, attempt, filename) {
        run_id -> Text,
        stage -> Text,
        attempt -> Integer,
        filename -> Text,
        path -> Text,
        size_bytes -> BigInt,
        content_type -> Text,
    }
}

diesel::table! {
    events (id) {
        id -> BigInt,
        run_id -> Text,
        stage -> Nullable<Text>,
        attempt -> Nullable<Integer>,
        #[sql_name = "type"]
        event_type -> Text,
        message -> Text,
        data -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    run_locks (run_id) {
        run_id -> Text,
        holder -> Text,
        acquired_at -> Text,
        heartbeat_at -> Text,
        expires_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(runs, stage_attempts, artifacts, events, run_locks,);
