//! Implementación SQLite de `PipelineStore` y `LockManager`.
//!
//! Reglas de la capa:
//! - Cada método toma una conexión del pool al entrar y la devuelve al salir;
//!   nunca se llama a otro método del store con la conexión tomada (el pool
//!   es de tamaño 1).
//! - Las escrituras multi-paso usan `immediate_transaction`; las simples son
//!   single-statement.
//! - El mapeo fila ↔ registro del core queda aislado en este módulo.

use chrono::Duration;
use chrono::{DateTime, Utc};
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::sqlite::SqliteConnection;
use log::debug;
use serde_json::Value;

use phase_core::ids::{generate_run_id, generate_worker_id};
use phase_core::store::{ArtifactRecord, AttemptRecord, AttemptStatus, EventKind, EventRecord, LockAcquire,
                        LockRecord, NewEvent, NewRun, PipelineStore, RunFilter, RunRecord, RunStatus};
use phase_core::store::LockManager;
use phase_core::StoreError;

use crate::error::PersistenceError;
use crate::pool::{open_pool, SqlitePool};
use crate::schema::{artifacts, events, run_locks, runs, stage_attempts};
use crate::time::{now_iso, parse_iso, to_iso};

type SqliteConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Store durable sobre una base SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Abre (o reutiliza) el pool de `path` y deja la base migrada.
    pub fn open(path: &std::path::Path) -> Result<Self, PersistenceError> {
        Ok(Self { pool: open_pool(path)? })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<SqliteConn, StoreError> {
        self.pool
            .get()
            .map_err(|e| StoreError::Backend(format!("connection pool error: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Filas Diesel
// ---------------------------------------------------------------------------

#[derive(Queryable)]
struct RunRow {
    id: String,
    industry: String,
    country: String,
    client_context: Option<String>,
    target_stage: String,
    status: String,
    created_at: String,
    updated_at: String,
    finished_at: Option<String>,
    error: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = runs)]
struct NewRunRow<'a> {
    id: &'a str,
    industry: &'a str,
    country: &'a str,
    client_context: Option<&'a str>,
    target_stage: &'a str,
    status: &'a str,
    created_at: &'a str,
    updated_at: &'a str,
}

#[derive(Queryable)]
struct AttemptRow {
    id: i64,
    run_id: String,
    stage: String,
    attempt: i32,
    status: String,
    started_at: String,
    finished_at: Option<String>,
    duration_ms: Option<i64>,
    error: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = stage_attempts)]
struct NewAttemptRow<'a> {
    run_id: &'a str,
    stage: &'a str,
    attempt: i32,
    status: &'a str,
    started_at: &'a str,
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = artifacts)]
struct ArtifactRow {
    run_id: String,
    stage: String,
    attempt: i32,
    filename: String,
    path: String,
    size_bytes: i64,
    content_type: String,
}

#[derive(Queryable)]
struct EventRow {
    id: i64,
    run_id: String,
    stage: Option<String>,
    attempt: Option<i32>,
    event_type: String,
    message: String,
    data: Option<String>,
    created_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = events)]
struct NewEventRow<'a> {
    run_id: &'a str,
    stage: Option<&'a str>,
    attempt: Option<i32>,
    event_type: &'a str,
    message: &'a str,
    data: Option<String>,
    created_at: &'a str,
}

#[derive(Queryable)]
struct LockRow {
    run_id: String,
    holder: String,
    acquired_at: String,
    heartbeat_at: String,
    expires_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = run_locks)]
struct NewLockRow<'a> {
    run_id: &'a str,
    holder: &'a str,
    acquired_at: &'a str,
    heartbeat_at: &'a str,
    expires_at: &'a str,
}

// ---------------------------------------------------------------------------
// Mapeo fila -> registro
// ---------------------------------------------------------------------------

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    parse_iso(s).ok_or_else(|| StoreError::Backend(format!("invalid stored timestamp `{s}`")))
}

fn parse_opt_ts(s: Option<&str>) -> Result<Option<DateTime<Utc>>, StoreError> {
    s.map(parse_ts).transpose()
}

fn run_record(row: RunRow) -> Result<RunRecord, StoreError> {
    let status = RunStatus::parse(&row.status)
        .ok_or_else(|| StoreError::Backend(format!("invalid run status `{}`", row.status)))?;
    Ok(RunRecord { status,
                   created_at: parse_ts(&row.created_at)?,
                   updated_at: parse_ts(&row.updated_at)?,
                   finished_at: parse_opt_ts(row.finished_at.as_deref())?,
                   id: row.id,
                   industry: row.industry,
                   country: row.country,
                   client_context: row.client_context,
                   target_stage: row.target_stage,
                   error: row.error })
}

fn attempt_record(row: AttemptRow) -> Result<AttemptRecord, StoreError> {
    let status = AttemptStatus::parse(&row.status)
        .ok_or_else(|| StoreError::Backend(format!("invalid attempt status `{}`", row.status)))?;
    Ok(AttemptRecord { status,
                       started_at: parse_ts(&row.started_at)?,
                       finished_at: parse_opt_ts(row.finished_at.as_deref())?,
                       id: row.id,
                       run_id: row.run_id,
                       stage: row.stage,
                       attempt: row.attempt,
                       duration_ms: row.duration_ms,
                       error: row.error })
}

fn event_record(row: EventRow) -> Result<EventRecord, StoreError> {
    let kind = EventKind::parse(&row.event_type)
        .ok_or_else(|| StoreError::Backend(format!("invalid event type `{}`", row.event_type)))?;
    let data = match row.data {
        Some(text) => Some(serde_json::from_str::<Value>(&text)
            .map_err(|e| StoreError::Backend(format!("invalid event data json: {e}")))?),
        None => None,
    };
    Ok(EventRecord { kind,
                     data,
                     created_at: parse_ts(&row.created_at)?,
                     id: row.id,
                     run_id: row.run_id,
                     stage: row.stage,
                     attempt: row.attempt,
                     message: row.message })
}

fn lock_record(row: LockRow) -> Result<LockRecord, StoreError> {
    Ok(LockRecord { acquired_at: parse_ts(&row.acquired_at)?,
                    heartbeat_at: parse_ts(&row.heartbeat_at)?,
                    expires_at: parse_ts(&row.expires_at)?,
                    run_id: row.run_id,
                    holder: row.holder })
}

// ---------------------------------------------------------------------------
// PipelineStore
// ---------------------------------------------------------------------------

impl PipelineStore for SqliteStore {
    fn create_run(&self, new: NewRun) -> Result<RunRecord, StoreError> {
        let mut conn = self.conn()?;
        let id = new.id.unwrap_or_else(generate_run_id);
        let now_dt = Utc::now();
        let now = to_iso(&now_dt);
        let target_stage = new.target_stage.unwrap_or_else(|| "9".to_string());

        let row = NewRunRow { id: &id,
                              industry: &new.industry,
                              country: &new.country,
                              client_context: new.client_context.as_deref(),
                              target_stage: &target_stage,
                              status: "pending",
                              created_at: &now,
                              updated_at: &now };
        if let Err(e) = diesel::insert_into(runs::table).values(&row).execute(&mut conn) {
            return Err(match PersistenceError::from(e) {
                PersistenceError::UniqueViolation(_) => StoreError::DuplicateRunId(id),
                other => other.into(),
            });
        }
        debug!("created run {id}");

        let created = parse_iso(&now).unwrap_or(now_dt);
        Ok(RunRecord { id,
                       industry: new.industry,
                       country: new.country,
                       client_context: new.client_context,
                       target_stage,
                       status: RunStatus::Pending,
                       created_at: created,
                       updated_at: created,
                       finished_at: None,
                       error: None })
    }

    fn get_run(&self, id: &str) -> Result<Option<RunRecord>, StoreError> {
        let mut conn = self.conn()?;
        let row: Option<RunRow> = runs::table.filter(runs::id.eq(id))
                                             .first(&mut conn)
                                             .optional()
                                             .map_err(PersistenceError::from)?;
        row.map(run_record).transpose()
    }

    fn list_runs(&self, filter: &RunFilter) -> Result<Vec<RunRecord>, StoreError> {
        let mut conn = self.conn()?;
        let mut query = runs::table.into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(runs::status.eq(status.as_str()));
        }
        let rows: Vec<RunRow> = query.order(runs::created_at.desc())
                                     .limit(filter.limit.max(0))
                                     .load(&mut conn)
                                     .map_err(PersistenceError::from)?;
        rows.into_iter().map(run_record).collect()
    }

    fn update_run_status(&self, id: &str, status: RunStatus, error: Option<&str>) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let now = now_iso();
        // `finished_at` sólo en estados terminales; al volver a un estado no
        // terminal (reanudación) se limpia para conservar la invariante.
        let finished: Option<String> = if status.is_terminal() { Some(now.clone()) } else { None };
        let affected = diesel::update(runs::table.filter(runs::id.eq(id)))
            .set((runs::status.eq(status.as_str()),
                  runs::updated_at.eq(&now),
                  runs::finished_at.eq(finished),
                  runs::error.eq(error)))
            .execute(&mut conn)
            .map_err(PersistenceError::from)?;
        if affected == 0 {
            return Err(StoreError::RunNotFound(id.to_string()));
        }
        Ok(())
    }

    fn update_target_stage(&self, id: &str, target_stage: &str) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let affected = diesel::update(runs::table.filter(runs::id.eq(id)))
            .set((runs::target_stage.eq(target_stage), runs::updated_at.eq(now_iso())))
            .execute(&mut conn)
            .map_err(PersistenceError::from)?;
        if affected == 0 {
            return Err(StoreError::RunNotFound(id.to_string()));
        }
        Ok(())
    }

    fn start_stage_attempt(&self, run_id: &str, stage: &str) -> Result<i32, StoreError> {
        let mut conn = self.conn()?;
        let now = now_iso();
        let attempt = conn.immediate_transaction::<i32, PersistenceError, _>(|conn| {
                              let known: i64 = runs::table.filter(runs::id.eq(run_id))
                                                          .count()
                                                          .get_result(conn)?;
                              if known == 0 {
                                  return Err(PersistenceError::NotFound);
                              }
                              let current: Option<i32> = stage_attempts::table
                                  .filter(stage_attempts::run_id.eq(run_id))
                                  .filter(stage_attempts::stage.eq(stage))
                                  .select(max(stage_attempts::attempt))
                                  .first(conn)?;
                              let attempt = current.unwrap_or(0) + 1;
                              diesel::insert_into(stage_attempts::table)
                                  .values(NewAttemptRow { run_id,
                                                          stage,
                                                          attempt,
                                                          status: "running",
                                                          started_at: &now })
                                  .execute(conn)?;
                              Ok(attempt)
                          })
                          .map_err(|e| match e {
                              PersistenceError::NotFound => StoreError::RunNotFound(run_id.to_string()),
                              other => other.into(),
                          })?;
        debug!("run {run_id}: stage {stage} attempt {attempt} inserted");
        Ok(attempt)
    }

    fn finish_stage_attempt(&self, run_id: &str, stage: &str, attempt: i32) -> Result<(), StoreError> {
        self.close_attempt(run_id, stage, attempt, AttemptStatus::Completed, None)
    }

    fn fail_stage_attempt(&self, run_id: &str, stage: &str, attempt: i32, error: &str) -> Result<(), StoreError> {
        self.close_attempt(run_id, stage, attempt, AttemptStatus::Failed, Some(error))
    }

    fn stage_attempts(&self, run_id: &str, stage: Option<&str>) -> Result<Vec<AttemptRecord>, StoreError> {
        let mut conn = self.conn()?;
        let mut query = stage_attempts::table.filter(stage_attempts::run_id.eq(run_id)).into_boxed();
        if let Some(stage) = stage {
            query = query.filter(stage_attempts::stage.eq(stage));
        }
        let rows: Vec<AttemptRow> = query.order(stage_attempts::id.asc())
                                         .load(&mut conn)
                                         .map_err(PersistenceError::from)?;
        rows.into_iter().map(attempt_record).collect()
    }

    fn latest_attempt(&self, run_id: &str, stage: &str) -> Result<Option<AttemptRecord>, StoreError> {
        let mut conn = self.conn()?;
        let row: Option<AttemptRow> = stage_attempts::table.filter(stage_attempts::run_id.eq(run_id))
                                                           .filter(stage_attempts::stage.eq(stage))
                                                           .order(stage_attempts::attempt.desc())
                                                           .first(&mut conn)
                                                           .optional()
                                                           .map_err(PersistenceError::from)?;
        row.map(attempt_record).transpose()
    }

    fn latest_completed_attempt(&self, run_id: &str, stage: &str) -> Result<Option<AttemptRecord>, StoreError> {
        let mut conn = self.conn()?;
        let row: Option<AttemptRow> = stage_attempts::table.filter(stage_attempts::run_id.eq(run_id))
                                                           .filter(stage_attempts::stage.eq(stage))
                                                           .filter(stage_attempts::status.eq("completed"))
                                                           .order(stage_attempts::attempt.desc())
                                                           .first(&mut conn)
                                                           .optional()
                                                           .map_err(PersistenceError::from)?;
        row.map(attempt_record).transpose()
    }

    fn record_artifact(&self, artifact: &ArtifactRecord) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let row = ArtifactRow { run_id: artifact.run_id.clone(),
                                stage: artifact.stage.clone(),
                                attempt: artifact.attempt,
                                filename: artifact.filename.clone(),
                                path: artifact.path.clone(),
                                size_bytes: artifact.size_bytes,
                                content_type: artifact.content_type.clone() };
        // Upsert single-statement por la clave natural.
        diesel::insert_into(artifacts::table)
            .values(&row)
            .on_conflict((artifacts::run_id, artifacts::stage, artifacts::attempt, artifacts::filename))
            .do_update()
            .set((artifacts::path.eq(&artifact.path),
                  artifacts::size_bytes.eq(artifact.size_bytes),
                  artifacts::content_type.eq(&artifact.content_type)))
            .execute(&mut conn)
            .map_err(PersistenceError::from)?;
        Ok(())
    }

    fn artifacts(&self, run_id: &str, stage: Option<&str>) -> Result<Vec<ArtifactRecord>, StoreError> {
        let mut conn = self.conn()?;
        let mut query = artifacts::table.filter(artifacts::run_id.eq(run_id)).into_boxed();
        if let Some(stage) = stage {
            query = query.filter(artifacts::stage.eq(stage));
        }
        let rows: Vec<ArtifactRow> = query.order((artifacts::stage.asc(),
                                                  artifacts::attempt.asc(),
                                                  artifacts::filename.asc()))
                                          .load(&mut conn)
                                          .map_err(PersistenceError::from)?;
        Ok(rows.into_iter()
               .map(|r| ArtifactRecord { run_id: r.run_id,
                                         stage: r.stage,
                                         attempt: r.attempt,
                                         filename: r.filename,
                                         path: r.path,
                                         size_bytes: r.size_bytes,
                                         content_type: r.content_type })
               .collect())
    }

    fn append_event(&self, event: NewEvent) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let data = event.data.as_ref().map(|d| d.to_string());
        diesel::insert_into(events::table)
            .values(NewEventRow { run_id: &event.run_id,
                                  stage: event.stage.as_deref(),
                                  attempt: event.attempt,
                                  event_type: event.kind.as_str(),
                                  message: &event.message,
                                  data,
                                  created_at: &now_iso() })
            .execute(&mut conn)
            .map_err(PersistenceError::from)?;
        Ok(())
    }

    fn events(&self, run_id: &str, stage: Option<&str>, kind: Option<EventKind>) -> Result<Vec<EventRecord>, StoreError> {
        let mut conn = self.conn()?;
        let mut query = events::table.filter(events::run_id.eq(run_id)).into_boxed();
        if let Some(stage) = stage {
            query = query.filter(events::stage.eq(stage));
        }
        if let Some(kind) = kind {
            query = query.filter(events::event_type.eq(kind.as_str()));
        }
        let rows: Vec<EventRow> = query.order(events::id.asc())
                                       .load(&mut conn)
                                       .map_err(PersistenceError::from)?;
        rows.into_iter().map(event_record).collect()
    }
}

impl SqliteStore {
    /// Cierre común de intento (`completed`/`failed`): verifica que el
    /// intento esté `running` y calcula `duration_ms` contra `started_at`.
    fn close_attempt(&self,
                     run_id: &str,
                     stage: &str,
                     attempt: i32,
                     status: AttemptStatus,
                     error: Option<&str>)
                     -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let now_dt = Utc::now();
        let now = to_iso(&now_dt);
        let closed = conn.immediate_transaction::<bool, PersistenceError, _>(|conn| {
                             let row: Option<(String, String)> = stage_attempts::table
                                 .filter(stage_attempts::run_id.eq(run_id))
                                 .filter(stage_attempts::stage.eq(stage))
                                 .filter(stage_attempts::attempt.eq(attempt))
                                 .select((stage_attempts::status, stage_attempts::started_at))
                                 .first(conn)
                                 .optional()?;
                             let Some((current, started_at)) = row else {
                                 return Ok(false);
                             };
                             if current != "running" {
                                 return Ok(false);
                             }
                             let duration_ms = parse_iso(&started_at)
                                 .map(|started| (now_dt - started).num_milliseconds().max(0))
                                 .unwrap_or(0);
                             diesel::update(stage_attempts::table
                                     .filter(stage_attempts::run_id.eq(run_id))
                                     .filter(stage_attempts::stage.eq(stage))
                                     .filter(stage_attempts::attempt.eq(attempt)))
                                 .set((stage_attempts::status.eq(status.as_str()),
                                       stage_attempts::finished_at.eq(&now),
                                       stage_attempts::duration_ms.eq(duration_ms),
                                       stage_attempts::error.eq(error)))
                                 .execute(conn)?;
                             Ok(true)
                         })
                         .map_err(StoreError::from)?;
        if !closed {
            return Err(StoreError::AttemptNotRunning { run_id: run_id.to_string(),
                                                       stage: stage.to_string(),
                                                       attempt });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LockManager
// ---------------------------------------------------------------------------

impl LockManager for SqliteStore {
    fn acquire(&self, run_id: &str, holder: Option<&str>, ttl_ms: i64) -> Result<LockAcquire, StoreError> {
        let mut conn = self.conn()?;
        let now_dt = Utc::now();
        let now = to_iso(&now_dt);
        let expires = to_iso(&(now_dt + Duration::milliseconds(ttl_ms)));
        let holder_id = holder.map(str::to_string).unwrap_or_else(generate_worker_id);

        let acquired = conn.immediate_transaction::<LockAcquire, PersistenceError, _>(|conn| {
                               // Recuperar locks vencidos antes de intentar.
                               diesel::delete(run_locks::table.filter(run_locks::expires_at.lt(&now)))
                                   .execute(conn)?;
                               let inserted = diesel::insert_into(run_locks::table)
                                   .values(NewLockRow { run_id,
                                                        holder: &holder_id,
                                                        acquired_at: &now,
                                                        heartbeat_at: &now,
                                                        expires_at: &expires })
                                   .on_conflict_do_nothing()
                                   .execute(conn)?;
                               if inserted == 1 {
                                   return Ok(LockAcquire::Acquired { holder: holder_id.clone() });
                               }
                               let current: Option<String> = run_locks::table
                                   .filter(run_locks::run_id.eq(run_id))
                                   .select(run_locks::holder)
                                   .first(conn)
                                   .optional()?;
                               Ok(LockAcquire::Held { holder: current.unwrap_or_else(|| "unknown".to_string()) })
                           })
                           .map_err(StoreError::from)?;
        Ok(acquired)
    }

    fn release(&self, run_id: &str, holder: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let removed = diesel::delete(run_locks::table.filter(run_locks::run_id.eq(run_id))
                                                     .filter(run_locks::holder.eq(holder)))
            .execute(&mut conn)
            .map_err(PersistenceError::from)?;
        Ok(removed > 0)
    }

    fn heartbeat(&self, run_id: &str, holder: &str, ttl_ms: i64) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let now_dt = Utc::now();
        let updated = diesel::update(run_locks::table.filter(run_locks::run_id.eq(run_id))
                                                     .filter(run_locks::holder.eq(holder)))
            .set((run_locks::heartbeat_at.eq(to_iso(&now_dt)),
                  run_locks::expires_at.eq(to_iso(&(now_dt + Duration::milliseconds(ttl_ms))))))
            .execute(&mut conn)
            .map_err(PersistenceError::from)?;
        Ok(updated > 0)
    }

    fn is_locked(&self, run_id: &str) -> Result<Option<LockRecord>, StoreError> {
        let mut conn = self.conn()?;
        diesel::delete(run_locks::table.filter(run_locks::expires_at.lt(now_iso())))
            .execute(&mut conn)
            .map_err(PersistenceError::from)?;
        let row: Option<LockRow> = run_locks::table.filter(run_locks::run_id.eq(run_id))
                                                   .first(&mut conn)
                                                   .optional()
                                                   .map_err(PersistenceError::from)?;
        row.map(lock_record).transpose()
    }

    fn clean_expired(&self) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let removed = diesel::delete(run_locks::table.filter(run_locks::expires_at.lt(now_iso())))
            .execute(&mut conn)
            .map_err(PersistenceError::from)?;
        Ok(removed)
    }
}
