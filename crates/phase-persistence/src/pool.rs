//! Pool de conexiones SQLite por ruta de base.
//!
//! Comportamiento:
//! - Un registro global por ruta (único estado module-scoped del repo):
//!   llamadas repetidas con la misma ruta reutilizan el mismo pool.
//! - Tamaño máximo 1: un proceso abre a lo sumo una conexión por base.
//! - Pragmas al conectar: WAL, synchronous NORMAL, busy_timeout y
//!   foreign_keys.
//! - Ejecuta las migraciones pendientes una sola vez al construir el pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
                                  PRAGMA synchronous = NORMAL; \
                                  PRAGMA busy_timeout = 5000; \
                                  PRAGMA foreign_keys = ON;";

#[derive(Debug)]
struct ConnectionPragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(CONNECTION_PRAGMAS).map_err(diesel::r2d2::Error::QueryError)
    }
}

static POOLS: Lazy<Mutex<HashMap<PathBuf, SqlitePool>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Devuelve el pool para `path`, creándolo (y migrando la base) la primera
/// vez.
pub fn open_pool(path: &Path) -> Result<SqlitePool, PersistenceError> {
    let mut pools = POOLS.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(pool) = pools.get(path) {
        return Ok(pool.clone());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::TransientIo(format!("create db dir: {e}")))?;
        }
    }

    let manager = ConnectionManager::<SqliteConnection>::new(path.to_string_lossy());
    let pool = Pool::builder().max_size(1)
                              .connection_customizer(Box::new(ConnectionPragmas))
                              .build(manager)
                              .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;

    // Migrar una sola vez al construir (primer checkout de conexión).
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    debug!("opened sqlite pool at {}", path.display());

    pools.insert(path.to_path_buf(), pool.clone());
    Ok(pool)
}
