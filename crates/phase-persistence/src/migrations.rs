//! Wrapper para correr migraciones embebidas.
//!
//! Idempotente: el harness de Diesel registra cada migración aplicada, por lo
//! que correr esto N veces converge al mismo esquema que correrlo una vez.

use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::PersistenceError;

// Directorio esperado: `migrations/` en este crate.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn run_pending_migrations(conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| PersistenceError::Migration(e.to_string()))
}
