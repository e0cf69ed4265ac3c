//! phase-persistence
//!
//! Capa durable del tracker: implementaciones SQLite (Diesel) de los traits
//! del core más el árbol de artefactos en filesystem.
//!
//! Garantías:
//! - Crash safety vía write-ahead journaling (`journal_mode = WAL`); una
//!   transacción en curso en un cierre sucio se revierte, lo confirmado
//!   sobrevive.
//! - Escritores contendientes esperan con `busy_timeout`; la contención por
//!   `run_id` se resuelve con el lock de run, no con el store.
//! - Un proceso abre a lo sumo una conexión por ruta de base (pool tamaño 1
//!   en un registro global por ruta: el único estado module-scoped del repo).
//!
//! Módulos:
//! - `store`: repositorios de runs/intentos/artefactos/eventos y lock manager.
//! - `fs`: artefactos en disco con protocolo de escritura atómica.
//! - `pool`: pool por ruta con pragmas aplicados al conectar.
//! - `migrations`: runner embebido de migraciones Diesel (idempotente).
//! - `config`: carga de configuración desde .env / variables de entorno.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod fs;
pub mod migrations;
pub mod pool;
pub mod schema;
pub mod store;
mod time;

pub use config::{init_dotenv, StoreConfig};
pub use error::PersistenceError;
pub use fs::FsArtifactStore;
pub use pool::{open_pool, SqlitePool};
pub use store::SqliteStore;
