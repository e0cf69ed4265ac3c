//! Carga de configuración desde variables de entorno.
//! Convención: `PHASE_DB_PATH` y `PHASE_ARTIFACTS_DIR`, con defaults bajo
//! `data/`.

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub artifacts_dir: PathBuf,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let db_path = env::var("PHASE_DB_PATH").map(PathBuf::from)
                                               .unwrap_or_else(|_| PathBuf::from("data/phase-tracker.db"));
        let artifacts_dir = env::var("PHASE_ARTIFACTS_DIR").map(PathBuf::from)
                                                           .unwrap_or_else(|_| PathBuf::from("data/runs"));
        Self { db_path, artifacts_dir }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
