//! Capa de artefactos: rutas deterministas, tipos de contenido y escritura
//! por bundle.
//!
//! El árbol en disco refleja la propiedad de los datos:
//! `<base>/<run_id>/stages/<stage>/attempt-<n>/<filename>`. La escritura debe
//! ser atómica respecto de cualquier lector concurrente: se escribe a una
//! ruta hermana con sufijo aleatorio y se renombra sobre el destino (rename
//! atómico en el mismo directorio).

mod paths;
mod writer;

pub use paths::{artifact_path, attempt_dir, content_type_for};
pub use writer::{write_error_artifact, write_stage_artifacts, StageArtifactBundle};

use crate::errors::ArtifactError;

/// Operaciones de archivo sobre el árbol de artefactos. Las rutas son
/// relativas a la base configurada; la implementación de filesystem vive en
/// `phase-persistence` y el backend in-memory en `store::memory`.
pub trait ArtifactStore: Send + Sync {
    /// Escribe `bytes` en `rel_path` con el protocolo atómico; devuelve el
    /// tamaño escrito.
    fn write_atomic(&self, rel_path: &str, bytes: &[u8]) -> Result<u64, ArtifactError>;

    fn read(&self, rel_path: &str) -> Result<Vec<u8>, ArtifactError>;

    fn exists(&self, rel_path: &str) -> Result<bool, ArtifactError>;
}
