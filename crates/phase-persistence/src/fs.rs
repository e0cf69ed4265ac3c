//! Árbol de artefactos en filesystem.
//!
//! Protocolo de escritura atómica respecto de lectores concurrentes:
//! 1. Asegurar el directorio padre.
//! 2. Escribir a una ruta hermana con sufijo aleatorio (`.<hex>.tmp`).
//! 3. `rename` sobre el destino: atómico en el mismo directorio, por lo que
//!    un lector ve el contenido anterior o el nuevo, nunca uno parcial.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use phase_core::artifact::ArtifactStore;
use phase_core::errors::ArtifactError;
use phase_core::ids::short_hex;

/// Implementación en disco del `ArtifactStore`, anclada a una base.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    base: PathBuf,
}

impl FsArtifactStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    fn full_path(&self, rel_path: &str) -> PathBuf {
        self.base.join(rel_path)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io { path: path.display().to_string(), source }
}

impl ArtifactStore for FsArtifactStore {
    fn write_atomic(&self, rel_path: &str, bytes: &[u8]) -> Result<u64, ArtifactError> {
        let target = self.full_path(rel_path);
        let parent = target.parent()
                           .ok_or_else(|| ArtifactError::NotFound(rel_path.to_string()))?;
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;

        let file_name = target.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let tmp = parent.join(format!("{file_name}.{}.tmp", short_hex()));
        fs::write(&tmp, bytes).map_err(|e| io_error(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(&target, e));
        }
        Ok(bytes.len() as u64)
    }

    fn read(&self, rel_path: &str) -> Result<Vec<u8>, ArtifactError> {
        let full = self.full_path(rel_path);
        fs::read(&full).map_err(|e| {
                           if e.kind() == ErrorKind::NotFound {
                               ArtifactError::NotFound(rel_path.to_string())
                           } else {
                               io_error(&full, e)
                           }
                       })
    }

    fn exists(&self, rel_path: &str) -> Result<bool, ArtifactError> {
        Ok(self.full_path(rel_path).exists())
    }
}
