//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas y de ahí a la
//! taxonomía del core (`StoreError`).

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use phase_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("database busy: {0}")]
    Busy(String),
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(info.message().to_string()),
                other => {
                    let message = info.message();
                    if message.contains("database is locked") || message.contains("database table is locked") {
                        Self::Busy(message.to_string())
                    } else {
                        Self::Unknown(format!("db error kind {:?}: {}", other, message))
                    }
                }
            },
            DieselError::DeserializationError(e) => Self::Unknown(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::RollbackErrorOnCommit { rollback_error, commit_error } => {
                Self::Unknown(format!("rollback={rollback_error}; commit={commit_error}"))
            }
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        StoreError::Backend(err.to_string())
    }
}
