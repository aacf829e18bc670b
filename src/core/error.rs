use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Entity '{0}' not found in model")]
    EntityNotFound(String),

    #[error("Attribute '{0}' not found on entity '{1}'")]
    UnknownAttribute(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Commit conflict: {0}")]
    CommitConflict(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Store schema does not match the configured model: {0}")]
    SchemaMismatch(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Payload has no remote identifier under key '{0}'")]
    MissingRemoteId(String),

    #[error("Invalid remote identifier: {0}")]
    InvalidRemoteId(String),

    #[error("Context backing this object has been discarded")]
    ContextDiscarded,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, RecordError>;

impl<T> From<std::sync::PoisonError<T>> for RecordError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for RecordError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
