use crate::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// Serialization failure or deadlock under row locking; the request can
    /// be retried against the committed state.
    #[error("transaction conflict: {message}")]
    Conflict { message: String },

    #[error("database unavailable: {message}")]
    Connection { message: String },

    #[error("database error: {message}")]
    Other { message: String },
}

impl DatabaseError {
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                let constraint = db.constraint().unwrap_or("unknown").to_string();
                match db.code().as_deref() {
                    Some("23505") => DatabaseError::UniqueViolation { constraint },
                    Some("23503") => DatabaseError::ForeignKeyViolation { constraint },
                    // 40001 serialization_failure, 40P01 deadlock_detected
                    Some("40001") | Some("40P01") => DatabaseError::Conflict {
                        message: db.message().to_string(),
                    },
                    _ => DatabaseError::Other {
                        message: db.message().to_string(),
                    },
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Connection {
                    message: err.to_string(),
                }
            }
            _ => DatabaseError::Other {
                message: err.to_string(),
            },
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => AppError::NotFound { entity, id },
            DatabaseError::Conflict { message } => AppError::ConcurrentConflict { message },
            other => AppError::Database {
                message: other.to_string(),
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from_sqlx(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_surfaces_as_concurrent_conflict() {
        let err: AppError = DatabaseError::Conflict {
            message: "could not serialize access".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::ConcurrentConflict { .. }));
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn not_found_passes_through() {
        let err: AppError = DatabaseError::NotFound {
            entity: "PayoutRequest",
            id: "x".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), 404);
    }
}
