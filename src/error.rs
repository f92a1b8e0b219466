use thiserror::Error;

use crate::form::ValidationErrors;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("rejected input: {0}")]
    Rejected(ValidationErrors),
    #[error("database error")]
    Database { source: sqlx::Error },
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Rejected(errors)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => AppError::NotFound,
            _ => AppError::Database { source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_is_not_found() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::NotFound
        ));
    }

    #[test]
    fn other_sqlx_errors_are_database_errors() {
        let error = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(error, AppError::Database { .. }));
        assert_eq!(error.to_string(), "database error");
    }
}
