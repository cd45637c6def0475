pub mod audit;
pub mod catalog;
pub mod clock;
pub mod collection;
pub mod config;
pub mod db;
pub mod demo;
pub mod display;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod patrol;
pub mod policy;
pub mod stats;
pub mod store;
pub mod validate;
pub mod visibility;
pub mod workspace;

#[cfg(test)]
mod tests {
    use super::error::{AppError, FieldError, REMOTE_FAILURE};

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("DB_TEST", "db failed").with_retryable(false);
        assert_eq!(err.code, "DB_TEST");
        assert_eq!(err.message, "db failed");
        assert!(!err.retryable);
        assert!(err.field_errors.is_empty());
    }

    #[test]
    fn validation_error_lists_fields() {
        let err = AppError::validation(vec![
            FieldError::new("title", "is required"),
            FieldError::new("severity", "is required"),
        ]);
        assert_eq!(err.details.as_deref(), Some("fields=title, severity"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["field_errors"][1]["field"], "severity");
    }

    #[test]
    fn remote_failure_is_retryable_and_keeps_the_cause() {
        let cause = AppError::new("DB_WRITE_FAILED", "disk full").with_details("SQLITE_FULL");
        let err = AppError::remote_failure(cause);
        assert_eq!(err.code, REMOTE_FAILURE);
        assert!(err.retryable);
        assert_eq!(
            err.details.as_deref(),
            Some("[DB_WRITE_FAILED] disk full: SQLITE_FULL")
        );
    }
}
