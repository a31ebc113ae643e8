use thiserror::Error;

/// Core error type for the Greenlight engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Workflow template not found
    #[error("Workflow template not found: {0}")]
    TemplateNotFound(String),

    /// Workflow instance not found
    #[error("Workflow instance not found: {0}")]
    InstanceNotFound(String),

    /// Requested action is not legal from the instance's current status
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Caller-supplied argument violates a precondition
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Repository collaborator failed
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Save rejected because the instance was modified since it was read
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// Notifier collaborator failed
    #[error("Notification error: {0}")]
    NotificationError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Whether the caller can reasonably retry the operation.
    ///
    /// Dependency failures (storage, stale version, notification transport)
    /// are transient; everything else is a definitive rejection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::StorageError(_)
                | EngineError::VersionConflict(_)
                | EngineError::NotificationError(_)
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::SerializationError(err.to_string())
    }
}

impl From<String> for EngineError {
    fn from(err: String) -> Self {
        EngineError::Other(err)
    }
}

impl From<&str> for EngineError {
    fn from(err: &str) -> Self {
        EngineError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                EngineError::TemplateNotFound("tpl1".to_string()),
                "Workflow template not found: tpl1",
            ),
            (
                EngineError::InstanceNotFound("inst1".to_string()),
                "Workflow instance not found: inst1",
            ),
            (
                EngineError::InvalidStateTransition("approve from Rejected".to_string()),
                "Invalid state transition: approve from Rejected",
            ),
            (
                EngineError::ValidationError("reason is blank".to_string()),
                "Validation error: reason is blank",
            ),
            (
                EngineError::StorageError("db down".to_string()),
                "Storage error: db down",
            ),
            (
                EngineError::VersionConflict("expected 2, found 3".to_string()),
                "Version conflict: expected 2, found 3",
            ),
            (
                EngineError::NotificationError("smtp timeout".to_string()),
                "Notification error: smtp timeout",
            ),
            (
                EngineError::SerializationError("bad json".to_string()),
                "Serialization error: bad json",
            ),
            (EngineError::Other("other".to_string()), "other"),
        ];

        for (error, expected_msg) in errors {
            assert_eq!(error.to_string(), expected_msg);
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(EngineError::StorageError("x".into()).is_retryable());
        assert!(EngineError::VersionConflict("x".into()).is_retryable());
        assert!(EngineError::NotificationError("x".into()).is_retryable());

        assert!(!EngineError::TemplateNotFound("x".into()).is_retryable());
        assert!(!EngineError::InstanceNotFound("x".into()).is_retryable());
        assert!(!EngineError::InvalidStateTransition("x".into()).is_retryable());
        assert!(!EngineError::ValidationError("x".into()).is_retryable());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: EngineError = json_error.into();

        match error {
            EngineError::SerializationError(msg) => {
                assert!(msg.contains("expected value"));
            }
            _ => panic!("Expected SerializationError variant"),
        }
    }

    #[test]
    fn test_from_string() {
        let error: EngineError = "test error message".to_string().into();
        match error {
            EngineError::Other(msg) => assert_eq!(msg, "test error message"),
            _ => panic!("Expected Other variant"),
        }
    }

    #[test]
    fn test_error_clone_and_eq() {
        let original = EngineError::ValidationError("test".to_string());
        let cloned = original.clone();

        assert_eq!(original, cloned);
        assert_eq!(format!("{:?}", original), format!("{:?}", cloned));
    }
}
