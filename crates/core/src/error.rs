use crate::article::ArticleStatus;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Invalid transition: cannot {command} an article in status {status}")]
    InvalidTransition {
        status: ArticleStatus,
        command: &'static str,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl CoreError {
    /// Shorthand for a missing article addressed by `key`.
    pub fn article_not_found(key: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: "Article",
            key: key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_address() {
        let err = CoreError::article_not_found("public_id=abc version=2");
        assert_eq!(
            err.to_string(),
            "Entity not found: Article public_id=abc version=2"
        );
    }

    #[test]
    fn invalid_transition_message_names_status_and_command() {
        let err = CoreError::InvalidTransition {
            status: ArticleStatus::Editing,
            command: "approve",
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot approve an article in status EDITING"
        );
    }
}
