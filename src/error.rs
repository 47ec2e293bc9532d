use thiserror::Error;

/// Errors surfaced by the translation sync engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A single-language write targeted a field that was never initialized
    #[error("Field '{0}' is not present in the store")]
    FieldNotFound(String),

    /// The external translation operation failed for a field
    #[error("Translation failed for field '{field}': {message}")]
    Translation { field: String, message: String },
}

impl SyncError {
    /// Wrap a translator failure, keeping the full context chain in the message.
    pub fn translation(field: &str, error: &anyhow::Error) -> Self {
        SyncError::Translation {
            field: field.to_string(),
            message: format!("{:#}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_not_found_message() {
        let err = SyncError::FieldNotFound("title".to_string());
        assert_eq!(err.to_string(), "Field 'title' is not present in the store");
    }

    #[test]
    fn test_translation_keeps_context_chain() {
        let inner = anyhow::anyhow!("connection refused").context("Failed to send request");
        let err = SyncError::translation("body", &inner);
        let message = err.to_string();

        assert!(message.contains("body"));
        assert!(message.contains("Failed to send request"));
        assert!(message.contains("connection refused"));
    }
}
