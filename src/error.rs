use crate::store::StoreError;

/// Errors surfaced to the annotator. All of them are recoverable.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Missing or invalid input configuration; the user corrects it and retries.
    #[error("{0}")]
    Input(String),

    /// A store call failed or returned a non-success status.
    #[error("{action}: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: StoreError,
    },

    /// Malformed CSV input.
    #[error("Failed to read CSV: {0}")]
    Parse(String),
}

impl SessionError {
    pub fn transport(action: &'static str, source: StoreError) -> Self {
        SessionError::Transport { action, source }
    }
}
