use thiserror::Error;

/// Top-level error type for persona management.
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("This operation requires administrator permission.")]
    PermissionDenied,

    #[error("Persona {0} not found.")]
    NotFound(String),

    #[error("Persona {0} already exists, use /persona_plus update {0} instead.")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidPayload(String),

    #[error("Timed out waiting for persona content; operation cancelled.")]
    Timeout,

    #[error("profile sync failed ({adapter}): {message}")]
    Sync { adapter: String, message: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PersonaError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }

    /// Whether the error should be shown to the user verbatim rather than logged as a fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::NotFound(_)
                | Self::AlreadyExists(_)
                | Self::InvalidPayload(_)
                | Self::Timeout
        )
    }
}
