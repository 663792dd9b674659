use thiserror::Error;

/// Failure taxonomy shared by every relay handler.
///
/// None of these are retried in-process. Handlers log them with enough
/// context to correlate and hand them back to the invoking host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("missing attribute '{name}'")]
    MissingAttribute { name: String },

    #[error("{capability} failed for '{target}': {message}")]
    DownstreamUnavailable {
        capability: String,
        target: String,
        message: String,
    },

    #[error("misconfiguration: {reason}")]
    Misconfiguration { reason: String },
}

impl RelayError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    pub fn missing_attribute(name: impl Into<String>) -> Self {
        Self::MissingAttribute { name: name.into() }
    }

    pub fn downstream(
        capability: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DownstreamUnavailable {
            capability: capability.into(),
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn misconfiguration(reason: impl Into<String>) -> Self {
        Self::Misconfiguration {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code, used as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::MissingAttribute { .. } => "missing_attribute",
            Self::DownstreamUnavailable { .. } => "downstream_unavailable",
            Self::Misconfiguration { .. } => "misconfiguration",
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
