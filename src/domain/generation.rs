//! Failure taxonomy for reply generation.

use thiserror::Error;

/// Why a generation did not produce text.
///
/// Every variant carries a human-readable detail. None of them leave a cache
/// row or a timeline entry behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Credential missing or unusable. Never retried.
    #[error("Generation is not configured: {0}")]
    Config(String),

    /// Rate limit, 5xx or network failure that outlived the retry budget.
    #[error("Upstream temporarily unavailable: {detail}")]
    TransientUpstream { status: Option<u16>, detail: String },

    /// The model answered with blank text on every attempt.
    #[error("Upstream returned an empty reply: {0}")]
    EmptyResponse(String),

    /// A 4xx other than 429. Not retried.
    #[error("Upstream rejected the request: {detail}")]
    PermanentUpstream { status: u16, detail: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl GenerationError {
    /// HTTP status reported by the upstream, when there was one.
    #[must_use]
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::TransientUpstream { status, .. } => *status,
            Self::PermanentUpstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used for the `outcome` metric dimension.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::TransientUpstream { .. } => "transient",
            Self::EmptyResponse(_) => "empty",
            Self::PermanentUpstream { .. } => "permanent",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<anyhow::Error> for GenerationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

impl From<sea_orm::DbErr> for GenerationError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_exposed_for_http_failures() {
        let transient = GenerationError::TransientUpstream {
            status: Some(503),
            detail: "HTTP 503: busy".to_string(),
        };
        let permanent = GenerationError::PermanentUpstream {
            status: 400,
            detail: "HTTP 400: bad".to_string(),
        };

        assert_eq!(transient.upstream_status(), Some(503));
        assert_eq!(permanent.upstream_status(), Some(400));
        assert_eq!(GenerationError::Config("no key".into()).upstream_status(), None);
    }

    #[test]
    fn display_carries_detail() {
        let err = GenerationError::EmptyResponse("blank after 3 attempts".to_string());
        assert!(err.to_string().contains("blank after 3 attempts"));
    }

    #[test]
    fn storage_errors_keep_context_chain() {
        let err: GenerationError = anyhow::anyhow!("disk full")
            .context("Failed to insert summary")
            .into();
        assert_eq!(err.kind(), "storage");
        assert!(err.to_string().contains("disk full"));
    }
}
