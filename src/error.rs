/// Per-request failures. Both are recoverable: the caller should fall back to
/// serving the request from the origin server instead of redirecting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedirectError {
    #[error("cdn redirect is not enabled")]
    FeatureDisabled,

    #[error("no path mapping rule matches {path}")]
    NoMappingMatch { path: String },
}

impl RedirectError {
    /// Stable label used in log fields and metric labels
    pub fn reason(&self) -> &'static str {
        match self {
            RedirectError::FeatureDisabled => "disabled",
            RedirectError::NoMappingMatch { .. } => "no_mapping",
        }
    }
}

/// Configuration errors. These are raised while loading configuration and
/// are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must not be empty when auth is enabled")]
    MissingCredential { field: &'static str },

    #[error("invalid path mapping rule {rule:?}: {reason}")]
    InvalidMappingRule { rule: String, reason: &'static str },

    #[error("cdn.endpoint must not be empty")]
    MissingEndpoint,

    #[error("invalid cdn.endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Reasons a token fails verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed sign token")]
    Malformed,

    #[error("sign token expired at {expired_at} (now {now})")]
    Expired { expired_at: u64, now: u64 },

    #[error("sign token hash mismatch")]
    Mismatch,
}

pub type Result<T> = std::result::Result<T, RedirectError>;
