use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for every driver, registry and engine operation.
///
/// Each variant carries a `provider` field naming the provider type (or the
/// engine component) that produced it, plus variant-specific context. The
/// enum is serializable with a `code` tag so HTTP layers can surface the kind
/// and the vendor message verbatim.
///
/// # Capability gaps
///
/// [`UnsupportedOperation`](Self::UnsupportedOperation) and
/// [`DnssecNotSupported`](Self::DnssecNotSupported) are not failures of the
/// remote API: they state that the driver cannot perform the call at all.
/// Check [`is_unsupported`](Self::is_unsupported) or consult
/// `DnsDriver::get_capabilities` before invoking optional operations.
///
/// # Timeouts
///
/// [`OperationTimeout`](Self::OperationTimeout) (a deadline elapsed, including
/// DNS propagation waits) is kept apart from
/// [`NetworkError`](Self::NetworkError) (the vendor could not be reached).
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// The provider type is empty or not registered.
    #[error("[{provider}] Invalid provider type")]
    InvalidProviderType {
        /// The offending provider type key.
        provider: String,
    },

    /// The account name in the configuration is empty.
    #[error("[{provider}] Invalid provider name")]
    InvalidProviderName {
        /// Provider type of the configuration.
        provider: String,
    },

    /// A required credential field is missing or blank.
    #[error("[{provider}] Missing credentials: {field}")]
    MissingCredentials {
        /// Provider type of the configuration.
        provider: String,
        /// Name of the missing field (`*` when the whole map is empty).
        field: String,
    },

    /// The provided credentials are invalid or expired.
    #[error("[{provider}] Invalid credentials{}", suffix(.raw_message))]
    InvalidCredentials {
        /// Provider that produced the error.
        provider: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// No driver is registered under this provider type.
    #[error("[{provider}] Provider not found")]
    ProviderNotFound {
        /// The provider type key that was looked up.
        provider: String,
    },

    /// The zone does not exist in the provider account.
    #[error("[{provider}] Zone '{zone}' not found{}", suffix(.raw_message))]
    ZoneNotFound {
        /// Provider that produced the error.
        provider: String,
        /// Zone name that was not found.
        zone: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// The record does not exist.
    #[error("[{provider}] Record '{record_id}' not found{}", suffix(.raw_message))]
    RecordNotFound {
        /// Provider that produced the error.
        provider: String,
        /// ID (or name) of the record that was not found.
        record_id: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// A record with the same identity already exists.
    #[error("[{provider}] Record '{record_name}' already exists{}", suffix(.raw_message))]
    RecordExists {
        /// Provider that produced the error.
        provider: String,
        /// Name of the conflicting record.
        record_name: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// A record is malformed or not acceptable to this driver.
    #[error("[{provider}] Invalid record field '{field}': {detail}")]
    InvalidRecord {
        /// Provider that produced the error.
        provider: String,
        /// Offending field (`type`, `name`, `value`, `ttl`, ...).
        field: String,
        /// Description of what's wrong.
        detail: String,
    },

    /// The account's resource quota has been exceeded.
    #[error("[{provider}] Quota exceeded{}", suffix(.raw_message))]
    QuotaExceeded {
        /// Provider that produced the error.
        provider: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// The vendor API reported that its rate limit was hit.
    #[error("[{provider}] Rate limit exceeded{}", retry_hint(.retry_after))]
    RateLimitExceeded {
        /// Provider that produced the error.
        provider: String,
        /// Suggested wait in seconds, if the API provided one.
        retry_after: Option<u64>,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// A deadline elapsed: an HTTP request timed out or a propagation wait expired.
    #[error("[{provider}] Operation timed out: {detail}")]
    OperationTimeout {
        /// Provider that produced the error.
        provider: String,
        /// What timed out.
        detail: String,
    },

    /// The driver cannot perform this operation.
    #[error("[{provider}] Unsupported operation: {operation}")]
    UnsupportedOperation {
        /// Provider that produced the error.
        provider: String,
        /// Operation name.
        operation: String,
    },

    /// The driver does not support DNSSEC management.
    #[error("[{provider}] DNSSEC is not supported")]
    DnssecNotSupported {
        /// Provider that produced the error.
        provider: String,
    },

    /// A zone file could not be parsed or the requested format is unknown.
    #[error("[{provider}] Invalid zone file (line {line}): {detail}")]
    InvalidZoneFile {
        /// Provider that produced the error.
        provider: String,
        /// 1-based line number, 0 when the error is not tied to a line.
        line: usize,
        /// Description of what's wrong.
        detail: String,
    },

    /// A network-level error occurred (DNS resolution failure, connection refused, 5xx gateway).
    #[error("[{provider}] Network error: {detail}")]
    NetworkError {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The authenticated principal lacks permission for the requested operation.
    #[error("[{provider}] Permission denied{}", suffix(.raw_message))]
    PermissionDenied {
        /// Provider that produced the error.
        provider: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// Failed to parse the provider's API response.
    #[error("[{provider}] Parse error: {detail}")]
    ParseError {
        /// Provider that produced the error.
        provider: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// The caller cancelled a long-running operation.
    #[error("[{provider}] Operation cancelled")]
    Cancelled {
        /// Provider that produced the error.
        provider: String,
    },

    /// An unrecognized error from the provider API.
    ///
    /// This is a catch-all for error codes not yet mapped to a specific variant.
    #[error("[{provider}] {raw_message}")]
    Unknown {
        /// Provider that produced the error.
        provider: String,
        /// Raw error code from the API, if available.
        raw_code: Option<String>,
        /// Raw error message from the API.
        raw_message: String,
    },
}

fn suffix(raw_message: &Option<String>) -> String {
    raw_message
        .as_deref()
        .map_or_else(String::new, |msg| format!(": {msg}"))
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    retry_after.map_or_else(String::new, |secs| format!(" (retry after {secs}s)"))
}

impl ProviderError {
    /// Whether the error is an expected outcome (bad input, missing resource,
    /// capability gap) rather than a system fault. Used for log levels:
    /// `true` logs at `warn`, `false` at `error`.
    ///
    /// **Update this when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InvalidProviderType { .. }
                | Self::InvalidProviderName { .. }
                | Self::MissingCredentials { .. }
                | Self::InvalidCredentials { .. }
                | Self::ProviderNotFound { .. }
                | Self::ZoneNotFound { .. }
                | Self::RecordNotFound { .. }
                | Self::RecordExists { .. }
                | Self::InvalidRecord { .. }
                | Self::QuotaExceeded { .. }
                | Self::UnsupportedOperation { .. }
                | Self::DnssecNotSupported { .. }
                | Self::InvalidZoneFile { .. }
                | Self::PermissionDenied { .. }
                | Self::Cancelled { .. }
        )
    }

    /// `true` for the "unsupported" outcome of an optional operation.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedOperation { .. } | Self::DnssecNotSupported { .. }
        )
    }

    /// Provider type recorded on the error.
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::InvalidProviderType { provider }
            | Self::InvalidProviderName { provider }
            | Self::MissingCredentials { provider, .. }
            | Self::InvalidCredentials { provider, .. }
            | Self::ProviderNotFound { provider }
            | Self::ZoneNotFound { provider, .. }
            | Self::RecordNotFound { provider, .. }
            | Self::RecordExists { provider, .. }
            | Self::InvalidRecord { provider, .. }
            | Self::QuotaExceeded { provider, .. }
            | Self::RateLimitExceeded { provider, .. }
            | Self::OperationTimeout { provider, .. }
            | Self::UnsupportedOperation { provider, .. }
            | Self::DnssecNotSupported { provider }
            | Self::InvalidZoneFile { provider, .. }
            | Self::NetworkError { provider, .. }
            | Self::PermissionDenied { provider, .. }
            | Self::ParseError { provider, .. }
            | Self::Cancelled { provider }
            | Self::Unknown { provider, .. } => provider,
        }
    }

    pub(crate) fn unsupported(provider: &str, operation: &str) -> Self {
        Self::UnsupportedOperation {
            provider: provider.to_string(),
            operation: operation.to_string(),
        }
    }

    pub(crate) fn invalid_record(
        provider: &str,
        field: &str,
        detail: impl Into<String>,
    ) -> Self {
        Self::InvalidRecord {
            provider: provider.to_string(),
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    /// Log the error at a level matching [`is_expected`](Self::is_expected).
    pub(crate) fn log(&self, context: &str) {
        if self.is_expected() {
            log::warn!("{context}: {self}");
        } else {
            log::error!("{context}: {self}");
        }
    }
}

/// Convenience type alias for `Result<T, ProviderError>`.
pub type Result<T> = std::result::Result<T, ProviderError>;
