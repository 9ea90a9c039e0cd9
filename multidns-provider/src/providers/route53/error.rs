//! Route 53 error mapping

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::{PROVIDER, Route53Driver};

/// Route 53 error code mapping
/// Reference: <https://docs.aws.amazon.com/Route53/latest/APIReference/CommonErrors.html>
impl ProviderErrorMapper for Route53Driver {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        let provider = self.provider_name().to_string();
        match raw.code.as_deref() {
            Some("NoSuchHostedZone" | "HostedZoneNotFound") => ProviderError::ZoneNotFound {
                provider,
                zone: context.zone.unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            // InvalidChangeBatch carries the reason only in its message text.
            Some("InvalidChangeBatch") if raw.message.contains("already exists") => {
                ProviderError::RecordExists {
                    provider,
                    record_name: context
                        .record_name
                        .unwrap_or_else(|| "<unknown>".to_string()),
                    raw_message: Some(raw.message),
                }
            }
            Some("InvalidChangeBatch") if raw.message.contains("not found") => {
                ProviderError::RecordNotFound {
                    provider,
                    record_id: context.record_id.unwrap_or_else(|| "<unknown>".to_string()),
                    raw_message: Some(raw.message),
                }
            }
            Some("InvalidChangeBatch" | "InvalidInput" | "InvalidDomainName") => {
                ProviderError::InvalidRecord {
                    provider,
                    field: "record".to_string(),
                    detail: raw.message,
                }
            }

            Some("Throttling" | "ThrottlingException" | "PriorRequestNotComplete") => {
                ProviderError::RateLimitExceeded {
                    provider,
                    retry_after: None,
                    raw_message: Some(raw.message),
                }
            }

            Some(
                "InvalidClientTokenId"
                | "SignatureDoesNotMatch"
                | "IncompleteSignature"
                | "MissingAuthenticationToken"
                | "ExpiredToken"
                | "401",
            ) => ProviderError::InvalidCredentials {
                provider,
                raw_message: Some(raw.message),
            },

            Some("AccessDenied" | "AccessDeniedException" | "403") => {
                ProviderError::PermissionDenied {
                    provider,
                    raw_message: Some(raw.message),
                }
            }

            Some("TooManyHostedZones" | "LimitsExceeded" | "TooManyRecords") => {
                ProviderError::QuotaExceeded {
                    provider,
                    raw_message: Some(raw.message),
                }
            }

            Some("404") => match context.record_id {
                Some(record_id) => ProviderError::RecordNotFound {
                    provider,
                    record_id,
                    raw_message: Some(raw.message),
                },
                None => ProviderError::ZoneNotFound {
                    provider,
                    zone: context.zone.unwrap_or_else(|| "<unknown>".to_string()),
                    raw_message: Some(raw.message),
                },
            },

            _ => self.unknown_error(raw),
        }
    }
}
