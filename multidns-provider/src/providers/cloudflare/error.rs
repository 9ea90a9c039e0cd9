//! Cloudflare error mapping

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::{CloudflareDriver, PROVIDER};

/// Cloudflare error code mapping
/// Reference: <https://api.cloudflare.com/#getting-started-responses>
impl ProviderErrorMapper for CloudflareDriver {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        let provider = self.provider_name().to_string();
        match raw.code.as_deref() {
            // 6003: Invalid request headers
            // 6103: Invalid format for X-Auth-Key header
            // 6111: Invalid format for Authorization header
            // 9103: Unknown X-Auth-Key or X-Auth-Email
            // 10000: Authentication error
            Some("6003" | "6103" | "6111" | "9103" | "10000" | "401") => {
                ProviderError::InvalidCredentials {
                    provider,
                    raw_message: Some(raw.message),
                }
            }

            // 9109: Unauthorized to access requested resource
            Some("9109" | "403") => ProviderError::PermissionDenied {
                provider,
                raw_message: Some(raw.message),
            },

            // 1004: DNS Validation Error
            // 9000: Invalid or missing name
            // 9005/9006: A/AAAA content is not an address
            // 9009: MX content must be a hostname
            // 9021: Invalid TTL
            // 9041: This DNS record cannot be proxied
            Some(code @ ("1004" | "9000" | "9005" | "9006" | "9009" | "9021" | "9041")) => {
                let field = match code {
                    "9000" => "name",
                    "9005" | "9006" | "9009" => "value",
                    "9021" => "ttl",
                    "9041" => "proxied",
                    _ => "record",
                };
                ProviderError::InvalidRecord {
                    provider,
                    field: field.to_string(),
                    detail: raw.message,
                }
            }

            // 81053-81058: a record with that host/settings already exists
            Some("81053" | "81054" | "81055" | "81056" | "81057" | "81058") => {
                ProviderError::RecordExists {
                    provider,
                    record_name: context
                        .record_name
                        .unwrap_or_else(|| "<unknown>".to_string()),
                    raw_message: Some(raw.message),
                }
            }

            // 81044: Record does not exist
            Some("81044") => ProviderError::RecordNotFound {
                provider,
                record_id: context.record_id.unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            // 81045: The record quota has been exceeded
            // 1105: Zone limit reached for the account
            Some("81045" | "1105") => ProviderError::QuotaExceeded {
                provider,
                raw_message: Some(raw.message),
            },

            // 971: Please wait and consider throttling your request speed
            // 10429: Rate limited
            Some("971" | "10429") => ProviderError::RateLimitExceeded {
                provider,
                retry_after: None,
                raw_message: Some(raw.message),
            },

            // 7000: No route for that URI
            // 7003: Could not route, object identifier invalid
            // 1001: Invalid zone identifier
            // A bad record ID inside a valid zone also lands here.
            Some("7000" | "7003" | "1001" | "404") => match context.record_id {
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
