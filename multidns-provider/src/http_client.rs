//! Shared HTTP plumbing for the vendor adapters.
//!
//! Adapters build their own signed `RequestBuilder`; this module sends it,
//! logs it, and turns transport-level failures into [`ProviderError`]s.
//! Requests are sent exactly once. Retrying is left to the caller.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::utils::log_sanitizer::truncate_for_log;

pub(crate) struct HttpUtils;

impl HttpUtils {
    /// Send `request_builder` and return `(status, body)`.
    ///
    /// - a client-side timeout becomes `OperationTimeout`
    /// - connection failures and HTTP 502-504 become `NetworkError`
    /// - HTTP 429 becomes `RateLimitExceeded` carrying `Retry-After`
    ///
    /// Any other status is returned for the adapter to interpret.
    pub async fn execute_request(
        request_builder: RequestBuilder,
        provider_name: &str,
        method_name: &str,
        url_or_action: &str,
    ) -> Result<(u16, String), ProviderError> {
        log::debug!("[{provider_name}] {method_name} {url_or_action}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::OperationTimeout {
                    provider: provider_name.to_string(),
                    detail: format!("{method_name} {url_or_action}: {e}"),
                }
            } else {
                ProviderError::NetworkError {
                    provider: provider_name.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[{provider_name}] Response Status: {status_code}");

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        if status_code == 429 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{provider_name}] Rate limited (HTTP 429), retry_after={retry_after:?}");
            return Err(ProviderError::RateLimitExceeded {
                provider: provider_name.to_string(),
                retry_after,
                raw_message: (!body.is_empty()).then(|| truncate_for_log(&body)),
            });
        }

        if matches!(status_code, 502..=504) {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{provider_name}] Gateway error (HTTP {status_code})");
            return Err(ProviderError::NetworkError {
                provider: provider_name.to_string(),
                detail: format!("HTTP {status_code}: {}", truncate_for_log(&body)),
            });
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError {
                provider: provider_name.to_string(),
                detail: format!("Failed to read response body: {e}"),
            })?;

        log::debug!(
            "[{provider_name}] Response Body: {}",
            truncate_for_log(&response_text)
        );

        Ok((status_code, response_text))
    }

    pub fn parse_json<T>(response_text: &str, provider_name: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("[{provider_name}] JSON parse failed: {e}");
            log::error!(
                "[{provider_name}] Raw response: {}",
                truncate_for_log(response_text)
            );
            ProviderError::ParseError {
                provider: provider_name.to_string(),
                detail: e.to_string(),
            }
        })
    }

    #[cfg(feature = "route53")]
    pub fn parse_xml<T>(response_text: &str, provider_name: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        quick_xml::de::from_str(response_text).map_err(|e| {
            log::error!("[{provider_name}] XML parse failed: {e}");
            log::error!(
                "[{provider_name}] Raw response: {}",
                truncate_for_log(response_text)
            );
            ProviderError::ParseError {
                provider: provider_name.to_string(),
                detail: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Foo {
        x: i32,
    }

    #[test]
    fn parse_json_valid() {
        let result: Result<Foo, ProviderError> = HttpUtils::parse_json(r#"{"x":42}"#, "test");
        assert!(
            matches!(&result, Ok(Foo { x: 42 })),
            "unexpected parse result: {result:?}"
        );
    }

    #[test]
    fn parse_json_invalid() {
        let result: Result<Foo, ProviderError> = HttpUtils::parse_json("not json", "test");
        assert!(
            matches!(&result, Err(ProviderError::ParseError { .. })),
            "unexpected parse result: {result:?}"
        );
    }

    #[cfg(feature = "route53")]
    #[test]
    fn parse_xml_valid() {
        #[derive(serde::Deserialize, Debug)]
        #[serde(rename_all = "PascalCase")]
        struct Wrapper {
            name: String,
        }
        let result: Result<Wrapper, ProviderError> =
            HttpUtils::parse_xml("<Wrapper><Name>example.com.</Name></Wrapper>", "test");
        assert!(
            matches!(&result, Ok(w) if w.name == "example.com."),
            "unexpected parse result: {result:?}"
        );
    }
}
