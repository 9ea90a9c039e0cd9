//! Route 53 request plumbing.

use chrono::Utc;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};
use crate::utils::log_sanitizer::truncate_for_log;

use super::sign::{SigV4, canonical_query, payload_hash};
use super::types::Route53ErrorBody;
use super::{API_VERSION, PROVIDER, Route53Driver, SERVICE};

/// Raw error code and message from a Route 53 error body.
fn parse_error_body(status: u16, text: &str) -> RawApiError {
    match quick_xml::de::from_str::<Route53ErrorBody>(text) {
        Ok(Route53ErrorBody {
            error: Some(error), ..
        }) => RawApiError::with_code(error.code, error.message),
        Ok(Route53ErrorBody {
            messages: Some(messages),
            ..
        }) => RawApiError::with_code("InvalidChangeBatch", messages.items.join("; ")),
        _ => RawApiError::with_code(
            status.to_string(),
            format!("HTTP {status}: {}", truncate_for_log(text)),
        ),
    }
}

impl Route53Driver {
    fn signer(&self) -> SigV4<'_> {
        SigV4 {
            access_key_id: &self.access_key_id,
            secret_access_key: &self.secret_access_key,
            region: &self.region,
            service: SERVICE,
        }
    }

    /// Send one signed request; `path` is relative to the API version root.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<String>,
        context: ErrorContext,
    ) -> Result<String> {
        let uri = format!("/{API_VERSION}{path}");
        let query = canonical_query(query);
        let payload = body.unwrap_or_default();
        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let content_hash = payload_hash(&payload);

        let headers = [
            ("host", self.host.as_str()),
            ("x-amz-date", amz_date.as_str()),
            ("x-amz-content-sha256", content_hash.as_str()),
        ];
        let authorization =
            self.signer()
                .authorization(method.as_str(), &uri, &query, &headers, &payload, &amz_date);

        let url = if query.is_empty() {
            format!("{}{uri}", self.base_url)
        } else {
            format!("{}{uri}?{query}", self.base_url)
        };

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header("X-Amz-Date", &amz_date)
            .header("X-Amz-Content-Sha256", &content_hash)
            .header("Authorization", authorization);
        if !payload.is_empty() {
            log::debug!("Request Body: {}", truncate_for_log(&payload));
            builder = builder
                .header("Content-Type", "application/xml")
                .body(payload);
        }

        let (status, text) =
            HttpUtils::execute_request(builder, PROVIDER, method.as_str(), &uri).await?;

        if status >= 400 {
            let raw = parse_error_body(status, &text);
            log::warn!(
                "[{PROVIDER}] {method} {uri} failed: {} {}",
                raw.code.as_deref().unwrap_or("-"),
                raw.message
            );
            return Err(self.map_error(raw, context));
        }
        Ok(text)
    }

    fn to_xml<B: Serialize>(&self, body: &B) -> Result<String> {
        quick_xml::se::to_string(body).map_err(|e| self.parse_error(format!("cannot encode request: {e}")))
    }

    pub(crate) async fn get_xml<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: ErrorContext,
    ) -> Result<T> {
        let text = self.request(Method::GET, path, query, None, context).await?;
        HttpUtils::parse_xml(&text, PROVIDER)
    }

    pub(crate) async fn post_xml<T, B>(&self, path: &str, body: &B, context: ErrorContext) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let payload = self.to_xml(body)?;
        let text = self
            .request(Method::POST, path, &[], Some(payload), context)
            .await?;
        HttpUtils::parse_xml(&text, PROVIDER)
    }

    pub(crate) async fn delete_xml(&self, path: &str, context: ErrorContext) -> Result<()> {
        self.request(Method::DELETE, path, &[], None, context)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_body() {
        let raw = parse_error_body(
            400,
            "<ErrorResponse><Error><Type>Sender</Type><Code>Throttling</Code><Message>Rate exceeded</Message></Error></ErrorResponse>",
        );
        assert_eq!(raw.code.as_deref(), Some("Throttling"));
        assert_eq!(raw.message, "Rate exceeded");
    }

    #[test]
    fn invalid_change_batch_body() {
        let raw = parse_error_body(
            400,
            "<InvalidChangeBatch><Messages><Message>it already exists</Message></Messages></InvalidChangeBatch>",
        );
        assert_eq!(raw.code.as_deref(), Some("InvalidChangeBatch"));
        assert_eq!(raw.message, "it already exists");
    }

    #[test]
    fn non_xml_body_uses_status() {
        let raw = parse_error_body(403, "Forbidden");
        assert_eq!(raw.code.as_deref(), Some("403"));
    }
}
