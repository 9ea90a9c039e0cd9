//! Cloudflare request plumbing.

use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};
use crate::utils::log_sanitizer::truncate_for_log;

use super::types::CloudflareResultInfo;
use super::{CloudflareAuth, CloudflareDriver, CloudflareResponse, PROVIDER};

/// Build `?k=v&...` with every value percent-encoded.
pub(crate) fn query_string(params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect();
    format!("?{}", pairs.join("&"))
}

impl CloudflareDriver {
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            CloudflareAuth::Token(token) => builder.bearer_auth(token),
            CloudflareAuth::Key { api_key, email } => builder
                .header("X-Auth-Key", api_key)
                .header("X-Auth-Email", email),
        }
    }

    /// Send one request and unwrap the Cloudflare envelope.
    async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        context: ErrorContext,
    ) -> Result<CloudflareResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.authorize(self.client.request(method.clone(), &url));
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let (status, text) =
            HttpUtils::execute_request(builder, PROVIDER, method.as_str(), path).await?;

        let response: CloudflareResponse<T> = match HttpUtils::parse_json(&text, PROVIDER) {
            Ok(response) => response,
            Err(_) if status >= 400 => {
                let raw = RawApiError::with_code(
                    status.to_string(),
                    format!("HTTP {status}: {}", truncate_for_log(&text)),
                );
                return Err(self.map_error(raw, context));
            }
            Err(e) => return Err(e),
        };

        if !response.success || status >= 400 {
            let raw = response.errors.first().map_or_else(
                || RawApiError::with_code(status.to_string(), truncate_for_log(&text)),
                |e| RawApiError::with_code(e.code.to_string(), e.message.clone()),
            );
            log::warn!(
                "[{PROVIDER}] {method} {path} failed: {} {}",
                raw.code.as_deref().unwrap_or("-"),
                raw.message
            );
            return Err(self.map_error(raw, context));
        }

        Ok(response)
    }

    fn require_result<T>(&self, response: CloudflareResponse<T>) -> Result<T> {
        response
            .result
            .ok_or_else(|| self.parse_error("response has no result field"))
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        context: ErrorContext,
    ) -> Result<T> {
        let response = self
            .send::<T, ()>(Method::GET, path, None, context)
            .await?;
        self.require_result(response)
    }

    /// One page of a list endpoint.
    pub(crate) async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: ErrorContext,
    ) -> Result<(Vec<T>, CloudflareResultInfo)> {
        let response = self
            .send::<Vec<T>, ()>(
                Method::GET,
                &format!("{path}{}", query_string(query)),
                None,
                context,
            )
            .await?;
        let info = response.result_info.unwrap_or_default();
        Ok((response.result.unwrap_or_default(), info))
    }

    /// Every item of a list endpoint, or one page when `requested` is set.
    pub(crate) async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(&str, String)>,
        max_page_size: u32,
        requested: Option<(u32, u32)>,
        context: ErrorContext,
    ) -> Result<Vec<T>> {
        if let Some((page, page_size)) = requested {
            if page_size > max_page_size {
                return self
                    .get_window(path, query, max_page_size, (page, page_size), context)
                    .await;
            }
            query.push(("page", page.to_string()));
            query.push(("per_page", page_size.to_string()));
            let (items, _) = self.get_page(path, &query, context).await?;
            return Ok(items);
        }

        query.push(("per_page", max_page_size.to_string()));
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let mut page_query = query.clone();
            page_query.push(("page", page.to_string()));
            let (batch, info) = self.get_page(path, &page_query, context.clone()).await?;
            let fetched = batch.len();
            items.extend(batch);
            log::debug!(
                "[{PROVIDER}] {path}: page {}/{} ({} of {} items)",
                info.page,
                info.total_pages,
                items.len(),
                info.total_count
            );
            if fetched == 0 || page >= info.total_pages {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    /// A canonical page wider than the vendor limit, cut out of consecutive
    /// vendor pages of `max_page_size` items.
    async fn get_window<T: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(&str, String)>,
        max_page_size: u32,
        (page, page_size): (u32, u32),
        context: ErrorContext,
    ) -> Result<Vec<T>> {
        let per_page = u64::from(max_page_size);
        let skip = u64::from(page.saturating_sub(1)) * u64::from(page_size);
        let Ok(mut vendor_page) = u32::try_from(skip / per_page + 1) else {
            return Ok(Vec::new());
        };
        let mut offset = usize::try_from(skip % per_page).unwrap_or_default();
        let take = page_size as usize;

        query.push(("per_page", max_page_size.to_string()));
        let mut items = Vec::with_capacity(take);
        loop {
            let mut page_query = query.clone();
            page_query.push(("page", vendor_page.to_string()));
            let (batch, info) = self.get_page(path, &page_query, context.clone()).await?;
            let fetched = batch.len();
            let remaining = take - items.len();
            items.extend(batch.into_iter().skip(offset).take(remaining));
            offset = 0;
            if items.len() >= take || fetched == 0 || vendor_page >= info.total_pages {
                break;
            }
            vendor_page += 1;
        }
        Ok(items)
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B, context: ErrorContext) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(Method::POST, path, Some(body), context).await?;
        self.require_result(response)
    }

    pub(crate) async fn patch<T, B>(&self, path: &str, body: &B, context: ErrorContext) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(Method::PATCH, path, Some(body), context).await?;
        self.require_result(response)
    }

    pub(crate) async fn delete(&self, path: &str, context: ErrorContext) -> Result<()> {
        self.send::<serde_json::Value, ()>(Method::DELETE, path, None, context)
            .await
            .map(|_| ())
    }
}
