//! Cloudflare adapter (API v4).

mod error;
mod http;
mod provider;
mod types;

use std::collections::BTreeMap;

use reqwest::Client;

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::providers::common::create_http_client;
use crate::types::{
    Capability, DnsRecordType, LIMIT_MAX_BATCH_SIZE, LIMIT_MAX_DOMAINS,
    LIMIT_MAX_RECORDS_PER_DOMAIN, LIMIT_RATE_PER_SECOND, ProviderInfo,
};
use crate::utils::log_sanitizer::mask_secret;

pub(crate) use types::{CloudflareDnsRecord, CloudflareResponse, CloudflareZone};

pub(crate) const PROVIDER: &str = "cloudflare";
pub(crate) const CF_API_BASE: &str = "https://api.cloudflare.com/client/v4";
/// Largest `per_page` the zones endpoint accepts.
pub(crate) const MAX_PAGE_SIZE_ZONES: u32 = 50;
/// Largest `per_page` the DNS records endpoint accepts.
pub(crate) const MAX_PAGE_SIZE_RECORDS: u32 = 100;

/// How requests authenticate.
#[derive(Debug, Clone)]
pub(crate) enum CloudflareAuth {
    /// Scoped API token, sent as `Authorization: Bearer`.
    Token(String),
    /// Global API key, sent as `X-Auth-Key` + `X-Auth-Email`.
    Key { api_key: String, email: String },
}

/// Cloudflare DNS driver.
///
/// Credentials: `api_token`, or `api_key` together with `email`.
/// `account_id` is only needed for zone creation.
#[derive(Debug)]
pub struct CloudflareDriver {
    pub(crate) client: Client,
    pub(crate) auth: CloudflareAuth,
    pub(crate) base_url: String,
    pub(crate) account_id: Option<String>,
    pub(crate) info: ProviderInfo,
    pub(crate) concurrency: usize,
}

impl CloudflareDriver {
    /// Build from a validated configuration. Performs no network I/O.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let auth = match config.credential("api_token") {
            Some(token) => CloudflareAuth::Token(token.to_string()),
            None => CloudflareAuth::Key {
                api_key: config.require_credential("api_key")?.to_string(),
                email: config.require_credential("email")?.to_string(),
            },
        };
        let base_url = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(CF_API_BASE)
            .trim_end_matches('/')
            .to_string();

        log::debug!(
            "[{PROVIDER}] account '{}' using {} at {base_url}",
            config.name,
            match &auth {
                CloudflareAuth::Token(token) => format!("token {}", mask_secret(token)),
                CloudflareAuth::Key { email, .. } => format!("global key for {email}"),
            }
        );

        Ok(Self {
            client: create_http_client(PROVIDER, config.timeout())?,
            info: provider_info(&base_url, &auth),
            auth,
            base_url,
            account_id: config.credential("account_id").map(str::to_string),
            concurrency: config.concurrency(),
        })
    }
}

fn provider_info(base_url: &str, auth: &CloudflareAuth) -> ProviderInfo {
    let limits = BTreeMap::from([
        (LIMIT_MAX_DOMAINS.to_string(), 1_000),
        (LIMIT_MAX_RECORDS_PER_DOMAIN.to_string(), 3_500),
        (LIMIT_MAX_BATCH_SIZE.to_string(), 100),
        (LIMIT_RATE_PER_SECOND.to_string(), 4),
    ]);
    let metadata = BTreeMap::from([
        ("endpoint".to_string(), base_url.to_string()),
        (
            "auth".to_string(),
            match auth {
                CloudflareAuth::Token(_) => "api_token",
                CloudflareAuth::Key { .. } => "api_key",
            }
            .to_string(),
        ),
    ]);

    ProviderInfo {
        name: "Cloudflare".to_string(),
        provider_type: PROVIDER.to_string(),
        version: "v4".to_string(),
        features: vec![
            Capability::DnsManagement,
            Capability::ZoneManagement,
            Capability::ZoneUpdate,
            Capability::BatchOperations,
            Capability::TxtChallenges,
            Capability::ZoneSync,
            Capability::Dnssec,
            Capability::ZoneFiles,
            Capability::Statistics,
            Capability::RecordComments,
        ],
        limits,
        regions: vec!["global".to_string()],
        record_types: vec![
            DnsRecordType::A,
            DnsRecordType::Aaaa,
            DnsRecordType::Cname,
            DnsRecordType::Mx,
            DnsRecordType::Txt,
            DnsRecordType::Ns,
            DnsRecordType::Srv,
            DnsRecordType::Caa,
        ],
        metadata,
    }
}
