//! Amazon Route 53 adapter (REST/XML API 2013-04-01).

mod error;
mod http;
mod provider;
mod sign;
mod types;

use std::collections::BTreeMap;

use reqwest::{Client, Url};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::providers::common::create_http_client;
use crate::types::{
    Capability, DnsRecordType, LIMIT_MAX_BATCH_SIZE, LIMIT_MAX_DOMAINS,
    LIMIT_MAX_RECORDS_PER_DOMAIN, LIMIT_RATE_PER_SECOND, ProviderInfo,
};
use crate::utils::log_sanitizer::mask_secret;

pub(crate) const PROVIDER: &str = "route53";
pub(crate) const ROUTE53_ENDPOINT: &str = "https://route53.amazonaws.com";
pub(crate) const API_VERSION: &str = "2013-04-01";
pub(crate) const XMLNS: &str = "https://route53.amazonaws.com/doc/2013-04-01/";
/// SigV4 service name.
pub(crate) const SERVICE: &str = "route53";
/// Route 53 is global; requests are signed for this region unless configured.
pub(crate) const DEFAULT_REGION: &str = "us-east-1";
/// Largest `maxitems` for `ListHostedZones`.
pub(crate) const MAX_ITEMS_ZONES: u32 = 100;
/// Largest `maxitems` for `ListResourceRecordSets`.
pub(crate) const MAX_ITEMS_RECORDS: u32 = 300;

/// Route 53 DNS driver.
///
/// Credentials: `access_key_id`, `secret_access_key`, `region`.
///
/// Single-record writes rewrite the whole record set, so batch calls run
/// sequentially to keep values at one name from overwriting each other.
pub struct Route53Driver {
    pub(crate) client: Client,
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: String,
    pub(crate) region: String,
    pub(crate) base_url: String,
    /// `Host` value covered by the signature, with port when non-default.
    pub(crate) host: String,
    pub(crate) info: ProviderInfo,
}

impl Route53Driver {
    /// Build from a validated configuration. Performs no network I/O.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let access_key_id = config.require_credential("access_key_id")?.to_string();
        let secret_access_key = config.require_credential("secret_access_key")?.to_string();
        let region = config
            .credential("region")
            .or(config.region.as_deref())
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        let base_url = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(ROUTE53_ENDPOINT)
            .trim_end_matches('/')
            .to_string();
        let host = signing_host(&base_url)?;

        log::debug!(
            "[{PROVIDER}] account '{}' using key {} in {region} at {base_url}",
            config.name,
            mask_secret(&access_key_id)
        );

        Ok(Self {
            client: create_http_client(PROVIDER, config.timeout())?,
            info: provider_info(&base_url, &region),
            access_key_id,
            secret_access_key,
            region,
            base_url,
            host,
        })
    }
}

fn signing_host(base_url: &str) -> Result<String> {
    let url = Url::parse(base_url).map_err(|e| ProviderError::ParseError {
        provider: PROVIDER.to_string(),
        detail: format!("invalid endpoint '{base_url}': {e}"),
    })?;
    let Some(host) = url.host_str() else {
        return Err(ProviderError::ParseError {
            provider: PROVIDER.to_string(),
            detail: format!("endpoint '{base_url}' has no host"),
        });
    };
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn provider_info(base_url: &str, region: &str) -> ProviderInfo {
    let limits = BTreeMap::from([
        (LIMIT_MAX_DOMAINS.to_string(), 500),
        (LIMIT_MAX_RECORDS_PER_DOMAIN.to_string(), 10_000),
        (LIMIT_MAX_BATCH_SIZE.to_string(), 1_000),
        (LIMIT_RATE_PER_SECOND.to_string(), 5),
    ]);
    let metadata = BTreeMap::from([
        ("endpoint".to_string(), base_url.to_string()),
        ("api_version".to_string(), API_VERSION.to_string()),
    ]);

    ProviderInfo {
        name: "Amazon Route 53".to_string(),
        provider_type: PROVIDER.to_string(),
        version: API_VERSION.to_string(),
        features: vec![
            Capability::DnsManagement,
            Capability::ZoneManagement,
            Capability::BatchOperations,
            Capability::TxtChallenges,
            Capability::ZoneSync,
            Capability::ZoneFiles,
            Capability::Statistics,
            Capability::RecordSets,
        ],
        limits,
        regions: vec![region.to_string()],
        record_types: vec![
            DnsRecordType::A,
            DnsRecordType::Aaaa,
            DnsRecordType::Cname,
            DnsRecordType::Mx,
            DnsRecordType::Txt,
            DnsRecordType::Ns,
            DnsRecordType::Srv,
            DnsRecordType::Caa,
            DnsRecordType::Ptr,
        ],
        metadata,
    }
}
