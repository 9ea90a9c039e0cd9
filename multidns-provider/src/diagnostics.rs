//! Connectivity probe, statistics, quota, usage and metrics.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;

use crate::error::Result;
use crate::traits::DnsDriver;
use crate::types::{
    LIMIT_MAX_DOMAINS, LIMIT_MAX_RECORDS_PER_DOMAIN, LIMIT_RATE_PER_SECOND, ListOptions, Metrics,
    Quota, Statistics, TestResult, Usage,
};

/// Time a one-zone listing. Failures are captured in the result.
pub async fn probe<D>(driver: &D) -> TestResult
where
    D: DnsDriver + ?Sized,
{
    let started = Instant::now();
    let outcome = driver.list_zones(&ListOptions::page(1, 1)).await;
    let latency = started.elapsed();

    let mut details = BTreeMap::new();
    details.insert("provider".to_string(), driver.provider_type().to_string());

    let (success, error_msg) = match outcome {
        Ok(zones) => {
            details.insert("zones_seen".to_string(), zones.len().to_string());
            (true, None)
        }
        Err(e) => {
            e.log(&format!("[{}] connectivity test", driver.provider_type()));
            (false, Some(e.to_string()))
        }
    };

    TestResult {
        success,
        latency,
        error_msg,
        details,
        tested_at: Utc::now(),
        test_type: "list_zones".to_string(),
        endpoint: driver.info().metadata.get("endpoint").cloned(),
        status_code: None,
    }
}

/// Record counts by type for one zone.
pub async fn statistics<D>(driver: &D, zone: &str) -> Result<Statistics>
where
    D: DnsDriver + ?Sized,
{
    let records = driver.list_records(zone, &ListOptions::all()).await?;
    let mut records_by_type = BTreeMap::new();
    for record in &records {
        *records_by_type.entry(record.record_type).or_insert(0) += 1;
    }
    Ok(Statistics {
        domain: zone.to_string(),
        total_records: records.len(),
        records_by_type,
        collected_at: Utc::now(),
    })
}

/// Declared limits plus the live zone count.
pub async fn quota<D>(driver: &D) -> Result<Quota>
where
    D: DnsDriver + ?Sized,
{
    let info = driver.info();
    let zones = driver.list_zones(&ListOptions::all()).await?;
    let rate_limit = info.limit(LIMIT_RATE_PER_SECOND);

    Ok(Quota {
        provider: info.provider_type.clone(),
        total_domains: info.limit(LIMIT_MAX_DOMAINS),
        used_domains: zones.len() as u64,
        total_records: info.limit(LIMIT_MAX_RECORDS_PER_DOMAIN),
        used_records: 0,
        rate_limit,
        rate_remaining: rate_limit,
        reset_time: Utc::now() + chrono::Duration::hours(1),
        features: info.features.iter().map(|f| (*f, true)).collect(),
        limits: info.limits.clone(),
    })
}

/// Zone and record counts across the whole account.
///
/// A zone whose records cannot be listed is skipped rather than failing
/// the whole report.
pub async fn usage<D>(driver: &D) -> Result<Usage>
where
    D: DnsDriver + ?Sized,
{
    let info = driver.info();
    let zones = driver.list_zones(&ListOptions::all()).await?;

    let mut records_used = 0u64;
    for zone in &zones {
        match driver.list_records(&zone.name, &ListOptions::all()).await {
            Ok(records) => records_used += records.len() as u64,
            Err(e) => e.log(&format!(
                "[{}] usage: cannot count records of {}",
                info.provider_type, zone.name
            )),
        }
    }

    Ok(Usage {
        provider: info.provider_type.clone(),
        domains_used: zones.len() as u64,
        domains_limit: info.limit(LIMIT_MAX_DOMAINS),
        records_used,
        records_limit: info.limit(LIMIT_MAX_RECORDS_PER_DOMAIN) * zones.len() as u64,
        collected_at: Utc::now(),
    })
}

/// Static driver facts merged with usage counters.
pub async fn metrics<D>(driver: &D) -> Result<Metrics>
where
    D: DnsDriver + ?Sized,
{
    let info = driver.info();
    let mut metrics = Metrics::new();
    metrics.insert("provider".to_string(), json!(info.provider_type));
    metrics.insert("version".to_string(), json!(info.version));
    metrics.insert("capabilities".to_string(), json!(info.features));
    metrics.insert("record_types".to_string(), json!(info.record_types));
    metrics.insert("last_check".to_string(), json!(Utc::now().to_rfc3339()));

    let usage = driver.get_usage().await?;
    metrics.insert("domains_used".to_string(), json!(usage.domains_used));
    metrics.insert("records_used".to_string(), json!(usage.records_used));
    Ok(metrics)
}
