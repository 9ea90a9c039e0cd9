//! DNS-01 challenge orchestration.
//!
//! Lifecycle: `Created → Propagating → {Validated | TimedOut} → Deleted`.
//! The challenge record is a TXT named `_acme-challenge` in the zone
//! `domain`, holding the token as a quoted TXT string.

use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};
use crate::providers::common::{quote_txt, unquote_txt};
use crate::traits::DnsDriver;
use crate::types::{ChallengeResult, ChallengeState, ChallengeValidation, DnsRecordType, Record};

/// Relative name of the challenge record.
pub const CHALLENGE_RECORD_NAME: &str = "_acme-challenge";
/// TTL used when the caller passes 0.
pub const DEFAULT_CHALLENGE_TTL: u32 = 600;

fn is_token(record: &Record, token: &str) -> bool {
    record.record_type == DnsRecordType::Txt && unquote_txt(&record.value) == unquote_txt(token)
}

/// Publish `token` and return the challenge handle.
pub async fn create_txt_challenge<D>(
    driver: &D,
    domain: &str,
    token: &str,
    ttl: u32,
) -> Result<ChallengeResult>
where
    D: DnsDriver + ?Sized,
{
    let ttl = if ttl == 0 { DEFAULT_CHALLENGE_TTL } else { ttl };
    let record = Record::new(
        CHALLENGE_RECORD_NAME,
        DnsRecordType::Txt,
        quote_txt(token),
        ttl,
    );

    let created = driver.create_record(domain, &record).await?;
    let created_at = Utc::now();
    log::info!(
        "[{}] challenge created for {domain} (record {})",
        driver.provider_type(),
        created.id
    );

    Ok(ChallengeResult {
        domain: domain.to_string(),
        token: token.to_string(),
        record_id: created.id,
        ttl,
        created_at,
        expires_at: created_at + chrono::Duration::seconds(i64::from(ttl)),
        state: ChallengeState::Created,
    })
}

/// Single point-in-time check for the token.
pub async fn validate_challenge<D>(
    driver: &D,
    domain: &str,
    token: &str,
) -> Result<ChallengeValidation>
where
    D: DnsDriver + ?Sized,
{
    let records = driver
        .get_records_by_name(domain, CHALLENGE_RECORD_NAME)
        .await?;
    let txt: Vec<&Record> = records
        .iter()
        .filter(|r| r.record_type == DnsRecordType::Txt)
        .collect();
    let matched = txt.iter().find(|r| is_token(r, token));

    Ok(ChallengeValidation {
        valid: matched.is_some(),
        propagated: !txt.is_empty(),
        value: matched
            .or_else(|| txt.first())
            .map(|r| unquote_txt(&r.value).to_string()),
        expected_value: token.to_string(),
        checked_at: Utc::now(),
        servers: driver
            .info()
            .metadata
            .get("endpoint")
            .cloned()
            .into_iter()
            .collect(),
    })
}

/// Stand-in deadline for timeouts too large to represent; polling then ends
/// only on success or cancellation.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Poll until a `record_type` record with `expected_value` is visible.
///
/// Returns `Ok(())` as soon as the value is observed, `OperationTimeout` once
/// `timeout` has elapsed and `Cancelled` as soon as `cancel` fires. Each
/// lookup is raced against both exit conditions; lookup errors are logged
/// and polling continues.
pub async fn wait_for_propagation<D>(
    driver: &D,
    domain: &str,
    record_type: DnsRecordType,
    expected_value: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<()>
where
    D: DnsDriver + ?Sized,
{
    let provider = driver.provider_type();
    let interval = driver.propagation_poll_interval();
    let started = Instant::now();
    let deadline = started
        .checked_add(timeout)
        .unwrap_or_else(|| started + FAR_FUTURE);
    let expected = unquote_txt(expected_value);
    let mut attempt = 0u32;

    let timed_out = || ProviderError::OperationTimeout {
        provider: provider.to_string(),
        detail: format!(
            "{record_type} '{expected}' not visible in {domain} after {timeout:?}"
        ),
    };
    let cancelled = || ProviderError::Cancelled {
        provider: provider.to_string(),
    };

    loop {
        attempt += 1;
        let lookup = driver.get_records_by_type(domain, record_type);
        let records = tokio::select! {
            () = cancel.cancelled() => return Err(cancelled()),
            () = tokio::time::sleep_until(deadline) => return Err(timed_out()),
            records = lookup => records,
        };

        match records {
            Ok(records) if records.iter().any(|r| unquote_txt(&r.value) == expected) => {
                log::info!("[{provider}] {record_type} '{expected}' visible in {domain} after {attempt} poll(s)");
                return Ok(());
            }
            Ok(_) => log::debug!("[{provider}] poll {attempt}: {record_type} '{expected}' not yet visible in {domain}"),
            Err(e) => log::warn!("[{provider}] poll {attempt} for {domain} failed: {e}"),
        }

        let wake = Instant::now()
            .checked_add(interval)
            .unwrap_or(deadline)
            .min(deadline);
        tokio::select! {
            () = cancel.cancelled() => return Err(cancelled()),
            () = tokio::time::sleep_until(wake) => {}
        }
        if Instant::now() >= deadline {
            return Err(timed_out());
        }
    }
}

/// Remove the challenge record holding `token`.
pub async fn delete_txt_challenge<D>(driver: &D, domain: &str, token: &str) -> Result<()>
where
    D: DnsDriver + ?Sized,
{
    let records = driver
        .get_records_by_name(domain, CHALLENGE_RECORD_NAME)
        .await?;
    let Some(record) = records.iter().find(|r| is_token(r, token)) else {
        return Err(ProviderError::RecordNotFound {
            provider: driver.provider_type().to_string(),
            record_id: format!("{CHALLENGE_RECORD_NAME}.{domain}"),
            raw_message: Some("no challenge record holds this token".to_string()),
        });
    };

    driver.delete_record(domain, &record.id).await?;
    log::info!(
        "[{}] challenge deleted for {domain} (record {})",
        driver.provider_type(),
        record.id
    );
    Ok(())
}
