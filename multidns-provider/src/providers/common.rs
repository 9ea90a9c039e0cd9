//! Helpers shared by the vendor adapters.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;

use crate::error::{ProviderError, Result};
use crate::types::{DnsRecordType, Record};

type HmacSha256 = Hmac<Sha256>;

// ============ HTTP Client ============

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client with the connect timeout fixed and the request timeout from config.
pub fn create_http_client(provider: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NetworkError {
            provider: provider.to_string(),
            detail: format!("cannot build HTTP client: {e}"),
        })
}

// ============ HMAC-SHA256 ============

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so this only fails on a broken build.
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return Vec::new();
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

// ============ Names ============

/// Strip the trailing dot.
pub fn normalize_domain_name(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

/// `"www.example.com"` in `"example.com"` → `"www"`; the apex → `"@"`.
pub fn full_name_to_relative(full_name: &str, zone_name: &str) -> String {
    let full = normalize_domain_name(full_name);
    let zone = normalize_domain_name(zone_name);

    if full.eq_ignore_ascii_case(&zone) {
        return "@".to_string();
    }
    let suffix = format!(".{}", zone.to_ascii_lowercase());
    match full.to_ascii_lowercase().strip_suffix(&suffix) {
        Some(sub) => full[..sub.len()].to_string(),
        None => full,
    }
}

/// `"www"` in `"example.com"` → `"www.example.com"`; `"@"` → the zone.
pub fn relative_to_full_name(relative_name: &str, zone_name: &str) -> String {
    let zone = normalize_domain_name(zone_name);

    if relative_name == "@" || relative_name.is_empty() {
        zone
    } else {
        format!("{relative_name}.{zone}")
    }
}

// ============ TXT ============

/// Wrap in one layer of double quotes unless already quoted, escaping `\`
/// and `"`.
pub fn quote_txt(value: &str) -> String {
    if is_quoted(value) {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Inverse of [`quote_txt`]: strip one layer of quotes and resolve `\"` and
/// `\\` escapes inside them.
pub fn txt_content(value: &str) -> String {
    let trimmed = value.trim();
    if !is_quoted(trimmed) {
        return trimmed.to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    let mut chars = trimmed[1..trimmed.len() - 1].chars();
    while let Some(c) = chars.next() {
        match (c, chars.clone().next()) {
            ('\\', Some(next @ ('"' | '\\'))) => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Strip one layer of surrounding double quotes.
pub fn unquote_txt(value: &str) -> &str {
    let trimmed = value.trim();
    if is_quoted(trimmed) {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && value.ends_with('"')
}

// ============ MX / SRV value folding ============

/// Vendor value for vendors that keep MX/SRV fields inside the value string:
/// MX `"prio target"`, SRV `"prio weight port target"`.
pub fn fold_value(record: &Record) -> String {
    match record.record_type {
        DnsRecordType::Mx => format!("{} {}", record.priority.unwrap_or(0), record.value),
        DnsRecordType::Srv => format!(
            "{} {} {} {}",
            record.priority.unwrap_or(0),
            record.weight.unwrap_or(0),
            record.port.unwrap_or(0),
            record.value
        ),
        _ => record.value.clone(),
    }
}

/// Inverse of [`fold_value`], filling `priority`/`weight`/`port` on `record`.
///
/// A value that does not have the folded shape is left as is.
pub fn unfold_value(mut record: Record) -> Record {
    let parts: Vec<&str> = record.value.split_whitespace().collect();
    match (record.record_type, parts.as_slice()) {
        (DnsRecordType::Mx, [prio, target]) => {
            if let Ok(prio) = prio.parse() {
                record.priority = Some(prio);
                record.value = (*target).to_string();
            }
        }
        (DnsRecordType::Srv, [prio, weight, port, target]) => {
            if let (Ok(prio), Ok(weight), Ok(port)) = (prio.parse(), weight.parse(), port.parse())
            {
                record.priority = Some(prio);
                record.weight = Some(weight);
                record.port = Some(port);
                record.value = (*target).to_string();
            }
        }
        _ => {}
    }
    record
}
