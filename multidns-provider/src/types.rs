use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::duration_ms;

// ============ List Options ============

/// Filter key matching the record type (case-insensitive).
pub const FILTER_TYPE: &str = "type";
/// Filter key matching the relative record name exactly.
pub const FILTER_NAME: &str = "name";
/// Filter key matching a substring of the record name or value.
pub const FILTER_KEYWORD: &str = "keyword";

/// Page size used when a page is requested without an explicit size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Sort direction for list calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Canonical list options shared by zone and record listing.
///
/// When `page` is `None` a driver returns every item, walking all vendor
/// pages. When `page` is set (1-indexed) only that page is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
    /// One of `name`, `type`, `value`, `ttl`.
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
}

impl ListOptions {
    /// Options that list everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Options for a single page.
    #[must_use]
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page.max(1)),
            page_size: Some(page_size.max(1)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_filter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.filter.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_sort(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some(field.to_string());
        self.order = Some(order);
        self
    }

    pub fn filter_value(&self, key: &str) -> Option<&str> {
        self.filter
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// `(page, page_size)` when a single page was requested.
    pub fn requested_page(&self) -> Option<(u32, u32)> {
        self.page.map(|page| {
            (
                page.max(1),
                self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
            )
        })
    }

    /// `(skip, take)` for the requested page, saturating on huge page numbers.
    pub fn page_window(&self) -> Option<(usize, usize)> {
        self.requested_page().map(|(page, page_size)| {
            let size = page_size as usize;
            ((page as usize - 1).saturating_mul(size), size)
        })
    }

    /// Whether `record` passes every filter in these options.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(record_type) = self.filter_value(FILTER_TYPE)
            && !record_type.eq_ignore_ascii_case(record.record_type.as_str())
        {
            return false;
        }
        if let Some(name) = self.filter_value(FILTER_NAME)
            && name != record.name
        {
            return false;
        }
        if let Some(keyword) = self.filter_value(FILTER_KEYWORD) {
            let keyword = keyword.to_lowercase();
            if !record.name.to_lowercase().contains(&keyword)
                && !record.value.to_lowercase().contains(&keyword)
            {
                return false;
            }
        }
        true
    }

    /// Filter, sort and page an already-fetched record list in memory.
    ///
    /// Used by drivers whose vendor API has no server-side equivalent.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let mut records: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(sort) = self.sort.as_deref() {
            match sort {
                "name" => records.sort_by(|a, b| a.name.cmp(&b.name)),
                "type" => records.sort_by_key(|r| r.record_type),
                "value" => records.sort_by(|a, b| a.value.cmp(&b.value)),
                "ttl" => records.sort_by_key(|r| r.ttl),
                other => log::debug!("ignoring unknown sort key '{other}'"),
            }
            if self.order == Some(SortOrder::Desc) {
                records.reverse();
            }
        }

        match self.page_window() {
            Some((skip, take)) => records.into_iter().skip(skip).take(take).collect(),
            None => records,
        }
    }
}

// ============ Zone ============

/// Zone status, normalised across vendors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    Active,
    Inactive,
    Pending,
    Expired,
    #[default]
    Unknown,
}

/// A DNS zone managed by a provider account.
///
/// `name` is the canonical domain with the trailing dot stripped; `id` is the
/// vendor-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub status: ZoneStatus,
}

// ============ Record ============

/// DNS record type.
///
/// Serialized as uppercase strings (`"A"`, `"AAAA"`, `"CNAME"`, etc.).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Canonical name (alias) record.
    Cname,
    /// Mail exchange record.
    Mx,
    /// Text record.
    Txt,
    /// Name server record.
    Ns,
    /// Service locator record.
    Srv,
    /// Certificate Authority Authorization record.
    Caa,
    /// Reverse pointer record.
    Ptr,
}

impl DnsRecordType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Srv => "SRV",
            Self::Caa => "CAA",
            Self::Ptr => "PTR",
        }
    }

    /// Types whose value is a hostname.
    pub const fn has_host_target(self) -> bool {
        matches!(
            self,
            Self::Cname | Self::Mx | Self::Ns | Self::Srv | Self::Ptr
        )
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a record type string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown record type: {0}")]
pub struct UnknownRecordType(pub String);

impl FromStr for DnsRecordType {
    type Err = UnknownRecordType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "SRV" => Ok(Self::Srv),
            "CAA" => Ok(Self::Caa),
            "PTR" => Ok(Self::Ptr),
            _ => Err(UnknownRecordType(s.to_string())),
        }
    }
}

/// One DNS resource record within a zone.
///
/// `name` is relative to the zone, with `"@"` for the apex. `priority`,
/// `weight` and `port` only carry meaning for MX/SRV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    pub value: String,
    pub ttl: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        record_type: DnsRecordType,
        value: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            record_type,
            value: value.into(),
            ttl,
            priority: None,
            weight: None,
            port: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_srv(mut self, priority: u16, weight: u16, port: u16) -> Self {
        self.priority = Some(priority);
        self.weight = Some(weight);
        self.port = Some(port);
        self
    }

    /// Comparison identity within a zone.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            name: self.name.clone(),
            record_type: self.record_type,
        }
    }

    /// Same name, type, value and TTL (IDs ignored).
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.record_type == other.record_type
            && self.same_value(other)
            && self.ttl == other.ttl
    }

    /// Value equality; host targets ignore a trailing dot and ASCII case.
    pub fn same_value(&self, other: &Self) -> bool {
        if self.record_type.has_host_target() {
            self.value
                .trim_end_matches('.')
                .eq_ignore_ascii_case(other.value.trim_end_matches('.'))
        } else {
            self.value == other.value
        }
    }
}

/// `(name, type)` identity used by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub name: String,
    pub record_type: DnsRecordType,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.record_type)
    }
}

// ============ Provider Info ============

/// Limit key: maximum zones per account.
pub const LIMIT_MAX_DOMAINS: &str = "max_domains";
/// Limit key: maximum records per zone.
pub const LIMIT_MAX_RECORDS_PER_DOMAIN: &str = "max_records_per_domain";
/// Limit key: maximum items per batch call.
pub const LIMIT_MAX_BATCH_SIZE: &str = "max_batch_size";
/// Limit key: vendor API requests per second.
pub const LIMIT_RATE_PER_SECOND: &str = "rate_limit_per_second";

/// Optional operation groups a driver may implement.
///
/// Record CRUD and zone listing are mandatory and need no capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Record create/update/delete against the vendor.
    DnsManagement,
    /// Programmatic zone creation and deletion.
    ZoneManagement,
    /// Zone update (status/pause).
    ZoneUpdate,
    BatchOperations,
    TxtChallenges,
    ZoneSync,
    Dnssec,
    ZoneFiles,
    Statistics,
    RecordComments,
    RecordHistory,
    RecordSets,
}

impl Capability {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DnsManagement => "dns_management",
            Self::ZoneManagement => "zone_management",
            Self::ZoneUpdate => "zone_update",
            Self::BatchOperations => "batch_operations",
            Self::TxtChallenges => "txt_challenges",
            Self::ZoneSync => "zone_sync",
            Self::Dnssec => "dnssec",
            Self::ZoneFiles => "zone_files",
            Self::Statistics => "statistics",
            Self::RecordComments => "record_comments",
            Self::RecordHistory => "record_history",
            Self::RecordSets => "record_sets",
        }
    }
}

/// Static per-driver description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Human-readable name.
    pub name: String,
    /// Registry key (`cloudflare`, `route53`, ...).
    pub provider_type: String,
    pub version: String,
    /// Capabilities the driver implements meaningfully.
    pub features: Vec<Capability>,
    pub limits: BTreeMap<String, u64>,
    pub regions: Vec<String>,
    pub record_types: Vec<DnsRecordType>,
    pub metadata: BTreeMap<String, String>,
}

impl ProviderInfo {
    pub fn supports(&self, capability: Capability) -> bool {
        self.features.contains(&capability)
    }

    pub fn supports_record_type(&self, record_type: DnsRecordType) -> bool {
        self.record_types.contains(&record_type)
    }

    pub fn limit(&self, key: &str) -> u64 {
        self.limits.get(key).copied().unwrap_or_default()
    }
}

// ============ Batch ============

/// Outcome of one item in a batch or import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    /// Caller-stable identifier of the item.
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Record>,
}

impl OperationResult {
    pub fn ok(id: impl Into<String>, data: Option<Record>) -> Self {
        Self {
            id: id.into(),
            success: true,
            error_msg: None,
            data,
        }
    }

    pub fn failed(id: impl Into<String>, error: &crate::ProviderError) -> Self {
        Self {
            id: id.into(),
            success: false,
            error_msg: Some(error.to_string()),
            data: None,
        }
    }
}

/// Aggregate outcome of a batch call. `results` follows input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<OperationResult>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

// ============ Reconciliation ============

/// Options for `sync_zone`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncOptions {
    /// Plan only; never mutate.
    pub dry_run: bool,
    /// Apply the plan even when CNAME conflicts were detected.
    pub force: bool,
    /// Restrict both sides to these types (empty means all).
    pub record_types: Vec<DnsRecordType>,
    /// Relative names left untouched on both sides.
    pub exclude_names: Vec<String>,
}

impl SyncOptions {
    pub(crate) fn includes(&self, record: &Record) -> bool {
        (self.record_types.is_empty() || self.record_types.contains(&record.record_type))
            && !self.exclude_names.iter().any(|n| n == &record.name)
    }
}

/// Reconciliation plan for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneComparison {
    pub domain: String,
    pub local_records: Vec<Record>,
    pub remote_records: Vec<Record>,
    pub to_add: Vec<Record>,
    /// Local records carrying the ID of the remote record they replace.
    pub to_update: Vec<Record>,
    pub to_delete: Vec<Record>,
    pub unchanged: Vec<Record>,
    pub conflicts: Vec<Record>,
    pub compared_at: DateTime<Utc>,
}

impl ZoneComparison {
    pub fn has_changes(&self) -> bool {
        !(self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty())
    }
}

/// Outcome of `sync_zone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub dry_run: bool,
    pub total_records: usize,
    pub added_records: usize,
    pub updated_records: usize,
    pub deleted_records: usize,
    pub failed_records: usize,
    pub errors: Vec<String>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    pub plan: ZoneComparison,
}

// ============ Challenge ============

/// DNS-01 challenge lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeState {
    Created,
    Propagating,
    Validated,
    TimedOut,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResult {
    pub domain: String,
    pub token: String,
    pub record_id: String,
    pub ttl: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: ChallengeState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeValidation {
    pub valid: bool,
    /// A challenge record was visible at all.
    pub propagated: bool,
    pub value: Option<String>,
    pub expected_value: String,
    pub checked_at: DateTime<Utc>,
    /// Endpoints consulted for the check.
    pub servers: Vec<String>,
}

// ============ Diagnostics ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub success: bool,
    #[serde(with = "duration_ms")]
    pub latency: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    pub details: BTreeMap<String, String>,
    pub tested_at: DateTime<Utc>,
    pub test_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    pub suggestions: Vec<String>,
    pub details: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    /// Record one problem; the first one becomes `error_msg`.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        self.valid = false;
        if self.error_msg.is_none() {
            self.error_msg = Some(message.clone());
        }
        self.details.insert(field.to_string(), message);
    }
}

// ============ DNSSEC ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnssecKeyType {
    Ksk,
    Zsk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnssecKey {
    pub id: String,
    pub key_type: DnssecKeyType,
    pub algorithm: String,
    pub key_tag: u32,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnssecResult {
    pub enabled: bool,
    pub keys: Vec<DnssecKey>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ============ Zone Files ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<OperationResult>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

// ============ Statistics ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub domain: String,
    pub total_records: usize,
    pub records_by_type: BTreeMap<DnsRecordType, usize>,
    pub collected_at: DateTime<Utc>,
}

/// Advertised limits; never enforced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    pub provider: String,
    pub total_domains: u64,
    pub used_domains: u64,
    pub total_records: u64,
    pub used_records: u64,
    pub rate_limit: u64,
    pub rate_remaining: u64,
    pub reset_time: DateTime<Utc>,
    pub features: BTreeMap<Capability, bool>,
    pub limits: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub provider: String,
    pub domains_used: u64,
    pub domains_limit: u64,
    pub records_used: u64,
    pub records_limit: u64,
    pub collected_at: DateTime<Utc>,
}

/// Free-form metrics map.
pub type Metrics = BTreeMap<String, serde_json::Value>;
