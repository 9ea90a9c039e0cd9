use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};
use crate::types::{
    BatchResult, Capability, ChallengeResult, ChallengeValidation, DnsRecordType, DnssecKey,
    DnssecResult, FILTER_KEYWORD, FILTER_NAME, FILTER_TYPE, ImportResult, ListOptions, Metrics,
    ProviderInfo, Quota, Record, Statistics, SyncOptions, SyncResult, TestResult, Usage,
    ValidationResult, Zone, ZoneComparison,
};
use crate::{batch, challenge, diagnostics, reconcile, registry, validation, zonefile};

/// Raw vendor API error (internal).
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// Vendor error code, format differs per vendor.
    pub code: Option<String>,
    pub message: String,
}

impl RawApiError {
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Operation context attached while mapping a vendor error (internal).
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// Record name, for `RecordExists`.
    pub record_name: Option<String>,
    /// Record ID, for `RecordNotFound`.
    pub record_id: Option<String>,
    /// Zone name, for `ZoneNotFound`.
    pub zone: Option<String>,
}

impl ErrorContext {
    pub fn zone(zone: &str) -> Self {
        Self {
            zone: Some(zone.to_string()),
            ..Self::default()
        }
    }

    pub fn record(zone: &str, record: &Record) -> Self {
        Self {
            record_name: Some(record.name.clone()),
            record_id: (!record.id.is_empty()).then(|| record.id.clone()),
            zone: Some(zone.to_string()),
        }
    }

    pub fn record_id(zone: &str, record_id: &str) -> Self {
        Self {
            record_id: Some(record_id.to_string()),
            zone: Some(zone.to_string()),
            ..Self::default()
        }
    }
}

/// Vendor error mapping (internal).
///
/// Each adapter implements this to translate raw API errors into the shared
/// taxonomy.
pub(crate) trait ProviderErrorMapper {
    /// Provider type key.
    fn provider_name(&self) -> &'static str;

    /// Map a raw API error onto [`ProviderError`].
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError;

    fn parse_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::ParseError {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
        }
    }

    /// Fallback for codes with no mapping.
    fn unknown_error(&self, raw: RawApiError) -> ProviderError {
        ProviderError::Unknown {
            provider: self.provider_name().to_string(),
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }
}

/// Interval between propagation polls unless a driver overrides it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The capability contract every DNS driver satisfies.
///
/// Only zone listing and record CRUD are required. Every other operation has
/// a default built on those primitives (batch, reconciliation, challenges,
/// zone files, queries, statistics) or returns the "unsupported" outcome
/// (zone management, DNSSEC, comments, history, record sets). Drivers
/// override what their vendor does natively and advertise it in
/// [`ProviderInfo::features`].
///
/// Zones are addressed by name; records by the driver-assigned ID within a
/// zone. A driver holds no zone or record state between calls.
#[async_trait]
pub trait DnsDriver: Send + Sync {
    /// Static description of this driver.
    fn info(&self) -> &ProviderInfo;

    /// Registry key of this driver.
    fn provider_type(&self) -> &str {
        &self.info().provider_type
    }

    /// Capabilities this driver implements meaningfully.
    fn get_capabilities(&self) -> Vec<Capability> {
        self.info().features.clone()
    }

    fn supports(&self, capability: Capability) -> bool {
        self.info().supports(capability)
    }

    fn get_supported_record_types(&self) -> Vec<DnsRecordType> {
        self.info().record_types.clone()
    }

    /// Worker count for batch calls. `1` runs items sequentially.
    fn batch_concurrency(&self) -> usize {
        1
    }

    fn propagation_poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    // ============ Diagnostics ============

    /// Connectivity probe; failures are reported inside the result.
    async fn test(&self) -> TestResult {
        diagnostics::probe(self).await
    }

    async fn health_check(&self) -> TestResult {
        self.test().await
    }

    /// Check a credential map against this provider type's required fields.
    async fn validate_credentials(
        &self,
        credentials: &HashMap<String, String>,
    ) -> Result<ValidationResult> {
        Ok(registry::check_credentials(
            self.provider_type(),
            credentials,
        ))
    }

    // ============ Zones ============

    async fn list_zones(&self, options: &ListOptions) -> Result<Vec<Zone>>;

    async fn get_zone(&self, name: &str) -> Result<Zone>;

    async fn create_zone(&self, _zone: &Zone) -> Result<Zone> {
        Err(ProviderError::unsupported(self.provider_type(), "create_zone"))
    }

    async fn update_zone(&self, _zone: &Zone) -> Result<Zone> {
        Err(ProviderError::unsupported(self.provider_type(), "update_zone"))
    }

    async fn delete_zone(&self, _name: &str) -> Result<()> {
        Err(ProviderError::unsupported(self.provider_type(), "delete_zone"))
    }

    // ============ Records ============

    async fn list_records(&self, zone: &str, options: &ListOptions) -> Result<Vec<Record>>;

    async fn get_record(&self, zone: &str, record_id: &str) -> Result<Record>;

    async fn create_record(&self, zone: &str, record: &Record) -> Result<Record>;

    /// Update the record identified by `record.id`.
    async fn update_record(&self, zone: &str, record: &Record) -> Result<Record>;

    async fn delete_record(&self, zone: &str, record_id: &str) -> Result<()>;

    // ============ Batch ============

    async fn batch_create_records(&self, zone: &str, records: &[Record]) -> Result<BatchResult> {
        Ok(batch::create_records(self, zone, records).await)
    }

    async fn batch_update_records(&self, zone: &str, records: &[Record]) -> Result<BatchResult> {
        Ok(batch::update_records(self, zone, records).await)
    }

    async fn batch_delete_records(
        &self,
        zone: &str,
        record_ids: &[String],
    ) -> Result<BatchResult> {
        Ok(batch::delete_records(self, zone, record_ids).await)
    }

    // ============ Reconciliation ============

    async fn compare_zone(&self, zone: &str, local: &[Record]) -> Result<ZoneComparison> {
        reconcile::compare_zone(self, zone, local).await
    }

    async fn sync_zone(
        &self,
        zone: &str,
        desired: &[Record],
        options: &SyncOptions,
    ) -> Result<SyncResult> {
        reconcile::sync_zone(self, zone, desired, options).await
    }

    // ============ DNS-01 Challenges ============

    async fn create_txt_challenge(
        &self,
        domain: &str,
        token: &str,
        ttl: u32,
    ) -> Result<ChallengeResult> {
        challenge::create_txt_challenge(self, domain, token, ttl).await
    }

    async fn delete_txt_challenge(&self, domain: &str, token: &str) -> Result<()> {
        challenge::delete_txt_challenge(self, domain, token).await
    }

    async fn validate_challenge(&self, domain: &str, token: &str) -> Result<ChallengeValidation> {
        challenge::validate_challenge(self, domain, token).await
    }

    async fn wait_for_propagation(
        &self,
        domain: &str,
        record_type: DnsRecordType,
        expected_value: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        challenge::wait_for_propagation(self, domain, record_type, expected_value, timeout, cancel)
            .await
    }

    // ============ DNSSEC ============

    async fn enable_dnssec(&self, _zone: &str) -> Result<DnssecResult> {
        Err(self.dnssec_not_supported())
    }

    async fn disable_dnssec(&self, _zone: &str) -> Result<DnssecResult> {
        Err(self.dnssec_not_supported())
    }

    async fn get_dnssec_keys(&self, _zone: &str) -> Result<Vec<DnssecKey>> {
        Err(self.dnssec_not_supported())
    }

    async fn rotate_dnssec_keys(&self, _zone: &str) -> Result<Vec<DnssecKey>> {
        Err(self.dnssec_not_supported())
    }

    #[doc(hidden)]
    fn dnssec_not_supported(&self) -> ProviderError {
        ProviderError::DnssecNotSupported {
            provider: self.provider_type().to_string(),
        }
    }

    // ============ Zone Files ============

    /// Current zone contents in BIND format.
    async fn get_zone_file(&self, zone: &str) -> Result<String> {
        let records = self.list_records(zone, &ListOptions::all()).await?;
        Ok(zonefile::export_bind(zone, &records, chrono::Utc::now()))
    }

    /// Export in `format`; only `bind` and `rfc1035` are known.
    async fn export_zone_file(&self, zone: &str, format: &str) -> Result<String> {
        zonefile::check_format(self.provider_type(), format)?;
        self.get_zone_file(zone).await
    }

    /// Parse `content` and create every supported record.
    ///
    /// A syntax error fails the whole import before anything is created.
    async fn import_zone_file(&self, zone: &str, content: &str) -> Result<ImportResult> {
        zonefile::import(self, zone, content).await
    }

    // ============ Queries ============

    async fn get_records_by_type(
        &self,
        zone: &str,
        record_type: DnsRecordType,
    ) -> Result<Vec<Record>> {
        let options = ListOptions::all().with_filter(FILTER_TYPE, record_type.as_str());
        self.list_records(zone, &options).await
    }

    async fn get_records_by_name(&self, zone: &str, name: &str) -> Result<Vec<Record>> {
        let options = ListOptions::all().with_filter(FILTER_NAME, name);
        self.list_records(zone, &options).await
    }

    async fn search_records(&self, zone: &str, query: &str) -> Result<Vec<Record>> {
        let options = ListOptions::all().with_filter(FILTER_KEYWORD, query);
        self.list_records(zone, &options).await
    }

    // ============ Validation ============

    /// Offline shape check of `record` against this driver.
    fn validate_record(&self, record: &Record) -> ValidationResult {
        validation::validate_record(self.info(), record)
    }

    async fn validate_zone(&self, zone: &str) -> Result<ValidationResult> {
        validation::validate_zone(self, zone).await
    }

    /// Records at `record.name` that would violate CNAME exclusivity.
    async fn check_record_conflicts(&self, zone: &str, record: &Record) -> Result<Vec<Record>> {
        let existing = self.get_records_by_name(zone, &record.name).await?;
        Ok(validation::conflicting_records(record, &existing))
    }

    // ============ Statistics ============

    async fn get_statistics(&self, zone: &str) -> Result<Statistics> {
        diagnostics::statistics(self, zone).await
    }

    async fn get_quota(&self) -> Result<Quota> {
        diagnostics::quota(self).await
    }

    async fn get_usage(&self) -> Result<Usage> {
        diagnostics::usage(self).await
    }

    async fn get_metrics(&self) -> Result<Metrics> {
        diagnostics::metrics(self).await
    }

    // ============ Advanced ============

    async fn set_record_comment(&self, _zone: &str, _record_id: &str, _comment: &str) -> Result<()> {
        Err(ProviderError::unsupported(
            self.provider_type(),
            "set_record_comment",
        ))
    }

    async fn get_record_history(
        &self,
        _zone: &str,
        _record_id: &str,
    ) -> Result<Vec<serde_json::Value>> {
        Err(ProviderError::unsupported(
            self.provider_type(),
            "get_record_history",
        ))
    }

    /// Create several values sharing one name and type as a single set.
    async fn create_record_set(&self, _zone: &str, _records: &[Record]) -> Result<Vec<Record>> {
        Err(ProviderError::unsupported(
            self.provider_type(),
            "create_record_set",
        ))
    }

    async fn update_record_set(&self, _zone: &str, _records: &[Record]) -> Result<Vec<Record>> {
        Err(ProviderError::unsupported(
            self.provider_type(),
            "update_record_set",
        ))
    }
}

impl std::fmt::Debug for dyn DnsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsDriver")
            .field("info", self.info())
            .finish_non_exhaustive()
    }
}
