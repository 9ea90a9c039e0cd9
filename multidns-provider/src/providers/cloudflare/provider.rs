//! Cloudflare `DnsDriver` implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::{ProviderError, Result};
use crate::providers::common::{full_name_to_relative, relative_to_full_name, unfold_value};
use crate::traits::{DnsDriver, ErrorContext, ProviderErrorMapper};
use crate::types::{
    DnsRecordType, DnssecKey, DnssecKeyType, DnssecResult, FILTER_KEYWORD, FILTER_NAME,
    FILTER_TYPE, ListOptions, ProviderInfo, Record, SortOrder, Zone, ZoneStatus,
};
use crate::validation::ensure_record_supported;

use super::types::{CloudflareCaaData, CloudflareDnssec, CloudflareRecordBody, CloudflareSrvData};
use super::types::{CloudflareAccountRef, CloudflareCreateZoneBody};
use super::{
    CloudflareDnsRecord, CloudflareDriver, CloudflareZone, MAX_PAGE_SIZE_RECORDS,
    MAX_PAGE_SIZE_ZONES, PROVIDER,
};

/// Cloudflare zone status: active, pending, initializing, moved, deactivated.
fn zone_status(zone: &CloudflareZone) -> ZoneStatus {
    if zone.paused {
        return ZoneStatus::Inactive;
    }
    match zone.status.as_str() {
        "active" => ZoneStatus::Active,
        "pending" | "initializing" => ZoneStatus::Pending,
        "moved" | "deactivated" => ZoneStatus::Inactive,
        _ => ZoneStatus::Unknown,
    }
}

fn to_zone(zone: CloudflareZone) -> Zone {
    Zone {
        status: zone_status(&zone),
        id: zone.id,
        name: zone.name,
    }
}

/// `0 issue "letsencrypt.org"` → CAA data.
fn caa_data(record: &Record) -> Result<CloudflareCaaData> {
    let mut parts = record.value.splitn(3, ' ');
    let (Some(flags), Some(tag), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ProviderError::invalid_record(
            PROVIDER,
            "value",
            "CAA value must be \"flags tag value\"",
        ));
    };
    let flags = flags
        .parse()
        .map_err(|_| ProviderError::invalid_record(PROVIDER, "value", "CAA flags must be 0-255"))?;
    Ok(CloudflareCaaData {
        flags,
        tag: tag.to_string(),
        value: value.trim_matches('"').to_string(),
    })
}

impl CloudflareDriver {
    /// Resolve a zone name to the Cloudflare zone object.
    pub(crate) async fn resolve_zone(&self, zone: &str) -> Result<CloudflareZone> {
        let name = zone.trim_end_matches('.');
        let (zones, _) = self
            .get_page::<CloudflareZone>(
                "/zones",
                &[("name", name.to_string())],
                ErrorContext::zone(name),
            )
            .await?;
        zones
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ProviderError::ZoneNotFound {
                provider: PROVIDER.to_string(),
                zone: name.to_string(),
                raw_message: None,
            })
    }

    /// `None` for record types the canonical model does not carry.
    fn to_record(cf: CloudflareDnsRecord, zone_name: &str) -> Option<Record> {
        let Ok(record_type) = cf.record_type.parse::<DnsRecordType>() else {
            log::debug!("[{PROVIDER}] skipping {} record {}", cf.record_type, cf.id);
            return None;
        };
        let name = full_name_to_relative(&cf.name, zone_name);
        let mut record = Record::new(name, record_type, cf.content, cf.ttl).with_id(cf.id);

        match record_type {
            DnsRecordType::Mx => record.priority = cf.priority,
            DnsRecordType::Srv => {
                match cf
                    .data
                    .and_then(|d| serde_json::from_value::<CloudflareSrvData>(d).ok())
                {
                    Some(srv) => {
                        record.priority = Some(srv.priority);
                        record.weight = Some(srv.weight);
                        record.port = Some(srv.port);
                        record.value = srv.target;
                    }
                    // content is "weight port target" with priority alongside
                    None => {
                        record.value = format!("{} {}", cf.priority.unwrap_or(0), record.value);
                        record = unfold_value(record);
                    }
                }
            }
            _ => {}
        }
        Some(record)
    }

    fn record_body(record: &Record, zone_name: &str) -> Result<CloudflareRecordBody> {
        let mut body = CloudflareRecordBody {
            record_type: record.record_type.as_str(),
            name: relative_to_full_name(&record.name, zone_name),
            content: Some(record.value.clone()),
            ttl: record.ttl,
            priority: None,
            data: None,
        };
        match record.record_type {
            DnsRecordType::Mx => body.priority = record.priority,
            DnsRecordType::Srv => {
                let srv = CloudflareSrvData {
                    priority: record.priority.unwrap_or(0),
                    weight: record.weight.unwrap_or(0),
                    port: record.port.unwrap_or(0),
                    target: record.value.clone(),
                };
                body.content = None;
                body.data = Some(json!(srv));
            }
            DnsRecordType::Caa => {
                body.content = None;
                body.data = Some(json!(caa_data(record)?));
            }
            _ => {}
        }
        Ok(body)
    }

    /// The exact name filter wins over the keyword; both use the `name` key.
    fn zones_query(options: &ListOptions) -> Vec<(&'static str, String)> {
        if let Some(name) = options.filter_value(FILTER_NAME) {
            vec![("name", name.to_string())]
        } else if let Some(keyword) = options.filter_value(FILTER_KEYWORD) {
            vec![("name", format!("contains:{keyword}"))]
        } else {
            Vec::new()
        }
    }

    fn records_query(options: &ListOptions, zone_name: &str) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(record_type) = options.filter_value(FILTER_TYPE) {
            query.push(("type", record_type.to_ascii_uppercase()));
        }
        if let Some(name) = options.filter_value(FILTER_NAME) {
            query.push(("name", relative_to_full_name(name, zone_name)));
        }
        if let Some(keyword) = options.filter_value(FILTER_KEYWORD) {
            query.push(("name.contains", keyword.to_string()));
        }
        if let Some(sort) = options.sort.as_deref() {
            let order = match sort {
                "value" => "content",
                other => other,
            };
            query.push(("order", order.to_string()));
            let direction = match options.order.unwrap_or_default() {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            query.push(("direction", direction.to_string()));
        }
        query
    }

    fn dnssec_result(dnssec: CloudflareDnssec) -> DnssecResult {
        let enabled = matches!(dnssec.status.as_str(), "active" | "pending");
        let updated_at = dnssec
            .modified_on
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map_or_else(Utc::now, |t| t.with_timezone(&Utc));
        let keys = Self::dnssec_keys(&dnssec);
        DnssecResult {
            enabled,
            keys,
            message: (dnssec.status == "pending")
                .then(|| "add the DS record at the registrar to finish activation".to_string()),
            status: dnssec.status,
            updated_at,
        }
    }

    fn dnssec_keys(dnssec: &CloudflareDnssec) -> Vec<DnssecKey> {
        let (Some(key_tag), Some(public_key)) = (dnssec.key_tag, dnssec.public_key.clone()) else {
            return Vec::new();
        };
        vec![DnssecKey {
            id: key_tag.to_string(),
            // Cloudflare signs with one combined key carrying the SEP flag.
            key_type: if dnssec.flags == Some(256) {
                DnssecKeyType::Zsk
            } else {
                DnssecKeyType::Ksk
            },
            algorithm: dnssec.algorithm.clone().unwrap_or_default(),
            key_tag,
            public_key,
            ds: dnssec.ds.clone(),
            created_at: None,
            expires_at: None,
        }]
    }
}

#[async_trait]
impl DnsDriver for CloudflareDriver {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn batch_concurrency(&self) -> usize {
        self.concurrency
    }

    async fn list_zones(&self, options: &ListOptions) -> Result<Vec<Zone>> {
        let zones: Vec<CloudflareZone> = self
            .get_all(
                "/zones",
                Self::zones_query(options),
                MAX_PAGE_SIZE_ZONES,
                options.requested_page(),
                ErrorContext::default(),
            )
            .await?;
        Ok(zones.into_iter().map(to_zone).collect())
    }

    async fn get_zone(&self, name: &str) -> Result<Zone> {
        self.resolve_zone(name).await.map(to_zone)
    }

    async fn create_zone(&self, zone: &Zone) -> Result<Zone> {
        let account_id =
            self.account_id
                .as_deref()
                .ok_or_else(|| ProviderError::MissingCredentials {
                    provider: PROVIDER.to_string(),
                    field: "account_id".to_string(),
                })?;
        let body = CloudflareCreateZoneBody {
            name: zone.name.trim_end_matches('.'),
            account: CloudflareAccountRef { id: account_id },
            zone_type: "full",
        };
        let created: CloudflareZone = self
            .post("/zones", &body, ErrorContext::zone(&zone.name))
            .await?;
        log::info!("[{PROVIDER}] zone {} created ({})", created.name, created.id);
        Ok(to_zone(created))
    }

    /// Pauses the zone unless `zone.status` is `Active`.
    async fn update_zone(&self, zone: &Zone) -> Result<Zone> {
        let current = self.resolve_zone(&zone.name).await?;
        let paused = zone.status != ZoneStatus::Active;
        let updated: CloudflareZone = self
            .patch(
                &format!("/zones/{}", current.id),
                &json!({ "paused": paused }),
                ErrorContext::zone(&zone.name),
            )
            .await?;
        Ok(to_zone(updated))
    }

    async fn delete_zone(&self, name: &str) -> Result<()> {
        let zone = self.resolve_zone(name).await?;
        self.delete(&format!("/zones/{}", zone.id), ErrorContext::zone(name))
            .await?;
        log::info!("[{PROVIDER}] zone {name} deleted");
        Ok(())
    }

    async fn list_records(&self, zone: &str, options: &ListOptions) -> Result<Vec<Record>> {
        let cf_zone = self.resolve_zone(zone).await?;
        let records: Vec<CloudflareDnsRecord> = self
            .get_all(
                &format!("/zones/{}/dns_records", cf_zone.id),
                Self::records_query(options, &cf_zone.name),
                MAX_PAGE_SIZE_RECORDS,
                options.requested_page(),
                ErrorContext::zone(zone),
            )
            .await?;
        Ok(records
            .into_iter()
            .filter_map(|r| Self::to_record(r, &cf_zone.name))
            .collect())
    }

    async fn get_record(&self, zone: &str, record_id: &str) -> Result<Record> {
        let cf_zone = self.resolve_zone(zone).await?;
        let cf_record: CloudflareDnsRecord = self
            .get(
                &format!("/zones/{}/dns_records/{record_id}", cf_zone.id),
                ErrorContext::record_id(zone, record_id),
            )
            .await?;
        let record_type = cf_record.record_type.clone();
        Self::to_record(cf_record, &cf_zone.name).ok_or_else(|| {
            self.parse_error(format!("record {record_id} has unsupported type {record_type}"))
        })
    }

    async fn create_record(&self, zone: &str, record: &Record) -> Result<Record> {
        ensure_record_supported(&self.info, record)?;
        let cf_zone = self.resolve_zone(zone).await?;
        let body = Self::record_body(record, &cf_zone.name)?;
        let created: CloudflareDnsRecord = self
            .post(
                &format!("/zones/{}/dns_records", cf_zone.id),
                &body,
                ErrorContext::record(zone, record),
            )
            .await?;
        log::info!("[{PROVIDER}] created {} in {zone} ({})", record.key(), created.id);
        Self::to_record(created, &cf_zone.name)
            .ok_or_else(|| self.parse_error("created record has an unknown type"))
    }

    async fn update_record(&self, zone: &str, record: &Record) -> Result<Record> {
        ensure_record_supported(&self.info, record)?;
        if record.id.is_empty() {
            return Err(ProviderError::invalid_record(PROVIDER, "id", "update needs a record id"));
        }
        let cf_zone = self.resolve_zone(zone).await?;
        let body = Self::record_body(record, &cf_zone.name)?;
        let updated: CloudflareDnsRecord = self
            .patch(
                &format!("/zones/{}/dns_records/{}", cf_zone.id, record.id),
                &body,
                ErrorContext::record(zone, record),
            )
            .await?;
        Self::to_record(updated, &cf_zone.name)
            .ok_or_else(|| self.parse_error("updated record has an unknown type"))
    }

    async fn delete_record(&self, zone: &str, record_id: &str) -> Result<()> {
        let cf_zone = self.resolve_zone(zone).await?;
        self.delete(
            &format!("/zones/{}/dns_records/{record_id}", cf_zone.id),
            ErrorContext::record_id(zone, record_id),
        )
        .await?;
        log::info!("[{PROVIDER}] deleted record {record_id} in {zone}");
        Ok(())
    }

    async fn enable_dnssec(&self, zone: &str) -> Result<DnssecResult> {
        let cf_zone = self.resolve_zone(zone).await?;
        let dnssec: CloudflareDnssec = self
            .patch(
                &format!("/zones/{}/dnssec", cf_zone.id),
                &json!({ "status": "active" }),
                ErrorContext::zone(zone),
            )
            .await?;
        Ok(Self::dnssec_result(dnssec))
    }

    async fn disable_dnssec(&self, zone: &str) -> Result<DnssecResult> {
        let cf_zone = self.resolve_zone(zone).await?;
        let dnssec: CloudflareDnssec = self
            .patch(
                &format!("/zones/{}/dnssec", cf_zone.id),
                &json!({ "status": "disabled" }),
                ErrorContext::zone(zone),
            )
            .await?;
        Ok(Self::dnssec_result(dnssec))
    }

    async fn get_dnssec_keys(&self, zone: &str) -> Result<Vec<DnssecKey>> {
        let cf_zone = self.resolve_zone(zone).await?;
        let dnssec: CloudflareDnssec = self
            .get(&format!("/zones/{}/dnssec", cf_zone.id), ErrorContext::zone(zone))
            .await?;
        Ok(Self::dnssec_keys(&dnssec))
    }

    async fn rotate_dnssec_keys(&self, _zone: &str) -> Result<Vec<DnssecKey>> {
        Err(ProviderError::unsupported(PROVIDER, "rotate_dnssec_keys"))
    }

    async fn set_record_comment(&self, zone: &str, record_id: &str, comment: &str) -> Result<()> {
        let cf_zone = self.resolve_zone(zone).await?;
        let _: CloudflareDnsRecord = self
            .patch(
                &format!("/zones/{}/dns_records/{record_id}", cf_zone.id),
                &json!({ "comment": comment }),
                ErrorContext::record_id(zone, record_id),
            )
            .await?;
        Ok(())
    }
}
