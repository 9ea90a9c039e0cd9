//! Route 53 `DnsDriver` implementation
//!
//! Route 53 stores one record set per `(name, type)`. Sets are exploded into
//! one canonical record per value, identified as `fqdn|TYPE|value` where
//! `value` is the vendor form (MX/SRV folded, TXT quoted).

use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::providers::common::{
    fold_value, full_name_to_relative, normalize_domain_name, quote_txt, relative_to_full_name,
    txt_content, unfold_value,
};
use crate::traits::{DnsDriver, ErrorContext};
use crate::types::{
    DnsRecordType, FILTER_KEYWORD, FILTER_NAME, ListOptions, ProviderInfo, Record, Zone,
    ZoneStatus,
};
use crate::validation::ensure_record_supported;

use super::types::{
    Change, ChangeAction, ChangeBatch, ChangeResourceRecordSetsRequest,
    ChangeResourceRecordSetsResponse, Changes, CreateHostedZoneRequest, CreateHostedZoneResponse,
    HostedZone, ListHostedZonesByNameResponse, ListHostedZonesResponse,
    ListResourceRecordSetsResponse, ResourceRecordSet,
};
use super::{MAX_ITEMS_RECORDS, MAX_ITEMS_ZONES, PROVIDER, Route53Driver, XMLNS};

const ID_SEPARATOR: char = '|';

/// Route 53 escapes `*` in owner names as `\052`.
fn decode_name(name: &str) -> String {
    normalize_domain_name(&name.replace("\\052", "*"))
}

/// Absolute owner name with the trailing dot Route 53 expects.
fn absolute_name(name: &str, zone: &str) -> String {
    format!("{}.", relative_to_full_name(name, zone))
}

fn record_id(fqdn: &str, record_type: &str, value: &str) -> String {
    format!("{fqdn}{ID_SEPARATOR}{record_type}{ID_SEPARATOR}{value}")
}

/// The parts of a record ID.
struct RecordRef<'a> {
    fqdn: &'a str,
    record_type: DnsRecordType,
    value: &'a str,
}

fn parse_record_id(id: &str) -> Result<RecordRef<'_>> {
    let mut parts = id.splitn(3, ID_SEPARATOR);
    let (Some(fqdn), Some(record_type), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ProviderError::invalid_record(
            PROVIDER,
            "id",
            format!("'{id}' is not of the form name|TYPE|value"),
        ));
    };
    let record_type = record_type
        .parse()
        .map_err(|_| ProviderError::invalid_record(PROVIDER, "id", format!("unknown type in '{id}'")))?;
    Ok(RecordRef {
        fqdn,
        record_type,
        value,
    })
}

/// Vendor value for `record`; host targets are written absolute.
fn vendor_value(record: &Record) -> String {
    match record.record_type {
        DnsRecordType::Txt => quote_txt(&record.value),
        t if t.has_host_target() => {
            let mut absolute = record.clone();
            absolute.value = format!("{}.", normalize_domain_name(&record.value));
            fold_value(&absolute)
        }
        _ => fold_value(record),
    }
}

fn to_zone(zone: &HostedZone) -> Zone {
    Zone {
        id: zone.short_id().to_string(),
        name: normalize_domain_name(&zone.name),
        status: ZoneStatus::Active,
    }
}

/// One canonical record per value; alias and routing-policy sets are skipped.
fn explode(set: &ResourceRecordSet, zone_name: &str) -> Vec<Record> {
    if let Some(alias) = &set.alias_target {
        log::debug!("[{PROVIDER}] skipping alias {} -> {}", set.name, alias.dns_name);
        return Vec::new();
    }
    if set.set_identifier.is_some() {
        log::debug!("[{PROVIDER}] skipping policy set {} {}", set.name, set.record_type);
        return Vec::new();
    }
    let Ok(record_type) = set.record_type.parse::<DnsRecordType>() else {
        log::debug!("[{PROVIDER}] skipping {} set {}", set.record_type, set.name);
        return Vec::new();
    };
    let fqdn = decode_name(&set.name);
    let name = full_name_to_relative(&fqdn, zone_name);
    let ttl = set.ttl.unwrap_or_default();

    set.values()
        .map(|raw| {
            let value = match record_type {
                DnsRecordType::Txt => txt_content(raw),
                _ => raw.to_string(),
            };
            let mut record = unfold_value(Record::new(name.clone(), record_type, value, ttl));
            if record_type.has_host_target() {
                record.value = normalize_domain_name(&record.value);
            }
            record.with_id(record_id(&fqdn, record_type.as_str(), raw))
        })
        .collect()
}

fn not_found(record_id: &str) -> ProviderError {
    ProviderError::RecordNotFound {
        provider: PROVIDER.to_string(),
        record_id: record_id.to_string(),
        raw_message: None,
    }
}

/// Every record must share the first record's name and type.
fn check_set_members(records: &[Record]) -> Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    if records.iter().any(|r| r.key() != first.key()) {
        return Err(ProviderError::invalid_record(
            PROVIDER,
            "record",
            "record set members must share name and type",
        ));
    }
    Ok(())
}

impl Route53Driver {
    /// Resolve a zone name through `ListHostedZonesByName`.
    pub(crate) async fn resolve_zone(&self, zone: &str) -> Result<HostedZone> {
        let name = normalize_domain_name(zone);
        let response: ListHostedZonesByNameResponse = self
            .get_xml(
                "/hostedzonesbyname",
                &[("dnsname", name.clone()), ("maxitems", "1".to_string())],
                ErrorContext::zone(&name),
            )
            .await?;
        response
            .hosted_zones
            .items
            .into_iter()
            .find(|z| normalize_domain_name(&z.name).eq_ignore_ascii_case(&name))
            .ok_or_else(|| ProviderError::ZoneNotFound {
                provider: PROVIDER.to_string(),
                zone: name,
                raw_message: None,
            })
    }

    async fn all_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut query = vec![("maxitems", MAX_ITEMS_ZONES.to_string())];
            if let Some(marker) = marker.take() {
                query.push(("marker", marker));
            }
            let page: ListHostedZonesResponse = self
                .get_xml("/hostedzone", &query, ErrorContext::default())
                .await?;
            zones.extend(page.hosted_zones.items);
            match page.next_marker {
                Some(next) if page.is_truncated => marker = Some(next),
                _ => break,
            }
        }
        log::debug!("[{PROVIDER}] {} hosted zones", zones.len());
        Ok(zones)
    }

    async fn all_record_sets(&self, zone: &HostedZone) -> Result<Vec<ResourceRecordSet>> {
        let path = format!("/hostedzone/{}/rrset", zone.short_id());
        let context = ErrorContext::zone(&normalize_domain_name(&zone.name));
        let mut sets = Vec::new();
        let mut start: Vec<(&str, String)> = Vec::new();
        loop {
            let mut query = vec![("maxitems", MAX_ITEMS_RECORDS.to_string())];
            query.append(&mut start);
            let page: ListResourceRecordSetsResponse =
                self.get_xml(&path, &query, context.clone()).await?;
            sets.extend(page.resource_record_sets.items);
            if !page.is_truncated {
                break;
            }
            let Some(next_name) = page.next_record_name else {
                break;
            };
            start.push(("name", next_name));
            if let Some(next_type) = page.next_record_type {
                start.push(("type", next_type));
            }
            if let Some(next_id) = page.next_record_identifier {
                start.push(("identifier", next_id));
            }
        }
        Ok(sets)
    }

    /// The simple record set at exactly `fqdn`/`record_type`, if any.
    async fn find_set(
        &self,
        zone: &HostedZone,
        fqdn: &str,
        record_type: DnsRecordType,
        context: ErrorContext,
    ) -> Result<Option<ResourceRecordSet>> {
        let wanted = normalize_domain_name(fqdn);
        let page: ListResourceRecordSetsResponse = self
            .get_xml(
                &format!("/hostedzone/{}/rrset", zone.short_id()),
                &[
                    ("name", format!("{wanted}.")),
                    ("type", record_type.as_str().to_string()),
                    ("maxitems", "1".to_string()),
                ],
                context,
            )
            .await?;
        Ok(page.resource_record_sets.items.into_iter().find(|set| {
            set.set_identifier.is_none()
                && set.alias_target.is_none()
                && set.record_type == record_type.as_str()
                && decode_name(&set.name).eq_ignore_ascii_case(&wanted)
        }))
    }

    async fn change(
        &self,
        zone: &HostedZone,
        action: ChangeAction,
        set: ResourceRecordSet,
        context: ErrorContext,
    ) -> Result<()> {
        let request = ChangeResourceRecordSetsRequest {
            xmlns: XMLNS,
            change_batch: ChangeBatch {
                comment: None,
                changes: Changes {
                    items: vec![Change {
                        action: action.as_str(),
                        resource_record_set: set,
                    }],
                },
            },
        };
        let response: ChangeResourceRecordSetsResponse = self
            .post_xml(
                &format!("/hostedzone/{}/rrset", zone.short_id()),
                &request,
                context,
            )
            .await?;
        log::debug!(
            "[{PROVIDER}] change {} is {}",
            response.change_info.id,
            response.change_info.status
        );
        Ok(())
    }

    /// Write `records` as one set with `action`.
    async fn write_record_set(
        &self,
        zone: &str,
        records: &[Record],
        action: ChangeAction,
    ) -> Result<Vec<Record>> {
        check_set_members(records)?;
        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };
        for record in records {
            ensure_record_supported(&self.info, record)?;
        }

        let hosted_zone = self.resolve_zone(zone).await?;
        let zone_name = normalize_domain_name(&hosted_zone.name);
        let fqdn = absolute_name(&first.name, &zone_name);
        let mut values: Vec<String> = Vec::with_capacity(records.len());
        for record in records {
            let value = vendor_value(record);
            if !values.contains(&value) {
                values.push(value);
            }
        }

        let set = ResourceRecordSet::new(fqdn, first.record_type.as_str(), first.ttl, values);
        let written = explode(&set, &zone_name);
        self.change(&hosted_zone, action, set, ErrorContext::record(zone, first))
            .await?;
        log::info!(
            "[{PROVIDER}] {} set {} in {zone} ({} values)",
            action.as_str(),
            first.key(),
            written.len()
        );
        Ok(written)
    }

    /// Keep zones passing the name/keyword filters, then page in memory.
    fn filter_zones(zones: Vec<Zone>, options: &ListOptions) -> Vec<Zone> {
        let name = options.filter_value(FILTER_NAME).map(normalize_domain_name);
        let keyword = options.filter_value(FILTER_KEYWORD).map(str::to_lowercase);
        let zones = zones.into_iter().filter(|z| {
            name.as_ref().is_none_or(|n| z.name.eq_ignore_ascii_case(n))
                && keyword
                    .as_ref()
                    .is_none_or(|k| z.name.to_lowercase().contains(k.as_str()))
        });
        match options.page_window() {
            Some((skip, take)) => zones.skip(skip).take(take).collect(),
            None => zones.collect(),
        }
    }
}

#[async_trait]
impl DnsDriver for Route53Driver {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn list_zones(&self, options: &ListOptions) -> Result<Vec<Zone>> {
        let zones = self.all_hosted_zones().await?;
        Ok(Self::filter_zones(
            zones.iter().map(to_zone).collect(),
            options,
        ))
    }

    async fn get_zone(&self, name: &str) -> Result<Zone> {
        self.resolve_zone(name).await.map(|z| to_zone(&z))
    }

    async fn create_zone(&self, zone: &Zone) -> Result<Zone> {
        let name = normalize_domain_name(&zone.name);
        let request = CreateHostedZoneRequest {
            xmlns: XMLNS,
            name: &name,
            caller_reference: uuid::Uuid::new_v4().to_string(),
        };
        let response: CreateHostedZoneResponse = self
            .post_xml("/hostedzone", &request, ErrorContext::zone(&name))
            .await?;
        log::info!(
            "[{PROVIDER}] hosted zone {name} created ({})",
            response.hosted_zone.short_id()
        );
        Ok(to_zone(&response.hosted_zone))
    }

    async fn delete_zone(&self, name: &str) -> Result<()> {
        let zone = self.resolve_zone(name).await?;
        self.delete_xml(
            &format!("/hostedzone/{}", zone.short_id()),
            ErrorContext::zone(name),
        )
        .await?;
        log::info!("[{PROVIDER}] hosted zone {name} deleted");
        Ok(())
    }

    async fn list_records(&self, zone: &str, options: &ListOptions) -> Result<Vec<Record>> {
        let hosted_zone = self.resolve_zone(zone).await?;
        let zone_name = normalize_domain_name(&hosted_zone.name);
        let records = self
            .all_record_sets(&hosted_zone)
            .await?
            .iter()
            .flat_map(|set| explode(set, &zone_name))
            .collect();
        Ok(options.apply(records))
    }

    async fn get_record(&self, zone: &str, record_id: &str) -> Result<Record> {
        let wanted = parse_record_id(record_id)?;
        let hosted_zone = self.resolve_zone(zone).await?;
        let zone_name = normalize_domain_name(&hosted_zone.name);
        let set = self
            .find_set(
                &hosted_zone,
                wanted.fqdn,
                wanted.record_type,
                ErrorContext::record_id(zone, record_id),
            )
            .await?
            .ok_or_else(|| not_found(record_id))?;
        explode(&set, &zone_name)
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| not_found(record_id))
    }

    /// Adds the value to the set at the record's name, creating the set if needed.
    async fn create_record(&self, zone: &str, record: &Record) -> Result<Record> {
        ensure_record_supported(&self.info, record)?;
        let hosted_zone = self.resolve_zone(zone).await?;
        let zone_name = normalize_domain_name(&hosted_zone.name);
        let fqdn = absolute_name(&record.name, &zone_name);
        let value = vendor_value(record);
        let context = ErrorContext::record(zone, record);

        let existing = self
            .find_set(&hosted_zone, &fqdn, record.record_type, context.clone())
            .await?;
        let (action, mut values) = match existing {
            None => (ChangeAction::Create, Vec::new()),
            Some(set) if set.values().any(|v| v == value) => {
                return Err(ProviderError::RecordExists {
                    provider: PROVIDER.to_string(),
                    record_name: record.name.clone(),
                    raw_message: None,
                });
            }
            Some(set) => (
                ChangeAction::Upsert,
                set.values().map(str::to_string).collect(),
            ),
        };
        values.push(value.clone());

        let set = ResourceRecordSet::new(fqdn.clone(), record.record_type.as_str(), record.ttl, values);
        self.change(&hosted_zone, action, set, context).await?;
        log::info!("[{PROVIDER}] created {} in {zone}", record.key());

        Ok(record.clone().with_id(record_id(
            &normalize_domain_name(&fqdn),
            record.record_type.as_str(),
            &value,
        )))
    }

    /// Replaces the value in place; a new name or type moves the record instead.
    async fn update_record(&self, zone: &str, record: &Record) -> Result<Record> {
        ensure_record_supported(&self.info, record)?;
        if record.id.is_empty() {
            return Err(ProviderError::invalid_record(PROVIDER, "id", "update needs a record id"));
        }
        let old = parse_record_id(&record.id)?;
        let hosted_zone = self.resolve_zone(zone).await?;
        let zone_name = normalize_domain_name(&hosted_zone.name);
        let fqdn = absolute_name(&record.name, &zone_name);

        if old.record_type != record.record_type
            || !normalize_domain_name(&fqdn).eq_ignore_ascii_case(old.fqdn)
        {
            self.delete_record(zone, &record.id).await?;
            let mut moved = record.clone();
            moved.id.clear();
            return self.create_record(zone, &moved).await;
        }

        let context = ErrorContext::record(zone, record);
        let set = self
            .find_set(&hosted_zone, &fqdn, record.record_type, context.clone())
            .await?
            .filter(|set| set.values().any(|v| v == old.value))
            .ok_or_else(|| not_found(&record.id))?;

        let value = vendor_value(record);
        let mut values: Vec<String> = Vec::new();
        for current in set.values() {
            let next = if current == old.value { value.as_str() } else { current };
            if !values.iter().any(|v| v == next) {
                values.push(next.to_string());
            }
        }

        let updated = ResourceRecordSet::new(fqdn.clone(), record.record_type.as_str(), record.ttl, values);
        self.change(&hosted_zone, ChangeAction::Upsert, updated, context)
            .await?;
        log::info!("[{PROVIDER}] updated {} in {zone}", record.key());

        Ok(record.clone().with_id(record_id(
            &normalize_domain_name(&fqdn),
            record.record_type.as_str(),
            &value,
        )))
    }

    /// Removes the value; the set is deleted with its last value.
    async fn delete_record(&self, zone: &str, record_id: &str) -> Result<()> {
        let wanted = parse_record_id(record_id)?;
        let hosted_zone = self.resolve_zone(zone).await?;
        let context = ErrorContext::record_id(zone, record_id);
        let set = self
            .find_set(&hosted_zone, wanted.fqdn, wanted.record_type, context.clone())
            .await?
            .filter(|set| set.values().any(|v| v == wanted.value))
            .ok_or_else(|| not_found(record_id))?;

        let remaining: Vec<String> = set
            .values()
            .filter(|v| *v != wanted.value)
            .map(str::to_string)
            .collect();
        if remaining.is_empty() {
            self.change(&hosted_zone, ChangeAction::Delete, set, context)
                .await?;
        } else {
            let ttl = set.ttl.unwrap_or_default();
            let reduced =
                ResourceRecordSet::new(set.name.clone(), wanted.record_type.as_str(), ttl, remaining);
            self.change(&hosted_zone, ChangeAction::Upsert, reduced, context)
                .await?;
        }
        log::info!("[{PROVIDER}] deleted record {record_id} in {zone}");
        Ok(())
    }

    async fn create_record_set(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        self.write_record_set(zone, records, ChangeAction::Create)
            .await
    }

    async fn update_record_set(&self, zone: &str, records: &[Record]) -> Result<Vec<Record>> {
        self.write_record_set(zone, records, ChangeAction::Upsert)
            .await
    }
}
