//! Offline record checks shared by every driver.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{ProviderError, Result};
use crate::reconcile::cname_conflicts;
use crate::traits::DnsDriver;
use crate::types::{DnsRecordType, ListOptions, ProviderInfo, Record, ValidationResult};

/// Check `record` against the driver's declared record types and basic
/// per-type shape rules.
pub fn validate_record(info: &ProviderInfo, record: &Record) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if record.name.trim().is_empty() {
        result.reject("name", "record name is empty");
        result
            .suggestions
            .push("use \"@\" for the zone apex".to_string());
    }
    if record.value.trim().is_empty() {
        result.reject("value", "record value is empty");
    }
    if record.ttl == 0 {
        result.reject("ttl", "ttl must be a positive number of seconds");
    }
    if !info.supports_record_type(record.record_type) {
        result.reject(
            "type",
            format!(
                "record type {} is not supported by {}",
                record.record_type, info.provider_type
            ),
        );
        result.suggestions.push(format!(
            "supported types: {}",
            info.record_types
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    match record.record_type {
        DnsRecordType::A if record.value.parse::<Ipv4Addr>().is_err() => {
            result.reject("value", format!("'{}' is not an IPv4 address", record.value));
        }
        DnsRecordType::Aaaa if record.value.parse::<Ipv6Addr>().is_err() => {
            result.reject("value", format!("'{}' is not an IPv6 address", record.value));
        }
        DnsRecordType::Mx if record.priority.is_none() => {
            result.reject("priority", "MX records need a priority");
        }
        DnsRecordType::Srv
            if record.priority.is_none() || record.weight.is_none() || record.port.is_none() =>
        {
            result.reject("port", "SRV records need priority, weight and port");
        }
        _ => {}
    }

    result
}

/// Fail-fast guard adapters call before any mutating record request.
///
/// Rejects types outside `info.record_types` and structurally empty records
/// with `InvalidRecord`, before any network I/O.
pub fn ensure_record_supported(info: &ProviderInfo, record: &Record) -> Result<()> {
    let provider = info.provider_type.as_str();
    if !info.supports_record_type(record.record_type) {
        return Err(ProviderError::invalid_record(
            provider,
            "type",
            format!("record type {} is not supported", record.record_type),
        ));
    }
    if record.name.trim().is_empty() {
        return Err(ProviderError::invalid_record(provider, "name", "empty name"));
    }
    if record.value.trim().is_empty() {
        return Err(ProviderError::invalid_record(provider, "value", "empty value"));
    }
    if record.ttl == 0 {
        return Err(ProviderError::invalid_record(provider, "ttl", "ttl must be positive"));
    }
    Ok(())
}

/// Records in `existing` that `record` would clash with under CNAME
/// exclusivity. `record` itself (same ID) is ignored.
pub fn conflicting_records(record: &Record, existing: &[Record]) -> Vec<Record> {
    existing
        .iter()
        .filter(|other| other.name == record.name)
        .filter(|other| record.id.is_empty() || other.id != record.id)
        .filter(|other| {
            (record.record_type == DnsRecordType::Cname) != (other.record_type == DnsRecordType::Cname)
                || (record.record_type == DnsRecordType::Cname && other.value != record.value)
        })
        .cloned()
        .collect()
}

/// Zone must exist and must not break CNAME exclusivity anywhere.
pub async fn validate_zone<D>(driver: &D, zone: &str) -> Result<ValidationResult>
where
    D: DnsDriver + ?Sized,
{
    let mut result = ValidationResult::valid();

    match driver.get_zone(zone).await {
        Ok(found) => {
            result
                .details
                .insert("status".to_string(), format!("{:?}", found.status).to_lowercase());
        }
        Err(ProviderError::ZoneNotFound { .. }) => {
            result.reject("zone", format!("zone {zone} does not exist"));
            return Ok(result);
        }
        Err(e) => return Err(e),
    }

    let records = driver.list_records(zone, &ListOptions::all()).await?;
    result
        .details
        .insert("records".to_string(), records.len().to_string());

    let conflicts = cname_conflicts(&records);
    if !conflicts.is_empty() {
        let mut names: Vec<&str> = conflicts.iter().map(|r| r.name.as_str()).collect();
        names.dedup();
        result.reject(
            "cname",
            format!("CNAME coexists with other records at: {}", names.join(", ")),
        );
        result
            .suggestions
            .push("remove the CNAME or the other records at the same name".to_string());
    }

    if records
        .iter()
        .any(|r| r.name == "@" && r.record_type == DnsRecordType::Cname)
    {
        result.reject("apex", "CNAME at the zone apex");
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn info() -> ProviderInfo {
        ProviderInfo {
            name: "Test".to_string(),
            provider_type: "test".to_string(),
            version: "1".to_string(),
            features: Vec::new(),
            limits: BTreeMap::new(),
            regions: Vec::new(),
            record_types: vec![
                DnsRecordType::A,
                DnsRecordType::Aaaa,
                DnsRecordType::Cname,
                DnsRecordType::Mx,
                DnsRecordType::Txt,
            ],
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn accepts_valid_a_record() {
        let r = Record::new("www", DnsRecordType::A, "192.0.2.1", 300);
        assert!(validate_record(&info(), &r).valid);
        assert!(ensure_record_supported(&info(), &r).is_ok());
    }

    #[test]
    fn rejects_undeclared_type() {
        let r = Record::new("_sip._tcp", DnsRecordType::Srv, "sip.example.com", 300)
            .with_srv(10, 5, 5060);
        let v = validate_record(&info(), &r);
        assert!(!v.valid);
        assert!(v.details.contains_key("type"));
        assert!(matches!(
            ensure_record_supported(&info(), &r),
            Err(ProviderError::InvalidRecord { field, .. }) if field == "type"
        ));
    }

    #[test]
    fn rejects_bad_ipv4() {
        let r = Record::new("www", DnsRecordType::A, "not-an-ip", 300);
        let v = validate_record(&info(), &r);
        assert!(!v.valid);
        assert!(v.details.contains_key("value"));
    }

    #[test]
    fn mx_needs_priority() {
        let r = Record::new("@", DnsRecordType::Mx, "mail.example.com", 300);
        assert!(!validate_record(&info(), &r).valid);
        assert!(validate_record(&info(), &r.with_priority(10)).valid);
    }

    #[test]
    fn zero_ttl_is_rejected_before_io() {
        let r = Record::new("www", DnsRecordType::A, "192.0.2.1", 0);
        assert!(matches!(
            ensure_record_supported(&info(), &r),
            Err(ProviderError::InvalidRecord { field, .. }) if field == "ttl"
        ));
    }

    #[test]
    fn cname_conflicts_with_a_at_same_name() {
        let cname = Record::new("www", DnsRecordType::Cname, "lb.example.net", 300);
        let existing = vec![
            Record::new("www", DnsRecordType::A, "192.0.2.1", 300).with_id("1"),
            Record::new("api", DnsRecordType::A, "192.0.2.2", 300).with_id("2"),
        ];
        let clashes = conflicting_records(&cname, &existing);
        assert_eq!(clashes.len(), 1);
        assert_eq!(clashes[0].id, "1");
    }

    #[test]
    fn a_conflicts_with_existing_cname() {
        let a = Record::new("www", DnsRecordType::A, "192.0.2.1", 300);
        let existing = vec![Record::new("www", DnsRecordType::Cname, "lb", 300).with_id("c")];
        assert_eq!(conflicting_records(&a, &existing).len(), 1);
    }

    #[test]
    fn two_a_records_do_not_conflict() {
        let a = Record::new("www", DnsRecordType::A, "192.0.2.1", 300);
        let existing = vec![Record::new("www", DnsRecordType::A, "192.0.2.9", 300).with_id("x")];
        assert!(conflicting_records(&a, &existing).is_empty());
    }
}
