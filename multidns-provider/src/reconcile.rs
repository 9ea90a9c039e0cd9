//! Zone reconciliation: diff a desired record set against a driver's live
//! records and optionally apply the difference.
//!
//! Records are matched on `(name, type)` only. Several remote records with
//! the same key (round-robin A records, say) form one group: the first
//! local record with that key consumes the whole group and is compared with
//! its first member, and an unconsumed group is deleted as a whole.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Instant;

use chrono::Utc;

use crate::error::{ProviderError, Result};
use crate::traits::DnsDriver;
use crate::types::{
    DnsRecordType, ListOptions, Record, RecordKey, SyncOptions, SyncResult, ZoneComparison,
};

/// Build the reconciliation plan from two already-fetched record sets.
pub fn plan_zone(domain: &str, local: &[Record], remote: &[Record]) -> ZoneComparison {
    let mut groups: HashMap<RecordKey, Vec<&Record>> = HashMap::new();
    for record in remote {
        groups.entry(record.key()).or_default().push(record);
    }

    let mut consumed: HashSet<RecordKey> = HashSet::new();
    let mut to_add = Vec::new();
    let mut to_update = Vec::new();
    let mut unchanged = Vec::new();

    for record in local {
        let key = record.key();
        match groups.get(&key) {
            Some(group) if !consumed.contains(&key) => {
                let current = group[0];
                if current.same_value(record) && current.ttl == record.ttl {
                    unchanged.push(current.clone());
                } else {
                    to_update.push(record.clone().with_id(current.id.clone()));
                }
                consumed.insert(key);
            }
            _ => to_add.push(record.clone()),
        }
    }

    let to_delete = remote
        .iter()
        .filter(|r| !consumed.contains(&r.key()))
        .cloned()
        .collect();

    ZoneComparison {
        domain: domain.to_string(),
        local_records: local.to_vec(),
        remote_records: remote.to_vec(),
        to_add,
        to_update,
        to_delete,
        unchanged,
        conflicts: cname_conflicts(local.iter().chain(remote)),
        compared_at: Utc::now(),
    }
}

/// Every record sharing a name with a CNAME of a different type, CNAME
/// included. Duplicate `(name, type, value)` entries are reported once.
pub fn cname_conflicts<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<Record> {
    let mut by_name: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in records {
        by_name.entry(record.name.as_str()).or_default().push(record);
    }

    let mut conflicts = Vec::new();
    for group in by_name.values() {
        let has_cname = group.iter().any(|r| r.record_type == DnsRecordType::Cname);
        let has_other = group.iter().any(|r| r.record_type != DnsRecordType::Cname);
        if !(has_cname && has_other) {
            continue;
        }
        let mut seen = BTreeSet::new();
        for record in group {
            if seen.insert((record.record_type, record.value.as_str())) {
                conflicts.push((*record).clone());
            }
        }
    }
    conflicts
}

/// Fetch the zone's records once (all pages) and plan against `local`.
pub async fn compare_zone<D>(driver: &D, zone: &str, local: &[Record]) -> Result<ZoneComparison>
where
    D: DnsDriver + ?Sized,
{
    let remote = driver.list_records(zone, &ListOptions::all()).await?;
    let plan = plan_zone(zone, local, &remote);
    log::debug!(
        "[{}] compare {zone}: +{} ~{} -{} ={} conflicts={}",
        driver.provider_type(),
        plan.to_add.len(),
        plan.to_update.len(),
        plan.to_delete.len(),
        plan.unchanged.len(),
        plan.conflicts.len()
    );
    Ok(plan)
}

/// Plan and, unless `options.dry_run`, apply the plan.
///
/// Items are applied one at a time (adds, updates, then deletes). A failing
/// item is counted and recorded in `errors`; the rest of the plan still runs.
pub async fn sync_zone<D>(
    driver: &D,
    zone: &str,
    desired: &[Record],
    options: &SyncOptions,
) -> Result<SyncResult>
where
    D: DnsDriver + ?Sized,
{
    let provider = driver.provider_type();
    let started = Instant::now();

    let local: Vec<Record> = desired
        .iter()
        .filter(|r| options.includes(r))
        .cloned()
        .collect();
    let remote: Vec<Record> = driver
        .list_records(zone, &ListOptions::all())
        .await?
        .into_iter()
        .filter(|r| options.includes(r))
        .collect();
    let plan = plan_zone(zone, &local, &remote);

    if !plan.conflicts.is_empty() && !options.force && !options.dry_run {
        let names: BTreeSet<&str> = plan.conflicts.iter().map(|r| r.name.as_str()).collect();
        return Err(ProviderError::invalid_record(
            provider,
            "type",
            format!(
                "CNAME conflicts at {}; rerun with force to apply anyway",
                names.into_iter().collect::<Vec<_>>().join(", ")
            ),
        ));
    }

    let mut result = SyncResult {
        success: true,
        dry_run: options.dry_run,
        total_records: local.len(),
        added_records: 0,
        updated_records: 0,
        deleted_records: 0,
        failed_records: 0,
        errors: Vec::new(),
        duration: started.elapsed(),
        plan,
    };

    if options.dry_run {
        log::info!(
            "[{provider}] dry-run sync {zone}: +{} ~{} -{}",
            result.plan.to_add.len(),
            result.plan.to_update.len(),
            result.plan.to_delete.len()
        );
        return Ok(result);
    }

    for record in &result.plan.to_add {
        match driver.create_record(zone, record).await {
            Ok(_) => result.added_records += 1,
            Err(e) => {
                e.log(&format!("[{provider}] sync add {}", record.key()));
                result.failed_records += 1;
                result.errors.push(format!("add {}: {e}", record.key()));
            }
        }
    }

    for record in &result.plan.to_update {
        match driver.update_record(zone, record).await {
            Ok(_) => result.updated_records += 1,
            Err(e) => {
                e.log(&format!("[{provider}] sync update {}", record.key()));
                result.failed_records += 1;
                result.errors.push(format!("update {}: {e}", record.key()));
            }
        }
    }

    for record in &result.plan.to_delete {
        match driver.delete_record(zone, &record.id).await {
            Ok(()) => result.deleted_records += 1,
            Err(e) => {
                e.log(&format!("[{provider}] sync delete {}", record.key()));
                result.failed_records += 1;
                result.errors.push(format!("delete {}: {e}", record.key()));
            }
        }
    }

    result.success = result.failed_records == 0;
    result.duration = started.elapsed();
    log::info!(
        "[{provider}] sync {zone}: added={} updated={} deleted={} failed={} in {:?}",
        result.added_records,
        result.updated_records,
        result.deleted_records,
        result.failed_records,
        result.duration
    );
    Ok(result)
}
