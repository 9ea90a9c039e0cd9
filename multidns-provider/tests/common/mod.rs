//! Shared test utilities: assertion macros and an in-memory driver.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use multidns_provider::{
    Capability, DnsDriver, DnsRecordType, ListOptions, ProviderError, ProviderInfo, Record,
    Result, Zone, ZoneStatus,
};

/// Skip a live test when any of the named environment variables is unset.
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("skipping: {} is not set", $var);
                return;
            }
        )+
    };
}

/// Assert `Option` is `Some` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// Assert `Result` is `Ok` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

pub const ZONE: &str = "example.com";
pub const PROVIDER: &str = "memory";

pub fn a(name: &str, value: &str, ttl: u32) -> Record {
    Record::new(name, DnsRecordType::A, value, ttl)
}

pub fn txt(name: &str, value: &str, ttl: u32) -> Record {
    Record::new(name, DnsRecordType::Txt, value, ttl)
}

/// Driver keeping zones in memory, with failure injection and a call log.
pub struct MemoryDriver {
    info: ProviderInfo,
    zones: Mutex<BTreeMap<String, Vec<Record>>>,
    next_id: AtomicU64,
    /// Record names whose create/update fails, and record IDs whose delete fails.
    failing: Mutex<HashSet<String>>,
    /// Per-name latency for writes.
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
    /// Number of upcoming listings that come back empty.
    hidden_listings: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    concurrency: usize,
    poll_interval: Duration,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self {
            info: ProviderInfo {
                name: "In-memory".to_string(),
                provider_type: PROVIDER.to_string(),
                version: "1".to_string(),
                features: vec![
                    Capability::DnsManagement,
                    Capability::BatchOperations,
                    Capability::TxtChallenges,
                    Capability::ZoneSync,
                    Capability::ZoneFiles,
                ],
                limits: BTreeMap::new(),
                regions: Vec::new(),
                record_types: vec![
                    DnsRecordType::A,
                    DnsRecordType::Aaaa,
                    DnsRecordType::Cname,
                    DnsRecordType::Mx,
                    DnsRecordType::Txt,
                    DnsRecordType::Ns,
                    DnsRecordType::Srv,
                ],
                metadata: BTreeMap::new(),
            },
            zones: Mutex::new(BTreeMap::from([(ZONE.to_string(), Vec::new())])),
            next_id: AtomicU64::new(1),
            failing: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            hidden_listings: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            concurrency: 1,
            poll_interval: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_record_types(mut self, record_types: Vec<DnsRecordType>) -> Self {
        self.info.record_types = record_types;
        self
    }

    /// Seed `records` into the zone, assigning IDs to those without one.
    pub fn seed(&self, records: Vec<Record>) -> Vec<Record> {
        let seeded: Vec<Record> = records
            .into_iter()
            .map(|r| {
                if r.id.is_empty() {
                    let id = self.allocate_id();
                    r.with_id(id)
                } else {
                    r
                }
            })
            .collect();
        lock(&self.zones)
            .entry(ZONE.to_string())
            .or_default()
            .extend(seeded.iter().cloned());
        seeded
    }

    /// Make writes touching `key` (record name or ID) fail.
    pub fn fail_on(&self, key: &str) {
        lock(&self.failing).insert(key.to_string());
    }

    pub fn delay(&self, name: &str, delay: Duration) {
        lock(&self.delays).insert(name.to_string(), delay);
    }

    /// Let the next `count` listings return nothing.
    pub fn hide_for(&self, count: usize) {
        self.hidden_listings.store(count, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<Record> {
        lock(&self.zones).get(ZONE).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of write calls logged so far.
    pub fn write_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| !c.starts_with("list"))
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn log_call(&self, call: String) {
        lock(&self.calls).push(call);
    }

    fn check_failing(&self, key: &str) -> Result<()> {
        if lock(&self.failing).contains(key) {
            return Err(ProviderError::InvalidRecord {
                provider: PROVIDER.to_string(),
                field: "value".to_string(),
                detail: format!("injected failure for '{key}'"),
            });
        }
        Ok(())
    }

    async fn simulate_latency(&self, name: &str) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let delay = lock(&self.delays).get(name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn zone_not_found(zone: &str) -> ProviderError {
        ProviderError::ZoneNotFound {
            provider: PROVIDER.to_string(),
            zone: zone.to_string(),
            raw_message: None,
        }
    }

    fn record_not_found(record_id: &str) -> ProviderError {
        ProviderError::RecordNotFound {
            provider: PROVIDER.to_string(),
            record_id: record_id.to_string(),
            raw_message: None,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl DnsDriver for MemoryDriver {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn batch_concurrency(&self) -> usize {
        self.concurrency
    }

    fn propagation_poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn list_zones(&self, _options: &ListOptions) -> Result<Vec<Zone>> {
        Ok(lock(&self.zones)
            .keys()
            .map(|name| Zone {
                id: name.clone(),
                name: name.clone(),
                status: ZoneStatus::Active,
            })
            .collect())
    }

    async fn get_zone(&self, name: &str) -> Result<Zone> {
        if !lock(&self.zones).contains_key(name) {
            return Err(Self::zone_not_found(name));
        }
        Ok(Zone {
            id: name.to_string(),
            name: name.to_string(),
            status: ZoneStatus::Active,
        })
    }

    async fn list_records(&self, zone: &str, options: &ListOptions) -> Result<Vec<Record>> {
        self.log_call(format!("list {zone}"));
        let records = lock(&self.zones)
            .get(zone)
            .cloned()
            .ok_or_else(|| Self::zone_not_found(zone))?;
        let hidden = self
            .hidden_listings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hidden {
            return Ok(Vec::new());
        }
        Ok(options.apply(records))
    }

    async fn get_record(&self, zone: &str, record_id: &str) -> Result<Record> {
        lock(&self.zones)
            .get(zone)
            .ok_or_else(|| Self::zone_not_found(zone))?
            .iter()
            .find(|r| r.id == record_id)
            .cloned()
            .ok_or_else(|| Self::record_not_found(record_id))
    }

    async fn create_record(&self, zone: &str, record: &Record) -> Result<Record> {
        self.log_call(format!("create {}", record.key()));
        self.simulate_latency(&record.name).await;
        self.check_failing(&record.name)?;

        let mut zones = lock(&self.zones);
        let records = zones
            .get_mut(zone)
            .ok_or_else(|| Self::zone_not_found(zone))?;
        if records.iter().any(|r| r.same_content(record)) {
            return Err(ProviderError::RecordExists {
                provider: PROVIDER.to_string(),
                record_name: record.name.clone(),
                raw_message: None,
            });
        }
        let created = record.clone().with_id(self.allocate_id());
        records.push(created.clone());
        Ok(created)
    }

    async fn update_record(&self, zone: &str, record: &Record) -> Result<Record> {
        self.log_call(format!("update {}", record.id));
        self.simulate_latency(&record.name).await;
        self.check_failing(&record.name)?;

        let mut zones = lock(&self.zones);
        let records = zones
            .get_mut(zone)
            .ok_or_else(|| Self::zone_not_found(zone))?;
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| Self::record_not_found(&record.id))?;
        *slot = record.clone();
        Ok(record.clone())
    }

    async fn delete_record(&self, zone: &str, record_id: &str) -> Result<()> {
        self.log_call(format!("delete {record_id}"));
        self.simulate_latency(record_id).await;
        self.check_failing(record_id)?;

        let mut zones = lock(&self.zones);
        let records = zones
            .get_mut(zone)
            .ok_or_else(|| Self::zone_not_found(zone))?;
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Err(Self::record_not_found(record_id));
        }
        Ok(())
    }
}
