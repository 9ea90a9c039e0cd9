//! Batch executor.
//!
//! Fans a single-record operation out over a list with at most
//! `DnsDriver::batch_concurrency()` calls in flight. Every item gets its own
//! [`OperationResult`] slot; one item failing never affects another, and
//! `results` always comes back in input order.

use std::future::Future;
use std::time::Instant;

use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::traits::DnsDriver;
use crate::types::{BatchResult, OperationResult, Record};

/// Create every record; result ids are `"{index}:{name}"`.
pub async fn create_records<D>(driver: &D, zone: &str, records: &[Record]) -> BatchResult
where
    D: DnsDriver + ?Sized,
{
    run(driver, "create", records, |index, record| {
        let id = format!("{index}:{}", record.name);
        async move {
            let outcome = driver.create_record(zone, record).await.map(Some);
            (id, outcome)
        }
    })
    .await
}

/// Update every record by its ID; result ids are the record IDs.
pub async fn update_records<D>(driver: &D, zone: &str, records: &[Record]) -> BatchResult
where
    D: DnsDriver + ?Sized,
{
    run(driver, "update", records, |_, record| async move {
        let outcome = driver.update_record(zone, record).await.map(Some);
        (record.id.clone(), outcome)
    })
    .await
}

/// Delete every record ID; result ids are the record IDs.
pub async fn delete_records<D>(driver: &D, zone: &str, record_ids: &[String]) -> BatchResult
where
    D: DnsDriver + ?Sized,
{
    run(driver, "delete", record_ids, |_, record_id| async move {
        let outcome = driver.delete_record(zone, record_id).await.map(|()| None);
        (record_id.clone(), outcome)
    })
    .await
}

async fn run<'a, D, T, F, Fut>(driver: &D, action: &str, items: &'a [T], op: F) -> BatchResult
where
    D: DnsDriver + ?Sized,
    F: Fn(usize, &'a T) -> Fut,
    Fut: Future<Output = (String, Result<Option<Record>>)>,
{
    let provider = driver.provider_type();
    let started = Instant::now();
    let workers = driver.batch_concurrency().max(1);

    let pending: Vec<Fut> = items
        .iter()
        .enumerate()
        .map(|(index, item)| op(index, item))
        .collect();

    // `buffered` yields in submission order, so slot i holds item i.
    let results: Vec<OperationResult> = stream::iter(pending)
        .buffered(workers)
        .map(|(id, outcome)| match outcome {
            Ok(data) => OperationResult::ok(id, data),
            Err(e) => {
                e.log(&format!("[{provider}] batch {action} '{id}' failed"));
                OperationResult::failed(id, &e)
            }
        })
        .collect()
        .await;

    let success = results.iter().filter(|r| r.success).count();
    let duration = started.elapsed();
    log::info!(
        "[{provider}] batch {action}: {success}/{} succeeded in {duration:?} ({workers} workers)",
        results.len()
    );

    BatchResult {
        total: items.len(),
        success,
        failed: results.len() - success,
        results,
        duration,
    }
}
