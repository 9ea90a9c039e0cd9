//! Placeholder driver for provider types that are registered but not wired up.
//!
//! Reads come back empty and every write is `UnsupportedOperation`, so a
//! multi-account job degrades for that one account instead of aborting.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{ProviderError, Result};
use crate::traits::DnsDriver;
use crate::types::{
    BatchResult, ChallengeResult, DnsRecordType, ImportResult, ListOptions, ProviderInfo, Record,
    SyncOptions, SyncResult, TestResult, Zone,
};

pub struct StubDriver {
    info: ProviderInfo,
}

impl StubDriver {
    pub fn new(provider_type: &str) -> Self {
        Self {
            info: ProviderInfo {
                name: provider_type.to_string(),
                provider_type: provider_type.to_string(),
                version: "0.1.0".to_string(),
                features: Vec::new(),
                limits: BTreeMap::new(),
                regions: Vec::new(),
                record_types: vec![
                    DnsRecordType::A,
                    DnsRecordType::Aaaa,
                    DnsRecordType::Cname,
                    DnsRecordType::Txt,
                ],
                metadata: BTreeMap::from([("stub".to_string(), "true".to_string())]),
            },
        }
    }

    fn unsupported(&self, operation: &str) -> ProviderError {
        log::debug!("[{}] stub driver rejects {operation}", self.info.provider_type);
        ProviderError::unsupported(&self.info.provider_type, operation)
    }
}

#[async_trait]
impl DnsDriver for StubDriver {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn test(&self) -> TestResult {
        TestResult {
            success: true,
            latency: Duration::ZERO,
            error_msg: None,
            details: BTreeMap::from([("provider".to_string(), self.info.provider_type.clone())]),
            tested_at: Utc::now(),
            test_type: "noop".to_string(),
            endpoint: None,
            status_code: None,
        }
    }

    async fn list_zones(&self, _options: &ListOptions) -> Result<Vec<Zone>> {
        Ok(Vec::new())
    }

    async fn get_zone(&self, name: &str) -> Result<Zone> {
        Err(ProviderError::ZoneNotFound {
            provider: self.info.provider_type.clone(),
            zone: name.to_string(),
            raw_message: None,
        })
    }

    async fn list_records(&self, _zone: &str, _options: &ListOptions) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn get_record(&self, _zone: &str, record_id: &str) -> Result<Record> {
        Err(ProviderError::RecordNotFound {
            provider: self.info.provider_type.clone(),
            record_id: record_id.to_string(),
            raw_message: None,
        })
    }

    async fn create_record(&self, _zone: &str, _record: &Record) -> Result<Record> {
        Err(self.unsupported("create_record"))
    }

    async fn update_record(&self, _zone: &str, _record: &Record) -> Result<Record> {
        Err(self.unsupported("update_record"))
    }

    async fn delete_record(&self, _zone: &str, _record_id: &str) -> Result<()> {
        Err(self.unsupported("delete_record"))
    }

    async fn batch_create_records(&self, _zone: &str, _records: &[Record]) -> Result<BatchResult> {
        Err(self.unsupported("batch_create_records"))
    }

    async fn batch_update_records(&self, _zone: &str, _records: &[Record]) -> Result<BatchResult> {
        Err(self.unsupported("batch_update_records"))
    }

    async fn batch_delete_records(
        &self,
        _zone: &str,
        _record_ids: &[String],
    ) -> Result<BatchResult> {
        Err(self.unsupported("batch_delete_records"))
    }

    async fn sync_zone(
        &self,
        _zone: &str,
        _desired: &[Record],
        _options: &SyncOptions,
    ) -> Result<SyncResult> {
        Err(self.unsupported("sync_zone"))
    }

    async fn create_txt_challenge(
        &self,
        _domain: &str,
        _token: &str,
        _ttl: u32,
    ) -> Result<ChallengeResult> {
        Err(self.unsupported("create_txt_challenge"))
    }

    async fn delete_txt_challenge(&self, _domain: &str, _token: &str) -> Result<()> {
        Err(self.unsupported("delete_txt_challenge"))
    }

    async fn import_zone_file(&self, _zone: &str, _content: &str) -> Result<ImportResult> {
        Err(self.unsupported("import_zone_file"))
    }
}
