//! Driver registry and configuration handling.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::MemoryDriver;
use multidns_provider::{
    DEFAULT_CONCURRENT, DnsDriver, DnsRecordType, DriverRegistry, ListOptions, ProviderConfig,
    ProviderError, Record, STUB_PROVIDER_TYPES, Zone, ZoneStatus,
};

fn memory_registry() -> DriverRegistry {
    let registry = DriverRegistry::new();
    registry.register_driver("memory", |_config: &ProviderConfig| {
        Ok(Arc::new(MemoryDriver::new()) as Arc<dyn DnsDriver>)
    });
    registry
}

fn memory_config() -> ProviderConfig {
    ProviderConfig::new("memory", "test").with_credential("token", "t")
}

#[test]
fn unknown_type_is_rejected() {
    let registry = DriverRegistry::with_builtin_drivers();
    let config = ProviderConfig::new("bind9", "lab").with_credential("key", "k");
    assert!(matches!(
        registry.create_driver(&config),
        Err(ProviderError::InvalidProviderType { ref provider }) if provider == "bind9"
    ));
}

#[test]
fn config_shape_is_checked_first() {
    let registry = memory_registry();

    let unnamed = ProviderConfig::new("memory", " ").with_credential("token", "t");
    assert!(matches!(
        registry.create_driver(&unnamed),
        Err(ProviderError::InvalidProviderName { .. })
    ));

    let no_credentials = ProviderConfig::new("memory", "test");
    assert!(matches!(
        registry.create_driver(&no_credentials),
        Err(ProviderError::MissingCredentials { .. })
    ));
}

#[test]
fn missing_credentials_name_the_field() {
    let registry = DriverRegistry::with_builtin_drivers();

    let route53 = ProviderConfig::new("route53", "aws").with_credential("access_key_id", "AKIA");
    assert!(matches!(
        registry.create_driver(&route53),
        Err(ProviderError::MissingCredentials { ref field, .. }) if field == "secret_access_key"
    ));

    let cloudflare = ProviderConfig::new("cloudflare", "cf").with_credential("api_key", "k");
    assert!(matches!(
        registry.create_driver(&cloudflare),
        Err(ProviderError::MissingCredentials { ref field, .. }) if field == "email"
    ));

    let credentials = HashMap::from([("api_key".to_string(), "k".to_string())]);
    assert!(matches!(
        registry.validate_config("godaddy", &credentials),
        Err(ProviderError::MissingCredentials { ref field, .. }) if field == "api_secret"
    ));
}

#[test]
fn later_registration_wins() {
    let registry = memory_registry();
    registry.register_driver("memory", |_config: &ProviderConfig| {
        Ok(Arc::new(MemoryDriver::new().with_concurrency(7)) as Arc<dyn DnsDriver>)
    });

    let driver = require_ok!(registry.create_driver(&memory_config()));
    assert_eq!(driver.batch_concurrency(), 7);
    assert_eq!(registry.supported_types(), vec!["memory".to_string()]);
}

#[test]
fn unregister_removes_the_type() {
    let registry = memory_registry();
    require_ok!(registry.unregister_driver("memory"));
    assert!(!registry.is_registered("memory"));
    assert!(matches!(
        registry.unregister_driver("memory"),
        Err(ProviderError::ProviderNotFound { .. })
    ));
    assert!(matches!(
        registry.create_driver(&memory_config()),
        Err(ProviderError::InvalidProviderType { .. })
    ));
}

#[test]
fn builtin_types_are_listed_sorted() {
    let registry = DriverRegistry::with_builtin_drivers();
    let types = registry.supported_types();

    let mut sorted = types.clone();
    sorted.sort();
    assert_eq!(types, sorted);
    assert!(types.iter().any(|t| t == "cloudflare"));
    assert!(types.iter().any(|t| t == "route53"));
    for stub in STUB_PROVIDER_TYPES {
        assert!(registry.is_registered(stub), "{stub} missing");
    }
}

#[test]
fn defaults_are_merged_before_construction() {
    let registry = DriverRegistry::new();
    let seen = Arc::new(std::sync::Mutex::new(None::<ProviderConfig>));
    let sink = Arc::clone(&seen);
    registry.register_driver("route53", move |config: &ProviderConfig| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(config.clone());
        }
        Ok(Arc::new(MemoryDriver::new()) as Arc<dyn DnsDriver>)
    });

    let config = ProviderConfig::new("route53", "aws").with_credential("access_key_id", "AKIA");
    require_ok!(registry.create_driver(&config));

    let merged = require_some!(seen.lock().ok().and_then(|slot| slot.clone()));
    assert_eq!(merged.endpoint.as_deref(), Some("https://route53.amazonaws.com"));
    assert_eq!(merged.region.as_deref(), Some("us-east-1"));
    assert_eq!(merged.concurrent, Some(DEFAULT_CONCURRENT));

    let defaults = require_ok!(registry.default_config("route53"));
    assert_eq!(defaults.region.as_deref(), Some("us-east-1"));
    assert!(matches!(
        registry.default_config("bind9"),
        Err(ProviderError::InvalidProviderType { .. })
    ));
}

#[tokio::test]
async fn stub_types_degrade_gracefully() {
    let registry = DriverRegistry::with_builtin_drivers();
    let config = ProviderConfig::new("godaddy", "legacy")
        .with_credential("api_key", "k")
        .with_credential("api_secret", "s");
    let driver = require_ok!(registry.create_driver(&config));

    assert_eq!(driver.provider_type(), "godaddy");
    assert!(driver.get_capabilities().is_empty());
    assert!(require_ok!(driver.list_zones(&ListOptions::all()).await).is_empty());

    let zone = Zone {
        id: String::new(),
        name: "example.com".to_string(),
        status: ZoneStatus::Active,
    };
    assert!(driver.create_zone(&zone).await.is_err_and(|e| e.is_unsupported()));
    let record = Record::new("www", DnsRecordType::A, "192.0.2.1", 300);
    assert!(
        driver
            .create_record("example.com", &record)
            .await
            .is_err_and(|e| e.is_unsupported())
    );
    assert!(driver.test().await.success);
}

#[test]
fn credentials_are_decrypted_before_use() {
    let config = ProviderConfig::new("cloudflare", "prod").with_credential("api_token", "enc:secret");
    let decrypt = |value: &str| -> Result<String, String> {
        value
            .strip_prefix("enc:")
            .map(str::to_string)
            .ok_or_else(|| "not encrypted".to_string())
    };
    let plain = require_ok!(config.decrypt_credentials(&decrypt));
    assert_eq!(plain.credential("api_token"), Some("secret"));

    let bad = ProviderConfig::new("cloudflare", "prod").with_credential("api_token", "raw");
    assert!(matches!(
        bad.decrypt_credentials(&decrypt),
        Err(ProviderError::InvalidCredentials { raw_message: Some(ref msg), .. }) if msg.contains("api_token")
    ));
}

#[test]
fn config_parses_from_json() {
    let json = r#"{"type":"route53","name":"aws","credentials":{"access_key_id":"AKIA"},"timeoutSecs":10}"#;
    let config = require_ok!(serde_json::from_str::<ProviderConfig>(json));
    assert_eq!(config.provider_type, "route53");
    assert_eq!(config.timeout().as_secs(), 10);
    assert_eq!(config.concurrency(), DEFAULT_CONCURRENT);
}
