//! Driver registry: provider type key → constructor.
//!
//! One registry is built at process start and passed by reference to every
//! consumer. Tests build their own, seeded with fake drivers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{DefaultConfig, ProviderConfig};
use crate::error::{ProviderError, Result};
use crate::providers::StubDriver;
#[cfg(feature = "cloudflare")]
use crate::providers::CloudflareDriver;
#[cfg(feature = "route53")]
use crate::providers::Route53Driver;
use crate::traits::DnsDriver;
use crate::types::ValidationResult;

/// Builds a driver from an already validated, defaulted configuration.
///
/// Must not perform network I/O.
pub type DriverConstructor =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn DnsDriver>> + Send + Sync>;

/// Provider types served by [`StubDriver`] in [`DriverRegistry::with_builtin_drivers`].
pub const STUB_PROVIDER_TYPES: [&str; 4] = ["aliyun", "tencent", "godaddy", "dnspod"];

/// Maps provider type keys to driver constructors.
#[derive(Default)]
pub struct DriverRegistry {
    constructors: RwLock<HashMap<String, DriverConstructor>>,
}

impl DriverRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every adapter compiled into this crate.
    #[must_use]
    pub fn with_builtin_drivers() -> Self {
        let registry = Self::new();

        #[cfg(feature = "cloudflare")]
        registry.register_driver("cloudflare", |config: &ProviderConfig| {
            Ok(Arc::new(CloudflareDriver::from_config(config)?) as Arc<dyn DnsDriver>)
        });
        #[cfg(feature = "route53")]
        registry.register_driver("route53", |config: &ProviderConfig| {
            Ok(Arc::new(Route53Driver::from_config(config)?) as Arc<dyn DnsDriver>)
        });
        for provider_type in STUB_PROVIDER_TYPES {
            registry.register_driver(provider_type, |config: &ProviderConfig| {
                Ok(Arc::new(StubDriver::new(&config.provider_type)) as Arc<dyn DnsDriver>)
            });
        }

        registry
    }

    /// Associate `provider_type` with `constructor`. A later registration for
    /// the same key replaces the earlier one.
    pub fn register_driver<F>(&self, provider_type: &str, constructor: F)
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn DnsDriver>> + Send + Sync + 'static,
    {
        let replaced = self
            .constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider_type.to_string(), Arc::new(constructor))
            .is_some();
        if replaced {
            log::debug!("[{provider_type}] driver constructor replaced");
        }
    }

    pub fn unregister_driver(&self, provider_type: &str) -> Result<()> {
        self.constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(provider_type)
            .map(|_| ())
            .ok_or_else(|| ProviderError::ProviderNotFound {
                provider: provider_type.to_string(),
            })
    }

    /// Validate `config`, merge the vendor defaults and construct the driver.
    pub fn create_driver(&self, config: &ProviderConfig) -> Result<Arc<dyn DnsDriver>> {
        config.validate()?;

        let constructor = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&config.provider_type)
            .cloned()
            .ok_or_else(|| ProviderError::InvalidProviderType {
                provider: config.provider_type.clone(),
            })?;

        let config = config.clone().with_defaults(&default_config(&config.provider_type));
        match constructor(&config) {
            Ok(driver) => {
                log::debug!(
                    "[{}] driver created for account '{}'",
                    config.provider_type,
                    config.name
                );
                Ok(driver)
            }
            Err(e) => {
                e.log(&format!(
                    "[{}] cannot construct driver for account '{}'",
                    config.provider_type, config.name
                ));
                Err(e)
            }
        }
    }

    /// Registered type keys, sorted.
    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        types.sort();
        types
    }

    pub fn is_registered(&self, provider_type: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(provider_type)
    }

    /// Per-type credential check. Fails on the first missing field.
    pub fn validate_config(
        &self,
        provider_type: &str,
        credentials: &HashMap<String, String>,
    ) -> Result<()> {
        if !self.is_registered(provider_type) {
            return Err(ProviderError::InvalidProviderType {
                provider: provider_type.to_string(),
            });
        }
        match missing_credential(provider_type, credentials) {
            Some(field) => Err(ProviderError::MissingCredentials {
                provider: provider_type.to_string(),
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Vendor defaults for a registered type.
    pub fn default_config(&self, provider_type: &str) -> Result<DefaultConfig> {
        if !self.is_registered(provider_type) {
            return Err(ProviderError::InvalidProviderType {
                provider: provider_type.to_string(),
            });
        }
        Ok(default_config(provider_type))
    }
}

/// Credential fields a provider type cannot work without.
///
/// Cloudflare accepts either `api_token` or the `api_key` + `email` pair,
/// so it is handled in [`missing_credential`].
fn required_fields(provider_type: &str) -> &'static [&'static str] {
    match provider_type {
        "route53" => &["access_key_id", "secret_access_key", "region"],
        "aliyun" => &["access_key_id", "access_key_secret", "region"],
        "godaddy" => &["api_key", "api_secret"],
        "dnspod" => &["login_token"],
        "tencent" => &["secret_id", "secret_key"],
        _ => &[],
    }
}

fn present(credentials: &HashMap<String, String>, field: &str) -> bool {
    credentials
        .get(field)
        .is_some_and(|value| !value.trim().is_empty())
}

fn missing_credential(
    provider_type: &str,
    credentials: &HashMap<String, String>,
) -> Option<&'static str> {
    if provider_type == "cloudflare" {
        if present(credentials, "api_token") {
            return None;
        }
        if !present(credentials, "api_key") {
            return Some("api_token");
        }
        return (!present(credentials, "email")).then_some("email");
    }
    required_fields(provider_type)
        .iter()
        .copied()
        .find(|field| !present(credentials, field))
}

/// Network-free credential check returning a report instead of an error.
pub fn check_credentials(
    provider_type: &str,
    credentials: &HashMap<String, String>,
) -> ValidationResult {
    let mut result = ValidationResult::valid();
    if let Some(field) = missing_credential(provider_type, credentials) {
        result.reject(field, format!("credential '{field}' is required"));
        if provider_type == "cloudflare" {
            result
                .suggestions
                .push("provide api_token, or api_key together with email".to_string());
        }
    }
    result
}

/// Vendor defaults. Unknown types get the generic defaults.
pub fn default_config(provider_type: &str) -> DefaultConfig {
    let (endpoint, region) = match provider_type {
        "route53" => ("https://route53.amazonaws.com", Some("us-east-1")),
        "aliyun" => ("https://alidns.aliyuncs.com", Some("cn-hangzhou")),
        "godaddy" => ("https://api.godaddy.com", None),
        "cloudflare" => ("https://api.cloudflare.com/client/v4", None),
        "dnspod" => ("https://dnsapi.cn", None),
        "tencent" => ("https://dnspod.tencentcloudapi.com", None),
        _ => return DefaultConfig::default(),
    };
    DefaultConfig {
        endpoint: Some(endpoint.to_string()),
        region: region.map(str::to_string),
        ..DefaultConfig::default()
    }
}
