//! Per-account provider configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// Request timeout when the configuration does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Advertised requests per second when the configuration does not set one.
pub const DEFAULT_RATE_LIMIT: u32 = 10;
/// Batch worker count when the configuration does not set one.
pub const DEFAULT_CONCURRENT: usize = 5;

/// Configuration for one provider account.
///
/// Credential values may still be ciphertext when loaded; run
/// [`decrypt_credentials`](Self::decrypt_credentials) before handing the
/// config to the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Registry key, e.g. `cloudflare` or `route53`.
    #[serde(rename = "type")]
    pub provider_type: String,
    /// Account label chosen by the operator.
    pub name: String,
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent: Option<usize>,
}

impl ProviderConfig {
    pub fn new(provider_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_credential(mut self, key: &str, value: impl Into<String>) -> Self {
        self.credentials.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Shape check run before any driver is constructed.
    pub fn validate(&self) -> Result<()> {
        if self.provider_type.trim().is_empty() {
            return Err(ProviderError::InvalidProviderType {
                provider: self.provider_type.clone(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(ProviderError::InvalidProviderName {
                provider: self.provider_type.clone(),
            });
        }
        if self.credentials.is_empty() {
            return Err(ProviderError::MissingCredentials {
                provider: self.provider_type.clone(),
                field: "*".to_string(),
            });
        }
        Ok(())
    }

    /// Fill every unset field from `defaults`.
    #[must_use]
    pub fn with_defaults(mut self, defaults: &DefaultConfig) -> Self {
        if self.endpoint.as_deref().is_none_or(str::is_empty) {
            self.endpoint.clone_from(&defaults.endpoint);
        }
        if self.region.as_deref().is_none_or(str::is_empty) {
            self.region.clone_from(&defaults.region);
        }
        self.timeout_secs.get_or_insert(defaults.timeout_secs);
        self.rate_limit.get_or_insert(defaults.rate_limit);
        self.concurrent.get_or_insert(defaults.concurrent);
        self
    }

    /// Trimmed credential value, `None` when missing or blank.
    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Credential value or `MissingCredentials` naming the field.
    pub fn require_credential(&self, key: &str) -> Result<&str> {
        self.credential(key)
            .ok_or_else(|| ProviderError::MissingCredentials {
                provider: self.provider_type.clone(),
                field: key.to_string(),
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn concurrency(&self) -> usize {
        self.concurrent.unwrap_or(DEFAULT_CONCURRENT).max(1)
    }

    /// Replace every credential value with its plaintext.
    ///
    /// Fails on the first field the decryptor rejects, naming that field.
    pub fn decrypt_credentials(mut self, decryptor: &dyn SecretDecryptor) -> Result<Self> {
        for (field, value) in &mut self.credentials {
            let plaintext =
                decryptor
                    .decrypt(value)
                    .map_err(|reason| ProviderError::InvalidCredentials {
                        provider: self.provider_type.clone(),
                        raw_message: Some(format!("cannot decrypt '{field}': {reason}")),
                    })?;
            *value = plaintext;
        }
        Ok(self)
    }
}

/// Vendor defaults merged into a [`ProviderConfig`] by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultConfig {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub timeout_secs: u64,
    pub rate_limit: u32,
    pub concurrent: usize,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rate_limit: DEFAULT_RATE_LIMIT,
            concurrent: DEFAULT_CONCURRENT,
        }
    }
}

/// Collaborator that turns stored credential ciphertext into plaintext.
pub trait SecretDecryptor: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, String>;
}

impl<F> SecretDecryptor for F
where
    F: Fn(&str) -> std::result::Result<String, String> + Send + Sync,
{
    fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, String> {
        self(ciphertext)
    }
}
