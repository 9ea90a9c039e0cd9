//! # multidns-provider
//!
//! A provider-agnostic DNS engine: one capability contract over many DNS
//! vendors, plus the vendor-independent logic built on top of it (batch
//! execution, zone reconciliation, DNS-01 challenges, zone files).
//!
//! ## Supported Providers
//!
//! | Provider | Feature Flag | Auth Method |
//! |----------|-------------|-------------|
//! | [Cloudflare](https://www.cloudflare.com/) | `cloudflare` | Bearer Token or Global API Key |
//! | [Amazon Route 53](https://aws.amazon.com/route53/) | `route53` | AWS SigV4 |
//! | Aliyun, Tencent Cloud, `GoDaddy`, `DNSPod` | *(always)* | placeholder driver |
//!
//! Placeholder types answer reads with empty results and writes with
//! [`ProviderError::UnsupportedOperation`].
//!
//! ## Feature Flags
//!
//! ### Provider Selection
//!
//! - **`all-providers`** *(default)*: Enable every vendor adapter.
//! - **`cloudflare`**: Enable the Cloudflare adapter.
//! - **`route53`**: Enable the Route 53 adapter.
//!
//! ### TLS Backend
//!
//! - **`native-tls`** *(default)*: Use the platform's native TLS implementation.
//! - **`rustls`**: Use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use multidns_provider::{DriverRegistry, ListOptions, ProviderConfig, Record, DnsRecordType, SyncOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. One registry per process, passed to whoever needs drivers
//!     let registry = DriverRegistry::with_builtin_drivers();
//!
//!     // 2. Build a driver from an account configuration
//!     let config = ProviderConfig::new("cloudflare", "production")
//!         .with_credential("api_token", "your-token");
//!     let driver = registry.create_driver(&config)?;
//!
//!     // 3. List zones
//!     for zone in driver.list_zones(&ListOptions::all()).await? {
//!         println!("{} ({:?})", zone.name, zone.status);
//!     }
//!
//!     // 4. Preview a reconciliation without touching the zone
//!     let desired = vec![Record::new("www", DnsRecordType::A, "192.0.2.10", 300)];
//!     let options = SyncOptions { dry_run: true, ..SyncOptions::default() };
//!     let result = driver.sync_zone("example.com", &desired, &options).await?;
//!     println!("{} to add, {} to update", result.plan.to_add.len(), result.plan.to_update.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All driver operations return [`Result<T, ProviderError>`](ProviderError).
//! Optional operations a driver does not implement return
//! [`ProviderError::UnsupportedOperation`] (or
//! [`ProviderError::DnssecNotSupported`]); check
//! [`DnsDriver::get_capabilities`] before calling them, or branch on
//! [`ProviderError::is_unsupported`].
//!
//! Requests are sent once. Rate limits surface as
//! [`ProviderError::RateLimitExceeded`] and retrying is left to the caller.

mod batch;
mod challenge;
mod config;
mod diagnostics;
mod error;
mod http_client;
mod providers;
mod reconcile;
mod registry;
mod traits;
mod types;
mod utils;
mod validation;
mod zonefile;

// Re-export error types
pub use error::{ProviderError, Result};

// Re-export configuration
pub use config::{
    DEFAULT_CONCURRENT, DEFAULT_RATE_LIMIT, DEFAULT_TIMEOUT_SECS, DefaultConfig, ProviderConfig,
    SecretDecryptor,
};

// Re-export the capability contract (internal traits are not exported)
pub use traits::{DEFAULT_POLL_INTERVAL, DnsDriver};

// Re-export the registry
pub use registry::{
    DriverConstructor, DriverRegistry, STUB_PROVIDER_TYPES, check_credentials, default_config,
};

// Re-export vendor-independent logic usable without a driver
pub use challenge::{CHALLENGE_RECORD_NAME, DEFAULT_CHALLENGE_TTL};
pub use reconcile::{cname_conflicts, plan_zone};
pub use validation::ensure_record_supported;
pub use zonefile::{ParsedZone, SUPPORTED_FORMATS, export_bind, parse_bind};

// Re-export types
pub use types::{
    BatchResult, Capability, ChallengeResult, ChallengeState, ChallengeValidation,
    DEFAULT_PAGE_SIZE, DnsRecordType, DnssecKey, DnssecKeyType, DnssecResult, FILTER_KEYWORD,
    FILTER_NAME, FILTER_TYPE, ImportResult, LIMIT_MAX_BATCH_SIZE, LIMIT_MAX_DOMAINS,
    LIMIT_MAX_RECORDS_PER_DOMAIN, LIMIT_RATE_PER_SECOND, ListOptions, Metrics, OperationResult,
    ProviderInfo, Quota, Record, RecordKey, SortOrder, Statistics, SyncOptions, SyncResult,
    TestResult, Usage, ValidationResult, Zone, ZoneComparison, ZoneStatus, UnknownRecordType,
};

// Cancellation handle taken by `DnsDriver::wait_for_propagation`.
pub use tokio_util::sync::CancellationToken;

// Re-export concrete drivers
pub use providers::StubDriver;

#[cfg(feature = "cloudflare")]
pub use providers::CloudflareDriver;

#[cfg(feature = "route53")]
pub use providers::Route53Driver;
