//! DNS driver implementations

/// Shared utilities used by driver implementations.
pub mod common;

#[cfg(feature = "cloudflare")]
mod cloudflare;
#[cfg(feature = "route53")]
mod route53;
mod stub;

#[cfg(feature = "cloudflare")]
pub use cloudflare::CloudflareDriver;
#[cfg(feature = "route53")]
pub use route53::Route53Driver;
pub use stub::StubDriver;
