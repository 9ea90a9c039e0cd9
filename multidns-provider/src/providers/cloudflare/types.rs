//! Cloudflare API v4 wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope shared by every Cloudflare response.
#[derive(Debug, Deserialize)]
pub struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<CloudflareError>,
    pub result_info: Option<CloudflareResultInfo>,
}

#[derive(Debug, Deserialize)]
pub struct CloudflareError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CloudflareResultInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct CloudflareZone {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub paused: bool,
}

#[derive(Debug, Deserialize)]
pub struct CloudflareDnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub ttl: u32,
    pub priority: Option<u16>,
    /// Structured rdata for SRV/CAA.
    pub data: Option<Value>,
}

/// Request body for record create/update.
#[derive(Debug, Serialize)]
pub struct CloudflareRecordBody {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloudflareSrvData {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloudflareCaaData {
    pub flags: u8,
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct CloudflareCreateZoneBody<'a> {
    pub name: &'a str,
    pub account: CloudflareAccountRef<'a>,
    #[serde(rename = "type")]
    pub zone_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CloudflareAccountRef<'a> {
    pub id: &'a str,
}

/// `GET/PATCH /zones/{id}/dnssec`.
#[derive(Debug, Deserialize)]
pub struct CloudflareDnssec {
    pub status: String,
    pub algorithm: Option<String>,
    pub key_tag: Option<u32>,
    pub flags: Option<u32>,
    pub public_key: Option<String>,
    pub ds: Option<String>,
    pub modified_on: Option<String>,
}
