//! AWS Signature Version 4

use std::fmt::Write;

use sha2::{Digest, Sha256};

use crate::providers::common::hmac_sha256;
use crate::utils::log_sanitizer::truncate_for_log;

/// Key material and scope for one SigV4 signer.
pub(crate) struct SigV4<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub region: &'a str,
    pub service: &'a str,
}

/// Canonical query string: pairs sorted by key, RFC 3986 encoded.
pub(crate) fn canonical_query(params: &[(&str, String)]) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    pairs.sort_unstable();
    pairs.join("&")
}

/// Payload hash sent as `x-amz-content-sha256` and used in the canonical request.
pub(crate) fn payload_hash(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

impl SigV4<'_> {
    /// `Authorization` header value for a request.
    /// Reference: <https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html>
    ///
    /// `query` must already be canonical (see [`canonical_query`]) and `headers`
    /// must include `host` and `x-amz-date`. `amz_date` is `YYYYMMDDTHHMMSSZ`.
    pub(crate) fn authorization(
        &self,
        method: &str,
        uri: &str,
        query: &str,
        headers: &[(&str, &str)],
        payload: &str,
        amz_date: &str,
    ) -> String {
        let date_stamp = amz_date.get(..8).unwrap_or(amz_date);

        // 1. Canonical headers, lowercase and sorted
        let mut sorted_headers: Vec<(String, &str)> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.trim()))
            .collect();
        sorted_headers.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical_headers = sorted_headers
            .iter()
            .fold(String::new(), |mut acc, (k, v)| {
                let _ = writeln!(acc, "{k}:{v}");
                acc
            });
        let signed_headers = sorted_headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        // 2. Canonical request
        let canonical_request = format!(
            "{method}\n{uri}\n{query}\n{canonical_headers}\n{signed_headers}\n{}",
            payload_hash(payload)
        );
        log::debug!("CanonicalRequest:\n{}", truncate_for_log(&canonical_request));

        // 3. String to sign
        let credential_scope = format!(
            "{date_stamp}/{}/{}/aws4_request",
            self.region, self.service
        );
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        // 4. Derived signing key
        let k_date = hmac_sha256(
            format!("AWS4{}", self.secret_access_key).as_bytes(),
            date_stamp.as_bytes(),
        );
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        let k_signing = hmac_sha256(&k_service, b"aws4_request");
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

        format!(
            "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key_id
        )
    }
}
