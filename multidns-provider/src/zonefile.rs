//! BIND zone-file export and import.
//!
//! The parser accepts the subset of RFC 1035 master-file syntax that
//! provider exports and hand-written zones use in practice: comments,
//! `$ORIGIN`, `$TTL`, owner inheritance, optional TTL and class in either
//! order, parenthesised continuation lines, and quoted TXT strings.

use std::fmt::Write as _;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::error::{ProviderError, Result};
use crate::providers::common::{normalize_domain_name, quote_txt, txt_content};
use crate::traits::DnsDriver;
use crate::types::{DnsRecordType, ImportResult, OperationResult, Record};

const COMPONENT: &str = "zonefile";

/// Formats `export_zone_file` understands.
pub const SUPPORTED_FORMATS: [&str; 2] = ["bind", "rfc1035"];

/// Records read from a zone file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedZone {
    pub records: Vec<Record>,
    /// SOA, apex NS and record types the canonical model does not know.
    pub skipped: usize,
}

fn invalid(line: usize, detail: impl Into<String>) -> ProviderError {
    ProviderError::InvalidZoneFile {
        provider: COMPONENT.to_string(),
        line,
        detail: detail.into(),
    }
}

/// Reject anything but `bind` / `rfc1035` (case-insensitive).
pub fn check_format(provider: &str, format: &str) -> Result<()> {
    if SUPPORTED_FORMATS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(format.trim()))
    {
        Ok(())
    } else {
        Err(ProviderError::InvalidZoneFile {
            provider: provider.to_string(),
            line: 0,
            detail: format!(
                "unsupported format '{format}', expected one of: {}",
                SUPPORTED_FORMATS.join(", ")
            ),
        })
    }
}

// ============ Export ============

/// Render `records` as a BIND zone file with `$ORIGIN zone.`.
pub fn export_bind(zone: &str, records: &[Record], generated_at: DateTime<Utc>) -> String {
    let zone = normalize_domain_name(zone);
    let mut out = String::new();
    let _ = writeln!(out, "; Zone file for {zone}");
    let _ = writeln!(out, "; Generated at {}", generated_at.to_rfc3339());
    let _ = writeln!(out, "$ORIGIN {zone}.");
    out.push('\n');

    for record in records {
        let _ = writeln!(
            out,
            "{}\t{}\tIN\t{}\t{}",
            record.name,
            record.ttl,
            record.record_type,
            rdata(&zone, record)
        );
    }
    out
}

fn absolute_target(zone: &str, target: &str) -> String {
    if target.ends_with('.') {
        target.to_string()
    } else if target == "@" {
        format!("{zone}.")
    } else if target.contains('.') {
        format!("{target}.")
    } else {
        format!("{target}.{zone}.")
    }
}

fn rdata(zone: &str, record: &Record) -> String {
    match record.record_type {
        DnsRecordType::Mx => format!(
            "{} {}",
            record.priority.unwrap_or(0),
            absolute_target(zone, &record.value)
        ),
        DnsRecordType::Srv => format!(
            "{} {} {} {}",
            record.priority.unwrap_or(0),
            record.weight.unwrap_or(0),
            record.port.unwrap_or(0),
            absolute_target(zone, &record.value)
        ),
        DnsRecordType::Txt => quote_txt(&record.value),
        t if t.has_host_target() => absolute_target(zone, &record.value),
        _ => record.value.clone(),
    }
}

// ============ Parse ============

struct Entry {
    line: usize,
    text: String,
    inherits_owner: bool,
}

/// Remove the comment and parentheses from one physical line.
///
/// Returns the cleaned text and the net parenthesis depth change.
fn clean_line(raw: &str, line: usize) -> Result<(String, i32)> {
    let mut text = String::with_capacity(raw.len());
    let mut depth = 0;
    let mut in_quote = false;
    let mut escaped = false;

    for c in raw.chars() {
        if escaped {
            escaped = false;
            text.push(c);
            continue;
        }
        match c {
            '\\' if in_quote => {
                escaped = true;
                text.push(c);
            }
            '"' => {
                in_quote = !in_quote;
                text.push(c);
            }
            ';' if !in_quote => break,
            '(' if !in_quote => {
                depth += 1;
                text.push(' ');
            }
            ')' if !in_quote => {
                depth -= 1;
                text.push(' ');
            }
            _ => text.push(c),
        }
    }

    if in_quote {
        return Err(invalid(line, "unterminated quoted string"));
    }
    Ok((text, depth))
}

/// Join parenthesised continuations into one logical entry per record.
fn logical_lines(content: &str) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut pending: Option<Entry> = None;
    let mut depth = 0;
    let mut last_line = 0;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        last_line = line;
        let (text, delta) = clean_line(raw, line)?;

        match pending.as_mut() {
            Some(entry) => {
                entry.text.push(' ');
                entry.text.push_str(&text);
            }
            None if text.trim().is_empty() && delta == 0 => continue,
            None => {
                pending = Some(Entry {
                    line,
                    text,
                    inherits_owner: raw.starts_with([' ', '\t']),
                });
            }
        }

        depth += delta;
        if depth < 0 {
            return Err(invalid(line, "unbalanced ')'"));
        }
        if depth == 0
            && let Some(entry) = pending.take()
            && !entry.text.trim().is_empty()
        {
            entries.push(entry);
        }
    }

    if let Some(entry) = pending {
        return Err(invalid(
            entry.line,
            format!("'(' not closed before end of file (line {last_line})"),
        ));
    }
    Ok(entries)
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaped = false;

    for c in text.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }
        match c {
            '\\' if in_quote => {
                escaped = true;
                current.push(c);
            }
            '"' => {
                in_quote = !in_quote;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quote => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// `3600`, `1h`, `1h30m`, `2d`, `1w`.
fn parse_ttl(token: &str) -> Option<u32> {
    if let Ok(secs) = token.parse::<u32>() {
        return Some(secs);
    }
    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in token.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit: u64 = match c.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            'w' => 604_800,
            _ => return None,
        };
        let n: u64 = digits.parse().ok()?;
        total = total.checked_add(n.checked_mul(unit)?)?;
        digits.clear();
    }
    if !digits.is_empty() {
        return None;
    }
    u32::try_from(total).ok()
}

fn is_class(token: &str) -> bool {
    matches!(
        token.to_ascii_uppercase().as_str(),
        "IN" | "CH" | "HS" | "CS"
    )
}

/// Absolute name without the trailing dot.
fn absolute_name(name: &str, origin: &str) -> String {
    if name == "@" {
        origin.to_string()
    } else if let Some(stripped) = name.strip_suffix('.') {
        stripped.to_string()
    } else {
        format!("{name}.{origin}")
    }
}

fn relative_owner(absolute: &str, zone: &str, line: usize) -> Result<String> {
    if absolute.eq_ignore_ascii_case(zone) {
        return Ok("@".to_string());
    }
    let suffix = format!(".{}", zone.to_ascii_lowercase());
    match absolute.to_ascii_lowercase().strip_suffix(&suffix) {
        Some(sub) => Ok(absolute[..sub.len()].to_string()),
        None => Err(invalid(line, format!("owner '{absolute}' is outside zone '{zone}'"))),
    }
}

fn parse_u16(token: Option<&String>, field: &str, line: usize) -> Result<u16> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| invalid(line, format!("missing or invalid {field}")))
}

fn target(token: Option<&String>, origin: &str, line: usize) -> Result<String> {
    token
        .map(|t| absolute_name(t, origin))
        .ok_or_else(|| invalid(line, "missing target name"))
}

/// Parse a BIND zone file for `zone`.
///
/// Hostname targets come back absolute without the trailing dot; TXT
/// strings come back unquoted and concatenated.
pub fn parse_bind(zone: &str, content: &str) -> Result<ParsedZone> {
    let zone = normalize_domain_name(zone);
    let mut origin = zone.clone();
    let mut default_ttl: Option<u32> = None;
    let mut last_ttl: Option<u32> = None;
    let mut last_owner: Option<String> = None;
    let mut parsed = ParsedZone::default();

    for entry in logical_lines(content)? {
        let line = entry.line;
        let tokens = tokenize(&entry.text);
        let Some(first) = tokens.first() else {
            continue;
        };

        if first.starts_with('$') {
            let arg = tokens
                .get(1)
                .ok_or_else(|| invalid(line, format!("{first} needs an argument")))?;
            match first.to_ascii_uppercase().as_str() {
                "$ORIGIN" => origin = absolute_name(arg, &origin),
                "$TTL" => {
                    default_ttl =
                        Some(parse_ttl(arg).ok_or_else(|| invalid(line, format!("bad $TTL '{arg}'")))?);
                }
                other => return Err(invalid(line, format!("unsupported directive {other}"))),
            }
            continue;
        }

        let mut rest = tokens.iter().peekable();
        let owner = if entry.inherits_owner {
            last_owner
                .clone()
                .ok_or_else(|| invalid(line, "no previous owner name to inherit"))?
        } else {
            let name = rest.next().map(String::as_str).unwrap_or_default();
            relative_owner(&absolute_name(name, &origin), &zone, line)?
        };
        last_owner = Some(owner.clone());

        let mut ttl = None;
        while let Some(token) = rest.peek() {
            if is_class(token) {
                rest.next();
            } else if ttl.is_none()
                && let Some(value) = parse_ttl(token)
            {
                ttl = Some(value);
                rest.next();
            } else {
                break;
            }
        }

        let type_token = rest
            .next()
            .ok_or_else(|| invalid(line, "missing record type"))?;
        let rdata: Vec<&String> = rest.collect();
        if rdata.is_empty() {
            return Err(invalid(line, format!("{type_token} record has no data")));
        }

        let ttl = ttl
            .or(default_ttl)
            .or(last_ttl)
            .ok_or_else(|| invalid(line, "no TTL given and no $TTL in effect"))?;
        last_ttl = Some(ttl);

        let Ok(record_type) = type_token.parse::<DnsRecordType>() else {
            log::debug!("[{COMPONENT}] line {line}: skipping {type_token} record");
            parsed.skipped += 1;
            continue;
        };
        if record_type == DnsRecordType::Ns && owner == "@" {
            parsed.skipped += 1;
            continue;
        }

        let mut record = Record::new(owner, record_type, String::new(), ttl);
        match record_type {
            DnsRecordType::Mx => {
                record.priority = Some(parse_u16(rdata.first().copied(), "MX preference", line)?);
                record.value = target(rdata.get(1).copied(), &origin, line)?;
            }
            DnsRecordType::Srv => {
                record.priority = Some(parse_u16(rdata.first().copied(), "SRV priority", line)?);
                record.weight = Some(parse_u16(rdata.get(1).copied(), "SRV weight", line)?);
                record.port = Some(parse_u16(rdata.get(2).copied(), "SRV port", line)?);
                record.value = target(rdata.get(3).copied(), &origin, line)?;
            }
            DnsRecordType::Txt => {
                record.value = rdata.iter().map(|s| txt_content(s)).collect::<String>();
            }
            DnsRecordType::Cname | DnsRecordType::Ns | DnsRecordType::Ptr => {
                record.value = target(rdata.first().copied(), &origin, line)?;
            }
            _ => {
                record.value = rdata
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }
        parsed.records.push(record);
    }

    Ok(parsed)
}

/// Parse `content` and batch-create every record the driver supports.
///
/// A syntax error fails the call before any record is created.
pub async fn import<D>(driver: &D, zone: &str, content: &str) -> Result<ImportResult>
where
    D: DnsDriver + ?Sized,
{
    let provider = driver.provider_type();
    let started = Instant::now();

    let parsed = parse_bind(zone, content)
        .inspect_err(|e| e.log(&format!("[{provider}] import into {zone} rejected")))?;

    let (supported, unsupported): (Vec<Record>, Vec<Record>) = parsed
        .records
        .into_iter()
        .partition(|r| driver.info().supports_record_type(r.record_type));
    for record in &unsupported {
        log::warn!(
            "[{provider}] import into {zone}: skipping {} ({} not supported)",
            record.key(),
            record.record_type
        );
    }
    let skipped = parsed.skipped + unsupported.len();

    let results: Vec<OperationResult> = if supported.is_empty() {
        Vec::new()
    } else {
        driver.batch_create_records(zone, &supported).await?.results
    };
    let success = results.iter().filter(|r| r.success).count();
    let duration = started.elapsed();

    log::info!(
        "[{provider}] import into {zone}: {success} created, {} failed, {skipped} skipped in {duration:?}",
        results.len() - success
    );

    Ok(ImportResult {
        total: results.len() + skipped,
        success,
        failed: results.len() - success,
        skipped,
        results,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONE: &str = r#"
$ORIGIN example.com.
$TTL 3600
@       IN  SOA ns1.example.com. admin.example.com. (
            2024010101 ; serial
            7200 3600 1209600 300 )
@       IN  NS  ns1.example.com.
@       300 IN  A   192.0.2.1
www         IN  CNAME @
        ; inherited owner
@       IN  MX  10 mail
mail    1h  IN  A   192.0.2.2
_sip._tcp   IN  SRV 10 5 5060 sip.example.com.
txt     IN  TXT "v=spf1 " "-all"
blog.example.com.   IN  AAAA 2001:db8::1
@       IN  HINFO "x86" "linux"
"#;

    #[test]
    fn parses_common_syntax() {
        let parsed = parse_bind("example.com", ZONE);
        assert!(parsed.is_ok(), "parse failed: {parsed:?}");
        let Ok(parsed) = parsed else { return };

        // SOA, apex NS, HINFO
        assert_eq!(parsed.skipped, 3);
        assert_eq!(parsed.records.len(), 7);

        let apex = &parsed.records[0];
        assert_eq!((apex.name.as_str(), apex.ttl), ("@", 300));

        let www = &parsed.records[1];
        assert_eq!(www.record_type, DnsRecordType::Cname);
        assert_eq!(www.value, "example.com");
        assert_eq!(www.ttl, 3600);

        let mx = &parsed.records[2];
        assert_eq!(mx.priority, Some(10));
        assert_eq!(mx.value, "mail.example.com");

        assert_eq!(parsed.records[3].ttl, 3600);

        let srv = &parsed.records[4];
        assert_eq!((srv.priority, srv.weight, srv.port), (Some(10), Some(5), Some(5060)));
        assert_eq!(srv.value, "sip.example.com");

        assert_eq!(parsed.records[5].value, "v=spf1 -all");
        assert_eq!(parsed.records[6].name, "blog");
    }

    #[test]
    fn inherited_owner() {
        let content = "$TTL 60\nwww IN A 192.0.2.1\n    IN A 192.0.2.2\n";
        let parsed = parse_bind("example.com", content);
        assert!(matches!(&parsed, Ok(p) if p.records.iter().all(|r| r.name == "www")));
    }

    #[test]
    fn missing_rdata_reports_line() {
        let content = "$TTL 60\nwww IN A 192.0.2.1\napi IN A\n";
        assert!(matches!(
            parse_bind("example.com", content),
            Err(ProviderError::InvalidZoneFile { line: 3, .. })
        ));
    }

    #[test]
    fn missing_ttl_is_an_error() {
        assert!(matches!(
            parse_bind("example.com", "www IN A 192.0.2.1\n"),
            Err(ProviderError::InvalidZoneFile { line: 1, .. })
        ));
    }

    #[test]
    fn unclosed_paren_is_an_error() {
        let content = "$TTL 60\n@ IN SOA a. b. ( 1 2 3 4 5\n";
        assert!(matches!(
            parse_bind("example.com", content),
            Err(ProviderError::InvalidZoneFile { line: 2, .. })
        ));
    }

    #[test]
    fn owner_outside_zone_is_an_error() {
        assert!(matches!(
            parse_bind("example.com", "$TTL 60\nwww.other.org. IN A 192.0.2.1\n"),
            Err(ProviderError::InvalidZoneFile { line: 2, .. })
        ));
    }

    #[test]
    fn ttl_units() {
        assert_eq!(parse_ttl("300"), Some(300));
        assert_eq!(parse_ttl("1h30m"), Some(5400));
        assert_eq!(parse_ttl("1w"), Some(604_800));
        assert_eq!(parse_ttl("IN"), None);
        assert_eq!(parse_ttl("10x"), None);
    }

    #[test]
    fn export_folds_and_absolutises() {
        let records = vec![
            Record::new("@", DnsRecordType::Mx, "mail.example.com", 300).with_priority(10),
            Record::new("www", DnsRecordType::Cname, "lb", 300),
            Record::new("txt", DnsRecordType::Txt, "hello world", 60),
            Record::new("quoted", DnsRecordType::Txt, "say \"hi\" \\o/", 60),
        ];
        let text = export_bind("example.com", &records, Utc::now());
        assert!(text.contains("$ORIGIN example.com.\n"));
        assert!(text.contains("@\t300\tIN\tMX\t10 mail.example.com.\n"));
        assert!(text.contains("www\t300\tIN\tCNAME\tlb.example.com.\n"));
        assert!(text.contains("txt\t60\tIN\tTXT\t\"hello world\"\n"));
        assert!(text.contains("quoted\t60\tIN\tTXT\t\"say \\\"hi\\\" \\\\o/\"\n"));
    }

    #[test]
    fn exported_zone_parses_back() {
        let records = vec![
            Record::new("@", DnsRecordType::A, "192.0.2.1", 300),
            Record::new("_sip._tcp", DnsRecordType::Srv, "sip.example.com", 300)
                .with_srv(10, 5, 5060),
            Record::new("txt", DnsRecordType::Txt, "hello world", 60),
            Record::new("quoted", DnsRecordType::Txt, "say \"hi\" \\o/", 60),
        ];
        let text = export_bind("example.com", &records, Utc::now());
        let parsed = parse_bind("example.com", &text);
        assert!(matches!(&parsed, Ok(p) if p.records == records), "{parsed:?}");
    }

    #[test]
    fn format_check() {
        assert!(check_format("cloudflare", "BIND").is_ok());
        assert!(check_format("cloudflare", "rfc1035").is_ok());
        assert!(matches!(
            check_format("cloudflare", "json"),
            Err(ProviderError::InvalidZoneFile { line: 0, .. })
        ));
    }
}
