//! Route 53 XML wire types.

use serde::{Deserialize, Serialize};

// ============ Hosted zones ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListHostedZonesResponse {
    #[serde(default)]
    pub hosted_zones: HostedZones,
    #[serde(default)]
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

/// `ListHostedZonesByName` shares the zone list shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListHostedZonesByNameResponse {
    #[serde(default)]
    pub hosted_zones: HostedZones,
}

#[derive(Debug, Default, Deserialize)]
pub struct HostedZones {
    #[serde(rename = "HostedZone", default)]
    pub items: Vec<HostedZone>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedZone {
    /// `/hostedzone/Z123...`
    pub id: String,
    /// Fully qualified, with trailing dot.
    pub name: String,
}

impl HostedZone {
    /// Bare zone ID without the `/hostedzone/` prefix.
    pub fn short_id(&self) -> &str {
        self.id.trim_start_matches("/hostedzone/")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "CreateHostedZoneRequest", rename_all = "PascalCase")]
pub struct CreateHostedZoneRequest<'a> {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'static str,
    pub name: &'a str,
    pub caller_reference: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateHostedZoneResponse {
    pub hosted_zone: HostedZone,
}

// ============ Record sets ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResourceRecordSetsResponse {
    #[serde(default)]
    pub resource_record_sets: ResourceRecordSets,
    #[serde(default)]
    pub is_truncated: bool,
    pub next_record_name: Option<String>,
    pub next_record_type: Option<String>,
    pub next_record_identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    pub items: Vec<ResourceRecordSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    /// Routing-policy sets (weighted, latency...) carry one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,
    /// Absent on alias sets.
    #[serde(rename = "TTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_records: Option<ResourceRecords>,
    #[serde(skip_serializing)]
    pub alias_target: Option<AliasTarget>,
}

impl ResourceRecordSet {
    pub fn new(name: String, record_type: &str, ttl: u32, values: Vec<String>) -> Self {
        Self {
            name,
            record_type: record_type.to_string(),
            set_identifier: None,
            ttl: Some(ttl),
            resource_records: Some(ResourceRecords {
                items: values
                    .into_iter()
                    .map(|value| ResourceRecord { value })
                    .collect(),
            }),
            alias_target: None,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.resource_records
            .iter()
            .flat_map(|r| r.items.iter().map(|rr| rr.value.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    pub items: Vec<ResourceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AliasTarget {
    #[serde(rename = "DNSName")]
    pub dns_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Delete,
    Upsert,
}

impl ChangeAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
            Self::Upsert => "UPSERT",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "ChangeResourceRecordSetsRequest", rename_all = "PascalCase")]
pub struct ChangeResourceRecordSetsRequest {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'static str,
    pub change_batch: ChangeBatch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeBatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub changes: Changes,
}

#[derive(Debug, Serialize)]
pub struct Changes {
    #[serde(rename = "Change")]
    pub items: Vec<Change>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Change {
    pub action: &'static str,
    pub resource_record_set: ResourceRecordSet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeResourceRecordSetsResponse {
    pub change_info: ChangeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeInfo {
    pub id: String,
    pub status: String,
}

// ============ Errors ============

/// Error body. Covers both `<ErrorResponse><Error>` and `<InvalidChangeBatch><Messages>`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Route53ErrorBody {
    pub error: Option<Route53ErrorDetail>,
    pub messages: Option<Route53Messages>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Route53ErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct Route53Messages {
    #[serde(rename = "Message", default)]
    pub items: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hosted_zones() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <ListHostedZonesResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
            <HostedZones>
                <HostedZone>
                    <Id>/hostedzone/Z1234567890ABC</Id>
                    <Name>example.com.</Name>
                    <CallerReference>ref-1</CallerReference>
                    <ResourceRecordSetCount>4</ResourceRecordSetCount>
                </HostedZone>
            </HostedZones>
            <IsTruncated>true</IsTruncated>
            <NextMarker>Z0987654321XYZ</NextMarker>
            <MaxItems>1</MaxItems>
        </ListHostedZonesResponse>"#;

        let parsed: ListHostedZonesResponse = match quick_xml::de::from_str(xml) {
            Ok(parsed) => parsed,
            Err(e) => panic!("parse failed: {e}"),
        };
        assert!(parsed.is_truncated);
        assert_eq!(parsed.next_marker.as_deref(), Some("Z0987654321XYZ"));
        assert_eq!(parsed.hosted_zones.items[0].short_id(), "Z1234567890ABC");
        assert_eq!(parsed.hosted_zones.items[0].name, "example.com.");
    }

    #[test]
    fn parses_record_sets_with_alias() {
        let xml = r#"<ListResourceRecordSetsResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
            <ResourceRecordSets>
                <ResourceRecordSet>
                    <Name>example.com.</Name>
                    <Type>MX</Type>
                    <TTL>300</TTL>
                    <ResourceRecords>
                        <ResourceRecord><Value>10 mail.example.com.</Value></ResourceRecord>
                        <ResourceRecord><Value>20 backup.example.com.</Value></ResourceRecord>
                    </ResourceRecords>
                </ResourceRecordSet>
                <ResourceRecordSet>
                    <Name>www.example.com.</Name>
                    <Type>A</Type>
                    <AliasTarget>
                        <HostedZoneId>Z2FDTNDATAQYW2</HostedZoneId>
                        <DNSName>d111111abcdef8.cloudfront.net.</DNSName>
                        <EvaluateTargetHealth>false</EvaluateTargetHealth>
                    </AliasTarget>
                </ResourceRecordSet>
            </ResourceRecordSets>
            <IsTruncated>false</IsTruncated>
            <MaxItems>300</MaxItems>
        </ListResourceRecordSetsResponse>"#;

        let parsed: ListResourceRecordSetsResponse = match quick_xml::de::from_str(xml) {
            Ok(parsed) => parsed,
            Err(e) => panic!("parse failed: {e}"),
        };
        let sets = parsed.resource_record_sets.items;
        assert_eq!(sets.len(), 2);
        assert_eq!(
            sets[0].values().collect::<Vec<_>>(),
            ["10 mail.example.com.", "20 backup.example.com."]
        );
        assert!(sets[1].resource_records.is_none());
        assert!(sets[1].alias_target.is_some());
        assert!(!parsed.is_truncated);
    }

    #[test]
    fn parses_both_error_shapes() {
        let xml = r"<ErrorResponse><Error><Type>Sender</Type><Code>NoSuchHostedZone</Code>
            <Message>No hosted zone found with ID: Z1</Message></Error><RequestId>r</RequestId></ErrorResponse>";
        let parsed: Result<Route53ErrorBody, _> = quick_xml::de::from_str(xml);
        assert!(matches!(parsed, Ok(Route53ErrorBody { error: Some(e), .. }) if e.code == "NoSuchHostedZone"));

        let xml = r"<InvalidChangeBatch><Messages><Message>Tried to create resource record set
            [name='www.example.com.', type='A'] but it already exists</Message></Messages></InvalidChangeBatch>";
        let parsed: Result<Route53ErrorBody, _> = quick_xml::de::from_str(xml);
        assert!(matches!(parsed, Ok(Route53ErrorBody { messages: Some(m), .. }) if m.items.len() == 1));
    }

    #[test]
    fn serializes_change_batch_with_namespace() {
        let request = ChangeResourceRecordSetsRequest {
            xmlns: crate::providers::route53::XMLNS,
            change_batch: ChangeBatch {
                comment: None,
                changes: Changes {
                    items: vec![Change {
                        action: ChangeAction::Upsert.as_str(),
                        resource_record_set: ResourceRecordSet::new(
                            "www.example.com.".to_string(),
                            "A",
                            300,
                            vec!["192.0.2.1".to_string()],
                        ),
                    }],
                },
            },
        };
        let xml = match quick_xml::se::to_string(&request) {
            Ok(xml) => xml,
            Err(e) => panic!("serialize failed: {e}"),
        };
        assert!(xml.starts_with(
            "<ChangeResourceRecordSetsRequest xmlns=\"https://route53.amazonaws.com/doc/2013-04-01/\">"
        ));
        assert!(xml.contains("<Action>UPSERT</Action>"));
        assert!(xml.contains("<TTL>300</TTL>"));
        assert!(xml.contains("<ResourceRecord><Value>192.0.2.1</Value></ResourceRecord>"));
        assert!(!xml.contains("SetIdentifier"));
    }
}
