//! Route 53 adapter against a mock API.

mod common;

use multidns_provider::{
    DnsDriver, DnsRecordType, DriverRegistry, ListOptions, ProviderConfig, ProviderError, Record,
    Route53Driver,
};
use wiremock::matchers::{
    body_string_contains, header_exists, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const XMLNS: &str = "https://route53.amazonaws.com/doc/2013-04-01/";
const RRSET: &str = "/2013-04-01/hostedzone/Z1EXAMPLE/rrset";

fn driver(server: &MockServer) -> Route53Driver {
    let config = ProviderConfig::new("route53", "test")
        .with_credential("access_key_id", "AKIDEXAMPLE")
        .with_credential("secret_access_key", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
        .with_endpoint(server.uri());
    match Route53Driver::from_config(&config) {
        Ok(driver) => driver,
        Err(e) => panic!("driver construction failed: {e}"),
    }
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/xml")
        .set_body_string(body)
}

fn hosted_zone(id: &str, name: &str) -> String {
    format!(
        "<HostedZone><Id>/hostedzone/{id}</Id><Name>{name}</Name>\
         <CallerReference>ref-{id}</CallerReference>\
         <Config><PrivateZone>false</PrivateZone></Config>\
         <ResourceRecordSetCount>4</ResourceRecordSetCount></HostedZone>"
    )
}

fn record_set(name: &str, record_type: &str, ttl: u32, values: &[&str]) -> String {
    let records: String = values
        .iter()
        .map(|v| format!("<ResourceRecord><Value>{v}</Value></ResourceRecord>"))
        .collect();
    format!(
        "<ResourceRecordSet><Name>{name}</Name><Type>{record_type}</Type><TTL>{ttl}</TTL>\
         <ResourceRecords>{records}</ResourceRecords></ResourceRecordSet>"
    )
}

fn record_sets(sets: &[String], next: Option<(&str, &str)>) -> String {
    let truncated = match next {
        Some((name, record_type)) => format!(
            "<IsTruncated>true</IsTruncated><NextRecordName>{name}</NextRecordName>\
             <NextRecordType>{record_type}</NextRecordType>"
        ),
        None => "<IsTruncated>false</IsTruncated>".to_string(),
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ListResourceRecordSetsResponse xmlns=\"{XMLNS}\">\
         <ResourceRecordSets>{}</ResourceRecordSets>{truncated}<MaxItems>300</MaxItems>\
         </ListResourceRecordSetsResponse>",
        sets.concat()
    )
}

fn change_accepted() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ChangeResourceRecordSetsResponse xmlns=\"{XMLNS}\">\
         <ChangeInfo><Id>/change/C2682N5HXP0BZ4</Id><Status>PENDING</Status>\
         <SubmittedAt>2024-01-01T00:00:00.000Z</SubmittedAt></ChangeInfo>\
         </ChangeResourceRecordSetsResponse>"
    )
}

fn error_response(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_string(format!(
        "<?xml version=\"1.0\"?>\
         <ErrorResponse xmlns=\"{XMLNS}\"><Error><Type>Sender</Type>\
         <Code>{code}</Code><Message>{message}</Message></Error>\
         <RequestId>b25f48e8-84fd-11e6-80d9-574e0c4664cb</RequestId></ErrorResponse>"
    ))
}

async fn mount_zone(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2013-04-01/hostedzonesbyname"))
        .and(query_param("dnsname", "example.com"))
        .respond_with(xml(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <ListHostedZonesByNameResponse xmlns=\"{XMLNS}\">\
             <HostedZones>{}</HostedZones><DNSName>example.com</DNSName>\
             <IsTruncated>false</IsTruncated><MaxItems>1</MaxItems>\
             </ListHostedZonesByNameResponse>",
            hosted_zone("Z1EXAMPLE", "example.com.")
        )))
        .mount(server)
        .await;
}

/// The set lookup for `name`/`record_type` returns `sets`.
async fn mount_lookup(server: &MockServer, name: &str, record_type: &str, sets: &[String]) {
    Mock::given(method("GET"))
        .and(path(RRSET))
        .and(query_param("name", name))
        .and(query_param("type", record_type))
        .and(query_param("maxitems", "1"))
        .respond_with(xml(record_sets(sets, None)))
        .with_priority(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn requests_are_signed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2013-04-01/hostedzonesbyname"))
        .and(header_exists("x-amz-date"))
        .and(header_exists("x-amz-content-sha256"))
        .and(header_regex(
            "authorization",
            r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/us-east-1/route53/aws4_request, SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature=[0-9a-f]{64}$",
        ))
        .respond_with(xml(format!(
            "<ListHostedZonesByNameResponse xmlns=\"{XMLNS}\"><HostedZones>{}</HostedZones>\
             <IsTruncated>false</IsTruncated></ListHostedZonesByNameResponse>",
            hosted_zone("Z1EXAMPLE", "example.com.")
        )))
        .expect(1)
        .mount(&server)
        .await;

    let zone = require_ok!(driver(&server).get_zone("example.com").await);
    assert_eq!(zone.id, "Z1EXAMPLE");
    assert_eq!(zone.name, "example.com");
}

#[tokio::test]
async fn record_sets_explode_into_records() {
    let server = MockServer::start().await;
    mount_zone(&server).await;

    Mock::given(method("GET"))
        .and(path(RRSET))
        .and(query_param("maxitems", "300"))
        .respond_with(xml(record_sets(
            &[
                record_set("example.com.", "MX", 3600, &["10 mail.example.com."]),
                record_set(
                    "example.com.",
                    "SOA",
                    900,
                    &["ns-1.awsdns-00.com. awsdns-hostmaster.amazon.com. 1 7200 900 1209600 86400"],
                ),
                "<ResourceRecordSet><Name>cdn.example.com.</Name><Type>A</Type>\
                 <AliasTarget><HostedZoneId>Z2FDTNDATAQYW2</HostedZoneId>\
                 <DNSName>d111111abcdef8.cloudfront.net.</DNSName>\
                 <EvaluateTargetHealth>false</EvaluateTargetHealth></AliasTarget></ResourceRecordSet>"
                    .to_string(),
            ],
            Some(("www.example.com.", "A")),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RRSET))
        .and(query_param("name", "www.example.com."))
        .and(query_param("type", "A"))
        .and(query_param("maxitems", "300"))
        .respond_with(xml(record_sets(
            &[
                record_set("www.example.com.", "A", 300, &["192.0.2.1", "192.0.2.2"]),
                record_set("\\052.example.com.", "TXT", 60, &["\"hello world\""]),
            ],
            None,
        )))
        .with_priority(1)
        .mount(&server)
        .await;

    let records = require_ok!(
        driver(&server)
            .list_records("example.com", &ListOptions::all())
            .await
    );

    // SOA and the alias set are skipped.
    assert_eq!(records.len(), 4);
    let mx = &records[0];
    assert_eq!((mx.name.as_str(), mx.priority), ("@", Some(10)));
    assert_eq!(mx.value, "mail.example.com");
    assert_eq!(records[1].value, "192.0.2.1");
    assert_eq!(records[2].value, "192.0.2.2");
    assert_eq!(records[1].id, "www.example.com|A|192.0.2.1");
    let wildcard = &records[3];
    assert_eq!(wildcard.name, "*");
    assert_eq!(wildcard.value, "hello world");
}

#[tokio::test]
async fn create_starts_a_new_set() {
    let server = MockServer::start().await;
    mount_zone(&server).await;
    // The lookup returns the next set in order, which is not ours.
    mount_lookup(
        &server,
        "www.example.com.",
        "A",
        &[record_set("zzz.example.com.", "A", 300, &["192.0.2.9"])],
    )
    .await;
    Mock::given(method("POST"))
        .and(path(RRSET))
        .and(body_string_contains("<Action>CREATE</Action>"))
        .and(body_string_contains("<Name>www.example.com.</Name>"))
        .and(body_string_contains("<Value>192.0.2.1</Value>"))
        .respond_with(xml(change_accepted()))
        .expect(1)
        .mount(&server)
        .await;

    let record = Record::new("www", DnsRecordType::A, "192.0.2.1", 300);
    let created = require_ok!(driver(&server).create_record("example.com", &record).await);
    assert_eq!(created.id, "www.example.com|A|192.0.2.1");
}

#[tokio::test]
async fn create_appends_to_existing_set() {
    let server = MockServer::start().await;
    mount_zone(&server).await;
    mount_lookup(
        &server,
        "www.example.com.",
        "A",
        &[record_set("www.example.com.", "A", 300, &["192.0.2.1"])],
    )
    .await;
    Mock::given(method("POST"))
        .and(path(RRSET))
        .and(body_string_contains("<Action>UPSERT</Action>"))
        .and(body_string_contains("<Value>192.0.2.1</Value>"))
        .and(body_string_contains("<Value>192.0.2.2</Value>"))
        .respond_with(xml(change_accepted()))
        .expect(1)
        .mount(&server)
        .await;

    let record = Record::new("www", DnsRecordType::A, "192.0.2.2", 300);
    require_ok!(driver(&server).create_record("example.com", &record).await);

    let duplicate = Record::new("www", DnsRecordType::A, "192.0.2.1", 300);
    let result = driver(&server).create_record("example.com", &duplicate).await;
    assert!(matches!(result, Err(ProviderError::RecordExists { .. })));
}

#[tokio::test]
async fn deleting_last_value_deletes_the_set() {
    let server = MockServer::start().await;
    mount_zone(&server).await;
    mount_lookup(
        &server,
        "old.example.com.",
        "TXT",
        &[record_set("old.example.com.", "TXT", 60, &["\"x\""])],
    )
    .await;
    Mock::given(method("POST"))
        .and(path(RRSET))
        .and(body_string_contains("<Action>DELETE</Action>"))
        .respond_with(xml(change_accepted()))
        .expect(1)
        .mount(&server)
        .await;

    require_ok!(
        driver(&server)
            .delete_record("example.com", "old.example.com|TXT|\"x\"")
            .await
    );

    let missing = driver(&server)
        .delete_record("example.com", "old.example.com|TXT|\"y\"")
        .await;
    assert!(matches!(missing, Err(ProviderError::RecordNotFound { .. })));

    let malformed = driver(&server).delete_record("example.com", "rec-1").await;
    assert!(matches!(
        malformed,
        Err(ProviderError::InvalidRecord { ref field, .. }) if field == "id"
    ));
}

#[tokio::test]
async fn change_batch_errors_are_mapped() {
    let server = MockServer::start().await;
    mount_zone(&server).await;
    mount_lookup(
        &server,
        "www.example.com.",
        "A",
        &[record_set("zzz.example.com.", "A", 300, &["192.0.2.9"])],
    )
    .await;
    Mock::given(method("POST"))
        .and(path(RRSET))
        .respond_with(error_response(
            400,
            "InvalidChangeBatch",
            "Tried to create resource record set [name='www.example.com.', type='A'] but it already exists",
        ))
        .mount(&server)
        .await;

    let record = Record::new("www", DnsRecordType::A, "192.0.2.1", 300);
    let result = driver(&server).create_record("example.com", &record).await;
    assert!(matches!(
        result,
        Err(ProviderError::RecordExists { ref record_name, .. }) if record_name == "www"
    ));
}

#[tokio::test]
async fn auth_failures_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(error_response(
            403,
            "SignatureDoesNotMatch",
            "The request signature we calculated does not match the signature you provided.",
        ))
        .mount(&server)
        .await;

    let result = driver(&server).list_zones(&ListOptions::all()).await;
    assert!(matches!(result, Err(ProviderError::InvalidCredentials { .. })));
}

#[tokio::test]
async fn zones_follow_markers_and_filter_in_memory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2013-04-01/hostedzone"))
        .respond_with(xml(format!(
            "<ListHostedZonesResponse xmlns=\"{XMLNS}\"><HostedZones>{}{}</HostedZones>\
             <IsTruncated>true</IsTruncated><NextMarker>Z3</NextMarker><MaxItems>100</MaxItems>\
             </ListHostedZonesResponse>",
            hosted_zone("Z1", "example.com."),
            hosted_zone("Z2", "shop.example.net."),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2013-04-01/hostedzone"))
        .and(query_param("marker", "Z3"))
        .respond_with(xml(format!(
            "<ListHostedZonesResponse xmlns=\"{XMLNS}\"><HostedZones>{}</HostedZones>\
             <IsTruncated>false</IsTruncated><MaxItems>100</MaxItems></ListHostedZonesResponse>",
            hosted_zone("Z3", "blog.example.org."),
        )))
        .with_priority(1)
        .mount(&server)
        .await;

    let all = require_ok!(driver(&server).list_zones(&ListOptions::all()).await);
    let names: Vec<&str> = all.iter().map(|z| z.name.as_str()).collect();
    assert_eq!(names, vec!["example.com", "shop.example.net", "blog.example.org"]);

    let shop = require_ok!(
        driver(&server)
            .list_zones(&ListOptions::all().with_filter(multidns_provider::FILTER_KEYWORD, "SHOP"))
            .await
    );
    assert_eq!(shop.len(), 1);
    assert_eq!(shop[0].id, "Z2");
}

#[tokio::test]
async fn registry_builds_route53_with_defaults() {
    let server = MockServer::start().await;
    mount_zone(&server).await;

    let registry = DriverRegistry::with_builtin_drivers();
    let config = ProviderConfig::new("route53", "aws")
        .with_credential("access_key_id", "AKIDEXAMPLE")
        .with_credential("secret_access_key", "secret")
        .with_endpoint(server.uri());
    let driver = require_ok!(registry.create_driver(&config));

    assert_eq!(driver.provider_type(), "route53");
    assert_eq!(driver.info().regions, vec!["us-east-1".to_string()]);
    assert_eq!(driver.batch_concurrency(), 1);
    let zone = require_ok!(driver.get_zone("example.com").await);
    assert_eq!(zone.id, "Z1EXAMPLE");
}

#[tokio::test]
async fn created_records_read_back_unchanged() {
    let cases = [
        (
            Record::new("@", DnsRecordType::Txt, "say \"hi\"", 300),
            "example.com.",
            "\"say \\\"hi\\\"\"",
        ),
        (
            Record::new("www", DnsRecordType::Cname, "target.example.net", 300),
            "www.example.com.",
            "target.example.net.",
        ),
        (
            Record::new("@", DnsRecordType::Mx, "mail.example.com", 3600).with_priority(10),
            "example.com.",
            "10 mail.example.com.",
        ),
        (
            Record::new("_sip._tcp", DnsRecordType::Srv, "sip.example.com", 300)
                .with_srv(10, 5, 5060),
            "_sip._tcp.example.com.",
            "10 5 5060 sip.example.com.",
        ),
    ];

    for (record, fqdn, stored) in cases {
        let server = MockServer::start().await;
        mount_zone(&server).await;
        let record_type = record.record_type.as_str();
        // Before the write the lookup lands on an unrelated set.
        Mock::given(method("GET"))
            .and(path(RRSET))
            .and(query_param("maxitems", "1"))
            .respond_with(xml(record_sets(
                &[record_set("zzz.example.com.", "A", 300, &["192.0.2.9"])],
                None,
            )))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(RRSET))
            .and(body_string_contains("<Action>CREATE</Action>"))
            .and(body_string_contains(format!("<Name>{fqdn}</Name>").as_str()))
            .respond_with(xml(change_accepted()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RRSET))
            .respond_with(xml(record_sets(
                &[record_set(fqdn, record_type, record.ttl, &[stored])],
                None,
            )))
            .mount(&server)
            .await;

        let r53 = driver(&server);
        let created = require_ok!(r53.create_record("example.com", &record).await);
        assert!(created.same_content(&record));

        let fetched = require_ok!(r53.get_record("example.com", &created.id).await);
        assert_eq!(fetched.name, record.name);
        assert_eq!(fetched.record_type, record.record_type);
        assert_eq!(fetched.value, record.value, "{record_type} value changed");
        assert_eq!(fetched.ttl, record.ttl);
        assert_eq!(
            (fetched.priority, fetched.weight, fetched.port),
            (record.priority, record.weight, record.port)
        );

        let listed = require_ok!(r53.list_records("example.com", &ListOptions::all()).await);
        assert_eq!(listed.len(), 1);
        assert!(listed[0].same_content(&record));
        assert_eq!(listed[0].id, created.id);
    }
}

#[tokio::test]
async fn absolute_target_is_not_an_update() {
    let server = MockServer::start().await;
    mount_zone(&server).await;
    Mock::given(method("GET"))
        .and(path(RRSET))
        .respond_with(xml(record_sets(
            &[record_set("www.example.com.", "CNAME", 300, &["target.example.net."])],
            None,
        )))
        .mount(&server)
        .await;

    let desired = vec![Record::new("www", DnsRecordType::Cname, "target.example.net.", 300)];
    let comparison = require_ok!(driver(&server).compare_zone("example.com", &desired).await);
    assert!(comparison.to_update.is_empty(), "{:?}", comparison.to_update);
    assert_eq!(comparison.unchanged.len(), 1);
}
