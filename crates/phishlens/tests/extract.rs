//! End-to-end extraction with frozen stage outputs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Duration as Days, Utc};
use phishlens::{
    BoundedResolver, ContentSource, ExtractorConfig, FeatureExtractor, FeatureName, FeatureValue,
    FetchResult, FetchedPage, HttpFetcher, RegistrationRecord, RegistrationSource, FEATURE_COUNT,
};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FrozenRegistration(Option<RegistrationRecord>);

#[async_trait]
impl RegistrationSource for FrozenRegistration {
    async fn lookup(&self, host: &str) -> phishlens::Result<RegistrationRecord> {
        self.0
            .clone()
            .ok_or_else(|| phishlens::Error::Whois(format!("no record for {host}")))
    }
}

struct NeverAnswers;

#[async_trait]
impl RegistrationSource for NeverAnswers {
    async fn lookup(&self, _host: &str) -> phishlens::Result<RegistrationRecord> {
        std::future::pending().await
    }
}

struct FrozenPage(FetchResult);

#[async_trait]
impl ContentSource for FrozenPage {
    async fn fetch(&self, _url: &str) -> FetchResult {
        self.0.clone()
    }
}

fn record(age_days: i64, names: &[&str]) -> RegistrationRecord {
    let created = Utc::now() - Days::days(age_days);
    RegistrationRecord {
        creation_date: Some(created),
        expiration_date: Some(created + Days::days(365 * 5)),
        domain_names: names.iter().map(|n| n.to_string()).collect(),
    }
}

fn page(body: &str) -> FetchResult {
    FetchResult::Fetched(FetchedPage {
        final_url: String::new(),
        status: 200,
        redirects: 0,
        body: body.to_string(),
    })
}

const CLEAN_PAGE: &str = r#"<html><head><link rel="icon" href="/favicon.ico"></head>
<body><img src="/logo.png"><a href="/about">About</a><a href="/help">Help</a></body></html>"#;

fn extractor_with(
    registration: impl RegistrationSource + 'static,
    content: FetchResult,
) -> FeatureExtractor {
    FeatureExtractor::with_sources(
        BoundedResolver::new(Arc::new(registration), Duration::from_millis(300)),
        Arc::new(FrozenPage(content)),
    )
}

fn established(host: &str, content: FetchResult) -> FeatureExtractor {
    extractor_with(
        FrozenRegistration(Some(record(3 * 365, &[&host.to_uppercase()]))),
        content,
    )
}

#[tokio::test]
async fn test_clean_established_site_is_all_default() {
    let extractor = established("good.example.com", page(CLEAN_PAGE));

    let report = extractor.extract("https://good.example.com").await;
    assert_eq!(report.row(), [1; FEATURE_COUNT]);

    let report = extractor.extract("http://good.example.com").await;
    assert_eq!(report.suspicious(), vec![FeatureName::Https]);
}

#[tokio::test]
async fn test_repeated_extraction_is_identical() {
    let extractor = established("shop.example.org", page(CLEAN_PAGE));
    let first = extractor.extract("shop.example.org/cart?id=7").await;
    let second = extractor.extract("shop.example.org/cart?id=7").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_fetch_flags_content_block() {
    let extractor = established(
        "good.example.com",
        FetchResult::Failed("operation timed out".to_string()),
    );
    let report = extractor.extract("https://good.example.com").await;

    for name in FeatureName::ALL {
        let expected = if name.is_content() {
            FeatureValue::Suspicious
        } else {
            FeatureValue::Legitimate
        };
        assert_eq!(report.vector.get(name), expected, "{name}");
    }
}

#[tokio::test]
async fn test_hung_registration_is_bounded() {
    let extractor = extractor_with(NeverAnswers, page(CLEAN_PAGE));

    let started = Instant::now();
    let report = extractor.extract("https://good.example.com").await;
    assert!(started.elapsed() < Duration::from_secs(2));

    for name in [
        FeatureName::DomainRegLen,
        FeatureName::AgeOfDomain,
        FeatureName::DnsRecording,
        FeatureName::AbnormalUrl,
        FeatureName::WebsiteTraffic,
        FeatureName::GoogleIndex,
        FeatureName::LinksPointingToPage,
    ] {
        assert_eq!(report.vector.get(name), FeatureValue::Suspicious, "{name}");
    }
    assert_eq!(report.vector.get(FeatureName::PageRank), FeatureValue::Legitimate);
}

#[tokio::test]
async fn test_ip_host() {
    let extractor = established("192.168.0.1", page(CLEAN_PAGE));
    let report = extractor.extract("http://192.168.0.1/login").await;
    assert_eq!(report.vector.get(FeatureName::UsingIp), FeatureValue::Suspicious);
}

#[tokio::test]
async fn test_long_url_only_flags_length() {
    let url = format!("https://plain.example.com/{}", "a".repeat(54));
    assert_eq!(url.len(), 80);

    let extractor = established("plain.example.com", page(CLEAN_PAGE));
    let report = extractor.extract(&url).await;
    assert_eq!(report.suspicious(), vec![FeatureName::LongUrl]);
}

#[tokio::test]
async fn test_form_handler_cases() {
    let cases = [
        (r#"<form><input name="u"></form>"#, FeatureValue::Suspicious),
        (
            r#"<form action="https://collector.example.net/post"></form>"#,
            FeatureValue::Neutral,
        ),
        (r#"<form action="/login/submit"></form>"#, FeatureValue::Legitimate),
    ];

    for (markup, expected) in cases {
        let extractor = established("good.example.com", page(markup));
        let report = extractor.extract("https://good.example.com").await;
        assert_eq!(
            report.vector.get(FeatureName::ServerFormHandler),
            expected,
            "{markup}"
        );
    }
}

#[tokio::test]
async fn test_young_domain_forces_derived_features() {
    let extractor = extractor_with(
        FrozenRegistration(Some(record(20, &["fresh.example.com"]))),
        page(CLEAN_PAGE),
    );
    let report = extractor.extract("https://fresh.example.com").await;
    assert_eq!(
        report.suspicious(),
        vec![
            FeatureName::AgeOfDomain,
            FeatureName::WebsiteTraffic,
            FeatureName::GoogleIndex,
            FeatureName::LinksPointingToPage,
        ]
    );
}

#[tokio::test]
async fn test_shape_holds_for_hostile_input() {
    let extractor = extractor_with(FrozenRegistration(None), page("<<<>>>\0</div></table>"));
    let long = "x".repeat(5000);
    let inputs: [&str; 9] = [
        "",
        "   ",
        "::::",
        "http://",
        "https://[::1]:99999/",
        "javascript:alert(1)",
        "http://exa mple.com/\u{1F41F}",
        "ftp://files.example.com/pub",
        long.as_str(),
    ];

    for input in inputs {
        let report = extractor.extract(input).await;
        assert_eq!(report.row().len(), FEATURE_COUNT);
        assert!(report.row().iter().all(|v| (-1..=1).contains(v)));
    }
}

#[tokio::test]
async fn test_live_fetch_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body onload="window.open('http://ads.example.net')">
            <iframe src="http://elsewhere.example.net/frame"></iframe>
            <a href="mailto:drop@example.net">contact</a></body></html>"#,
        ))
        .mount(&server)
        .await;

    let config = ExtractorConfig {
        fetch_timeout: Duration::from_secs(5),
        ..ExtractorConfig::default()
    };
    let extractor = FeatureExtractor::with_sources(
        BoundedResolver::new(
            Arc::new(FrozenRegistration(Some(record(900, &["127.0.0.1"])))),
            Duration::from_millis(300),
        ),
        Arc::new(HttpFetcher::new(&config).unwrap()),
    );

    let report = extractor.extract(&server.uri()).await;
    let v = &report.vector;
    assert_eq!(v.get(FeatureName::UsingIp), FeatureValue::Suspicious);
    assert_eq!(v.get(FeatureName::NonStdPort), FeatureValue::Suspicious);
    assert_eq!(v.get(FeatureName::UsingPopupWindow), FeatureValue::Suspicious);
    assert_eq!(v.get(FeatureName::IframeRedirection), FeatureValue::Suspicious);
    assert_eq!(v.get(FeatureName::InfoEmail), FeatureValue::Suspicious);
    assert_eq!(v.get(FeatureName::DisableRightClick), FeatureValue::Legitimate);
    assert_eq!(v.get(FeatureName::WebsiteForwarding), FeatureValue::Legitimate);
}

#[tokio::test]
async fn test_report_json_shape() {
    let extractor = established("good.example.com", page(CLEAN_PAGE));
    let report = extractor.extract("https://good.example.com").await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["url"], "https://good.example.com");
    assert_eq!(json["row"].as_array().unwrap().len(), FEATURE_COUNT);
    assert_eq!(json["features"]["UsingIP"], 1);
}
