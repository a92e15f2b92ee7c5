//! End-to-end tests of the HTTP engine against mock servers

use seo_sweep::config::{Config, IdentityConfig, OutputConfig, PipelineConfig};
use seo_sweep::output::{read_json, write_json};
use seo_sweep::FetchOutcome;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_AGENT: &str = "SeoSweepTest/1.0";

fn test_config(max_retries: u32) -> Config {
    Config {
        pipeline: PipelineConfig {
            concurrency: 2,
            timeout_ms: 5_000,
            max_retries,
            retry_delay_ms: 10,
            settle_grace_ms: 0,
            ..PipelineConfig::default()
        },
        identity: IdentityConfig {
            user_agent: TEST_AGENT.to_string(),
            default_language: "en".to_string(),
            alternate_language: "ar".to_string(),
        },
        output: OutputConfig::default(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_bilingual_home(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("accept-language", "ar"))
        .and(header("user-agent", TEST_AGENT))
        .respond_with(html(
            r#"<html lang="ar"><head>
                <title>الصفحة الرئيسية</title>
                <meta name="description" content="">
                <meta name="description" lang="ar" content="متجر إلكتروني">
            </head><body><h1>مرحبا</h1><p>نص تمهيدي.</p></body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("accept-language", "en"))
        .and(header("user-agent", TEST_AGENT))
        .respond_with(html(
            r#"<html lang="en"><head>
                <title>Home</title>
                <meta property="og:title" content="Home | Shop">
                <meta name="description" content="An online shop">
                <script type="application/ld+json">{"@context": "https://schema.org", "@type": "Store"}</script>
            </head><body><h1>Welcome</h1><p>Intro paragraph.</p></body></html>"#,
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_sweep_extracts_both_locales() {
    let server = MockServer::start().await;
    mount_bilingual_home(&server).await;

    let locations = vec![format!("{}/", server.uri())];
    let result = seo_sweep::run(&locations, &test_config(2)).await.expect("run failed");

    assert_eq!(result.stats.succeeded, 1);
    let record = &result.successes[0];
    assert_eq!(record.location, locations[0]);
    assert_eq!(record.title.en, "Home | Shop");
    assert_eq!(record.title.ar, "الصفحة الرئيسية");
    assert_eq!(record.description.en, "An online shop");
    assert_eq!(record.description.ar, "متجر إلكتروني");
    assert_eq!(record.heading.en, "Welcome");
    assert_eq!(record.heading.ar, "مرحبا");
    assert_eq!(record.intro.en, "Intro paragraph.");
    assert_eq!(record.intro.ar, "نص تمهيدي.");
    let data = record.structured_data.as_ref().expect("JSON-LD missing");
    assert_eq!(data["@type"], "Store");
}

#[tokio::test]
async fn test_server_error_exhausts_retries() {
    let server = MockServer::start().await;
    mount_bilingual_home(&server).await;

    // The default-locale load fails first, so each attempt makes one request
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let locations = vec![format!("{}/", server.uri()), format!("{}/broken", server.uri())];
    let result = seo_sweep::run(&locations, &test_config(2)).await.expect("run failed");

    assert_eq!(result.stats.succeeded, 1);
    assert_eq!(result.stats.failed, 1);
    let failure = &result.failures[0];
    assert_eq!(failure.location, locations[1]);
    assert_eq!(failure.attempts, 3);
    assert!(failure.error.contains("HTTP 500"), "unexpected error: {}", failure.error);
}

#[tokio::test]
async fn test_not_found_is_a_navigation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let locations = vec![format!("{}/missing", server.uri())];
    let result = seo_sweep::run(&locations, &test_config(0)).await.expect("run failed");

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].attempts, 1);
    assert!(result.failures[0].error.contains("HTTP 404"));
}

#[tokio::test]
async fn test_slow_page_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<title>Too late</title>").set_delay(Duration::from_millis(2_000)))
        .mount(&server)
        .await;

    let mut config = test_config(0);
    config.pipeline.timeout_ms = 1_000;

    let locations = vec![format!("{}/slow", server.uri())];
    let result = seo_sweep::run(&locations, &config).await.expect("run failed");

    assert_eq!(result.failures.len(), 1);
    assert!(
        result.failures[0].error.contains("Timed out after 1000ms"),
        "unexpected error: {}",
        result.failures[0].error
    );
}

#[tokio::test]
async fn test_retry_wrapper_recovers_over_http() {
    let server = MockServer::start().await;

    // First request fails, everything after succeeds
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html("<html><head><title>Recovered</title></head></html>"))
        .mount(&server)
        .await;

    let config = test_config(1);
    let engine = seo_sweep::HttpEngine::launch(&config.identity, &config.pipeline).unwrap();
    let location = format!("{}/flaky", server.uri());
    let outcome = seo_sweep::attempt(&engine, &location, &config.pipeline).await;

    match outcome {
        FetchOutcome::Success(record) => {
            assert_eq!(record.title.en, "Recovered");
            assert_eq!(record.title.ar, "Recovered");
        }
        FetchOutcome::Failure(detail) => panic!("expected success, got {:?}", detail),
    }
    assert_eq!(engine.open_sessions(), 0);
}

#[tokio::test]
async fn test_result_persists_as_json() {
    let server = MockServer::start().await;
    mount_bilingual_home(&server).await;

    let locations = vec![format!("{}/", server.uri())];
    let result = seo_sweep::run(&locations, &test_config(0)).await.expect("run failed");

    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("results.json");
    write_json(&result, &output_path).unwrap();

    let loaded = read_json(&output_path).unwrap();
    assert_eq!(loaded.successes, result.successes);
    assert_eq!(loaded.stats.total, 1);
}

#[tokio::test]
async fn test_invalid_identity_is_fatal_setup_error() {
    let mut config = test_config(0);
    config.identity.user_agent = "broken\u{0}agent".to_string();

    let result = seo_sweep::run(&["https://example.com/".to_string()], &config).await;
    assert!(matches!(result, Err(seo_sweep::SweepError::EngineSetup(_))));
}

#[tokio::test]
async fn test_timeout_applies_to_each_navigation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/steady"))
        .respond_with(
            html("<html><head><title>Steady</title></head></html>")
                .set_delay(Duration::from_millis(700)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let mut config = test_config(0);
    config.pipeline.timeout_ms = 1_000;

    // Both loads together exceed the timeout, each one alone does not
    let locations = vec![format!("{}/steady", server.uri())];
    let result = seo_sweep::run(&locations, &config).await.expect("run failed");

    assert_eq!(result.stats.succeeded, 1);
    assert_eq!(result.successes[0].title.ar, "Steady");
}
