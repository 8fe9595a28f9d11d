use docplan::core::currency::{CurrencyConverter, CurrencyError, HttpRateSource, RateCache, RateSource};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn usd_table() -> serde_json::Value {
    json!({"date": "2024-03-01", "usd": {"eur": 0.9, "ars": 850.0, "brl": 5.0}})
}

fn source(server: &MockServer) -> HttpRateSource {
    HttpRateSource::new(
        vec![
            format!("{}/primary/{{date}}/{{base}}.json", server.uri()),
            format!("{}/mirror/{{date}}/{{base}}.json", server.uri()),
        ],
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_mirror_is_used_when_primary_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/primary/latest/usd.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mirror/latest/usd.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(usd_table()))
        .expect(1)
        .mount(&server)
        .await;

    let payload = source(&server).fetch("USD", "latest").await.unwrap();
    assert_eq!(payload["usd"]["eur"], json!(0.9));
}

#[tokio::test]
async fn test_payload_without_base_table_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"date": "2024-03-01"})))
        .mount(&server)
        .await;

    let err = source(&server).fetch("usd", "latest").await.unwrap_err();
    assert!(matches!(err, CurrencyError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_tables_are_cached_on_disk_and_in_memory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/primary/2024-03-01/usd.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(usd_table()))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let cache = RateCache::new(dir.path(), Duration::from_secs(3600));

    let first = CurrencyConverter::new(
        Arc::new(source(&server)),
        Some(cache.clone()),
        vec!["usd".into()],
    );
    assert_eq!(first.rate("usd", "eur", "2024-03-01").await.unwrap(), 0.9);
    assert_eq!(first.rate("usd", "ars", "2024-03-01").await.unwrap(), 850.0);
    assert!(cache.path_for("usd", "2024-03-01").exists());

    let second = CurrencyConverter::new(Arc::new(source(&server)), Some(cache), vec!["usd".into()]);
    assert_eq!(second.rate("usd", "brl", "2024-03-01").await.unwrap(), 5.0);
}

#[tokio::test]
async fn test_inverse_and_triangulated_crossings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/primary/latest/usd.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(usd_table()))
        .mount(&server)
        .await;

    let converter = CurrencyConverter::new(Arc::new(source(&server)), None, vec!["usd".into()]);

    let eur_to_usd = converter.rate("eur", "usd", "latest").await.unwrap();
    assert!((eur_to_usd - 1.0 / 0.9).abs() < 1e-12);

    let eur_to_ars = converter.convert(9.0, "EUR", "ARS", "latest").await.unwrap();
    assert!((eur_to_ars - 8500.0).abs() < 1e-6);

    let err = converter.rate("eur", "jpy", "latest").await.unwrap_err();
    assert!(matches!(err, CurrencyError::NoCrossing { .. }));
}

#[tokio::test]
async fn test_provider_outage_is_paid_once_per_table() {
    let server = MockServer::start().await;
    // usd and eur tables, primary and mirror each: four requests in total.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let converter = CurrencyConverter::new(Arc::new(source(&server)), None, vec!["usd".into()]);
    for amount in [10.0, 20.0, 30.0] {
        let err = converter.convert(amount, "usd", "eur", "latest").await.unwrap_err();
        assert!(matches!(err, CurrencyError::NoCrossing { .. }));
    }
}
