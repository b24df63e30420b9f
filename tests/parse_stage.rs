// tests/parse_stage.rs
mod common;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use weather_fx_pipeline::ingest::content_store::ContentStore;
use weather_fx_pipeline::parse::{parse_documents, parse_documents_at, DocumentNames};

async fn store_with(docs: &[(&str, &str)]) -> (tempfile::TempDir, ContentStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ContentStore::new(dir.path().join("downloads"));
    store.ensure().await.unwrap();
    for (name, body) in docs {
        store.put(name, body.as_bytes()).await.unwrap();
    }
    (dir, store)
}

#[tokio::test]
async fn both_documents_parse() {
    let weather = common::fixture("KJFK.xml");
    let currency = common::fixture("usd.xml");
    let (_dir, store) = store_with(&[("KJFK.xml", weather.as_str()), ("usd.xml", currency.as_str())]).await;
    let now = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();

    let rec = parse_documents_at(&store, &DocumentNames::default(), now).await;

    let w = rec.weather.expect("weather");
    let c = rec.currency.expect("currency");
    assert_eq!(w.temperature_celsius, Decimal::new(239, 1));
    assert_eq!(c.usd_to_cny, Decimal::new(68996, 4));
    assert_eq!(w.observed_at, now);
    assert_eq!(c.observed_at, now);
}

#[tokio::test]
async fn missing_weather_does_not_block_currency() {
    let currency = common::fixture("usd.xml");
    let (_dir, store) = store_with(&[("usd.xml", currency.as_str())]).await;

    let rec = parse_documents(&store, &DocumentNames::default()).await;
    assert!(rec.weather.is_none());
    assert!(rec.currency.is_some());
}

#[tokio::test]
async fn broken_weather_does_not_block_currency() {
    let currency = common::fixture("usd.xml");
    let (_dir, store) = store_with(&[("KJFK.xml", "<html>503 Service"), ("usd.xml", currency.as_str())]).await;

    let rec = parse_documents(&store, &DocumentNames::default()).await;
    assert!(rec.weather.is_none());
    assert!(rec.currency.is_some());
}

#[tokio::test]
async fn broken_currency_does_not_block_weather() {
    let weather = common::fixture("KJFK.xml");
    let (_dir, store) = store_with(&[("KJFK.xml", weather.as_str()), ("usd.xml", "<channel><item><targetCurrency>CNY")]).await;

    let rec = parse_documents(&store, &DocumentNames::default()).await;
    assert!(rec.weather.is_some());
    assert!(rec.currency.is_none());
}

#[tokio::test]
async fn nothing_fetched_yields_empty_record() {
    let (_dir, store) = store_with(&[]).await;
    let rec = parse_documents(&store, &DocumentNames::default()).await;
    assert!(rec.is_empty());
}

#[tokio::test]
async fn custom_document_names_are_used() {
    let weather = common::fixture("KJFK.xml");
    let (_dir, store) = store_with(&[("station.xml", weather.as_str())]).await;
    let names = DocumentNames {
        weather: "station.xml".into(),
        currency: "rates.xml".into(),
    };
    let rec = parse_documents(&store, &names).await;
    assert!(rec.weather.is_some());
    assert!(rec.currency.is_none());
}
