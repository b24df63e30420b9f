// src/parse/mod.rs
//! Parse stage: turn the two stored documents into an [`ObservationRecord`].
//!
//! Each feed is handled on its own. Anything that goes wrong with one of them
//! (document missing, bad xml, no usable value) is logged and leaves that half
//! of the record empty; the stage itself never fails.

pub mod currency;
pub mod weather;
pub mod xml;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};

use crate::ingest::content_store::ContentStore;
use crate::record::{CurrencyValue, ObservationRecord, WeatherValue};

pub const WEATHER_DOCUMENT: &str = "KJFK.xml";
pub const CURRENCY_DOCUMENT: &str = "usd.xml";
pub const SOURCE_CURRENCY: &str = "USD";
pub const TARGET_CURRENCY: &str = "CNY";

/// Content-store keys of the two documents the parser reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNames {
    pub weather: String,
    pub currency: String,
}

impl Default for DocumentNames {
    fn default() -> Self {
        Self {
            weather: WEATHER_DOCUMENT.to_string(),
            currency: CURRENCY_DOCUMENT.to_string(),
        }
    }
}

pub async fn parse_documents(store: &ContentStore, names: &DocumentNames) -> ObservationRecord {
    parse_documents_at(store, names, Utc::now()).await
}

/// Same as [`parse_documents`] with an explicit extraction instant.
pub async fn parse_documents_at(
    store: &ContentStore,
    names: &DocumentNames,
    now: DateTime<Utc>,
) -> ObservationRecord {
    let t0 = std::time::Instant::now();

    let weather_doc = load(store, &names.weather, "weather").await;
    let currency_doc = load(store, &names.currency, "currency").await;

    let record = ObservationRecord {
        weather: weather_doc.and_then(|xml| extract_weather(&xml, now)),
        currency: currency_doc.and_then(|xml| extract_currency(&xml, now)),
    };

    histogram!("parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    tracing::info!(
        weather = record.weather.is_some(),
        currency = record.currency.is_some(),
        "parse finished"
    );
    record
}

async fn load(store: &ContentStore, name: &str, feed: &'static str) -> Option<String> {
    let path = store.path_for(name);
    match store.get(name).await {
        Ok(Some(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Ok(None) => {
            tracing::warn!(feed, path = %path.display(), "document not found");
            record_outcome(feed, "missing");
            None
        }
        Err(e) => {
            tracing::warn!(feed, path = %path.display(), error = %e, "document unreadable");
            record_outcome(feed, "missing");
            None
        }
    }
}

/// Weather half of the record, or `None` with the reason logged.
pub fn extract_weather(xml: &str, now: DateTime<Utc>) -> Option<WeatherValue> {
    match weather::temperature_celsius(xml) {
        Ok(temperature_celsius) => {
            tracing::info!(%temperature_celsius, "parsed weather data");
            record_outcome("weather", "ok");
            Some(WeatherValue {
                temperature_celsius,
                observed_at: now,
            })
        }
        Err(skip) => {
            tracing::warn!(reason = %skip, "weather value skipped");
            record_outcome("weather", "skipped");
            None
        }
    }
}

/// Currency half of the record, or `None` with the reason logged.
pub fn extract_currency(xml: &str, now: DateTime<Utc>) -> Option<CurrencyValue> {
    let items = match currency::parse_items(xml) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "currency xml unparsable");
            record_outcome("currency", "skipped");
            return None;
        }
    };
    tracing::info!(count = items.len(), "currency items found");

    match currency::find_rate(&items, SOURCE_CURRENCY, TARGET_CURRENCY) {
        currency::RateLookup::Found { rate, .. } => {
            record_outcome("currency", "ok");
            Some(CurrencyValue {
                usd_to_cny: rate,
                observed_at: now,
            })
        }
        currency::RateLookup::NotFound => {
            tracing::warn!(
                target_code = TARGET_CURRENCY,
                available = ?currency::describe_available(&items, 10),
                "target currency not found"
            );
            record_outcome("currency", "not_found");
            None
        }
    }
}

fn record_outcome(field: &'static str, outcome: &'static str) {
    counter!("parse_fields_total", "field" => field, "outcome" => outcome).increment(1);
}
