// src/persist/mod.rs
//! Persist stage: write whatever the parse stage produced in one transaction.

pub mod postgres;

use async_trait::async_trait;
use metrics::counter;

use crate::error::PersistError;
use crate::record::{CurrencyValue, ObservationRecord, WeatherValue};

pub const WEATHER_TABLE: &str = "weather_data";
pub const CURRENCY_TABLE: &str = "currency_data";

/// A durable store that hands out one transaction per persist call.
#[async_trait]
pub trait ObservationSink: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn SinkTransaction>, PersistError>;
}

/// An open transaction. Consuming `commit`/`rollback` release the underlying
/// connection; nothing is visible until `commit` returns `Ok`.
#[async_trait]
pub trait SinkTransaction: Send {
    async fn insert_weather(&mut self, weather: &WeatherValue) -> Result<(), PersistError>;
    async fn insert_currency(&mut self, currency: &CurrencyValue) -> Result<(), PersistError>;
    async fn commit(self: Box<Self>) -> Result<(), PersistError>;
    async fn rollback(self: Box<Self>) -> Result<(), PersistError>;
}

/// Rows written by one successful persist call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    pub weather_rows: u32,
    pub currency_rows: u32,
}

impl PersistOutcome {
    pub fn total(&self) -> u32 {
        self.weather_rows + self.currency_rows
    }
}

/// Insert the present halves of `record` and commit once.
///
/// `None` or an empty record is a successful no-op that never touches the sink.
/// Any insert or commit failure rolls the whole transaction back and is
/// returned to the caller.
pub async fn persist_record(
    sink: &dyn ObservationSink,
    record: Option<&ObservationRecord>,
) -> Result<PersistOutcome, PersistError> {
    crate::metrics::ensure_metrics_described();

    let Some(record) = record.filter(|r| !r.is_empty()) else {
        tracing::info!("no data to save");
        return Ok(PersistOutcome::default());
    };

    tracing::info!(?record, "saving data to database");
    let mut tx = sink.begin().await?;

    let outcome = match write_rows(tx.as_mut(), record).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "insert failed, rolling back");
            counter!("persist_rollbacks_total").increment(1);
            if let Err(rb) = tx.rollback().await {
                tracing::error!(error = %rb, "rollback failed");
            } else {
                tracing::info!("transaction rolled back");
            }
            return Err(e);
        }
    };

    if let Err(e) = tx.commit().await {
        // A failed COMMIT leaves the transaction aborted server-side.
        tracing::error!(error = %e, "commit failed, transaction rolled back");
        counter!("persist_rollbacks_total").increment(1);
        return Err(e);
    }

    counter!("persist_rows_total", "table" => WEATHER_TABLE)
        .increment(u64::from(outcome.weather_rows));
    counter!("persist_rows_total", "table" => CURRENCY_TABLE)
        .increment(u64::from(outcome.currency_rows));
    tracing::info!(rows = outcome.total(), "committed transaction");
    Ok(outcome)
}

async fn write_rows(
    tx: &mut dyn SinkTransaction,
    record: &ObservationRecord,
) -> Result<PersistOutcome, PersistError> {
    let mut outcome = PersistOutcome::default();

    match &record.weather {
        Some(weather) => {
            tx.insert_weather(weather).await?;
            outcome.weather_rows += 1;
            tracing::info!(temperature_c = %weather.temperature_celsius, "weather row written");
        }
        None => tracing::info!("no weather data to save"),
    }

    match &record.currency {
        Some(currency) => {
            tx.insert_currency(currency).await?;
            outcome.currency_rows += 1;
            tracing::info!(usd_to_cny = %currency.usd_to_cny, "currency row written");
        }
        None => tracing::info!("no currency data to save"),
    }

    Ok(outcome)
}
