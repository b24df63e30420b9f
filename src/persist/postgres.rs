// src/persist/postgres.rs
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use crate::error::PersistError;
use crate::persist::{ObservationSink, SinkTransaction, CURRENCY_TABLE, WEATHER_TABLE};
use crate::record::{CurrencyValue, WeatherValue};

/// PostgreSQL sink. Each `begin` opens a fresh single-connection pool that is
/// closed again when the transaction commits or rolls back.
#[derive(Debug, Clone)]
pub struct PgObservationSink {
    database_url: String,
    acquire_timeout: Duration,
}

impl PgObservationSink {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            acquire_timeout: Duration::from_secs(30),
        }
    }

    async fn connect(&self) -> Result<PgPool, PersistError> {
        PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await
            .map_err(PersistError::Connect)
    }
}

#[async_trait]
impl ObservationSink for PgObservationSink {
    async fn begin(&self) -> Result<Box<dyn SinkTransaction>, PersistError> {
        let pool = self.connect().await?;
        let tx = match pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                pool.close().await;
                return Err(PersistError::Begin(e));
            }
        };
        tracing::debug!("database transaction opened");
        Ok(Box::new(PgSinkTransaction { tx, pool }))
    }
}

// Field order matters: the transaction drops (and rolls back) before the pool.
struct PgSinkTransaction {
    tx: Transaction<'static, Postgres>,
    pool: PgPool,
}

#[async_trait]
impl SinkTransaction for PgSinkTransaction {
    async fn insert_weather(&mut self, weather: &WeatherValue) -> Result<(), PersistError> {
        sqlx::query(
            r#"
                INSERT INTO weather_data (temperature_c, timestamp)
                VALUES ($1, $2)
            "#,
        )
        .bind(weather.temperature_celsius)
        .bind(weather.observed_at.naive_utc())
        .execute(&mut *self.tx)
        .await
        .map_err(|source| PersistError::Insert {
            table: WEATHER_TABLE,
            source,
        })?;
        Ok(())
    }

    async fn insert_currency(&mut self, currency: &CurrencyValue) -> Result<(), PersistError> {
        sqlx::query(
            r#"
                INSERT INTO currency_data (usd_to_cny, timestamp)
                VALUES ($1, $2)
            "#,
        )
        .bind(currency.usd_to_cny)
        .bind(currency.observed_at.naive_utc())
        .execute(&mut *self.tx)
        .await
        .map_err(|source| PersistError::Insert {
            table: CURRENCY_TABLE,
            source,
        })?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PersistError> {
        let Self { tx, pool } = *self;
        let res = tx.commit().await.map_err(PersistError::Commit);
        pool.close().await;
        tracing::debug!("database connection closed");
        res
    }

    async fn rollback(self: Box<Self>) -> Result<(), PersistError> {
        let Self { tx, pool } = *self;
        let res = tx.rollback().await.map_err(PersistError::Rollback);
        pool.close().await;
        tracing::debug!("database connection closed");
        res
    }
}

/// Apply the bundled schema migration (`migrations/`).
pub async fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await?;
    let res = sqlx::migrate!("./migrations").run(&pool).await;
    pool.close().await;
    res?;
    Ok(())
}
