// src/record.rs
//! The typed message the parse stage hands to the persist stage.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Temperature extracted from the weather observation feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeatherValue {
    /// Degrees Celsius, one decimal place.
    pub temperature_celsius: Decimal,
    /// Extraction instant (not the station's own observation time).
    pub observed_at: DateTime<Utc>,
}

/// USD → CNY rate extracted from the currency table feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrencyValue {
    /// Four decimal places.
    pub usd_to_cny: Decimal,
    pub observed_at: DateTime<Utc>,
}

/// Result of one parse run. Either side may be missing; an all-empty record is
/// still a valid record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservationRecord {
    #[serde(default)]
    pub weather: Option<WeatherValue>,
    #[serde(default)]
    pub currency: Option<CurrencyValue>,
}

impl ObservationRecord {
    pub fn is_empty(&self) -> bool {
        self.weather.is_none() && self.currency.is_none()
    }
}
