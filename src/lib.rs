// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod handoff;
pub mod metrics;
pub mod record;

// Pipeline stages: fetch (ingest) → parse → persist
pub mod ingest;
pub mod parse;
pub mod persist;

// Reference orchestration: retries, alerts, schedule
pub mod notify;
pub mod orchestrator;

// ---- Re-exports for stable public API ----
pub use crate::error::{FetchError, PersistError};
pub use crate::ingest::fetch_documents;
pub use crate::parse::{parse_documents, parse_documents_at};
pub use crate::persist::persist_record;
pub use crate::record::{CurrencyValue, ObservationRecord, WeatherValue};
