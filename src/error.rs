// src/error.rs
//! Hard failures. Only the fetch and persist stages can fail; the parse stage
//! turns every problem into an absent field instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid source url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("writing {name} to the content store failed: {source}")]
    Store {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("could not open transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("insert into {table} failed: {source}")]
    Insert {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("commit failed: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("rollback failed: {0}")]
    Rollback(#[source] sqlx::Error),
}
