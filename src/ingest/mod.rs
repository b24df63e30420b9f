// src/ingest/mod.rs
pub mod content_store;
pub mod http;
pub mod types;

use metrics::counter;

use crate::error::FetchError;
use crate::ingest::content_store::ContentStore;
use crate::ingest::types::{DocumentSource, RemoteDocument};

/// What the fetch stage wrote for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub document: RemoteDocument,
    pub bytes: u64,
}

/// Download every url in order and store each body verbatim under its local
/// name. The first failure aborts the stage; documents written before it stay
/// on disk and are simply overwritten by the next attempt.
pub async fn fetch_documents(
    source: &dyn DocumentSource,
    store: &ContentStore,
    urls: &[String],
) -> Result<Vec<FetchedDocument>, FetchError> {
    crate::metrics::ensure_metrics_described();

    store.ensure().await.map_err(|source| FetchError::Store {
        name: store.root().display().to_string(),
        source,
    })?;

    let mut out = Vec::with_capacity(urls.len());
    for url in urls {
        let document = RemoteDocument::from_url(url)?;
        tracing::info!(url = %document.url, source = source.name(), "downloading");

        let body = match source.get(&document.url).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, url = %document.url, "download failed");
                counter!("fetch_errors_total").increment(1);
                return Err(e);
            }
        };

        let bytes = store
            .put(&document.local_name, &body)
            .await
            .map_err(|source| {
                counter!("fetch_errors_total").increment(1);
                FetchError::Store {
                    name: document.local_name.clone(),
                    source,
                }
            })?;

        tracing::info!(
            url = %document.url,
            path = %store.path_for(&document.local_name).display(),
            bytes,
            "downloaded ({:.2} KB)",
            bytes as f64 / 1024.0
        );
        counter!("fetch_documents_total").increment(1);
        counter!("fetch_bytes_total").increment(bytes);

        out.push(FetchedDocument { document, bytes });
    }

    Ok(out)
}
