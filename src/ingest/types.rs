// src/ingest/types.rs
use reqwest::Url;

use crate::error::FetchError;

/// A feed endpoint plus the content-store key derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub url: String,
    pub local_name: String,
}

impl RemoteDocument {
    /// The local name is the last path segment (`.../current_obs/KJFK.xml` → `KJFK.xml`).
    pub fn from_url(url: &str) -> Result<Self, FetchError> {
        let invalid = |reason: &str| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };
        let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
        let name = parsed
            .path_segments()
            .and_then(|mut segs| segs.next_back())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("url has no file name segment"))?;
        Ok(Self {
            url: url.to_string(),
            local_name: name.to_string(),
        })
    }
}

/// Where raw documents come from. The fetch stage only needs "bytes or a
/// transport error" per url.
#[async_trait::async_trait]
pub trait DocumentSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
    fn name(&self) -> &'static str;
}
