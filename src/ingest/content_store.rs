// src/ingest/content_store.rs
use std::io;
use std::path::{Path, PathBuf};

/// Directory of raw documents keyed by file name. Last writer wins.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create the directory if it does not exist yet.
    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Replace `name` with `bytes`, returning the size on disk.
    ///
    /// Goes through a sibling temp file and a rename so a reader sees either the
    /// old document or the new one.
    pub async fn put(&self, name: &str, bytes: &[u8]) -> io::Result<u64> {
        let target = self.path_for(name);
        let tmp = self.root.join(format!(".{name}.part"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(tokio::fs::metadata(&target).await?.len())
    }

    /// `Ok(None)` when the document was never fetched.
    pub async fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_and_get_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("downloads"));
        store.ensure().await.unwrap();
        store.ensure().await.unwrap();

        assert_eq!(store.put("a.xml", b"first").await.unwrap(), 5);
        assert_eq!(store.put("a.xml", b"2nd").await.unwrap(), 3);
        assert_eq!(store.get("a.xml").await.unwrap().as_deref(), Some(&b"2nd"[..]));
        assert!(store.get("missing.xml").await.unwrap().is_none());
    }
}
