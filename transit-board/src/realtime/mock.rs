//! File-backed feed source for development without network access.
//!
//! Serves a saved `FeedMessage` payload from disk as if it were a live
//! endpoint. The file is re-read on every fetch, so replacing it changes
//! what the next poll sees.

use std::path::{Path, PathBuf};

use super::aggregate::FeedSource;
use super::error::FeedError;
use super::types::FeedSnapshot;

#[derive(Debug, Clone)]
pub struct FileFeedSource {
    name: String,
    path: PathBuf,
}

impl FileFeedSource {
    /// A source serving one payload file, named after its file stem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("feed")
            .to_string();
        Self { name, path }
    }

    /// One source per `*.pb` file in `dir`, sorted by file name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Vec<Self>, FeedError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("pb") {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(FeedError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no .pb feed files in {}", dir.as_ref().display()),
            )));
        }

        Ok(paths.into_iter().map(Self::new).collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedSource for FileFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        let payload = tokio::fs::read(&self.path).await?;
        Ok(FeedSnapshot::decode(self.name.clone(), &payload)?)
    }
}
