//! Shared file storage behind `share://` IRIs

use std::path::{Component, Path, PathBuf};

use crate::error::PipelineError;
use crate::vocab::SHARE_SCHEME;

/// Directory shared with the other services of the job pipeline
#[derive(Debug, Clone)]
pub struct SharedStorage {
    root: PathBuf,
}

impl SharedStorage {
    /// Storage rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `share://` IRI of a file name
    #[must_use]
    pub fn physical_uri(name: &str) -> String {
        format!("{SHARE_SCHEME}{name}")
    }

    /// Local path of a `share://` IRI.
    ///
    /// Only plain relative paths below the root are accepted.
    pub fn resolve(&self, uri: &str) -> Result<PathBuf, PipelineError> {
        let relative = uri.strip_prefix(SHARE_SCHEME).unwrap_or(uri);
        if relative.is_empty() {
            return Err(PipelineError::NotFound(format!(
                "path for file '{uri}' is empty or file"
            )));
        }
        let relative = Path::new(relative);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(PipelineError::InvalidInput(format!(
                "file path '{uri}' escapes the shared directory"
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Read a file by its `share://` IRI
    pub async fn read(&self, uri: &str) -> Result<Vec<u8>, PipelineError> {
        let path = self.resolve(uri)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!(uri, path = %path.display(), "input file not found");
                Err(PipelineError::NotFound(format!(
                    "path for file '{uri}' is empty or file"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write `content` as `name`; returns the size in bytes
    pub async fn write(&self, name: &str, content: &[u8]) -> Result<u64, PipelineError> {
        let path = self.resolve(name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, content).await?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "file written");
        Ok(content.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_share_uris_below_root() {
        let storage = SharedStorage::new("/share");
        assert_eq!(storage.resolve("share://a.ttl").unwrap(), PathBuf::from("/share/a.ttl"));
        assert_eq!(
            storage.resolve("share://dir/b.ttl").unwrap(),
            PathBuf::from("/share/dir/b.ttl")
        );
    }

    #[test]
    fn rejects_empty_and_escaping_paths() {
        let storage = SharedStorage::new("/share");
        let empty = storage.resolve("share://").unwrap_err();
        assert!(empty.to_string().contains("not found"));
        assert!(matches!(
            storage.resolve("share://../etc/passwd"),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(storage.resolve("share:///etc/passwd").is_err());
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SharedStorage::new(dir.path().join("nested"));
        let size = storage.write("x.ttl", b"<a> <b> <c> .").await.unwrap();
        assert_eq!(size, 13);
        let bytes = storage.read(&SharedStorage::physical_uri("x.ttl")).await.unwrap();
        assert_eq!(bytes, b"<a> <b> <c> .");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SharedStorage::new(dir.path());
        let err = storage.read("share://absent.ttl").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "path for file 'share://absent.ttl' is empty or file not found"
        );
    }
}
