use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Read access to text log files
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LogSource: Send + Sync + 'static {
    /// Whole file content, `None` while the file does not exist yet
    async fn read(
        &self,
        path: &Path,
    ) -> std::io::Result<Option<String>>;
}

/// Reads logs from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLogSource;

#[async_trait]
impl LogSource for FsLogSource {
    async fn read(
        &self,
        path: &Path,
    ) -> std::io::Result<Option<String>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
