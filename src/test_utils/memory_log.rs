use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::LogSource;

/// Log files kept in memory, written by the test or by a fake server.
#[derive(Debug, Default)]
pub struct MemoryLogSource {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &self,
        path: &Path,
        text: &str,
    ) {
        self.files.lock().entry(path.to_path_buf()).or_default().push_str(text);
    }

    pub fn set(
        &self,
        path: &Path,
        text: &str,
    ) {
        self.files.lock().insert(path.to_path_buf(), text.to_string());
    }

    pub fn get(
        &self,
        path: &Path,
    ) -> Option<String> {
        self.files.lock().get(path).cloned()
    }
}

#[async_trait]
impl LogSource for MemoryLogSource {
    async fn read(
        &self,
        path: &Path,
    ) -> std::io::Result<Option<String>> {
        Ok(self.get(path))
    }
}
