use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Filesystem roots of the tool
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    /// Base directory; `clusters_folder` and `tls_folder` default below it
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,

    /// Parent of every cluster workspace
    #[serde(default)]
    pub clusters_folder: Option<PathBuf>,

    /// Process-wide TLS material cache
    #[serde(default)]
    pub tls_folder: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
            clusters_folder: None,
            tls_folder: None,
        }
    }
}

impl PathsConfig {
    pub fn clusters_folder(&self) -> PathBuf {
        self.clusters_folder
            .clone()
            .unwrap_or_else(|| self.home_dir.join("clusters"))
    }

    pub fn tls_folder(&self) -> PathBuf {
        self.tls_folder
            .clone()
            .unwrap_or_else(|| self.home_dir.join("tls_crts"))
    }
}

fn default_home_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
