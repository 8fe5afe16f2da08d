use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use tracing::debug;

use crate::constants::CLUSTER_MANAGER_LOG_FILE;
use crate::constants::WORKSPACE_SUFFIX_LEN;
use crate::utils::file_io::create_dir_if_not_exist;
use crate::utils::file_io::list_subdirectories;
use crate::utils::file_io::remove_folder;
use crate::utils::time::folder_timestamp;
use crate::utils::time::random_alphanumeric;
use crate::Error;
use crate::Result;
use crate::SystemError;

/// Directory owning every node directory and the tool's own log for one
/// cluster instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterWorkspace {
    path: PathBuf,
}

impl ClusterWorkspace {
    /// `<root>/<prefix>-<timestamp>-<random>`, freshly created.
    pub fn create(
        root: &Path,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        create_dir_if_not_exist(root)?;
        let name = format!(
            "{}-{}-{}",
            prefix,
            folder_timestamp(now),
            random_alphanumeric(WORKSPACE_SUFFIX_LEN)
        );
        let path = root.canonicalize().map_err(|e| SystemError::path(root, e))?.join(name);
        debug!("## Creating cluster folder in {}", path.display());
        std::fs::create_dir(&path).map_err(|e| SystemError::path(&path, e))?;
        Ok(Self { path })
    }

    /// Workspace left by an earlier invocation
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(Error::InvalidRequest(format!(
                "{} is not a cluster folder",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Every workspace directly under `root` whose name starts with `prefix`
    pub fn find(
        root: &Path,
        prefix: &str,
    ) -> Result<Vec<Self>> {
        Ok(list_subdirectories(root)?
            .into_iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(_, path)| Self { path })
            .collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_file(&self) -> PathBuf {
        self.path.join(CLUSTER_MANAGER_LOG_FILE)
    }

    /// Node directories are named by their port.
    pub fn node_ports(&self) -> Result<Vec<u16>> {
        let mut ports: Vec<u16> = list_subdirectories(&self.path)?
            .into_iter()
            .filter(|(name, _)| !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|(name, _)| name.parse().ok())
            .collect();
        ports.sort_unstable();
        Ok(ports)
    }

    pub fn node_dir(
        &self,
        port: u16,
    ) -> PathBuf {
        self.path.join(port.to_string())
    }

    pub fn remove(&self) -> Result<()> {
        remove_folder(&self.path)
    }
}
