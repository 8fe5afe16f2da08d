use std::fs::create_dir_all;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;

use tracing::debug;
use tracing::error;

use crate::Result;
use crate::SystemError;

pub fn create_dir_if_not_exist(path: &Path) -> Result<()> {
    if !path.exists() {
        if let Err(e) = create_dir_all(path) {
            error!("Failed to create directory {:?}: {:?}", path, e);
            return Err(SystemError::path(path, e).into());
        }
    }
    Ok(())
}

pub fn create_parent_dir_if_not_exist(path: &Path) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        create_dir_if_not_exist(parent_dir)?;
    }
    Ok(())
}

/// Truncates an existing file, like opening a fresh log.
pub fn open_file_for_write(path: &Path) -> Result<File> {
    create_parent_dir_if_not_exist(path)?;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| SystemError::path(path, e).into())
}

/// Recursively removes `path`. A missing folder is not an error.
pub fn remove_folder(path: &Path) -> Result<()> {
    debug!("Removing folder {}", path.display());
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Folder {} removed", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SystemError::path(path, e).into()),
    }
}

/// Direct sub-directories of `path` as `(name, full path)`, sorted by name.
pub fn list_subdirectories(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(path).map_err(|e| SystemError::path(path, e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SystemError::path(path, e))?;
        let file_type = entry.file_type().map_err(|e| SystemError::path(entry.path(), e))?;
        if file_type.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Time since the file was last modified
pub fn file_age(path: &Path) -> std::io::Result<Duration> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO))
}
