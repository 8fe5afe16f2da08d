use std::io::Write;

use crate::utils::file_io::create_parent_dir_if_not_exist;
use crate::utils::file_io::file_age;
use crate::utils::file_io::list_subdirectories;
use crate::utils::file_io::open_file_for_write;
use crate::utils::file_io::remove_folder;

/// Passed: "/tmp/files/data.txt"
/// Expected: "/tmp/files" created
#[test]
fn test_create_parent_dir_for_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let file_path = temp_dir.path().join("files").join("data.txt");

    create_parent_dir_if_not_exist(&file_path).unwrap();

    assert!(file_path.parent().unwrap().is_dir());
    assert!(!file_path.exists());
}

#[test]
fn test_open_file_for_write_truncates() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("logs").join("cluster_manager.log");

    let mut f = open_file_for_write(&path).unwrap();
    f.write_all(b"first run").unwrap();
    drop(f);

    let mut f = open_file_for_write(&path).unwrap();
    f.write_all(b"2nd").unwrap();
    drop(f);

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "2nd");
}

#[test]
fn test_remove_folder_is_idempotent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let folder = temp_dir.path().join("cluster-x");
    std::fs::create_dir_all(folder.join("7000")).unwrap();
    std::fs::write(folder.join("7000").join("server.log"), "log").unwrap();

    remove_folder(&folder).unwrap();
    assert!(!folder.exists());
    // second removal of a missing folder succeeds
    remove_folder(&folder).unwrap();
}

#[test]
fn test_list_subdirectories_skips_files_and_sorts() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(temp_dir.path().join("7002")).unwrap();
    std::fs::create_dir(temp_dir.path().join("7001")).unwrap();
    std::fs::write(temp_dir.path().join("cluster_manager.log"), "").unwrap();

    let dirs = list_subdirectories(temp_dir.path()).unwrap();
    let names: Vec<&str> = dirs.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["7001", "7002"]);
    assert_eq!(dirs[0].1, temp_dir.path().join("7001"));
}

#[test]
fn test_list_subdirectories_of_missing_path_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    assert!(list_subdirectories(&temp_dir.path().join("missing")).is_err());
}

#[test]
fn test_file_age_of_fresh_file_is_small() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("ca.crt");
    std::fs::write(&path, "pem").unwrap();

    let age = file_age(&path).unwrap();
    assert!(age.as_secs() < 60);
    assert!(file_age(&temp_dir.path().join("nope")).is_err());
}
