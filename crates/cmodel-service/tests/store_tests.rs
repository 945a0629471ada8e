use cmodel_service::{ModelStore, ServiceConfig, ServiceError};
use cmodel_sync::{FileStatus, ReadError};
use cmodel_test_utils::*;
use pretty_assertions::assert_eq;
use serde_yaml::Value;
use std::fs;
use std::sync::Arc;
use std::thread;

#[test]
fn test_read_through_store() {
    let dir = standard_model_dir();
    let store = ModelStore::new(dir.path());

    let model = store.read().unwrap();

    assert_eq!(model.name, STANDARD_CLOUD);
    assert_eq!(model.file_info.files.len(), STANDARD_FILES.len());
}

#[test]
fn test_check_clean_tree() {
    let dir = standard_model_dir();
    let report = ModelStore::new(dir.path()).check().unwrap();

    assert!(report.is_clean());
    assert_eq!(report.len(), STANDARD_FILES.len());
}

#[test]
fn test_check_reports_tree_that_does_not_round_trip() {
    let dir = ModelDirBuilder::standard()
        .file("data/pass_through_a.yml", "pass-through:\n  global: disabled\n")
        .file("data/pass_through_b.yml", "pass-through:\n  global:\n    esx_cloud: true\n")
        .build();

    let report = ModelStore::new(dir.path()).check().unwrap();

    assert_eq!(report.affected(), vec!["data/pass_through_a.yml"]);
    assert!(dir.path().join("data/pass_through_a.yml").exists());
}

#[test]
fn test_write_honors_dry_run_default() {
    let dir = standard_model_dir();
    let store = ModelStore::new(dir.path()).with_dry_run_by_default(true);
    let mut model = store.read().unwrap();
    model.input_model.shift_remove("networks");

    let report = store.write(model.clone(), None).unwrap();
    assert_eq!(report.status(NETWORKS_FILE), Some(FileStatus::Deleted));
    assert!(dir.path().join(NETWORKS_FILE).exists());

    let report = store.write(model, Some(false)).unwrap();
    assert_eq!(report.status(NETWORKS_FILE), Some(FileStatus::Deleted));
    assert!(!dir.path().join(NETWORKS_FILE).exists());
}

#[test]
fn test_write_to_configured_output_dir() {
    let source = standard_model_dir();
    let output = tempfile::tempdir().unwrap();
    let config = ServiceConfig::new()
        .with_model_dir(source.path())
        .with_output_dir(output.path());
    let store = ModelStore::from_config(&config);
    let mut model = store.read().unwrap();
    if let Some(Value::Sequence(servers)) = model.input_model.get_mut("servers") {
        servers.push(server("compute9"));
    }

    let report = store.write(model, None).unwrap();

    assert_eq!(report.files_with(FileStatus::Added).len(), STANDARD_FILES.len());
    assert_eq!(
        field_values(&read_yaml(output.path(), SERVERS_FILE)["servers"], "id").len(),
        4
    );
    assert_eq!(
        field_values(&read_yaml(source.path(), SERVERS_FILE)["servers"], "id").len(),
        3
    );
}

#[test]
fn test_config_file_round_trip() {
    let model = standard_model_dir();
    let config_dir = tempfile::tempdir().unwrap();
    let path = config_dir.path().join("cmodel.toml");
    fs::write(
        &path,
        format!(
            "[paths]\nmodel_dir = {:?}\n\n[write]\ndry_run_by_default = true\n",
            model.path().display().to_string()
        ),
    )
    .unwrap();

    let config = ServiceConfig::load(&path).unwrap();
    let store = ModelStore::from_config(&config);

    assert_eq!(store.read().unwrap().name, STANDARD_CLOUD);
    assert!(config.dry_run_by_default());
}

#[test]
fn test_missing_tree_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ModelStore::new(dir.path().join("nowhere")).read().unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Read(ReadError::MissingOrUnreadablePrimaryDocument { .. })
    ));
}

#[test]
fn test_concurrent_reads_and_write() {
    let dir = standard_model_dir();
    let store = Arc::new(ModelStore::new(dir.path()));
    let mut model = store.read().unwrap();
    if let Some(Value::Sequence(servers)) = model.input_model.get_mut("servers") {
        servers.push(server("compute9"));
    }

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let model = store.read().unwrap();
                // before or after the write, never in between
                let count = field_values(&model.input_model["servers"], "id").len();
                assert!(count == 3 || count == 4);
            })
        })
        .collect();
    store.write(model, Some(false)).unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(store.check().unwrap().is_clean());
}
