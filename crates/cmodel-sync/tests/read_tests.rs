use cmodel_sync::prelude::*;
use cmodel_sync::{KeyField, ModelLoader};
use cmodel_test_utils::*;
use pretty_assertions::assert_eq;
use serde_yaml::Value;

fn ids(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

#[test]
fn test_read_standard_model() {
    let dir = standard_model_dir();
    let model = read_model(dir.path()).unwrap();

    assert_eq!(model.name, STANDARD_CLOUD);
    assert_eq!(model.version, Value::from(2));
    assert!(model.errors.is_empty());
    assert_eq!(model.file_info.files.len(), STANDARD_FILES.len());
    assert_eq!(model.file_info.files[0], CLOUD_CONFIG);
    for file in STANDARD_FILES {
        assert!(model.file_info.files.iter().any(|f| f == file), "{file} not listed");
    }
}

#[test]
fn test_servers_section() {
    let dir = standard_model_dir();
    let model = read_model(dir.path()).unwrap();

    assert_eq!(
        field_values(&model.input_model["servers"], "id"),
        vec!["controller1", "controller2", "compute1"]
    );
    assert_eq!(model.file_info.files_for("servers"), [SERVERS_FILE]);
    assert_eq!(
        model.file_info.file_section_map[SERVERS_FILE],
        vec![
            SectionRef::scalar("product"),
            SectionRef::ArrayEntities {
                name: "servers".to_string(),
                key_field: KeyField::Id,
                member_ids: ids(&["controller1", "controller2", "compute1"]),
            },
        ]
    );
}

#[test]
fn test_split_list_follows_walk_order() {
    let dir = standard_model_dir();
    let model = read_model(dir.path()).unwrap();

    assert_eq!(
        field_values(&model.input_model["disk-models"], "name"),
        vec!["DISK_SET_COMPUTE", "DISK_SET_CONTROLLER"]
    );
    assert_eq!(
        field_values(&model.input_model["interface-models"], "name"),
        vec!["CONTROLLER-INTERFACES", "SWIFT-INTERFACES", "COMPUTE-INTERFACES"]
    );
    assert_eq!(
        model.file_info.files_for("interface-models"),
        [NET_INTERFACES_FILE, NET_INTERFACES_COMPUTE_FILE]
    );
}

#[test]
fn test_key_fields_per_section() {
    let dir = standard_model_dir();
    let info = read_model(dir.path()).unwrap().file_info;

    assert_eq!(info.key_field_for("servers"), Some(KeyField::Id));
    // name wins over region-name
    assert_eq!(info.key_field_for("control-planes"), Some(KeyField::Name));
    assert_eq!(info.key_field_for("ring-specifications"), Some(KeyField::RegionName));
    assert_eq!(info.key_field_for("baremetal_servers"), Some(KeyField::NodeName));
}

#[test]
fn test_object_sections_keep_document_position() {
    let dir = standard_model_dir();
    let info = read_model(dir.path()).unwrap().file_info;

    assert_eq!(
        info.file_section_map[CLOUD_CONFIG],
        vec![
            SectionRef::scalar("product"),
            SectionRef::ObjectSection {
                name: "cloud".to_string()
            },
        ]
    );
    let names: Vec<_> = info.file_section_map[BAREMETAL_FILE]
        .iter()
        .map(SectionRef::name)
        .collect();
    assert_eq!(names, vec!["product", "baremetal", "baremetal_servers"]);
}

#[test]
fn test_nested_directories_are_read() {
    let dir = standard_model_dir();
    let model = read_model(dir.path()).unwrap();

    assert_eq!(model.file_info.files_for("ring-specifications"), [RINGS_FILE]);
    assert_eq!(
        field_values(&model.input_model["ring-specifications"], "region-name"),
        vec!["region1"]
    );
}

#[test]
fn test_readme_captured() {
    let dir = standard_model_dir();
    let model = read_model(dir.path()).unwrap();

    assert!(model.readme["md"].starts_with("# Standard example model"));
}

#[test]
fn test_bad_secondary_file_is_recorded() {
    let dir = ModelDirBuilder::standard()
        .file("data/broken.yml", "servers: [\n")
        .build();
    let model = read_model(dir.path()).unwrap();

    assert_eq!(model.errors.len(), 1);
    assert!(model.file_info.is_inert("data/broken.yml"));
    assert_eq!(field_values(&model.input_model["servers"], "id").len(), 3);
}

#[test]
fn test_missing_cloud_name() {
    let dir = ModelDirBuilder::standard()
        .file(CLOUD_CONFIG, "product:\n  version: 2\ncloud:\n  hostname-data: {}\n")
        .build();

    let err = ModelLoader::new(dir.path()).load().unwrap_err();
    assert!(matches!(
        err,
        ReadError::MissingRequiredField { field: "cloud.name", .. }
    ));
}

#[test]
fn test_empty_directory() {
    let dir = ModelDirBuilder::new().build();
    let err = read_model(dir.path()).unwrap_err();

    assert!(matches!(
        err,
        ReadError::MissingOrUnreadablePrimaryDocument { .. }
    ));
}

#[test]
fn test_entity_without_key_field() {
    let dir = ModelDirBuilder::standard()
        .file(NETWORKS_FILE, "networks:\n  - name: A\n  - vlanid: 5\n")
        .build();

    let err = read_model(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        ReadError::UnidentifiableEntity { index: 1, .. }
    ));
}

#[test]
fn test_model_json_round_trip() {
    let dir = ModelDirBuilder::standard().with_single_pass_through().build();
    let model = read_model(dir.path()).unwrap();

    let json = serde_json::to_string(&model).unwrap();
    let back: Model = serde_json::from_str(&json).unwrap();

    assert_eq!(back, model);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["fileInfo"]["fileSectionMap"][SERVERS_FILE].is_array());
    assert_eq!(value["inputModel"]["cloud"]["name"], STANDARD_CLOUD);
}
