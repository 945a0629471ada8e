//! Testing utilities for cmodel workspace
//!
//! Shared model-tree fixtures, a builder for temporary model directories,
//! and small helpers for inspecting YAML on disk.

#![allow(missing_docs)]

use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const STANDARD_CLOUD: &str = "standard";

pub const CLOUD_CONFIG: &str = "cloudConfig.yml";
pub const SERVERS_FILE: &str = "data/servers.yml";
pub const CONTROL_PLANE_FILE: &str = "data/control_plane.yml";
pub const DISKS_CONTROLLER_FILE: &str = "data/disks_controller.yml";
pub const DISKS_COMPUTE_FILE: &str = "data/disks_compute.yml";
pub const NETWORKS_FILE: &str = "data/networks.yml";
pub const SERVER_GROUPS_FILE: &str = "data/server_groups.yml";
pub const NET_INTERFACES_FILE: &str = "data/net_interfaces.yml";
pub const NET_INTERFACES_COMPUTE_FILE: &str = "data/net_interfaces_compute.yml";
pub const BAREMETAL_FILE: &str = "data/baremetalConfig.yml";
pub const RINGS_FILE: &str = "data/swift/rings.yml";
pub const PASS_THROUGH_FILE: &str = "data/pass_through.yml";
pub const PASS_THROUGH_ESX1_FILE: &str = "data/pass_through_esx1.yml";
pub const PASS_THROUGH_ESX2_FILE: &str = "data/pass_through_esx2.yml";

/// Every YAML file of the standard fixture, primary document first
pub const STANDARD_FILES: [&str; 11] = [
    CLOUD_CONFIG,
    SERVERS_FILE,
    CONTROL_PLANE_FILE,
    DISKS_CONTROLLER_FILE,
    DISKS_COMPUTE_FILE,
    NETWORKS_FILE,
    SERVER_GROUPS_FILE,
    NET_INTERFACES_FILE,
    NET_INTERFACES_COMPUTE_FILE,
    BAREMETAL_FILE,
    RINGS_FILE,
];

const SERVERS: &str = "\
---
  product:
    version: 2

  servers:
    # Controllers
    - id: controller1
      ip-addr: 192.168.10.3
      role: CONTROLLER-ROLE
      server-group: RACK1
      nic-mapping: HP-DL360-4PORT
      mac-addr: b2:72:8d:ac:7c:6f

    - id: controller2
      ip-addr: 192.168.10.4
      role: CONTROLLER-ROLE
      server-group: RACK2
      nic-mapping: HP-DL360-4PORT
      mac-addr: 8a:8e:64:55:43:76

    # Compute
    - id: compute1
      ip-addr: 192.168.10.6
      role: COMPUTE-ROLE
      server-group: RACK1
      nic-mapping: HP-DL360-4PORT
      mac-addr: d6:70:c1:36:43:f7
";

const CONTROL_PLANE: &str = "\
---
  product:
    version: 2

  control-planes:
    - name: control-plane-1
      control-plane-prefix: cp1
      region-name: region1
      failure-zones:
        - AZ1
        - AZ2
      clusters:
        - name: cluster1
          cluster-prefix: c1
          server-role: CONTROLLER-ROLE
          member-count: 2
      resources:
        - name: compute
          resource-prefix: comp
          server-role: COMPUTE-ROLE
";

const DISKS_CONTROLLER: &str = "\
---
  product:
    version: 2

  disk-models:
  - name: DISK_SET_CONTROLLER
    volume-groups:
      - name: ardana-vg
        physical-volumes:
          - /dev/sda_root
        logical-volumes:
          - name: root
            size: 80%
            fstype: ext4
            mount: /
";

const DISKS_COMPUTE: &str = "\
---
  product:
    version: 2

  disk-models:
  - name: DISK_SET_COMPUTE
    volume-groups:
      - name: ardana-vg
        physical-volumes:
          - /dev/sda_root
        logical-volumes:
          - name: root
            size: 35%
            fstype: ext4
            mount: /
";

const NETWORKS: &str = "\
---
  product:
    version: 2

  networks:
    - name: MANAGEMENT-NET
      vlanid: 4
      tagged-vlan: false
      cidr: 192.168.10.0/24
      gateway-ip: 192.168.10.1
      network-group: MANAGEMENT

    - name: EXTERNAL-VM-NET
      vlanid: 102
      tagged-vlan: true
      network-group: EXTERNAL-VM
";

const SERVER_GROUPS: &str = "\
---
  product:
    version: 2

  server-groups:
    - name: CLOUD
      server-groups:
        - RACK1
        - RACK2
    - name: RACK1
      networks:
        - MANAGEMENT-NET
    - name: RACK2
      networks:
        - MANAGEMENT-NET
";

const NET_INTERFACES: &str = "\
---
  product:
    version: 2

  interface-models:
    - name: CONTROLLER-INTERFACES
      network-interfaces:
        - name: BOND0
          device:
            name: bond0
          network-groups:
            - MANAGEMENT

    - name: SWIFT-INTERFACES
      network-interfaces:
        - name: BOND0
          device:
            name: bond0
          network-groups:
            - MANAGEMENT
";

const NET_INTERFACES_COMPUTE: &str = "\
---
  product:
    version: 2

  interface-models:
    - name: COMPUTE-INTERFACES
      network-interfaces:
        - name: HW-ETH1
          device:
            name: hed1
          network-groups:
            - MANAGEMENT
";

const BAREMETAL: &str = "\
---
  product:
    version: 2

  baremetal:
    subnet: 192.168.10.0
    netmask: 255.255.255.0

  baremetal_servers:
    - node_name: controller1
      pxe_mac_addr: b2:72:8d:ac:7c:6f
      ilo_ip: 192.168.9.3
    - node_name: compute1
      pxe_mac_addr: d6:70:c1:36:43:f7
      ilo_ip: 192.168.9.6
";

const RINGS: &str = "\
---
  product:
    version: 2

  ring-specifications:
    - region-name: region1
      rings:
        - name: account
          display-name: Account Ring
          min-part-hours: 16
        - name: object-0
          display-name: General
          default: yes
";

const README: &str = "\
# Standard example model

Two controllers and one compute node on a single management network.
";

const SINGLE_PASS_THROUGH: &str = "\
---
  product:
    version: 2

  pass-through:
    global:
      esx_cloud: true
      thirdparty_folder: /opt/thirdparty
    servers:
      - id: controller1
        data:
          vmware:
            cert_check: false
";

const PASS_THROUGH_ESX1: &str = "\
---
  product:
    version: 2

  pass-through:
    global:
      esx_cloud1: true
";

const PASS_THROUGH_ESX2: &str = "\
---
  product:
    version: 2

  pass-through:
    global:
      esx_cloud2: true
";

/// Builder for a temporary model directory
#[derive(Debug, Clone, Default)]
pub struct ModelDirBuilder {
    files: Vec<(String, String)>,
}

impl ModelDirBuilder {
    /// Empty tree (no primary document)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Realistic fixture model named [`STANDARD_CLOUD`]
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_cloud_config(STANDARD_CLOUD)
            .file(SERVERS_FILE, SERVERS)
            .file(CONTROL_PLANE_FILE, CONTROL_PLANE)
            .file(DISKS_CONTROLLER_FILE, DISKS_CONTROLLER)
            .file(DISKS_COMPUTE_FILE, DISKS_COMPUTE)
            .file(NETWORKS_FILE, NETWORKS)
            .file(SERVER_GROUPS_FILE, SERVER_GROUPS)
            .file(NET_INTERFACES_FILE, NET_INTERFACES)
            .file(NET_INTERFACES_COMPUTE_FILE, NET_INTERFACES_COMPUTE)
            .file(BAREMETAL_FILE, BAREMETAL)
            .file(RINGS_FILE, RINGS)
            .file("README.md", README)
    }

    /// Primary document with the given cloud name
    #[must_use]
    pub fn with_cloud_config(self, name: &str) -> Self {
        let text = format!(
            "---\n  product:\n    version: 2\n\n  cloud:\n    name: {name}\n    hostname-data:\n      host-prefix: ardana\n      member-prefix: -m\n    ntp-servers:\n      - ntp-server1\n"
        );
        self.file(CLOUD_CONFIG, &text)
    }

    /// Pass-through held by a single file
    #[must_use]
    pub fn with_single_pass_through(self) -> Self {
        self.file(PASS_THROUGH_FILE, SINGLE_PASS_THROUGH)
    }

    /// Pass-through split over two files, one `global` key each
    #[must_use]
    pub fn with_split_pass_through(self) -> Self {
        self.file(PASS_THROUGH_ESX1_FILE, PASS_THROUGH_ESX1)
            .file(PASS_THROUGH_ESX2_FILE, PASS_THROUGH_ESX2)
    }

    /// Add or replace a file, path relative to the root with `/` separators
    #[must_use]
    pub fn file(mut self, relname: &str, text: &str) -> Self {
        self.files.retain(|(name, _)| name != relname);
        self.files.push((relname.to_string(), text.to_string()));
        self
    }

    /// Drop a file added earlier
    #[must_use]
    pub fn without(mut self, relname: &str) -> Self {
        self.files.retain(|(name, _)| name != relname);
        self
    }

    /// Write the tree into a fresh temporary directory
    ///
    /// # Panics
    /// Panics if the directory or a file cannot be created
    #[must_use]
    pub fn build(self) -> TempDir {
        let dir = tempfile::tempdir().expect("create temp model dir");
        write_tree(dir.path(), &self.files);
        dir
    }
}

fn write_tree(root: &Path, files: &[(String, String)]) {
    for (relname, text) in files {
        let path = relname.split('/').fold(root.to_path_buf(), |p, part| p.join(part));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture directory");
        }
        fs::write(&path, text).expect("write fixture file");
    }
}

/// Standard fixture in a temporary directory
#[must_use]
pub fn standard_model_dir() -> TempDir {
    ModelDirBuilder::standard().build()
}

/// Parse a YAML snippet
///
/// # Panics
/// Panics on invalid YAML
#[must_use]
pub fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).expect("valid YAML snippet")
}

/// Parsed content of a file below a root
///
/// # Panics
/// Panics if the file cannot be read or parsed
#[must_use]
pub fn read_yaml(root: &Path, relname: &str) -> Value {
    let text = fs::read_to_string(root.join(relname)).expect("read YAML file");
    yaml(&text)
}

/// Values of `field` across a list section
#[must_use]
pub fn field_values(list: &Value, field: &str) -> Vec<String> {
    list.as_sequence()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(field).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A server entity as the UI would add it
#[must_use]
pub fn server(id: &str) -> Value {
    yaml(&format!(
        "{{id: {id}, ip-addr: 192.168.10.99, role: COMPUTE-ROLE, server-group: RACK1}}"
    ))
}

/// A disk model entity
#[must_use]
pub fn disk_model(name: &str) -> Value {
    yaml(&format!(
        "{{name: {name}, volume-groups: [{{name: ardana-vg, physical-volumes: [/dev/sda_root]}}]}}"
    ))
}

/// An interface model entity
#[must_use]
pub fn interface_model(name: &str) -> Value {
    yaml(&format!(
        "{{name: {name}, network-interfaces: [{{name: BOND0, device: {{name: bond0}}}}]}}"
    ))
}
