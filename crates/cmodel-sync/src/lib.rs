//! Cloud Model Synchronization Engine
//!
//! Two-way mapping between a directory tree of YAML documents describing a
//! cloud deployment and a single in-memory model.
//!
//! # Core Operations
//!
//! - **Read**: Merge every document below a model root into a [`Model`],
//!   remembering which file contributed which section
//! - **Write**: Put an edited input model back into the same files, touching
//!   only files whose content changed, and report a status per file
//!
//! # Architecture
//!
//! ```text
//! model tree → ModelLoader → Model { inputModel, fileInfo } → edit
//!                                                           ↓
//! model tree ← write_file ← ModelWriter ← inputModel + original fileInfo
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cmodel_sync::prelude::*;
//!
//! let mut model = read_model("/var/lib/cloud/model")?;
//! if let Some(serde_yaml::Value::Sequence(servers)) = model.input_model.get_mut("servers") {
//!     servers.push(serde_yaml::from_str("{id: compute-9, role: COMPUTE-ROLE}")?);
//! }
//! let report = model.write_to(Path::new("/var/lib/cloud/model"), WriteOptions::default())?;
//! assert_eq!(report.status("data/servers.yml"), Some(FileStatus::Changed));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod document;
pub mod error;
pub mod file_io;
pub mod key_field;
pub mod layout;
pub mod loader;
pub mod model;
pub mod pass_through;
pub mod writer;

mod finalize;

// Re-exports for convenience
pub use error::{KeyFieldError, ReadError, SyncError, SyncResult, WriteError};
pub use file_io::write_file;
pub use key_field::KeyField;
pub use loader::{read_model, ModelLoader};
pub use model::{ChangeReport, FileChange, FileInfo, FileStatus, InputModel, Model, SectionRef};
pub use writer::{check_model, write_model, WriteOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for reading and writing model trees
    pub use crate::error::{ReadError, SyncError, SyncResult, WriteError};
    pub use crate::loader::{read_model, ModelLoader};
    pub use crate::model::{ChangeReport, FileInfo, FileStatus, InputModel, Model, SectionRef};
    pub use crate::writer::{check_model, write_model, WriteOptions};
    pub use std::path::Path;
}
