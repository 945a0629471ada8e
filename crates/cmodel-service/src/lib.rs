//! Cloud Model Service
//!
//! Collaborator surface around the synchronization engine:
//!
//! - **Config**: [`ServiceConfig`] loaded from TOML
//! - **Store**: [`ModelStore`] serializing reads and writes per directory
//! - **CLI**: the `cmodel` binary (`read`, `write`, `check`)

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod store;

pub use config::ServiceConfig;
pub use error::{ConfigError, ServiceError, ServiceResult};
pub use store::ModelStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
