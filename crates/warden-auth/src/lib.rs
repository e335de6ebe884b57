pub mod catalog;
pub mod closure;
pub mod config;
pub mod engine;
pub mod error;
pub mod mutator;
pub mod query;
pub mod store;
pub mod system;
pub mod types;
pub mod validate;

pub use closure::compute_closure;
pub use config::WardenConfig;
pub use engine::PermissionEngine;
pub use error::{EntityKind, WardenError};
pub use store::{PermissionStore, SqliteStore};
pub use system::SystemPermission;
pub use types::*;
