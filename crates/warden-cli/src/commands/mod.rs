pub mod effective;
pub mod grant;
pub mod init;
pub mod perm;
pub mod tenancy;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use warden_auth::{PermissionDefinition, PermissionEngine, PermissionStore, SqliteStore, WardenConfig};

/// Load config, open the database and wrap it in an engine.
pub async fn open_engine(base_dir: &Path) -> Result<PermissionEngine> {
    let config_path = WardenConfig::default_path(base_dir);
    let config = WardenConfig::load(&config_path)?;
    let store = SqliteStore::open(&config.warden.db_path)?;
    store.migrate().await?;
    Ok(PermissionEngine::new(Arc::new(store)))
}

pub fn print_definitions(definitions: &[PermissionDefinition]) {
    if definitions.is_empty() {
        println!("No permissions found.");
        return;
    }

    println!(
        "{:<28} {:<16} {:<40} {}",
        "ID", "SCOPE", "CONTAINS", "DESCRIPTION"
    );
    println!("{}", "-".repeat(110));

    for d in definitions {
        let contains = d
            .contained_ids
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<28} {:<16} {:<40} {}",
            d.id,
            d.scope.to_string(),
            contains,
            d.description.as_deref().unwrap_or(""),
        );
    }
}
