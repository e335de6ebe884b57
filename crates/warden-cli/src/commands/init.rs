use anyhow::Result;
use std::path::Path;

use warden_auth::{PermissionStore, SqliteStore, WardenConfig};

pub async fn run(base_dir: &Path) -> Result<()> {
    println!("Initializing Warden in {}", base_dir.display());

    std::fs::create_dir_all(base_dir)?;

    let config_path = WardenConfig::default_path(base_dir);
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        let config = WardenConfig::default_config(base_dir);
        config.save(&config_path)?;
        println!("Created config: {}", config_path.display());
    }

    let config = WardenConfig::load(&config_path)?;
    let store = SqliteStore::open(&config.warden.db_path)?;
    store.migrate().await?;
    println!("Initialized database: {}", config.warden.db_path);

    println!("\nWarden initialized. Next steps:");
    println!("  1. Run `warden project create <project>`");
    println!("  2. Run `warden perm create <project> <id> --scope any-team` to define permissions");

    Ok(())
}
