use anyhow::Result;
use std::path::Path;

use warden_auth::PermissionType;

use super::{open_engine, print_definitions};

pub async fn run(
    base_dir: &Path,
    project: &str,
    team: Option<&str>,
    user: &str,
    permission_type: PermissionType,
    direct: bool,
    json: bool,
) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    let definitions = if direct {
        engine
            .list_user_direct_permissions(project, team, user, permission_type)
            .await?
    } else {
        engine
            .list_user_permission_definitions_recursive(project, team, user, permission_type)
            .await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
    } else {
        print_definitions(&definitions);
    }
    Ok(())
}
