use anyhow::Result;
use std::path::Path;

use warden_auth::{NewPermission, PermissionPatch, Scope};

use super::{open_engine, print_definitions};

pub async fn list(base_dir: &Path, project: &str, scope: Option<&Scope>) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    let definitions = engine
        .list_server_permission_definitions(project, scope)
        .await?;
    print_definitions(&definitions);
    Ok(())
}

pub async fn create(
    base_dir: &Path,
    project: &str,
    scope: &Scope,
    id: &str,
    description: Option<String>,
    contain_ids: Vec<String>,
) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    let definition = engine
        .create_permission_definition(
            project,
            scope,
            &NewPermission {
                id: id.to_string(),
                description,
                contain_ids,
            },
        )
        .await?;
    println!("Created {} ({})", definition.id, definition.scope);
    Ok(())
}

pub async fn update(
    base_dir: &Path,
    project: &str,
    scope: &Scope,
    id: &str,
    patch: PermissionPatch,
) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    let definition = engine
        .update_permission_definition(project, scope, id, &patch)
        .await?;
    println!("Updated {} ({})", definition.id, definition.scope);
    Ok(())
}

pub async fn delete(base_dir: &Path, project: &str, scope: &Scope, id: &str) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    engine
        .delete_permission_definition(project, scope, id)
        .await?;
    println!("Deleted {id} ({scope})");
    Ok(())
}
