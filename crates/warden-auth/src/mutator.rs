//! Create, update and delete custom permission definitions.

use std::collections::HashSet;

use crate::catalog::{list_definitions, list_potential_parents};
use crate::error::{EntityKind, Result, WardenError};
use crate::store::{DefinitionUpdate, NewDefinition, PermissionStore};
use crate::system::SystemPermission;
use crate::types::*;
use crate::validate::validate_custom_permission_id;

async fn require_project(store: &dyn PermissionStore, project_id: &str) -> Result<Project> {
    store
        .find_project(project_id)
        .await?
        .ok_or_else(|| WardenError::not_found(EntityKind::Project, project_id))
}

async fn require_team(store: &dyn PermissionStore, project_id: &str, scope: &Scope) -> Result<()> {
    if let Scope::SpecificTeam { team_id } = scope {
        if store.find_team(project_id, team_id).await?.is_none() {
            return Err(WardenError::not_found(EntityKind::Team, team_id.as_str()));
        }
    }
    Ok(())
}

/// Resolve `contain_ids` against the parents allowed for `scope`.
///
/// An id that exists elsewhere in the project but not in the allowed set is a
/// scope violation; an id that exists nowhere is `NotFound`.
async fn resolve_parents(
    store: &dyn PermissionStore,
    project_id: &str,
    scope: &Scope,
    contain_ids: &[String],
) -> Result<Vec<PermissionRef>> {
    let potential = list_potential_parents(store, project_id, scope).await?;
    let mut project_level: Option<Vec<PermissionDefinition>> = None;
    let mut seen = HashSet::new();
    let mut parents = Vec::with_capacity(contain_ids.len());

    for parent_id in contain_ids {
        if !seen.insert(parent_id.as_str()) {
            continue;
        }
        if let Some(parent) = potential.iter().find(|p| &p.id == parent_id) {
            parents.push(parent.to_ref());
            continue;
        }

        if project_level.is_none() {
            project_level = Some(list_definitions(store, project_id, None).await?);
        }
        let elsewhere = project_level
            .as_deref()
            .and_then(|defs| defs.iter().find(|d| &d.id == parent_id));
        if let Some(other) = elsewhere {
            let parent_scope = if other.is_system() {
                "team".to_string()
            } else {
                other.scope.to_string()
            };
            tracing::warn!(project_id, %scope, %parent_id, "rejected cross-scope containment");
            return Err(WardenError::Validation(format!(
                "permission '{parent_id}' ({parent_scope}) cannot be contained by a {scope} permission"
            )));
        }

        tracing::warn!(project_id, %scope, %parent_id, "contained permission not found");
        return Err(WardenError::not_found(EntityKind::Permission, parent_id.as_str()));
    }

    Ok(parents)
}

pub async fn create(
    store: &dyn PermissionStore,
    project_id: &str,
    scope: &Scope,
    permission: &NewPermission,
) -> Result<PermissionDefinition> {
    validate_custom_permission_id(&permission.id)?;
    let project = require_project(store, project_id).await?;
    let parents = resolve_parents(store, project_id, scope, &permission.contain_ids).await?;

    let row = store
        .create_definition(
            &project,
            scope,
            &NewDefinition {
                id: permission.id.clone(),
                description: permission.description.clone(),
                parents,
            },
        )
        .await?;

    tracing::info!(
        project_id,
        %scope,
        permission_id = %row.id,
        contains = row.parents.len(),
        "created permission definition"
    );
    Ok(row.into())
}

/// Apply a partial update. When `contain_ids` is present the full edge set is
/// replaced with it; otherwise edges are left alone.
pub async fn update(
    store: &dyn PermissionStore,
    project_id: &str,
    scope: &Scope,
    permission_id: &str,
    patch: &PermissionPatch,
) -> Result<PermissionDefinition> {
    if let Some(ref new_id) = patch.id {
        validate_custom_permission_id(new_id)?;
    }
    let project = require_project(store, project_id).await?;
    require_team(store, project_id, scope).await?;

    let parents = match patch.contain_ids {
        Some(ref ids) => Some(resolve_parents(store, project_id, scope, ids).await?),
        None => None,
    };

    let update = DefinitionUpdate {
        id: patch.id.clone(),
        description: patch.description.clone(),
        parents,
    };
    let row = store
        .update_definition(&project, scope, permission_id, &update)
        .await?
        .ok_or_else(|| WardenError::not_found(EntityKind::Permission, permission_id))?;

    tracing::info!(
        project_id,
        %scope,
        permission_id,
        new_id = %row.id,
        edges_replaced = update.parents.is_some(),
        "updated permission definition"
    );
    Ok(row.into())
}

/// Delete a definition. References to it from other definitions and from
/// direct assignments are left in place.
pub async fn delete(
    store: &dyn PermissionStore,
    project_id: &str,
    scope: &Scope,
    permission_id: &str,
) -> Result<()> {
    if let Some(p) = SystemPermission::from_id(permission_id) {
        return Err(WardenError::Validation(format!(
            "system permission '{p}' cannot be deleted"
        )));
    }
    let project = require_project(store, project_id).await?;
    require_team(store, project_id, scope).await?;

    let deleted = store
        .delete_definitions(&project, scope, permission_id)
        .await?;
    if deleted < 1 {
        return Err(WardenError::not_found(EntityKind::Permission, permission_id));
    }

    tracing::info!(project_id, %scope, permission_id, "deleted permission definition");
    Ok(())
}
