//! Effective permission queries for a single member.

use std::collections::HashMap;

use crate::catalog::list_definitions;
use crate::closure::compute_closure;
use crate::error::{EntityKind, Result, WardenError};
use crate::store::PermissionStore;
use crate::types::*;

async fn direct_assignments(
    store: &dyn PermissionStore,
    project_id: &str,
    team_id: Option<&str>,
    user_id: &str,
) -> Result<Vec<AssignmentRow>> {
    store
        .find_direct_assignments(project_id, team_id, user_id)
        .await?
        .ok_or_else(|| WardenError::not_found(EntityKind::User, user_id))
}

/// Resolve each assignment to its full definition, in assignment order.
async fn resolve_assignments(
    store: &dyn PermissionStore,
    assignments: &[AssignmentRow],
) -> Result<Vec<PermissionDefinition>> {
    let keys: Vec<String> = assignments
        .iter()
        .filter_map(|a| match &a.permission {
            PermissionRef::Stored { internal_key, .. } => Some(internal_key.clone()),
            PermissionRef::System(_) => None,
        })
        .collect();
    let stored: HashMap<String, PermissionDefinition> = store
        .find_definitions_by_key(&keys)
        .await?
        .into_iter()
        .map(|row| (row.internal_key.clone(), PermissionDefinition::from(row)))
        .collect();

    assignments
        .iter()
        .map(|a| match &a.permission {
            PermissionRef::System(p) => Ok(p.definition()),
            PermissionRef::Stored { internal_key, id } => {
                stored.get(internal_key).cloned().ok_or_else(|| {
                    tracing::error!(
                        user_id = %a.user_id,
                        permission_id = %id,
                        "direct assignment references a deleted permission"
                    );
                    WardenError::Integrity(format!(
                        "direct assignment of user '{}' references missing permission '{id}'",
                        a.user_id
                    ))
                })
            }
        })
        .collect()
}

/// Definitions granted directly to the member whose own scope matches
/// `permission_type`.
pub async fn list_user_direct_permissions(
    store: &dyn PermissionStore,
    project_id: &str,
    team_id: Option<&str>,
    user_id: &str,
    permission_type: PermissionType,
) -> Result<Vec<PermissionDefinition>> {
    let assignments = direct_assignments(store, project_id, team_id, user_id).await?;
    let definitions = resolve_assignments(store, &assignments).await?;
    Ok(definitions
        .into_iter()
        .filter(|d| d.scope.matches(permission_type))
        .collect())
}

/// Every definition the member holds, directly or through containment.
///
/// Only grants whose own scope matches `permission_type` seed the closure;
/// grants of the other type are left out rather than reported.
pub async fn list_user_permissions_recursive(
    store: &dyn PermissionStore,
    project_id: &str,
    team_id: Option<&str>,
    user_id: &str,
    permission_type: PermissionType,
) -> Result<Vec<PermissionDefinition>> {
    let mut universe: HashMap<String, PermissionDefinition> = HashMap::new();
    match permission_type {
        PermissionType::Team => {
            if let Some(team_id) = team_id {
                let team_own =
                    list_definitions(store, project_id, Some(&Scope::specific_team(team_id)))
                        .await?;
                universe.extend(team_own.into_iter().map(|d| (d.id.clone(), d)));
            }
            // Any-team definitions win an id collision with a team's own.
            let any_team = list_definitions(store, project_id, Some(&Scope::AnyTeam)).await?;
            universe.extend(any_team.into_iter().map(|d| (d.id.clone(), d)));
        }
        PermissionType::Global => {
            let global = list_definitions(store, project_id, Some(&Scope::Global)).await?;
            universe.extend(global.into_iter().map(|d| (d.id.clone(), d)));
        }
    }

    let seeds: Vec<String> =
        list_user_direct_permissions(store, project_id, team_id, user_id, permission_type)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

    let closure = compute_closure(seeds, &universe)?;
    let mut result: Vec<PermissionDefinition> = closure
        .into_iter()
        .filter_map(|id| universe.remove(&id))
        .collect();
    result.sort_by(|a, b| a.id.cmp(&b.id));

    tracing::debug!(
        project_id,
        user_id,
        permission_type = %permission_type,
        count = result.len(),
        "resolved effective permissions"
    );
    Ok(result)
}
