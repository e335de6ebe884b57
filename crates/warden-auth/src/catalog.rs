//! Permission catalog: stored definitions merged with the system table.

use std::collections::HashSet;

use crate::error::{EntityKind, Result, WardenError};
use crate::store::{DefinitionFilter, PermissionStore};
use crate::system::SystemPermission;
use crate::types::{PermissionDefinition, Scope};

/// List the definitions visible in `scope`.
///
/// - `SpecificTeam`: the team's own definitions plus system permissions.
/// - `AnyTeam`: project-level team definitions plus system permissions.
/// - `Global`: global definitions only.
/// - `None`: every project-level definition plus system permissions; team
///   specific definitions are not included.
pub async fn list_definitions(
    store: &dyn PermissionStore,
    project_id: &str,
    scope: Option<&Scope>,
) -> Result<Vec<PermissionDefinition>> {
    let filter = match scope {
        Some(Scope::SpecificTeam { team_id }) => {
            if store.find_team(project_id, team_id).await?.is_none() {
                return Err(WardenError::not_found(EntityKind::Team, team_id.as_str()));
            }
            DefinitionFilter::Team(team_id.clone())
        }
        Some(Scope::AnyTeam) => DefinitionFilter::AnyTeam,
        Some(Scope::Global) => DefinitionFilter::Global,
        None => DefinitionFilter::ProjectLevel,
    };

    let mut definitions: Vec<PermissionDefinition> = store
        .find_definitions(project_id, &filter)
        .await?
        .into_iter()
        .map(PermissionDefinition::from)
        .collect();

    let include_system = !matches!(scope, Some(Scope::Global));
    if include_system {
        definitions.extend(SystemPermission::definitions());
    }
    definitions.sort_by(|a, b| a.id.cmp(&b.id));

    let scope_label = scope.map(ToString::to_string).unwrap_or_else(|| "all".into());
    tracing::debug!(
        project_id,
        scope = %scope_label,
        count = definitions.len(),
        "listed permission definitions"
    );
    Ok(definitions)
}

/// Definitions that a new or updated definition in `scope` may contain.
///
/// Global definitions may only contain global ones. Team definitions may
/// contain any-team definitions (system permissions included) and, for a
/// specific team, that team's own definitions whose id is not already taken
/// by an any-team one.
pub async fn list_potential_parents(
    store: &dyn PermissionStore,
    project_id: &str,
    scope: &Scope,
) -> Result<Vec<PermissionDefinition>> {
    match scope {
        Scope::Global => list_definitions(store, project_id, Some(&Scope::Global)).await,
        Scope::AnyTeam => list_definitions(store, project_id, Some(&Scope::AnyTeam)).await,
        Scope::SpecificTeam { .. } => {
            let mut parents = list_definitions(store, project_id, Some(&Scope::AnyTeam)).await?;
            let taken: HashSet<String> = parents.iter().map(|d| d.id.clone()).collect();
            let team_own = list_definitions(store, project_id, Some(scope)).await?;
            // An any-team definition wins an id collision with a team's own.
            // This also drops the second copy of each system permission.
            parents.extend(team_own.into_iter().filter(|d| !taken.contains(&d.id)));
            Ok(parents)
        }
    }
}
