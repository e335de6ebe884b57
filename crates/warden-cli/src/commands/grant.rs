use anyhow::Result;
use std::path::Path;

use warden_auth::{
    EntityKind, PermissionDefinition, PermissionEngine, PermissionStore, Scope, WardenError,
    catalog::list_potential_parents, validate::validate_permission_ref_id,
};

use super::open_engine;

/// Find the definition a grant names. A team grant draws from the same
/// universe a team definition may contain; a project-level grant draws from
/// the global definitions.
async fn resolve(
    engine: &PermissionEngine,
    project: &str,
    team: Option<&str>,
    permission: &str,
) -> Result<PermissionDefinition, WardenError> {
    validate_permission_ref_id(permission)?;
    let universe = match team {
        Some(team) => {
            list_potential_parents(engine.store().as_ref(), project, &Scope::specific_team(team))
                .await?
        }
        None => {
            engine
                .list_server_permission_definitions(project, Some(&Scope::Global))
                .await?
        }
    };
    if let Some(d) = universe.into_iter().find(|d| d.id == permission) {
        return Ok(d);
    }

    let elsewhere = engine
        .list_server_permission_definitions(project, None)
        .await?
        .into_iter()
        .any(|d| d.id == permission);
    if elsewhere {
        let target = match team {
            Some(team) => format!("team '{team}'"),
            None => "a project-level membership".to_string(),
        };
        return Err(WardenError::Validation(format!(
            "permission '{permission}' cannot be granted on {target}"
        )));
    }
    Err(WardenError::not_found(EntityKind::Permission, permission))
}

pub async fn grant(
    base_dir: &Path,
    project: &str,
    team: Option<&str>,
    user: &str,
    permission: &str,
) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    let definition = resolve(&engine, project, team, permission).await?;
    engine
        .store()
        .grant_permission(project, team, user, &definition.to_ref())
        .await?;
    tracing::info!(project, user, permission, "granted permission");
    println!("Granted {} to {user}", definition.id);
    Ok(())
}

pub async fn revoke(
    base_dir: &Path,
    project: &str,
    team: Option<&str>,
    user: &str,
    permission: &str,
) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    let definition = resolve(&engine, project, team, permission).await?;
    engine
        .store()
        .revoke_permission(project, team, user, &definition.to_ref())
        .await?;
    tracing::info!(project, user, permission, "revoked permission");
    println!("Revoked {} from {user}", definition.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warden_auth::{NewPermission, SqliteStore};

    async fn engine() -> PermissionEngine {
        let store = SqliteStore::open_in_memory().unwrap();
        store.migrate().await.unwrap();
        store.create_project("p").await.unwrap();
        store.create_team("p", "t").await.unwrap();
        store.create_team("p", "other").await.unwrap();
        let engine = PermissionEngine::new(Arc::new(store));
        for (scope, id) in [
            (Scope::Global, "billing"),
            (Scope::AnyTeam, "editor"),
            (Scope::specific_team("t"), "lead"),
            (Scope::specific_team("other"), "outsider"),
        ] {
            engine
                .create_permission_definition(
                    "p",
                    &scope,
                    &NewPermission {
                        id: id.to_string(),
                        description: None,
                        contain_ids: vec![],
                    },
                )
                .await
                .unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn team_grant_resolves_team_and_any_team_definitions() {
        let engine = engine().await;
        for id in ["lead", "editor", "$read_members"] {
            let d = resolve(&engine, "p", Some("t"), id).await.unwrap();
            assert_eq!(d.id, id);
        }
    }

    #[tokio::test]
    async fn team_grant_rejects_global_definitions() {
        let engine = engine().await;
        let err = resolve(&engine, "p", Some("t"), "billing").await.unwrap_err();
        assert!(matches!(err, WardenError::Validation(_)));
    }

    #[tokio::test]
    async fn project_level_grant_only_resolves_global_definitions() {
        let engine = engine().await;
        assert_eq!(resolve(&engine, "p", None, "billing").await.unwrap().id, "billing");
        for id in ["$read_members", "editor"] {
            let err = resolve(&engine, "p", None, id).await.unwrap_err();
            assert!(matches!(err, WardenError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn unknown_or_foreign_team_permission_is_not_found() {
        let engine = engine().await;
        let err = resolve(&engine, "p", Some("t"), "outsider").await.unwrap_err();
        assert!(matches!(err, WardenError::NotFound { kind: EntityKind::Permission, .. }));
        let err = resolve(&engine, "p", None, "ghost").await.unwrap_err();
        assert!(matches!(err, WardenError::NotFound { kind: EntityKind::Permission, .. }));
    }

    #[tokio::test]
    async fn malformed_permission_id_is_rejected() {
        let engine = engine().await;
        let err = resolve(&engine, "p", None, "Bad Id").await.unwrap_err();
        assert!(matches!(err, WardenError::Validation(_)));
    }
}
