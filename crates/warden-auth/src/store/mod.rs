pub mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::WardenError;
use crate::types::*;

/// Which stored definitions a catalog read wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionFilter {
    /// Every definition not attached to a team (global and any-team).
    ProjectLevel,
    Global,
    AnyTeam,
    Team(String),
}

/// A definition to insert, with parents already resolved.
#[derive(Debug, Clone)]
pub struct NewDefinition {
    pub id: String,
    pub description: Option<String>,
    pub parents: Vec<PermissionRef>,
}

/// Fields to change. `parents: Some(_)` replaces the whole edge set.
#[derive(Debug, Clone, Default)]
pub struct DefinitionUpdate {
    pub id: Option<String>,
    pub description: Option<String>,
    pub parents: Option<Vec<PermissionRef>>,
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    // Tenancy
    async fn find_project(&self, project_id: &str) -> Result<Option<Project>, WardenError>;
    async fn find_team(&self, project_id: &str, team_id: &str)
    -> Result<Option<Team>, WardenError>;

    // Definitions
    async fn find_definitions(
        &self,
        project_id: &str,
        filter: &DefinitionFilter,
    ) -> Result<Vec<DefinitionRow>, WardenError>;
    async fn find_definitions_by_key(
        &self,
        internal_keys: &[String],
    ) -> Result<Vec<DefinitionRow>, WardenError>;
    async fn create_definition(
        &self,
        project: &Project,
        scope: &Scope,
        definition: &NewDefinition,
    ) -> Result<DefinitionRow, WardenError>;
    /// Returns `None` when no definition matches `(project, scope, id)`.
    async fn update_definition(
        &self,
        project: &Project,
        scope: &Scope,
        id: &str,
        update: &DefinitionUpdate,
    ) -> Result<Option<DefinitionRow>, WardenError>;
    /// Returns the number of rows deleted. Edges and assignments that point
    /// at the deleted rows are left in place.
    async fn delete_definitions(
        &self,
        project: &Project,
        scope: &Scope,
        id: &str,
    ) -> Result<u64, WardenError>;

    // Direct assignments
    /// `None` when the membership does not exist. A `None` team addresses the
    /// user's project-level membership.
    async fn find_direct_assignments(
        &self,
        project_id: &str,
        team_id: Option<&str>,
        user_id: &str,
    ) -> Result<Option<Vec<AssignmentRow>>, WardenError>;

    // Administration
    async fn create_project(&self, project_id: &str) -> Result<Project, WardenError>;
    async fn create_team(&self, project_id: &str, team_id: &str) -> Result<Team, WardenError>;
    async fn add_project_user(&self, project_id: &str, user_id: &str) -> Result<(), WardenError>;
    async fn add_team_member(
        &self,
        project_id: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(), WardenError>;
    async fn remove_team_member(
        &self,
        project_id: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(), WardenError>;
    async fn grant_permission(
        &self,
        project_id: &str,
        team_id: Option<&str>,
        user_id: &str,
        permission: &PermissionRef,
    ) -> Result<(), WardenError>;
    async fn revoke_permission(
        &self,
        project_id: &str,
        team_id: Option<&str>,
        user_id: &str,
        permission: &PermissionRef,
    ) -> Result<(), WardenError>;

    // Lifecycle
    async fn migrate(&self) -> Result<(), WardenError>;
}
