use std::sync::Arc;

use crate::error::Result;
use crate::store::PermissionStore;
use crate::types::*;
use crate::{catalog, mutator, query};

/// Entry point for callers: the six permission operations over a shared store.
///
/// Holds no state besides the store handle; every call reads a fresh snapshot.
#[derive(Clone)]
pub struct PermissionEngine {
    store: Arc<dyn PermissionStore>,
}

impl PermissionEngine {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PermissionStore> {
        &self.store
    }

    pub async fn list_server_permission_definitions(
        &self,
        project_id: &str,
        scope: Option<&Scope>,
    ) -> Result<Vec<PermissionDefinition>> {
        catalog::list_definitions(self.store.as_ref(), project_id, scope).await
    }

    pub async fn list_user_permission_definitions_recursive(
        &self,
        project_id: &str,
        team_id: Option<&str>,
        user_id: &str,
        permission_type: PermissionType,
    ) -> Result<Vec<PermissionDefinition>> {
        query::list_user_permissions_recursive(
            self.store.as_ref(),
            project_id,
            team_id,
            user_id,
            permission_type,
        )
        .await
    }

    pub async fn list_user_direct_permissions(
        &self,
        project_id: &str,
        team_id: Option<&str>,
        user_id: &str,
        permission_type: PermissionType,
    ) -> Result<Vec<PermissionDefinition>> {
        query::list_user_direct_permissions(
            self.store.as_ref(),
            project_id,
            team_id,
            user_id,
            permission_type,
        )
        .await
    }

    pub async fn create_permission_definition(
        &self,
        project_id: &str,
        scope: &Scope,
        permission: &NewPermission,
    ) -> Result<PermissionDefinition> {
        mutator::create(self.store.as_ref(), project_id, scope, permission).await
    }

    pub async fn update_permission_definition(
        &self,
        project_id: &str,
        scope: &Scope,
        permission_id: &str,
        patch: &PermissionPatch,
    ) -> Result<PermissionDefinition> {
        mutator::update(self.store.as_ref(), project_id, scope, permission_id, patch).await
    }

    pub async fn delete_permission_definition(
        &self,
        project_id: &str,
        scope: &Scope,
        permission_id: &str,
    ) -> Result<()> {
        mutator::delete(self.store.as_ref(), project_id, scope, permission_id).await
    }
}
