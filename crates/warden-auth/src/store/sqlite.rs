use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use super::{DefinitionFilter, DefinitionUpdate, NewDefinition, PermissionStore};
use crate::error::{EntityKind, WardenError};
use crate::system::SystemPermission;
use crate::types::*;

// SQLITE_CONSTRAINT_PRIMARYKEY / SQLITE_CONSTRAINT_UNIQUE
const CONSTRAINT_PRIMARYKEY: i32 = 1555;
const CONSTRAINT_UNIQUE: i32 = 2067;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &str) -> Result<Self, WardenError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> Result<Self, WardenError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self::new(conn))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, WardenError> {
        self.conn
            .lock()
            .map_err(|_| WardenError::Internal("sqlite connection lock poisoned".into()))
    }
}

const MIGRATE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS teams (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (project_id, id)
);

CREATE TABLE IF NOT EXISTS project_users (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (project_id, user_id)
);

CREATE TABLE IF NOT EXISTS team_members (
    project_id TEXT NOT NULL,
    team_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (project_id, team_id, user_id),
    FOREIGN KEY (project_id, team_id) REFERENCES teams(project_id, id) ON DELETE CASCADE,
    FOREIGN KEY (project_id, user_id) REFERENCES project_users(project_id, user_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS permissions (
    db_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    team_id TEXT,
    queryable_id TEXT NOT NULL,
    scope TEXT NOT NULL CHECK (scope IN ('global', 'team')),
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (team_id IS NULL OR scope = 'team'),
    FOREIGN KEY (project_id, team_id) REFERENCES teams(project_id, id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS permissions_project_level_id
    ON permissions(project_id, queryable_id) WHERE team_id IS NULL;
CREATE UNIQUE INDEX IF NOT EXISTS permissions_team_level_id
    ON permissions(project_id, team_id, queryable_id) WHERE team_id IS NOT NULL;

-- Parent targets carry no foreign key: deleting a definition leaves edges
-- that point at it in place.
CREATE TABLE IF NOT EXISTS permission_edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    child_db_id TEXT NOT NULL REFERENCES permissions(db_id) ON DELETE CASCADE,
    parent_db_id TEXT,
    parent_queryable_id TEXT,
    parent_system_permission TEXT,
    CHECK ((parent_db_id IS NULL) = (parent_queryable_id IS NULL)),
    CHECK ((parent_db_id IS NULL) <> (parent_system_permission IS NULL))
);

CREATE INDEX IF NOT EXISTS permission_edges_child ON permission_edges(child_db_id);

CREATE TABLE IF NOT EXISTS direct_assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    team_id TEXT,
    user_id TEXT NOT NULL,
    permission_db_id TEXT,
    permission_queryable_id TEXT,
    system_permission TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK ((permission_db_id IS NULL) = (permission_queryable_id IS NULL)),
    CHECK ((permission_db_id IS NULL) <> (system_permission IS NULL)),
    FOREIGN KEY (project_id, user_id) REFERENCES project_users(project_id, user_id) ON DELETE CASCADE,
    FOREIGN KEY (project_id, team_id, user_id) REFERENCES team_members(project_id, team_id, user_id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS direct_assignments_unique
    ON direct_assignments(
        project_id,
        COALESCE(team_id, ''),
        user_id,
        COALESCE(permission_db_id, system_permission)
    );
"#;

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    if let rusqlite::Error::SqliteFailure(err, _) = e {
        return err.extended_code == CONSTRAINT_UNIQUE
            || err.extended_code == CONSTRAINT_PRIMARYKEY;
    }
    false
}

fn map_duplicate(e: rusqlite::Error, what: impl FnOnce() -> String) -> WardenError {
    if is_unique_violation(&e) {
        WardenError::Duplicate(what())
    } else {
        WardenError::Database(e.to_string())
    }
}

fn system_from_column(name: &str) -> Result<SystemPermission, WardenError> {
    SystemPermission::from_name(name)
        .ok_or_else(|| WardenError::Integrity(format!("unknown system permission '{name}'")))
}

/// Build a ref from the nullable dual columns of an edge or assignment row.
fn permission_ref(
    db_id: Option<String>,
    queryable_id: Option<String>,
    system: Option<String>,
) -> Result<PermissionRef, WardenError> {
    match (db_id, queryable_id, system) {
        (Some(internal_key), Some(id), None) => Ok(PermissionRef::Stored { internal_key, id }),
        (None, None, Some(name)) => Ok(PermissionRef::System(system_from_column(&name)?)),
        _ => Err(WardenError::Integrity(
            "permission reference must name exactly one stored or system permission".into(),
        )),
    }
}

fn ref_columns(r: &PermissionRef) -> (Option<&str>, Option<&str>, Option<&'static str>) {
    match r {
        PermissionRef::Stored { internal_key, id } => {
            (Some(internal_key.as_str()), Some(id.as_str()), None)
        }
        PermissionRef::System(p) => (None, None, Some(p.name())),
    }
}

fn scope_from_columns(scope: &str, team_id: Option<String>) -> Result<Scope, WardenError> {
    match (scope, team_id) {
        ("global", None) => Ok(Scope::Global),
        ("team", None) => Ok(Scope::AnyTeam),
        ("team", Some(team_id)) => Ok(Scope::SpecificTeam { team_id }),
        (other, _) => Err(WardenError::Integrity(format!(
            "invalid stored permission scope '{other}'"
        ))),
    }
}

fn scope_column(scope: &Scope) -> &'static str {
    match scope {
        Scope::Global => "global",
        Scope::AnyTeam | Scope::SpecificTeam { .. } => "team",
    }
}

fn load_parents(conn: &Connection, db_id: &str) -> Result<Vec<PermissionRef>, WardenError> {
    let mut stmt = conn.prepare(
        "SELECT e.parent_db_id, COALESCE(p.queryable_id, e.parent_queryable_id), e.parent_system_permission
         FROM permission_edges e
         LEFT JOIN permissions p ON p.db_id = e.parent_db_id
         WHERE e.child_db_id = ?1
         ORDER BY e.id",
    )?;
    let raw = stmt
        .query_map([db_id], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter()
        .map(|(db_id, queryable_id, system)| permission_ref(db_id, queryable_id, system))
        .collect()
}

type RawDefinition = (String, String, String, Option<String>, Option<String>);

const DEFINITION_COLUMNS: &str = "db_id, queryable_id, scope, team_id, description";

fn load_definitions(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<DefinitionRow>, WardenError> {
    let sql = format!(
        "SELECT {DEFINITION_COLUMNS} FROM permissions WHERE {where_clause} ORDER BY queryable_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw: Vec<RawDefinition> = stmt
        .query_map(params, |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(internal_key, id, scope, team_id, description)| {
            let parents = load_parents(conn, &internal_key)?;
            Ok(DefinitionRow {
                scope: scope_from_columns(&scope, team_id)?,
                internal_key,
                id,
                description,
                parents,
            })
        })
        .collect()
}

fn load_definition(conn: &Connection, db_id: &str) -> Result<Option<DefinitionRow>, WardenError> {
    Ok(load_definitions(conn, "db_id = ?1", &[&db_id])?.into_iter().next())
}

fn insert_edges(
    conn: &Connection,
    child_db_id: &str,
    parents: &[PermissionRef],
) -> Result<(), WardenError> {
    let mut stmt = conn.prepare(
        "INSERT INTO permission_edges (child_db_id, parent_db_id, parent_queryable_id, parent_system_permission)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for parent in parents {
        let (db_id, queryable_id, system) = ref_columns(parent);
        stmt.execute(params![child_db_id, db_id, queryable_id, system])?;
    }
    Ok(())
}

/// Locate a definition for update. Project-level lookups also match the
/// scope kind so a global definition is never edited through `AnyTeam`.
fn find_definition_key(
    conn: &Connection,
    project_id: &str,
    scope: &Scope,
    id: &str,
) -> Result<Option<String>, WardenError> {
    let key = match scope {
        Scope::SpecificTeam { team_id } => conn
            .query_row(
                "SELECT db_id FROM permissions
                 WHERE project_id = ?1 AND team_id = ?2 AND queryable_id = ?3",
                params![project_id, team_id, id],
                |row| row.get(0),
            )
            .optional()?,
        Scope::Global | Scope::AnyTeam => conn
            .query_row(
                "SELECT db_id FROM permissions
                 WHERE project_id = ?1 AND team_id IS NULL AND scope = ?2 AND queryable_id = ?3",
                params![project_id, scope_column(scope), id],
                |row| row.get(0),
            )
            .optional()?,
    };
    Ok(key)
}

fn membership_exists(
    conn: &Connection,
    project_id: &str,
    team_id: Option<&str>,
    user_id: &str,
) -> Result<bool, WardenError> {
    let found = match team_id {
        Some(team_id) => conn
            .query_row(
                "SELECT 1 FROM team_members WHERE project_id = ?1 AND team_id = ?2 AND user_id = ?3",
                params![project_id, team_id, user_id],
                |_| Ok(()),
            )
            .optional()?,
        None => conn
            .query_row(
                "SELECT 1 FROM project_users WHERE project_id = ?1 AND user_id = ?2",
                params![project_id, user_id],
                |_| Ok(()),
            )
            .optional()?,
    };
    Ok(found.is_some())
}

fn get_project(conn: &Connection, project_id: &str) -> Result<Option<Project>, WardenError> {
    Ok(conn
        .query_row(
            "SELECT id, created_at FROM projects WHERE id = ?1",
            [project_id],
            |row| {
                Ok(Project {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                })
            },
        )
        .optional()?)
}

fn get_team(
    conn: &Connection,
    project_id: &str,
    team_id: &str,
) -> Result<Option<Team>, WardenError> {
    Ok(conn
        .query_row(
            "SELECT project_id, id, created_at FROM teams WHERE project_id = ?1 AND id = ?2",
            params![project_id, team_id],
            |row| {
                Ok(Team {
                    project_id: row.get(0)?,
                    id: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?)
}

#[async_trait]
impl PermissionStore for SqliteStore {
    async fn migrate(&self) -> Result<(), WardenError> {
        let conn = self.conn()?;
        conn.execute_batch(MIGRATE_SQL)?;
        Ok(())
    }

    // --- Tenancy ---

    async fn find_project(&self, project_id: &str) -> Result<Option<Project>, WardenError> {
        let conn = self.conn()?;
        get_project(&conn, project_id)
    }

    async fn find_team(
        &self,
        project_id: &str,
        team_id: &str,
    ) -> Result<Option<Team>, WardenError> {
        let conn = self.conn()?;
        get_team(&conn, project_id, team_id)
    }

    // --- Definitions ---

    async fn find_definitions(
        &self,
        project_id: &str,
        filter: &DefinitionFilter,
    ) -> Result<Vec<DefinitionRow>, WardenError> {
        let conn = self.conn()?;
        match filter {
            DefinitionFilter::ProjectLevel => {
                load_definitions(&conn, "project_id = ?1 AND team_id IS NULL", &[&project_id])
            }
            DefinitionFilter::Global => load_definitions(
                &conn,
                "project_id = ?1 AND team_id IS NULL AND scope = 'global'",
                &[&project_id],
            ),
            DefinitionFilter::AnyTeam => load_definitions(
                &conn,
                "project_id = ?1 AND team_id IS NULL AND scope = 'team'",
                &[&project_id],
            ),
            DefinitionFilter::Team(team_id) => load_definitions(
                &conn,
                "project_id = ?1 AND team_id = ?2",
                &[&project_id, team_id],
            ),
        }
    }

    async fn find_definitions_by_key(
        &self,
        internal_keys: &[String],
    ) -> Result<Vec<DefinitionRow>, WardenError> {
        let conn = self.conn()?;
        let mut rows = Vec::with_capacity(internal_keys.len());
        for key in internal_keys {
            if let Some(row) = load_definition(&conn, key)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn create_definition(
        &self,
        project: &Project,
        scope: &Scope,
        definition: &NewDefinition,
    ) -> Result<DefinitionRow, WardenError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let db_id = uuid::Uuid::now_v7().to_string();
        tx.execute(
            "INSERT INTO permissions (db_id, project_id, team_id, queryable_id, scope, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                db_id,
                project.id,
                scope.team_id(),
                definition.id,
                scope_column(scope),
                definition.description,
            ],
        )
        .map_err(|e| {
            map_duplicate(e, || {
                format!("permission '{}' already exists in {scope}", definition.id)
            })
        })?;
        insert_edges(&tx, &db_id, &definition.parents)?;
        let row = load_definition(&tx, &db_id)?
            .ok_or_else(|| WardenError::Internal("inserted permission not readable".into()))?;
        tx.commit()?;
        Ok(row)
    }

    async fn update_definition(
        &self,
        project: &Project,
        scope: &Scope,
        id: &str,
        update: &DefinitionUpdate,
    ) -> Result<Option<DefinitionRow>, WardenError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let Some(db_id) = find_definition_key(&tx, &project.id, scope, id)? else {
            return Ok(None);
        };

        if let Some(ref new_id) = update.id {
            tx.execute(
                "UPDATE permissions SET queryable_id = ?1 WHERE db_id = ?2",
                params![new_id, db_id],
            )
            .map_err(|e| {
                map_duplicate(e, || format!("permission '{new_id}' already exists in {scope}"))
            })?;
            // Keep last-known ids current for references that may later dangle.
            tx.execute(
                "UPDATE permission_edges SET parent_queryable_id = ?1 WHERE parent_db_id = ?2",
                params![new_id, db_id],
            )?;
            tx.execute(
                "UPDATE direct_assignments SET permission_queryable_id = ?1 WHERE permission_db_id = ?2",
                params![new_id, db_id],
            )?;
        }
        if let Some(ref description) = update.description {
            tx.execute(
                "UPDATE permissions SET description = ?1 WHERE db_id = ?2",
                params![description, db_id],
            )?;
        }
        if let Some(ref parents) = update.parents {
            tx.execute(
                "DELETE FROM permission_edges WHERE child_db_id = ?1",
                [&db_id],
            )?;
            insert_edges(&tx, &db_id, parents)?;
        }

        let row = load_definition(&tx, &db_id)?;
        tx.commit()?;
        Ok(row)
    }

    async fn delete_definitions(
        &self,
        project: &Project,
        scope: &Scope,
        id: &str,
    ) -> Result<u64, WardenError> {
        let conn = self.conn()?;
        let changed = match scope {
            Scope::SpecificTeam { team_id } => conn.execute(
                "DELETE FROM permissions WHERE project_id = ?1 AND team_id = ?2 AND queryable_id = ?3",
                params![project.id, team_id, id],
            )?,
            Scope::Global | Scope::AnyTeam => conn.execute(
                "DELETE FROM permissions WHERE project_id = ?1 AND team_id IS NULL AND queryable_id = ?2",
                params![project.id, id],
            )?,
        };
        Ok(changed as u64)
    }

    // --- Direct assignments ---

    async fn find_direct_assignments(
        &self,
        project_id: &str,
        team_id: Option<&str>,
        user_id: &str,
    ) -> Result<Option<Vec<AssignmentRow>>, WardenError> {
        let conn = self.conn()?;
        if !membership_exists(&conn, project_id, team_id, user_id)? {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            "SELECT a.team_id, a.user_id, a.permission_db_id,
                    COALESCE(p.queryable_id, a.permission_queryable_id), a.system_permission
             FROM direct_assignments a
             LEFT JOIN permissions p ON p.db_id = a.permission_db_id
             WHERE a.project_id = ?1 AND a.team_id IS ?2 AND a.user_id = ?3
             ORDER BY a.id",
        )?;
        let raw = stmt
            .query_map(params![project_id, team_id, user_id], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(team_id, user_id, db_id, queryable_id, system)| {
                Ok(AssignmentRow {
                    team_id,
                    user_id,
                    permission: permission_ref(db_id, queryable_id, system)?,
                })
            })
            .collect::<Result<Vec<_>, WardenError>>()
            .map(Some)
    }

    // --- Administration ---

    async fn create_project(&self, project_id: &str) -> Result<Project, WardenError> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO projects (id) VALUES (?1)", [project_id])
            .map_err(|e| map_duplicate(e, || format!("project '{project_id}' already exists")))?;
        get_project(&conn, project_id)?
            .ok_or_else(|| WardenError::Internal("inserted project not readable".into()))
    }

    async fn create_team(&self, project_id: &str, team_id: &str) -> Result<Team, WardenError> {
        let conn = self.conn()?;
        if get_project(&conn, project_id)?.is_none() {
            return Err(WardenError::not_found(EntityKind::Project, project_id));
        }
        conn.execute(
            "INSERT INTO teams (project_id, id) VALUES (?1, ?2)",
            params![project_id, team_id],
        )
        .map_err(|e| map_duplicate(e, || format!("team '{team_id}' already exists")))?;
        get_team(&conn, project_id, team_id)?
            .ok_or_else(|| WardenError::Internal("inserted team not readable".into()))
    }

    async fn add_project_user(&self, project_id: &str, user_id: &str) -> Result<(), WardenError> {
        let conn = self.conn()?;
        if get_project(&conn, project_id)?.is_none() {
            return Err(WardenError::not_found(EntityKind::Project, project_id));
        }
        conn.execute(
            "INSERT OR IGNORE INTO project_users (project_id, user_id) VALUES (?1, ?2)",
            params![project_id, user_id],
        )?;
        Ok(())
    }

    async fn add_team_member(
        &self,
        project_id: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(), WardenError> {
        let mut conn = self.conn()?;
        if get_team(&conn, project_id, team_id)?.is_none() {
            return Err(WardenError::not_found(EntityKind::Team, team_id));
        }
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO project_users (project_id, user_id) VALUES (?1, ?2)",
            params![project_id, user_id],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO team_members (project_id, team_id, user_id) VALUES (?1, ?2, ?3)",
            params![project_id, team_id, user_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn remove_team_member(
        &self,
        project_id: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(), WardenError> {
        let conn = self.conn()?;
        // Direct assignments for the membership go with it (ON DELETE CASCADE).
        let changed = conn.execute(
            "DELETE FROM team_members WHERE project_id = ?1 AND team_id = ?2 AND user_id = ?3",
            params![project_id, team_id, user_id],
        )?;
        if changed == 0 {
            return Err(WardenError::not_found(EntityKind::User, user_id));
        }
        Ok(())
    }

    async fn grant_permission(
        &self,
        project_id: &str,
        team_id: Option<&str>,
        user_id: &str,
        permission: &PermissionRef,
    ) -> Result<(), WardenError> {
        let conn = self.conn()?;
        if !membership_exists(&conn, project_id, team_id, user_id)? {
            return Err(WardenError::not_found(EntityKind::User, user_id));
        }
        let (db_id, queryable_id, system) = ref_columns(permission);
        conn.execute(
            "INSERT OR IGNORE INTO direct_assignments
                (project_id, team_id, user_id, permission_db_id, permission_queryable_id, system_permission)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![project_id, team_id, user_id, db_id, queryable_id, system],
        )?;
        Ok(())
    }

    async fn revoke_permission(
        &self,
        project_id: &str,
        team_id: Option<&str>,
        user_id: &str,
        permission: &PermissionRef,
    ) -> Result<(), WardenError> {
        let conn = self.conn()?;
        let changed = match permission {
            PermissionRef::Stored { internal_key, .. } => conn.execute(
                "DELETE FROM direct_assignments
                 WHERE project_id = ?1 AND team_id IS ?2 AND user_id = ?3 AND permission_db_id = ?4",
                params![project_id, team_id, user_id, internal_key],
            )?,
            PermissionRef::System(p) => conn.execute(
                "DELETE FROM direct_assignments
                 WHERE project_id = ?1 AND team_id IS ?2 AND user_id = ?3 AND system_permission = ?4",
                params![project_id, team_id, user_id, p.name()],
            )?,
        };
        if changed == 0 {
            return Err(WardenError::not_found(EntityKind::Permission, permission.id()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn new_def(id: &str, parents: Vec<PermissionRef>) -> NewDefinition {
        NewDefinition {
            id: id.to_string(),
            description: None,
            parents,
        }
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = store().await;
        store.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_project_is_rejected() {
        let store = store().await;
        store.create_project("p1").await.unwrap();
        let err = store.create_project("p1").await.unwrap_err();
        assert!(matches!(err, WardenError::Duplicate(_)));
    }

    #[tokio::test]
    async fn team_requires_project() {
        let store = store().await;
        let err = store.create_team("missing", "t1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn project_level_ids_share_a_namespace() {
        let store = store().await;
        let project = store.create_project("p1").await.unwrap();
        store
            .create_definition(&project, &Scope::Global, &new_def("admin", vec![]))
            .await
            .unwrap();
        let err = store
            .create_definition(&project, &Scope::AnyTeam, &new_def("admin", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::Duplicate(_)));
    }

    #[tokio::test]
    async fn team_ids_are_separate_per_team() {
        let store = store().await;
        let project = store.create_project("p1").await.unwrap();
        store.create_team("p1", "t1").await.unwrap();
        store.create_team("p1", "t2").await.unwrap();
        for team in ["t1", "t2"] {
            store
                .create_definition(&project, &Scope::specific_team(team), &new_def("editor", vec![]))
                .await
                .unwrap();
        }
        // Same id at project level does not clash with team-level rows.
        store
            .create_definition(&project, &Scope::AnyTeam, &new_def("editor", vec![]))
            .await
            .unwrap();

        let rows = store
            .find_definitions("p1", &DefinitionFilter::Team("t1".into()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].scope, Scope::specific_team("t1"));
    }

    #[tokio::test]
    async fn filters_split_global_and_any_team() {
        let store = store().await;
        let project = store.create_project("p1").await.unwrap();
        store
            .create_definition(&project, &Scope::Global, &new_def("g", vec![]))
            .await
            .unwrap();
        store
            .create_definition(&project, &Scope::AnyTeam, &new_def("a", vec![]))
            .await
            .unwrap();

        let ids = |rows: Vec<DefinitionRow>| rows.into_iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(
            ids(store.find_definitions("p1", &DefinitionFilter::Global).await.unwrap()),
            vec!["g"]
        );
        assert_eq!(
            ids(store.find_definitions("p1", &DefinitionFilter::AnyTeam).await.unwrap()),
            vec!["a"]
        );
        assert_eq!(
            ids(store
                .find_definitions("p1", &DefinitionFilter::ProjectLevel)
                .await
                .unwrap()),
            vec!["a", "g"]
        );
    }

    #[tokio::test]
    async fn edges_round_trip_both_kinds() {
        let store = store().await;
        let project = store.create_project("p1").await.unwrap();
        let viewer = store
            .create_definition(&project, &Scope::AnyTeam, &new_def("viewer", vec![]))
            .await
            .unwrap();
        let editor = store
            .create_definition(
                &project,
                &Scope::AnyTeam,
                &new_def(
                    "editor",
                    vec![
                        PermissionRef::Stored {
                            internal_key: viewer.internal_key.clone(),
                            id: viewer.id.clone(),
                        },
                        PermissionRef::System(SystemPermission::ReadMembers),
                    ],
                ),
            )
            .await
            .unwrap();
        assert_eq!(editor.parents.len(), 2);
        assert!(editor
            .parents
            .contains(&PermissionRef::System(SystemPermission::ReadMembers)));
    }

    #[tokio::test]
    async fn rename_is_visible_through_edges() {
        let store = store().await;
        let project = store.create_project("p1").await.unwrap();
        let viewer = store
            .create_definition(&project, &Scope::AnyTeam, &new_def("viewer", vec![]))
            .await
            .unwrap();
        let editor = store
            .create_definition(
                &project,
                &Scope::AnyTeam,
                &new_def(
                    "editor",
                    vec![PermissionRef::Stored {
                        internal_key: viewer.internal_key.clone(),
                        id: viewer.id.clone(),
                    }],
                ),
            )
            .await
            .unwrap();

        let update = DefinitionUpdate {
            id: Some("reader".into()),
            ..Default::default()
        };
        store
            .update_definition(&project, &Scope::AnyTeam, "viewer", &update)
            .await
            .unwrap()
            .unwrap();

        let rows = store
            .find_definitions_by_key(&[editor.internal_key.clone()])
            .await
            .unwrap();
        assert_eq!(rows[0].parents[0].id(), "reader");
    }

    #[tokio::test]
    async fn update_does_not_cross_project_level_scopes() {
        let store = store().await;
        let project = store.create_project("p1").await.unwrap();
        store
            .create_definition(&project, &Scope::Global, &new_def("g", vec![]))
            .await
            .unwrap();
        let update = DefinitionUpdate {
            description: Some("x".into()),
            ..Default::default()
        };
        let res = store
            .update_definition(&project, &Scope::AnyTeam, "g", &update)
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn deleted_parent_leaves_dangling_edge() {
        let store = store().await;
        let project = store.create_project("p1").await.unwrap();
        let viewer = store
            .create_definition(&project, &Scope::AnyTeam, &new_def("viewer", vec![]))
            .await
            .unwrap();
        let editor = store
            .create_definition(
                &project,
                &Scope::AnyTeam,
                &new_def(
                    "editor",
                    vec![PermissionRef::Stored {
                        internal_key: viewer.internal_key.clone(),
                        id: viewer.id.clone(),
                    }],
                ),
            )
            .await
            .unwrap();

        let deleted = store
            .delete_definitions(&project, &Scope::AnyTeam, "viewer")
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let rows = store
            .find_definitions_by_key(&[editor.internal_key])
            .await
            .unwrap();
        assert_eq!(rows[0].parents[0].id(), "viewer");
    }

    #[tokio::test]
    async fn assignments_require_membership() {
        let store = store().await;
        store.create_project("p1").await.unwrap();
        store.create_team("p1", "t1").await.unwrap();

        assert!(store
            .find_direct_assignments("p1", Some("t1"), "u1")
            .await
            .unwrap()
            .is_none());
        let err = store
            .grant_permission(
                "p1",
                Some("t1"),
                "u1",
                &PermissionRef::System(SystemPermission::ReadMembers),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn grant_is_idempotent_and_revocable() {
        let store = store().await;
        store.create_project("p1").await.unwrap();
        store.create_team("p1", "t1").await.unwrap();
        store.add_team_member("p1", "t1", "u1").await.unwrap();

        let perm = PermissionRef::System(SystemPermission::InviteMembers);
        store.grant_permission("p1", Some("t1"), "u1", &perm).await.unwrap();
        store.grant_permission("p1", Some("t1"), "u1", &perm).await.unwrap();

        let rows = store
            .find_direct_assignments("p1", Some("t1"), "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].permission, perm);

        store.revoke_permission("p1", Some("t1"), "u1", &perm).await.unwrap();
        let err = store
            .revoke_permission("p1", Some("t1"), "u1", &perm)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn removing_member_drops_its_assignments() {
        let store = store().await;
        store.create_project("p1").await.unwrap();
        store.create_team("p1", "t1").await.unwrap();
        store.add_team_member("p1", "t1", "u1").await.unwrap();
        store
            .grant_permission(
                "p1",
                Some("t1"),
                "u1",
                &PermissionRef::System(SystemPermission::DeleteTeam),
            )
            .await
            .unwrap();

        store.remove_team_member("p1", "t1", "u1").await.unwrap();
        store.add_team_member("p1", "t1", "u1").await.unwrap();

        let rows = store
            .find_direct_assignments("p1", Some("t1"), "u1")
            .await
            .unwrap()
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn project_level_assignments_are_separate_from_team_ones() {
        let store = store().await;
        store.create_project("p1").await.unwrap();
        store.create_team("p1", "t1").await.unwrap();
        store.add_team_member("p1", "t1", "u1").await.unwrap();
        store
            .grant_permission(
                "p1",
                Some("t1"),
                "u1",
                &PermissionRef::System(SystemPermission::UpdateTeam),
            )
            .await
            .unwrap();

        let project_level = store
            .find_direct_assignments("p1", None, "u1")
            .await
            .unwrap()
            .unwrap();
        assert!(project_level.is_empty());
    }
}
