use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WardenError;
use crate::system::SystemPermission;

/// Visibility domain of a permission definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Scope {
    Global,
    /// Project-wide team permission, applicable to every team.
    AnyTeam,
    SpecificTeam { team_id: String },
}

impl Scope {
    pub fn specific_team(team_id: impl Into<String>) -> Self {
        Scope::SpecificTeam {
            team_id: team_id.into(),
        }
    }

    pub fn is_team_like(&self) -> bool {
        matches!(self, Scope::AnyTeam | Scope::SpecificTeam { .. })
    }

    pub fn team_id(&self) -> Option<&str> {
        match self {
            Scope::SpecificTeam { team_id } => Some(team_id),
            _ => None,
        }
    }

    /// Whether a definition in this scope is returned for `permission_type`.
    pub fn matches(&self, permission_type: PermissionType) -> bool {
        match permission_type {
            PermissionType::Team => self.is_team_like(),
            PermissionType::Global => !self.is_team_like(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::AnyTeam => write!(f, "any-team"),
            Scope::SpecificTeam { team_id } => write!(f, "team:{team_id}"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Scope::Global),
            "any-team" | "any_team" => Ok(Scope::AnyTeam),
            _ => match s.strip_prefix("team:") {
                Some(team_id) if !team_id.is_empty() => Ok(Scope::specific_team(team_id)),
                _ => Err(WardenError::Validation(format!(
                    "invalid scope '{s}' (expected global, any-team or team:<id>)"
                ))),
            },
        }
    }
}

/// Which half of the permission space a user query asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    Team,
    Global,
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionType::Team => write!(f, "team"),
            PermissionType::Global => write!(f, "global"),
        }
    }
}

impl std::str::FromStr for PermissionType {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "team" => Ok(PermissionType::Team),
            "global" => Ok(PermissionType::Global),
            _ => Err(WardenError::Validation(format!(
                "invalid permission type '{s}' (expected team or global)"
            ))),
        }
    }
}

/// Target of a containment edge or a direct assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PermissionRef {
    /// A stored custom definition. `id` is the definition's current id, or
    /// its last known id if the row has since been deleted.
    Stored { internal_key: String, id: String },
    System(SystemPermission),
}

impl PermissionRef {
    pub fn id(&self) -> String {
        match self {
            PermissionRef::Stored { id, .. } => id.clone(),
            PermissionRef::System(p) => p.id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    pub id: String,
    /// Opaque backing key. Equals `id` for system permissions.
    pub internal_key: String,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub contained_ids: BTreeSet<String>,
}

impl PermissionDefinition {
    pub fn is_system(&self) -> bool {
        SystemPermission::from_id(&self.id).is_some()
    }

    /// Reference used when another definition or an assignment points here.
    pub fn to_ref(&self) -> PermissionRef {
        match SystemPermission::from_id(&self.id) {
            Some(p) => PermissionRef::System(p),
            None => PermissionRef::Stored {
                internal_key: self.internal_key.clone(),
                id: self.id.clone(),
            },
        }
    }
}

/// A stored definition as read back from the persistence layer.
#[derive(Debug, Clone)]
pub struct DefinitionRow {
    pub internal_key: String,
    pub id: String,
    pub scope: Scope,
    pub description: Option<String>,
    pub parents: Vec<PermissionRef>,
}

impl From<DefinitionRow> for PermissionDefinition {
    fn from(row: DefinitionRow) -> Self {
        PermissionDefinition {
            contained_ids: row.parents.iter().map(PermissionRef::id).collect(),
            id: row.id,
            internal_key: row.internal_key,
            scope: row.scope,
            description: row.description,
        }
    }
}

/// A direct grant of one permission to one member.
#[derive(Debug, Clone)]
pub struct AssignmentRow {
    pub team_id: Option<String>,
    pub user_id: String,
    pub permission: PermissionRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub project_id: String,
    pub id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPermission {
    pub id: String,
    pub description: Option<String>,
    #[serde(default)]
    pub contain_ids: Vec<String>,
}

/// Partial update. `contain_ids`, when present, replaces the full edge set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionPatch {
    pub id: Option<String>,
    pub description: Option<String>,
    pub contain_ids: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parses_cli_forms() {
        assert_eq!("global".parse::<Scope>().unwrap(), Scope::Global);
        assert_eq!("any-team".parse::<Scope>().unwrap(), Scope::AnyTeam);
        assert_eq!(
            "team:t1".parse::<Scope>().unwrap(),
            Scope::specific_team("t1")
        );
        assert!("team:".parse::<Scope>().is_err());
        assert!("everyone".parse::<Scope>().is_err());
    }

    #[test]
    fn scope_serializes_with_type_tag() {
        let json = serde_json::to_value(Scope::specific_team("t1")).unwrap();
        assert_eq!(json["type"], "specific-team");
        assert_eq!(json["team_id"], "t1");
    }

    #[test]
    fn scope_matches_permission_type() {
        assert!(Scope::AnyTeam.matches(PermissionType::Team));
        assert!(Scope::specific_team("t").matches(PermissionType::Team));
        assert!(!Scope::Global.matches(PermissionType::Team));
        assert!(Scope::Global.matches(PermissionType::Global));
        assert!(!Scope::AnyTeam.matches(PermissionType::Global));
    }

    #[test]
    fn row_converts_parents_to_contained_ids() {
        let row = DefinitionRow {
            internal_key: "k1".into(),
            id: "editor".into(),
            scope: Scope::specific_team("t1"),
            description: None,
            parents: vec![
                PermissionRef::System(SystemPermission::ReadMembers),
                PermissionRef::Stored {
                    internal_key: "k2".into(),
                    id: "viewer".into(),
                },
            ],
        };
        let def = PermissionDefinition::from(row);
        assert_eq!(
            def.contained_ids.into_iter().collect::<Vec<_>>(),
            vec!["$read_members".to_string(), "viewer".to_string()]
        );
    }
}
