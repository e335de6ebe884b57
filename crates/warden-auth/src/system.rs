//! Built-in team permissions.
//!
//! System permissions are fixed at build time. They are never stored, cannot be
//! deleted, contain nothing, and are visible wherever team-scoped permissions
//! are visible.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{PermissionDefinition, Scope};

/// Prefix that marks a permission id as belonging to the system namespace.
pub const SYSTEM_PREFIX: char = '$';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemPermission {
    UpdateTeam,
    DeleteTeam,
    ReadMembers,
    RemoveMembers,
    InviteMembers,
}

impl SystemPermission {
    pub const ALL: [SystemPermission; 5] = [
        SystemPermission::UpdateTeam,
        SystemPermission::DeleteTeam,
        SystemPermission::ReadMembers,
        SystemPermission::RemoveMembers,
        SystemPermission::InviteMembers,
    ];

    /// Storage name, as written to edge and assignment rows.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UpdateTeam => "update_team",
            Self::DeleteTeam => "delete_team",
            Self::ReadMembers => "read_members",
            Self::RemoveMembers => "remove_members",
            Self::InviteMembers => "invite_members",
        }
    }

    /// Queryable id, e.g. `$read_members`.
    pub fn id(&self) -> String {
        format!("{SYSTEM_PREFIX}{}", self.name())
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::UpdateTeam => "Update the team information",
            Self::DeleteTeam => "Delete the team",
            Self::ReadMembers => "Read and list the other members of the team",
            Self::RemoveMembers => "Remove other members from the team",
            Self::InviteMembers => "Invite other users to the team",
        }
    }

    /// Look up by storage name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Look up by queryable id. The id must carry the `$` prefix.
    pub fn from_id(id: &str) -> Option<Self> {
        id.strip_prefix(SYSTEM_PREFIX).and_then(Self::from_name)
    }

    /// Synthesized definition; `internal_key` equals the id.
    pub fn definition(&self) -> PermissionDefinition {
        let id = self.id();
        PermissionDefinition {
            internal_key: id.clone(),
            id,
            scope: Scope::AnyTeam,
            description: Some(self.description().to_string()),
            contained_ids: Default::default(),
        }
    }

    pub fn definitions() -> Vec<PermissionDefinition> {
        Self::ALL.iter().map(Self::definition).collect()
    }
}

impl fmt::Display for SystemPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SYSTEM_PREFIX}{}", self.name())
    }
}
