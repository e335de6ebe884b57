//! Transitive closure over "contains" edges.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, WardenError};
use crate::types::PermissionDefinition;

/// Index definitions by id for [`compute_closure`].
pub fn index_by_id<I>(definitions: I) -> HashMap<String, PermissionDefinition>
where
    I: IntoIterator<Item = PermissionDefinition>,
{
    definitions.into_iter().map(|d| (d.id.clone(), d)).collect()
}

/// Compute every permission reachable from `seed_ids`, seeds included.
///
/// Each node is visited once, so cycles terminate. An id that does not resolve
/// in `definitions_by_id` is a dangling reference and fails the whole
/// computation with [`WardenError::Integrity`].
pub fn compute_closure<I, S>(
    seed_ids: I,
    definitions_by_id: &HashMap<String, PermissionDefinition>,
) -> Result<HashSet<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut stack: Vec<String> = seed_ids.into_iter().map(Into::into).collect();
    let mut visited: HashSet<String> = HashSet::with_capacity(stack.len());

    while let Some(id) = stack.pop() {
        if visited.contains(&id) {
            continue;
        }
        let Some(definition) = definitions_by_id.get(&id) else {
            tracing::error!(
                permission_id = %id,
                visited = visited.len(),
                "permission reference does not resolve in scope"
            );
            return Err(WardenError::Integrity(format!(
                "permission '{id}' is referenced but does not exist in the resolved scope"
            )));
        };
        stack.extend(
            definition
                .contained_ids
                .iter()
                .filter(|child| !visited.contains(*child))
                .cloned(),
        );
        visited.insert(id);
    }

    tracing::debug!(closure_size = visited.len(), "computed permission closure");
    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::SystemPermission;
    use crate::types::Scope;

    fn def(id: &str, contains: &[&str]) -> PermissionDefinition {
        PermissionDefinition {
            id: id.to_string(),
            internal_key: format!("key-{id}"),
            scope: Scope::AnyTeam,
            description: None,
            contained_ids: contains.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn leaf_closes_to_itself() {
        let defs = index_by_id([def("viewer", &[])]);
        let closure = compute_closure(["viewer"], &defs).unwrap();
        assert_eq!(closure, set(&["viewer"]));
    }

    #[test]
    fn editor_contains_system_permission() {
        let mut all = SystemPermission::definitions();
        all.push(def("editor", &["$read_members"]));
        let defs = index_by_id(all);
        let closure = compute_closure(["editor"], &defs).unwrap();
        assert_eq!(closure, set(&["editor", "$read_members"]));
    }

    #[test]
    fn follows_multiple_levels_and_shared_children() {
        let defs = index_by_id([
            def("admin", &["editor", "moderator"]),
            def("editor", &["viewer"]),
            def("moderator", &["viewer"]),
            def("viewer", &[]),
            def("unrelated", &[]),
        ]);
        let closure = compute_closure(["admin"], &defs).unwrap();
        assert_eq!(closure, set(&["admin", "editor", "moderator", "viewer"]));
    }

    #[test]
    fn cycle_terminates() {
        let defs = index_by_id([def("a", &["b"]), def("b", &["c"]), def("c", &["a"])]);
        let closure = compute_closure(["a"], &defs).unwrap();
        assert_eq!(closure, set(&["a", "b", "c"]));
    }

    #[test]
    fn self_loop_terminates() {
        let defs = index_by_id([def("a", &["a"])]);
        assert_eq!(compute_closure(["a"], &defs).unwrap(), set(&["a"]));
    }

    #[test]
    fn empty_seed_gives_empty_closure() {
        let defs = index_by_id([def("a", &[])]);
        assert!(compute_closure(Vec::<String>::new(), &defs).unwrap().is_empty());
    }

    #[test]
    fn closure_is_idempotent() {
        let defs = index_by_id([
            def("owner", &["admin"]),
            def("admin", &["editor", "$invite_members"]),
            def("editor", &["viewer"]),
            def("viewer", &["$read_members"]),
            def("$read_members", &[]),
            def("$invite_members", &[]),
            def("loop_a", &["loop_b"]),
            def("loop_b", &["loop_a", "viewer"]),
        ]);
        for seeds in [
            vec!["owner"],
            vec!["editor", "loop_a"],
            vec!["viewer"],
            vec!["$invite_members", "loop_b"],
        ] {
            let once = compute_closure(seeds.clone(), &defs).unwrap();
            let twice = compute_closure(once.clone(), &defs).unwrap();
            assert_eq!(once, twice, "seeds {seeds:?}");
        }
    }

    #[test]
    fn dangling_seed_is_integrity_error() {
        let defs = index_by_id([def("viewer", &[])]);
        let err = compute_closure(["ghost"], &defs).unwrap_err();
        assert!(matches!(err, WardenError::Integrity(ref m) if m.contains("ghost")));
    }

    #[test]
    fn dangling_edge_is_integrity_error() {
        let defs = index_by_id([def("editor", &["deleted_thing"])]);
        let err = compute_closure(["editor"], &defs).unwrap_err();
        assert!(matches!(err, WardenError::Integrity(ref m) if m.contains("deleted_thing")));
    }
}
