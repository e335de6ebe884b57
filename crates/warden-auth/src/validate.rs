use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, WardenError};
use crate::system::{SYSTEM_PREFIX, SystemPermission};

static PERMISSION_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?[a-z0-9_:]+$").expect("static regex"));

/// Check an id for a custom (stored) definition.
///
/// Only lowercase letters, digits, `_` and `:` are allowed, with an optional
/// leading `$`. A `$` id must name a system permission, and system permissions
/// cannot be redefined. Bare ids may not shadow a system permission name.
pub fn validate_custom_permission_id(id: &str) -> Result<()> {
    if !PERMISSION_ID_REGEX.is_match(id) {
        return Err(WardenError::Validation(format!(
            "invalid permission id '{id}': only lowercase letters, numbers, \":\", \"_\" \
             and an optional \"$\" at the beginning are allowed"
        )));
    }

    if id.starts_with(SYSTEM_PREFIX) {
        return match SystemPermission::from_id(id) {
            None => Err(WardenError::Validation(format!(
                "invalid system permission '{id}'"
            ))),
            Some(p) => Err(WardenError::Validation(format!(
                "system permission '{p}' cannot be redefined"
            ))),
        };
    }

    if SystemPermission::from_name(id).is_some() {
        return Err(WardenError::Validation(format!(
            "permission id '{id}' collides with a system permission; \
             system permissions must start with \"$\""
        )));
    }

    Ok(())
}

/// Check an id used as a reference (containment edge, grant target).
/// Unlike custom ids these may name a system permission.
pub fn validate_permission_ref_id(id: &str) -> Result<()> {
    if !PERMISSION_ID_REGEX.is_match(id) {
        return Err(WardenError::Validation(format!(
            "invalid permission id '{id}'"
        )));
    }
    if id.starts_with(SYSTEM_PREFIX) && SystemPermission::from_id(id).is_none() {
        return Err(WardenError::Validation(format!(
            "invalid system permission '{id}'"
        )));
    }
    Ok(())
}
