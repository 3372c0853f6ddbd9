use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{RbacError, Result};
use crate::role::Role;
use crate::table::DEFAULT_RESOURCE_PERMISSIONS;

/// Generic resource actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Write,
    Delete,
    Manage,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
            Action::Manage => "manage",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable role -> capability set lookup.
///
/// The table is flat: no role inherits from another and there are no
/// per-identity overrides. A role missing from the table has an empty set.
/// Clones share one `Arc`'d table.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    table: Arc<HashMap<Role, HashSet<String>>>,
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::build(
            DEFAULT_RESOURCE_PERMISSIONS
                .iter()
                .map(|(permission, roles)| ((*permission).to_string(), *roles)),
        )
    }
}

impl PermissionRegistry {
    /// Build a registry from `(permission, roles granted it)` pairs.
    ///
    /// # Errors
    ///
    /// Rejects permission strings that are empty, contain whitespace, or lack
    /// a `resource:action` separator.
    pub fn from_entries<'a, I, P>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, &'a [Role])>,
        P: Into<String>,
    {
        let mut validated = Vec::new();
        for (permission, roles) in entries {
            let permission = permission.into();
            validate_permission(&permission)?;
            validated.push((permission, roles));
        }
        Ok(Self::build(validated))
    }

    fn build<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, &'a [Role])>,
    {
        let mut table: HashMap<Role, HashSet<String>> = HashMap::new();
        for (permission, roles) in entries {
            for role in roles {
                table.entry(*role).or_default().insert(permission.clone());
            }
        }

        tracing::debug!(
            roles = table.len(),
            grants = table.values().map(HashSet::len).sum::<usize>(),
            "Permission registry built"
        );

        Self {
            table: Arc::new(table),
        }
    }

    /// True iff `permission` is in the capability set of `role`
    pub fn has_permission(&self, role: Role, permission: &str) -> bool {
        self.table
            .get(&role)
            .is_some_and(|set| set.contains(permission))
    }

    /// True iff `role` appears in `allowed`
    pub fn has_any_role(&self, role: Role, allowed: &[Role]) -> bool {
        has_any_role(role, allowed)
    }

    pub fn has_any_permission(&self, role: Role, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_permission(role, p))
    }

    pub fn has_all_permissions(&self, role: Role, permissions: &[&str]) -> bool {
        permissions.iter().all(|p| self.has_permission(role, p))
    }

    /// `{resource}:{action}`
    pub fn can_access_resource(&self, role: Role, resource: &str, action: Action) -> bool {
        self.has_permission(role, &format!("{resource}:{action}"))
    }

    /// `{resource}:own:{action}`
    pub fn can_access_own_resource(&self, role: Role, resource: &str, action: Action) -> bool {
        self.has_permission(role, &format!("{resource}:own:{action}"))
    }

    /// General permission first, then the owner-scoped one when `is_owner`
    pub fn can_perform_action(&self, role: Role, action: &str, entity: &str, is_owner: bool) -> bool {
        if self.has_permission(role, &format!("{entity}:{action}")) {
            return true;
        }
        is_owner && self.has_permission(role, &format!("{entity}:own:{action}"))
    }

    /// Capability set of `role`, sorted
    pub fn permissions_for(&self, role: Role) -> Vec<&str> {
        let mut permissions: Vec<&str> = self
            .table
            .get(&role)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        permissions.sort_unstable();
        permissions
    }

    /// Roles granted `permission`, in declaration order of [`Role::ALL`]
    pub fn roles_with(&self, permission: &str) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.has_permission(*role, permission))
            .collect()
    }
}

/// True iff `role` appears in `allowed`
pub fn has_any_role(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

fn validate_permission(permission: &str) -> Result<()> {
    let well_formed = !permission.is_empty()
        && !permission.chars().any(char::is_whitespace)
        && permission.split(':').count() >= 2
        && permission.split(':').all(|part| !part.is_empty());

    if well_formed {
        Ok(())
    } else {
        Err(RbacError::InvalidPermission(permission.to_string()))
    }
}
