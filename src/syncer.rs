use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use utoipa::ToSchema;

use crate::authz::SuperAdminRoles;
use crate::errors::{AppError, AppResult};
use crate::manager::PermissionManager;
use crate::store::{NewPermission, PermissionStore};

pub const DEFAULT_GUARD: &str = "web";

/// Per-role result: how many permissions were linked, or the marker for a
/// super admin role that exists only to be bypassed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOutcome {
    Count(usize),
    SuperAdmin,
}

impl fmt::Display for RoleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleOutcome::Count(count) => write!(f, "{count}"),
            RoleOutcome::SuperAdmin => f.write_str("SUPER ADMIN"),
        }
    }
}

impl Serialize for RoleOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RoleOutcome::Count(count) => serializer.serialize_u64(*count as u64),
            RoleOutcome::SuperAdmin => serializer.serialize_str("SUPER ADMIN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SyncReport {
    pub guard: String,
    pub permissions_count: usize,
    /// Role name to permission count, or `"SUPER ADMIN"`.
    #[schema(value_type = Object)]
    pub roles_processed: IndexMap<String, RoleOutcome>,
    /// Role references that matched nothing in the catalog.
    pub dropped_references: usize,
}

/// Pushes a compiled catalog and its role links into a store.
pub struct PermissionSyncer<'a, S: PermissionStore + ?Sized> {
    store: &'a S,
    super_admins: SuperAdminRoles,
}

impl<'a, S: PermissionStore + ?Sized> PermissionSyncer<'a, S> {
    pub fn new(store: &'a S, super_admins: SuperAdminRoles) -> Self {
        Self { store, super_admins }
    }

    pub async fn execute(&self, manager: &PermissionManager, guard: &str) -> AppResult<SyncReport> {
        let guard = guard.trim();
        if guard.is_empty() {
            return Err(AppError::bad_request("guard name must not be empty"));
        }

        let catalog = manager.catalog();
        let compiled = manager.compile_roles_with(&catalog);
        compiled.warn_dropped();

        let rows: Vec<NewPermission> = catalog
            .all()
            .iter()
            .map(|name| NewPermission::new(name.clone(), guard))
            .collect();
        self.store.upsert_permissions(&rows).await?;
        tracing::info!(guard, permissions = rows.len(), "permissions upserted");

        let mut roles_processed = IndexMap::new();
        for (role_name, permissions) in compiled.iter() {
            let role = self.store.ensure_role(role_name, guard).await?;
            self.store.set_role_permissions(&role, permissions).await?;
            tracing::debug!(guard, role = role_name, permissions = permissions.len(), "role synced");
            roles_processed.insert(role_name.to_string(), RoleOutcome::Count(permissions.len()));
        }

        // Super admin roles must exist even when no definition grants them anything.
        for role_name in self.super_admins.iter() {
            self.store.ensure_role(role_name, guard).await?;
            roles_processed
                .entry(role_name.to_string())
                .or_insert(RoleOutcome::SuperAdmin);
        }

        let report = SyncReport {
            guard: guard.to_string(),
            permissions_count: rows.len(),
            roles_processed,
            dropped_references: compiled.dropped().count(),
        };
        tracing::info!(guard, roles = report.roles_processed.len(), "sync complete");
        Ok(report)
    }
}
