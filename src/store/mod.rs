//! Persistence of the compiled catalog and role links.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermission {
    pub name: String,
    pub guard: String,
}

impl NewPermission {
    pub fn new(name: impl Into<String>, guard: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guard: guard.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, ToSchema)]
pub struct RoleHandle {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "guard_name")]
    pub guard: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, ToSchema)]
pub struct StoredPermission {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "guard_name")]
    pub guard: String,
}

/// Storage contract for syncing. Implementations must make
/// `upsert_permissions` an insert-or-update keyed by `(name, guard)` and
/// `ensure_role` create-if-absent, so repeated or concurrent syncs converge.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Returns the number of rows written.
    async fn upsert_permissions(&self, permissions: &[NewPermission]) -> AppResult<u64>;

    async fn ensure_role(&self, name: &str, guard: &str) -> AppResult<RoleHandle>;

    /// Replaces the role's links with the named permissions of its guard.
    async fn set_role_permissions(&self, role: &RoleHandle, permissions: &[String]) -> AppResult<()>;

    async fn find_role(&self, name: &str, guard: &str) -> AppResult<Option<RoleHandle>>;

    async fn list_permissions(&self, guard: &str) -> AppResult<Vec<StoredPermission>>;

    async fn role_permission_ids(&self, role: &RoleHandle) -> AppResult<Vec<i64>>;
}
