use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{NewPermission, PermissionStore, RoleHandle, StoredPermission};
use crate::errors::AppResult;

/// Rows per multi-value statement; keeps binds under SQLite's variable limit.
const CHUNK_SIZE: usize = 200;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn role_permission_names(&self, role: &RoleHandle) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT p.name FROM permissions p \
             JOIN role_has_permissions rp ON rp.permission_id = p.id \
             WHERE rp.role_id = ? ORDER BY p.name",
        )
        .bind(role.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}

#[async_trait]
impl PermissionStore for SqliteStore {
    async fn upsert_permissions(&self, permissions: &[NewPermission]) -> AppResult<u64> {
        if permissions.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for chunk in permissions.chunks(CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO permissions (name, guard_name, created_at, updated_at) ");
            builder.push_values(chunk, |mut row, permission| {
                row.push_bind(permission.name.clone())
                    .push_bind(permission.guard.clone())
                    .push_bind(now)
                    .push_bind(now);
            });
            builder.push(" ON CONFLICT (name, guard_name) DO UPDATE SET updated_at = excluded.updated_at");

            let result = builder.build().execute(&mut *tx).await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        tracing::debug!(rows = written, "upserted permissions");
        Ok(written)
    }

    async fn ensure_role(&self, name: &str, guard: &str) -> AppResult<RoleHandle> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO roles (name, guard_name, created_at, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (name, guard_name) DO NOTHING",
        )
        .bind(name)
        .bind(guard)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let role = sqlx::query_as::<_, RoleHandle>(
            "SELECT id, name, guard_name FROM roles WHERE name = ? AND guard_name = ?",
        )
        .bind(name)
        .bind(guard)
        .fetch_one(&self.pool)
        .await?;

        Ok(role)
    }

    async fn set_role_permissions(&self, role: &RoleHandle, permissions: &[String]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_has_permissions WHERE role_id = ?")
            .bind(role.id)
            .execute(&mut *tx)
            .await?;

        for chunk in permissions.chunks(CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT OR IGNORE INTO role_has_permissions (role_id, permission_id) SELECT ");
            builder
                .push_bind(role.id)
                .push(", id FROM permissions WHERE guard_name = ")
                .push_bind(role.guard.clone())
                .push(" AND name IN (");
            let mut names = builder.separated(", ");
            for name in chunk {
                names.push_bind(name.clone());
            }
            names.push_unseparated(")");

            builder.build().execute(&mut *tx).await?;
        }

        sqlx::query("UPDATE roles SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(role.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_role(&self, name: &str, guard: &str) -> AppResult<Option<RoleHandle>> {
        let role = sqlx::query_as::<_, RoleHandle>(
            "SELECT id, name, guard_name FROM roles WHERE name = ? AND guard_name = ?",
        )
        .bind(name)
        .bind(guard)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn list_permissions(&self, guard: &str) -> AppResult<Vec<StoredPermission>> {
        let rows = sqlx::query_as::<_, StoredPermission>(
            "SELECT id, name, guard_name FROM permissions WHERE guard_name = ? ORDER BY name",
        )
        .bind(guard)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn role_permission_ids(&self, role: &RoleHandle) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT permission_id FROM role_has_permissions WHERE role_id = ? ORDER BY permission_id",
        )
        .bind(role.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
