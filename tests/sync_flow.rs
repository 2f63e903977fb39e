use anyhow::Result;
use serde_json::json;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};

use permissions_manager::authz::SuperAdminRoles;
use permissions_manager::config::PermissionsConfig;
use permissions_manager::store::{NewPermission, PermissionStore, SqliteStore};
use permissions_manager::{db, PermissionSyncer, RoleOutcome};

async fn setup_store() -> Result<(TempDir, SqliteStore)> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;
    db::migrate(&pool).await?;
    Ok((dir, SqliteStore::new(pool)))
}

fn config(value: serde_json::Value) -> PermissionsConfig {
    PermissionsConfig::from_json_str(&value.to_string()).expect("valid config")
}

async fn count(pool: &SqlitePool, sql: &str) -> Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await?)
}

#[tokio::test]
async fn syncs_permissions_to_database() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    let config = config(json!({"permissions": ["products"]}));
    let syncer = PermissionSyncer::new(&store, config.super_admin_role.clone());

    let report = syncer.execute(&config.manager(), "web").await?;

    assert_eq!(report.permissions_count, 4);
    assert_eq!(count(store.pool(), "SELECT COUNT(*) FROM permissions").await?, 4);
    let names: Vec<String> = store.list_permissions("web").await?.into_iter().map(|p| p.name).collect();
    assert!(names.contains(&"create products".to_string()));
    Ok(())
}

#[tokio::test]
async fn syncs_roles_and_links() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    let config = config(json!({
        "permissions": {"users": ["view", "edit"], "posts": ["publish"]},
        "roles": {
            "admin": "*",
            "editor": {"users": "view", "posts": "publish"}
        }
    }));
    let syncer = PermissionSyncer::new(&store, config.super_admin_role.clone());

    let report = syncer.execute(&config.manager(), "web").await?;

    assert_eq!(report.permissions_count, 3);
    assert_eq!(report.roles_processed["admin"], RoleOutcome::Count(3));
    assert_eq!(report.roles_processed["editor"], RoleOutcome::Count(2));

    let admin = store.find_role("admin", "web").await?.expect("admin role");
    assert_eq!(
        store.role_permission_names(&admin).await?,
        vec!["edit users", "publish posts", "view users"]
    );

    let editor = store.find_role("editor", "web").await?.expect("editor role");
    let editor_permissions = store.role_permission_names(&editor).await?;
    assert!(editor_permissions.contains(&"view users".to_string()));
    assert!(!editor_permissions.contains(&"edit users".to_string()));
    assert!(editor_permissions.contains(&"publish posts".to_string()));
    Ok(())
}

#[tokio::test]
async fn super_admin_roles_are_created_without_definitions() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    let config = config(json!({
        "permissions": ["users"],
        "roles": {"viewer": {"users": "read"}},
        "super_admin_role": ["developer", "owner"]
    }));
    let syncer = PermissionSyncer::new(&store, config.super_admin_role.clone());

    let report = syncer.execute(&config.manager(), "web").await?;

    assert_eq!(report.roles_processed["viewer"], RoleOutcome::Count(1));
    assert_eq!(report.roles_processed["developer"], RoleOutcome::SuperAdmin);
    assert_eq!(report.roles_processed["owner"], RoleOutcome::SuperAdmin);
    assert_eq!(serde_json::to_value(&report)?["roles_processed"]["owner"], json!("SUPER ADMIN"));

    let developer = store.find_role("developer", "web").await?.expect("developer role");
    assert!(store.role_permission_ids(&developer).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn defined_super_admin_keeps_its_count() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    let config = config(json!({"permissions": ["users"], "roles": {"admin": "*"}}));
    let syncer = PermissionSyncer::new(&store, SuperAdminRoles::default());

    let report = syncer.execute(&config.manager(), "web").await?;

    assert_eq!(report.roles_processed["admin"], RoleOutcome::Count(4));
    Ok(())
}

#[tokio::test]
async fn repeated_sync_converges() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    let config = config(json!({
        "permissions": ["users", "posts"],
        "roles": {"admin": "*", "editor": ["posts"]}
    }));
    let manager = config.manager();
    let syncer = PermissionSyncer::new(&store, config.super_admin_role.clone());

    let first = syncer.execute(&manager, "web").await?;
    let second = syncer.execute(&manager, "web").await?;

    assert_eq!(first, second);
    assert_eq!(count(store.pool(), "SELECT COUNT(*) FROM permissions").await?, 8);
    assert_eq!(count(store.pool(), "SELECT COUNT(*) FROM roles").await?, 2);
    assert_eq!(count(store.pool(), "SELECT COUNT(*) FROM role_has_permissions").await?, 12);
    Ok(())
}

#[tokio::test]
async fn concurrent_syncs_do_not_duplicate_rows() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    let config = config(json!({
        "permissions": ["users", "posts", "tags"],
        "roles": {"admin": "*", "writer": {"posts": "create update"}}
    }));
    let manager = config.manager();
    let syncer = PermissionSyncer::new(&store, config.super_admin_role.clone());

    let (a, b) = tokio::join!(syncer.execute(&manager, "web"), syncer.execute(&manager, "web"));
    a?;
    b?;

    assert_eq!(count(store.pool(), "SELECT COUNT(*) FROM permissions").await?, 12);
    assert_eq!(count(store.pool(), "SELECT COUNT(*) FROM roles").await?, 2);
    let writer = store.find_role("writer", "web").await?.expect("writer role");
    assert_eq!(store.role_permission_ids(&writer).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn guards_are_separate_namespaces() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    let config = config(json!({"permissions": ["users"], "roles": {"viewer": {"users": "read"}}}));
    let syncer = PermissionSyncer::new(&store, config.super_admin_role.clone());

    syncer.execute(&config.manager(), "web").await?;
    syncer.execute(&config.manager(), "api").await?;

    assert_eq!(store.list_permissions("web").await?.len(), 4);
    assert_eq!(store.list_permissions("api").await?.len(), 4);

    let api_viewer = store.find_role("viewer", "api").await?.expect("api viewer");
    let web_viewer = store.find_role("viewer", "web").await?.expect("web viewer");
    assert_ne!(api_viewer.id, web_viewer.id);
    assert_eq!(store.role_permission_names(&api_viewer).await?, vec!["read users"]);
    Ok(())
}

#[tokio::test]
async fn removed_grants_are_unlinked_on_resync() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    let syncer = PermissionSyncer::new(&store, SuperAdminRoles::default());

    let before = config(json!({"permissions": ["users"], "roles": {"editor": {"users": "read update"}}}));
    syncer.execute(&before.manager(), "web").await?;

    let after = config(json!({"permissions": ["users"], "roles": {"editor": {"users": "read"}}}));
    syncer.execute(&after.manager(), "web").await?;

    let editor = store.find_role("editor", "web").await?.expect("editor role");
    assert_eq!(store.role_permission_names(&editor).await?, vec!["read users"]);
    Ok(())
}

#[tokio::test]
async fn upsert_bumps_updated_at_only() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    store.upsert_permissions(&[NewPermission::new("read products", "web")]).await?;
    let original: (String, String) = sqlx::query_as(
        "SELECT created_at, updated_at FROM permissions WHERE name = 'read products'",
    )
    .fetch_one(store.pool())
    .await?;

    std::thread::sleep(std::time::Duration::from_millis(20));
    let written = store
        .upsert_permissions(&[NewPermission::new("read products", "web"), NewPermission::new("create products", "web")])
        .await?;
    assert_eq!(written, 2);

    let updated: (String, String) = sqlx::query_as(
        "SELECT created_at, updated_at FROM permissions WHERE name = 'read products'",
    )
    .fetch_one(store.pool())
    .await?;

    assert_eq!(original.0, updated.0);
    assert!(updated.1 > original.1, "updated_at was not bumped");
    assert_eq!(count(store.pool(), "SELECT COUNT(*) FROM permissions").await?, 2);
    Ok(())
}

#[tokio::test]
async fn empty_guard_is_rejected() -> Result<()> {
    let (_dir, store) = setup_store().await?;
    let config = config(json!({"permissions": ["users"]}));
    let syncer = PermissionSyncer::new(&store, config.super_admin_role.clone());

    assert!(syncer.execute(&config.manager(), "  ").await.is_err());
    assert_eq!(count(store.pool(), "SELECT COUNT(*) FROM permissions").await?, 0);
    Ok(())
}
