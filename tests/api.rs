use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use permissions_manager::config::PermissionsConfig;
use permissions_manager::translator::LangDictionary;
use permissions_manager::{create_app, db, AppState};

async fn setup_app() -> Result<(TempDir, Router)> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;
    db::migrate(&pool).await?;

    let config = PermissionsConfig::from_json_str(
        &json!({
            "permissions": ["users", {"posts": ["publish"]}],
            "special_permissions": {"users": ["ban"]},
            "roles": {
                "admin": "*",
                "editor": {"posts": "publish", "users": "read ghost"}
            }
        })
        .to_string(),
    )?;

    let mut dictionary = LangDictionary::new();
    dictionary.add_lines(
        "es",
        [
            ("actions.create", "Crear"),
            ("actions.read", "Ver"),
            ("resources.users", "Usuarios"),
        ],
    );

    let state = AppState::new(pool, config, dictionary).with_locale("en", "en");
    Ok((dir, create_app(state)))
}

async fn call(app: &Router, method: &str, uri: &str) -> Result<(StatusCode, Value)> {
    let req = Request::builder().method(method).uri(uri).body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    let status = resp.status();
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes)?
    };
    Ok((status, value))
}

#[tokio::test]
async fn health_reports_db_and_catalog() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let (status, body) = call(&app, "GET", "/api/health").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["db_ok"], json!(true));
    assert_eq!(body["catalog_size"], json!(6));
    assert_eq!(body["locales"], json!(["es"]));
    Ok(())
}

#[tokio::test]
async fn catalog_with_labels() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let (status, body) = call(&app, "GET", "/api/catalog?locale=es").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(6));
    assert_eq!(body["resources"]["posts"], json!(["publish posts"]));
    assert_eq!(body["labels"]["create users"], json!("Crear Usuarios"));
    assert_eq!(body["labels"]["publish posts"], json!("publish posts"));
    Ok(())
}

#[tokio::test]
async fn roles_include_dropped_references() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let (status, body) = call(&app, "GET", "/api/roles").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"]["admin"].as_array().map(Vec::len), Some(6));
    assert_eq!(body["roles"]["editor"], json!(["publish posts", "read users"]));
    assert_eq!(body["dropped"][0]["reference"], json!("ghost users"));
    assert_eq!(body["super_admin_roles"], json!(["admin"]));
    Ok(())
}

#[tokio::test]
async fn translate_endpoint() -> Result<()> {
    let (_dir, app) = setup_app().await?;

    let (status, body) = call(&app, "GET", "/api/translate?name=read%20users&locale=es").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], json!("Ver Usuarios"));
    assert_eq!(body["locale"], json!("es"));

    let (status, _) = call(&app, "GET", "/api/translate?name=%20").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn sync_then_grouped_permissions_for_role() -> Result<()> {
    let (_dir, app) = setup_app().await?;

    let (status, report) = call(&app, "POST", "/api/guards/web/sync").await?;
    assert_eq!(status, StatusCode::OK, "sync failed: {report}");
    assert_eq!(report["permissions_count"], json!(6));
    assert_eq!(report["roles_processed"]["editor"], json!(2));
    assert_eq!(report["dropped_references"], json!(1));

    let (status, body) = call(&app, "GET", "/api/guards/web/permissions?role=editor&locale=es").await?;
    assert_eq!(status, StatusCode::OK);

    let groups = body["groups"].as_array().cloned().unwrap_or_default();
    let keys: Vec<&str> = groups.iter().filter_map(|g| g["key"].as_str()).collect();
    assert_eq!(keys, vec!["posts", "users"]);

    let users = &groups[1];
    assert_eq!(users["title"], json!("Users"));
    let checked: Vec<&str> = users["items"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|item| item["checked"] == json!(true))
        .filter_map(|item| item["name"].as_str())
        .collect();
    assert_eq!(checked, vec!["read users"]);

    let read_users = users["items"]
        .as_array()
        .and_then(|items| items.iter().find(|item| item["name"] == json!("read users")))
        .cloned()
        .unwrap_or_default();
    assert_eq!(read_users["label"], json!("Ver Usuarios"));
    assert_eq!(read_users["search_label"], json!("ver usuarios"));
    Ok(())
}

#[tokio::test]
async fn flat_permissions_and_unknown_role() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    call(&app, "POST", "/api/guards/web/sync").await?;

    let (status, body) = call(&app, "GET", "/api/guards/web/permissions/flat").await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| item["name"].as_str())
        .collect();
    assert_eq!(
        names,
        vec!["ban users", "create users", "destroy users", "publish posts", "read users", "update users"]
    );

    let (status, body) = call(&app, "GET", "/api/guards/web/permissions?role=nobody").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));
    Ok(())
}

#[tokio::test]
async fn openapi_document_lists_paths() -> Result<()> {
    let (_dir, app) = setup_app().await?;
    let (status, body) = call(&app, "GET", "/api-docs/openapi.json").await?;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/api/catalog").is_some());
    assert!(body["paths"].get("/api/guards/{guard}/sync").is_some());
    Ok(())
}
