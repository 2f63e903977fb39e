use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::PermissionsConfig;
use crate::docs;
use crate::routes::{catalog, guards, health};
use crate::store::SqliteStore;
use crate::translator::{LangDictionary, Translator};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub store: SqliteStore,
    pub config: Arc<PermissionsConfig>,
    pub dictionary: Arc<LangDictionary>,
    pub locale: String,
    pub fallback_locale: String,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: PermissionsConfig, dictionary: LangDictionary) -> Self {
        Self {
            store: SqliteStore::new(pool.clone()),
            pool,
            config: Arc::new(config),
            dictionary: Arc::new(dictionary),
            locale: "en".to_string(),
            fallback_locale: "en".to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>, fallback: impl Into<String>) -> Self {
        self.locale = locale.into();
        self.fallback_locale = fallback.into();
        self
    }

    /// Translator for the requested locale, or the configured one.
    pub fn translator(&self, locale: Option<&str>) -> Translator<'_> {
        let locale = locale
            .map(str::trim)
            .filter(|locale| !locale.is_empty())
            .unwrap_or(&self.locale);
        Translator::new(self.dictionary.as_ref(), locale).with_fallback(self.fallback_locale.as_str())
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/catalog", get(catalog::get_catalog))
        .route("/roles", get(catalog::get_roles))
        .route("/translate", get(catalog::translate))
        .route("/guards/:guard/sync", post(guards::sync_guard))
        .route("/guards/:guard/permissions", get(guards::guard_permissions))
        .route("/guards/:guard/permissions/flat", get(guards::guard_permissions_flat));

    Router::new()
        .nest("/api", api_routes)
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
