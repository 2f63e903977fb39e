use axum::extract::{Query, State};
use axum::Json;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::app::AppState;
use crate::authz::SuperAdminRoles;
use crate::errors::{AppError, AppResult};
use crate::roles::DroppedReference;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocaleQuery {
    /// Adds labels in this locale when present.
    pub locale: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogResponse {
    pub count: usize,
    pub permissions: Vec<String>,
    #[schema(value_type = Object)]
    pub resources: IndexMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub labels: Option<IndexMap<String, String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RolesResponse {
    #[schema(value_type = Object)]
    pub roles: IndexMap<String, Vec<String>>,
    pub dropped: Vec<DroppedReference>,
    #[schema(value_type = Vec<String>)]
    pub super_admin_roles: SuperAdminRoles,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TranslateQuery {
    /// Permission name, e.g. `create users`.
    pub name: String,
    pub locale: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TranslateResponse {
    pub name: String,
    pub label: String,
    pub locale: String,
}

/// Compiled permission catalog
#[utoipa::path(
    get,
    path = "/api/catalog",
    tag = "Catalog",
    params(LocaleQuery),
    responses((status = 200, description = "Permission catalog grouped by resource", body = CatalogResponse))
)]
pub async fn get_catalog(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> AppResult<Json<CatalogResponse>> {
    let catalog = state.config.manager().catalog();
    let labels = query
        .locale
        .as_deref()
        .map(|locale| state.translator(Some(locale)).translate_many(catalog.all()));

    Ok(Json(CatalogResponse {
        count: catalog.len(),
        permissions: catalog.all().to_vec(),
        resources: catalog.by_resource().clone(),
        labels,
    }))
}

/// Compiled role definitions
#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "Catalog",
    responses((status = 200, description = "Role to permission map with dropped references", body = RolesResponse))
)]
pub async fn get_roles(State(state): State<AppState>) -> AppResult<Json<RolesResponse>> {
    let compiled = state.config.manager().compile_roles();
    let dropped = compiled.dropped().cloned().collect();

    Ok(Json(RolesResponse {
        roles: compiled.into_map(),
        dropped,
        super_admin_roles: state.config.super_admin_role.clone(),
    }))
}

/// Label for a single permission name
#[utoipa::path(
    get,
    path = "/api/translate",
    tag = "Catalog",
    params(TranslateQuery),
    responses(
        (status = 200, description = "Translated label", body = TranslateResponse),
        (status = 400, description = "Empty permission name"),
    )
)]
pub async fn translate(
    State(state): State<AppState>,
    Query(query): Query<TranslateQuery>,
) -> AppResult<Json<TranslateResponse>> {
    if query.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let translator = state.translator(query.locale.as_deref());
    Ok(Json(TranslateResponse {
        label: translator.translate(&query.name),
        locale: translator.locale().to_string(),
        name: query.name,
    }))
}
