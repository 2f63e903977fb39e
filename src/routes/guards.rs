use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::grouping::{build_flat, build_groups, FlatPermission, PermissionGroup, PermissionItem};
use crate::store::PermissionStore;
use crate::syncer::{PermissionSyncer, SyncReport};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GuardPermissionsQuery {
    /// Marks the permissions linked to this role as checked.
    pub role: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GuardPermissionsResponse {
    pub guard: String,
    pub role: Option<String>,
    pub groups: Vec<PermissionGroup>,
}

/// Compile the loaded definitions and sync them into the guard
#[utoipa::path(
    post,
    path = "/api/guards/{guard}/sync",
    tag = "Guards",
    params(("guard" = String, Path, description = "Guard name, e.g. web")),
    responses(
        (status = 200, description = "Sync report", body = SyncReport),
        (status = 400, description = "Invalid guard"),
    )
)]
pub async fn sync_guard(
    State(state): State<AppState>,
    Path(guard): Path<String>,
) -> AppResult<Json<SyncReport>> {
    let manager = state.config.manager();
    let syncer = PermissionSyncer::new(&state.store, state.config.super_admin_role.clone());
    let report = syncer.execute(&manager, &guard).await?;
    Ok(Json(report))
}

async fn stored_items(state: &AppState, guard: &str) -> AppResult<Vec<PermissionItem>> {
    let rows = state.store.list_permissions(guard).await?;
    Ok(rows
        .into_iter()
        .map(|row| PermissionItem::new(Some(row.id), row.name))
        .collect())
}

/// Stored permissions of a guard grouped by resource
#[utoipa::path(
    get,
    path = "/api/guards/{guard}/permissions",
    tag = "Guards",
    params(
        ("guard" = String, Path, description = "Guard name"),
        GuardPermissionsQuery,
    ),
    responses(
        (status = 200, description = "Grouped permissions", body = GuardPermissionsResponse),
        (status = 404, description = "Role not found in guard"),
    )
)]
pub async fn guard_permissions(
    State(state): State<AppState>,
    Path(guard): Path<String>,
    Query(query): Query<GuardPermissionsQuery>,
) -> AppResult<Json<GuardPermissionsResponse>> {
    let items = stored_items(&state, &guard).await?;

    let selected: HashSet<i64> = match query.role.as_deref() {
        Some(role_name) => {
            let role = state
                .store
                .find_role(role_name, &guard)
                .await?
                .ok_or_else(|| AppError::not_found(format!("role `{role_name}` not found in guard `{guard}`")))?;
            state.store.role_permission_ids(&role).await?.into_iter().collect()
        }
        None => HashSet::new(),
    };

    let labels = state
        .translator(query.locale.as_deref())
        .translate_many(items.iter().map(|item| item.name.as_str()));
    let groups = build_groups(&items, Some(&labels), &selected);

    Ok(Json(GuardPermissionsResponse {
        guard,
        role: query.role,
        groups,
    }))
}

/// Stored permissions of a guard as a flat, name-sorted list
#[utoipa::path(
    get,
    path = "/api/guards/{guard}/permissions/flat",
    tag = "Guards",
    params(
        ("guard" = String, Path, description = "Guard name"),
        GuardPermissionsQuery,
    ),
    responses((status = 200, description = "Flat permission list", body = Vec<FlatPermission>))
)]
pub async fn guard_permissions_flat(
    State(state): State<AppState>,
    Path(guard): Path<String>,
    Query(query): Query<GuardPermissionsQuery>,
) -> AppResult<Json<Vec<FlatPermission>>> {
    let items = stored_items(&state, &guard).await?;
    let labels = state
        .translator(query.locale.as_deref())
        .translate_many(items.iter().map(|item| item.name.as_str()));
    Ok(Json(build_flat(&items, Some(&labels))))
}
