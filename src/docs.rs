use axum::Json;
use utoipa::OpenApi;

use crate::grouping::{FlatPermission, GroupedPermission, PermissionGroup};
use crate::roles::DroppedReference;
use crate::routes::{catalog, guards, health};
use crate::syncer::SyncReport;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        catalog::get_catalog,
        catalog::get_roles,
        catalog::translate,
        guards::sync_guard,
        guards::guard_permissions,
        guards::guard_permissions_flat,
    ),
    components(
        schemas(
            health::HealthResponse,
            catalog::CatalogResponse,
            catalog::RolesResponse,
            catalog::TranslateResponse,
            guards::GuardPermissionsResponse,
            DroppedReference,
            SyncReport,
            PermissionGroup,
            GroupedPermission,
            FlatPermission,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database probe"),
        (name = "Catalog", description = "Compiled permissions, roles and labels"),
        (name = "Guards", description = "Sync and display per guard")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
