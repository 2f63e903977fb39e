use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::authz::SuperAdminRoles;
use crate::definition::{ResourceDefinitions, RoleDefinitions, SpecialDefinitions};
use crate::errors::{AppError, AppResult};
use crate::manager::PermissionManager;
use crate::syncer::DEFAULT_GUARD;

/// The permission definitions file.
///
/// ```json
/// {
///   "permissions": ["users", {"posts": ["publish"]}],
///   "special_permissions": {"users": ["ban"]},
///   "roles": {"admin": "*", "editor": {"posts": "publish"}},
///   "super_admin_role": "admin"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub permissions: ResourceDefinitions,
    #[serde(default)]
    pub special_permissions: SpecialDefinitions,
    #[serde(default)]
    pub roles: RoleDefinitions,
    #[serde(default)]
    pub super_admin_role: SuperAdminRoles,
    #[serde(default = "default_guard")]
    pub default_guard: String,
}

fn default_guard() -> String {
    DEFAULT_GUARD.to_string()
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            permissions: ResourceDefinitions::default(),
            special_permissions: SpecialDefinitions::default(),
            roles: RoleDefinitions::default(),
            super_admin_role: SuperAdminRoles::default(),
            default_guard: default_guard(),
        }
    }
}

impl PermissionsConfig {
    pub fn from_json_str(raw: &str) -> AppResult<Self> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(deserializer).map_err(|err| {
            let path = err.path().to_string();
            AppError::configuration(format!("{path}: {}", err.into_inner()))
        })
    }

    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            AppError::configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        let config = Self::from_json_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            resources = config.permissions.len(),
            roles = config.roles.len(),
            "loaded permissions config"
        );
        Ok(config)
    }

    pub fn manager(&self) -> PermissionManager {
        PermissionManager::new(self.permissions.clone(), self.special_permissions.clone())
            .with_roles(self.roles.clone())
    }
}

/// Process settings read from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub permissions_path: PathBuf,
    pub lang_dir: PathBuf,
    pub locale: String,
    pub fallback_locale: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.trim().is_empty());

        let port = var("APP_PORT")
            .map(|value| value.parse::<u16>())
            .unwrap_or(Ok(8000))
            .map_err(|_| AppError::configuration("APP_PORT must be a valid port number"))?;

        Ok(Self {
            database_url: var("DATABASE_URL"),
            permissions_path: var("PERMISSIONS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config/permissions.json")),
            lang_dir: var("PERMISSIONS_LANG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("lang")),
            locale: var("APP_LOCALE").unwrap_or_else(|| "en".to_string()),
            fallback_locale: var("APP_FALLBACK_LOCALE").unwrap_or_else(|| "en".to_string()),
            port,
        })
    }

    pub fn require_database_url(&self) -> AppResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::configuration("DATABASE_URL not set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_json_path_of_bad_value() {
        let err = PermissionsConfig::from_json_str(r#"{"roles": {"editor": {"posts": [true]}}}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("roles"), "unexpected message: {message}");
        assert!(message.contains("boolean"), "unexpected message: {message}");
    }

    #[test]
    fn missing_sections_default() {
        let config = PermissionsConfig::from_json_str("{}").unwrap();
        assert!(config.permissions.is_empty());
        assert!(config.roles.is_empty());
        assert!(config.super_admin_role.contains("admin"));
        assert_eq!(config.default_guard, "web");
    }
}
