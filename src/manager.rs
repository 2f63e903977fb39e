use indexmap::IndexMap;

use crate::catalog::PermissionCatalog;
use crate::definition::{ResourceDefinitions, RoleDefinitions, SpecialDefinitions};
use crate::roles::{compile_all_roles, CompiledRoles};

/// Holds the raw definitions; every accessor recompiles from them.
#[derive(Debug, Clone, Default)]
pub struct PermissionManager {
    resources: ResourceDefinitions,
    specials: SpecialDefinitions,
    roles: RoleDefinitions,
}

impl PermissionManager {
    pub fn new(resources: ResourceDefinitions, specials: SpecialDefinitions) -> Self {
        Self {
            resources,
            specials,
            roles: RoleDefinitions::new(),
        }
    }

    pub fn with_roles(mut self, roles: RoleDefinitions) -> Self {
        self.roles = roles;
        self
    }

    pub fn catalog(&self) -> PermissionCatalog {
        PermissionCatalog::compile(&self.resources, &self.specials)
    }

    /// Flat, deduplicated permission names.
    pub fn all(&self) -> Vec<String> {
        self.catalog().all().to_vec()
    }

    pub fn compile_roles(&self) -> CompiledRoles {
        let catalog = self.catalog();
        self.compile_roles_with(&catalog)
    }

    pub fn compile_roles_with(&self, catalog: &PermissionCatalog) -> CompiledRoles {
        let compiled = compile_all_roles(&self.roles, catalog);
        tracing::debug!(
            roles = compiled.len(),
            dropped = compiled.dropped().count(),
            "compiled role definitions"
        );
        compiled
    }

    pub fn roles_with_permissions(&self) -> IndexMap<String, Vec<String>> {
        self.compile_roles().into_map()
    }
}
