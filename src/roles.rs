//! Role compilation against a permission catalog.
//!
//! Unknown references are dropped rather than failing the compilation; every
//! drop is recorded on the result so strict callers can act on it.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{compose, PermissionCatalog};
use crate::definition::{DefinitionValue, EntryKey, RoleDefinitions};

/// A token from a role definition that matched nothing in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DroppedReference {
    pub role: String,
    /// The name that was looked up, after composing with the resource.
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCompilation {
    pub permissions: Vec<String>,
    pub dropped: Vec<DroppedReference>,
}

pub fn compile_role(role: &str, definition: &DefinitionValue, catalog: &PermissionCatalog) -> RoleCompilation {
    if definition.is_wildcard() {
        return RoleCompilation {
            permissions: catalog.all().to_vec(),
            dropped: Vec::new(),
        };
    }

    let mut permissions: IndexSet<String> = IndexSet::new();
    let mut dropped = Vec::new();
    let mut drop_ref = |reference: String, resource: Option<&str>| {
        tracing::debug!(role, reference = %reference, "dropping unknown role reference");
        dropped.push(DroppedReference {
            role: role.to_string(),
            reference,
            resource: resource.map(str::to_string),
        });
    };

    for (key, items) in definition.entries() {
        match key {
            EntryKey::Index(_) => {
                for item in items.tokens() {
                    let item = item.trim();
                    if item.is_empty() {
                        continue;
                    }
                    if let Some(group) = catalog.permissions_for(item) {
                        permissions.extend(group.iter().cloned());
                    } else if catalog.contains(item) {
                        permissions.insert(item.to_string());
                    } else {
                        drop_ref(item.to_string(), None);
                    }
                }
            }
            EntryKey::Name(resource) => {
                for token in resource_tokens(items) {
                    let name = compose(token, &resource);
                    if catalog.contains(&name) {
                        permissions.insert(name);
                    } else {
                        drop_ref(name, Some(resource.as_str()));
                    }
                }
            }
        }
    }

    RoleCompilation {
        permissions: permissions.into_iter().collect(),
        dropped,
    }
}

/// ASCII whitespace (vertical tab included), commas and pipes.
fn is_token_separator(c: char) -> bool {
    c.is_ascii_whitespace() || matches!(c, '\x0B' | ',' | '|')
}

/// A string value is split on whitespace, commas and pipes; list items are
/// taken verbatim so they may carry full permission names.
fn resource_tokens(items: &DefinitionValue) -> Vec<&str> {
    match items {
        DefinitionValue::Scalar(raw) => raw
            .split(is_token_separator)
            .filter(|token| !token.is_empty())
            .collect(),
        other => other
            .tokens()
            .into_iter()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledRoles {
    roles: IndexMap<String, RoleCompilation>,
}

impl CompiledRoles {
    pub fn get(&self, role: &str) -> Option<&[String]> {
        self.roles.get(role).map(|compiled| compiled.permissions.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.roles
            .iter()
            .map(|(role, compiled)| (role.as_str(), compiled.permissions.as_slice()))
    }

    pub fn dropped(&self) -> impl Iterator<Item = &DroppedReference> {
        self.roles.values().flat_map(|compiled| compiled.dropped.iter())
    }

    pub fn has_dropped(&self) -> bool {
        self.dropped().next().is_some()
    }

    pub fn warn_dropped(&self) {
        for dropped in self.dropped() {
            tracing::warn!(
                role = %dropped.role,
                reference = %dropped.reference,
                "role references a permission missing from the catalog"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn into_map(self) -> IndexMap<String, Vec<String>> {
        self.roles
            .into_iter()
            .map(|(role, compiled)| (role, compiled.permissions))
            .collect()
    }
}

pub fn compile_all_roles(definitions: &RoleDefinitions, catalog: &PermissionCatalog) -> CompiledRoles {
    let roles = definitions
        .iter()
        .map(|(role, definition)| (role.to_string(), compile_role(role, definition, catalog)))
        .collect();
    CompiledRoles { roles }
}
