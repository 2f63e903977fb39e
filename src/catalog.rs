//! Permission catalog compilation.
//!
//! A permission is the composite `"{action} {resource}"`. The catalog is the
//! deduplicated union of CRUD/explicit actions and special permissions,
//! grouped by resource in definition order.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::definition::{ResourceDefinitions, SpecialDefinitions};

/// Actions implied by a bare resource name.
pub const DEFAULT_ACTIONS: [&str; 4] = ["read", "create", "update", "destroy"];

pub fn permission_name(action: &str, resource: &str) -> String {
    format!("{action} {resource}")
}

/// Items that already contain a space are full permission names and pass through.
pub fn compose(item: &str, resource: &str) -> String {
    if item.contains(' ') {
        item.to_string()
    } else {
        permission_name(item, resource)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    groups: IndexMap<String, Vec<String>>,
    all: Vec<String>,
    index: HashSet<String>,
}

impl PermissionCatalog {
    pub fn compile(resources: &ResourceDefinitions, specials: &SpecialDefinitions) -> Self {
        let mut catalog = Self::default();

        for (resource, actions) in resources.iter() {
            let names = actions
                .iter()
                .map(|action| permission_name(action, resource))
                .chain(specials.get(resource).iter().map(|item| compose(item, resource)));
            catalog.extend_group(resource, names);
        }

        for (resource, items) in specials.iter() {
            if catalog.groups.contains_key(resource) {
                continue;
            }
            let names = items.iter().map(|item| compose(item, resource));
            catalog.extend_group(resource, names);
        }

        tracing::debug!(
            resources = catalog.groups.len(),
            permissions = catalog.all.len(),
            "compiled permission catalog"
        );

        catalog
    }

    fn extend_group(&mut self, resource: &str, names: impl Iterator<Item = String>) {
        let mut group: Vec<String> = Vec::new();
        for name in names {
            if !group.contains(&name) {
                group.push(name);
            }
        }
        if group.is_empty() {
            return;
        }

        for name in &group {
            if self.index.insert(name.clone()) {
                self.all.push(name.clone());
            }
        }
        self.groups.insert(resource.to_string(), group);
    }

    /// Every permission name once, in resource then action order.
    pub fn all(&self) -> &[String] {
        &self.all
    }

    pub fn by_resource(&self) -> &IndexMap<String, Vec<String>> {
        &self.groups
    }

    pub fn permissions_for(&self, resource: &str) -> Option<&[String]> {
        self.groups.get(resource).map(Vec::as_slice)
    }

    pub fn has_resource(&self, resource: &str) -> bool {
        self.groups.contains_key(resource)
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.index.contains(permission)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

impl Serialize for PermissionCatalog {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.groups.serialize(serializer)
    }
}
