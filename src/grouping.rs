//! Display shaping for permission lists (role edit screens, pickers).

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const FALLBACK_GROUP: &str = "other";

/// A permission as known to the store; the id is assigned externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionItem {
    pub id: Option<i64>,
    pub name: String,
}

impl PermissionItem {
    pub fn new(id: Option<i64>, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GroupedPermission {
    pub id: Option<i64>,
    pub name: String,
    pub label: String,
    pub search_label: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PermissionGroup {
    pub key: String,
    pub title: String,
    pub items: Vec<GroupedPermission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FlatPermission {
    pub id: Option<i64>,
    pub name: String,
    pub label: String,
    pub search_label: String,
}

/// `users.create` -> `users`, `create users` -> `users`, otherwise `other`.
pub fn group_key(name: &str) -> &str {
    if let Some((head, _)) = name.split_once('.') {
        head
    } else if let Some((_, tail)) = name.split_once(' ') {
        tail
    } else {
        FALLBACK_GROUP
    }
}

/// `inventory_movements` -> `Inventory Movements`.
pub fn format_title(key: &str) -> String {
    key.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn label_for(name: &str, labels: Option<&IndexMap<String, String>>) -> String {
    labels
        .and_then(|labels| labels.get(name))
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

pub fn build_groups(
    permissions: &[PermissionItem],
    labels: Option<&IndexMap<String, String>>,
    selected_ids: &HashSet<i64>,
) -> Vec<PermissionGroup> {
    let mut grouped: BTreeMap<&str, Vec<&PermissionItem>> = BTreeMap::new();
    for permission in permissions {
        grouped.entry(group_key(&permission.name)).or_default().push(permission);
    }

    grouped
        .into_iter()
        .map(|(key, mut items)| {
            items.sort_by(|a, b| a.name.cmp(&b.name));
            let items = items
                .into_iter()
                .map(|item| {
                    let label = label_for(&item.name, labels);
                    GroupedPermission {
                        id: item.id,
                        name: item.name.clone(),
                        search_label: label.to_lowercase(),
                        label,
                        checked: item.id.is_some_and(|id| selected_ids.contains(&id)),
                    }
                })
                .collect();

            PermissionGroup {
                key: key.to_string(),
                title: format_title(key),
                items,
            }
        })
        .collect()
}

pub fn build_flat(permissions: &[PermissionItem], labels: Option<&IndexMap<String, String>>) -> Vec<FlatPermission> {
    let mut items: Vec<&PermissionItem> = permissions.iter().collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    items
        .into_iter()
        .map(|item| {
            let label = label_for(&item.name, labels);
            FlatPermission {
                id: item.id,
                name: item.name.clone(),
                search_label: label.to_lowercase(),
                label,
            }
        })
        .collect()
}
