//! Shape-polymorphic definition values.
//!
//! Resource, special-permission and role definitions are authored as loose
//! nested JSON: a value may be a string, a list or an object depending on
//! where it sits. Everything is funnelled through [`DefinitionValue`] and
//! normalised here before any compilation runs.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::catalog::DEFAULT_ACTIONS;
use crate::errors::{AppError, AppResult};

/// Key of a definition entry: either positional (no explicit resource) or named.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKey {
    Index(usize),
    Name(String),
}

impl EntryKey {
    fn parse(key: &str) -> Self {
        if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = key.parse::<usize>() {
                return EntryKey::Index(index);
            }
        }
        EntryKey::Name(key.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionValue {
    Scalar(String),
    List(Vec<DefinitionValue>),
    Mapping(Vec<(EntryKey, DefinitionValue)>),
}

impl DefinitionValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        DefinitionValue::Scalar(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DefinitionValue::List(items.into_iter().map(|s| DefinitionValue::Scalar(s.into())).collect())
    }

    /// Converts raw JSON, rejecting numbers, booleans and nulls with the path
    /// of the offending value.
    pub fn from_json(value: &Value) -> AppResult<Self> {
        Self::from_json_at(value, "$")
    }

    fn from_json_at(value: &Value, path: &str) -> AppResult<Self> {
        match value {
            Value::String(s) => Ok(DefinitionValue::Scalar(s.clone())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Self::from_json_at(item, &format!("{path}[{i}]")))
                .collect::<AppResult<Vec<_>>>()
                .map(DefinitionValue::List),
            Value::Object(map) => map
                .iter()
                .map(|(key, item)| {
                    let child = Self::from_json_at(item, &format!("{path}.{key}"))?;
                    Ok((EntryKey::parse(key), child))
                })
                .collect::<AppResult<Vec<_>>>()
                .map(DefinitionValue::Mapping),
            other => Err(AppError::definition(format!(
                "{path}: expected a string, list or object, found {}",
                json_type_name(other)
            ))),
        }
    }

    /// Entries of this value with scalars wrapped into a single positional
    /// entry. Objects nested inside a list contribute their named entries
    /// inline, so `["users", {"posts": ["publish"]}]` reads as one mapping.
    pub fn entries(&self) -> Vec<(EntryKey, &DefinitionValue)> {
        match self {
            DefinitionValue::Scalar(_) => vec![(EntryKey::Index(0), self)],
            DefinitionValue::List(items) => {
                let mut entries = Vec::with_capacity(items.len());
                let mut position = 0;
                for item in items {
                    match item {
                        DefinitionValue::Mapping(inner) => {
                            entries.extend(inner.iter().map(|(key, value)| (key.clone(), value)));
                        }
                        _ => {
                            entries.push((EntryKey::Index(position), item));
                            position += 1;
                        }
                    }
                }
                entries
            }
            DefinitionValue::Mapping(inner) => inner.iter().map(|(key, value)| (key.clone(), value)).collect(),
        }
    }

    /// All scalar leaves, in authoring order.
    pub fn tokens(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            DefinitionValue::Scalar(s) => out.push(s.as_str()),
            DefinitionValue::List(items) => items.iter().for_each(|item| item.collect_tokens(out)),
            DefinitionValue::Mapping(inner) => inner.iter().for_each(|(_, item)| item.collect_tokens(out)),
        }
    }

    /// `"*"` itself, or a collection whose first item is `"*"`.
    pub fn is_wildcard(&self) -> bool {
        let first = match self {
            DefinitionValue::Scalar(s) => return s == "*",
            DefinitionValue::List(items) => items.first(),
            DefinitionValue::Mapping(inner) => inner.first().map(|(_, value)| value),
        };
        matches!(first, Some(DefinitionValue::Scalar(s)) if s == "*")
    }
}

impl<'de> Deserialize<'de> for DefinitionValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        DefinitionValue::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn push_unique(target: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !target.iter().any(|existing| existing == value) {
        target.push(value.to_string());
    }
}

/// Resource name -> actions. Positional entries get the default CRUD set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDefinitions {
    resources: IndexMap<String, Vec<String>>,
}

impl ResourceDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: &DefinitionValue) -> Self {
        let mut defs = Self::new();
        for (key, item) in value.entries() {
            match key {
                EntryKey::Index(_) => {
                    for resource in item.tokens() {
                        defs.add(resource, DEFAULT_ACTIONS.iter().copied());
                    }
                }
                EntryKey::Name(resource) => {
                    let actions = item.tokens();
                    defs.add(&resource, actions);
                }
            }
        }
        defs
    }

    /// Resource with the default CRUD actions.
    pub fn crud(mut self, resource: &str) -> Self {
        self.add(resource, DEFAULT_ACTIONS.iter().copied());
        self
    }

    /// Resource with explicit actions.
    pub fn with_actions<'a>(mut self, resource: &str, actions: impl IntoIterator<Item = &'a str>) -> Self {
        self.add(resource, actions);
        self
    }

    /// Repeated resources merge their actions.
    pub fn add<'a>(&mut self, resource: &str, actions: impl IntoIterator<Item = &'a str>) {
        let resource = resource.trim();
        if resource.is_empty() {
            tracing::debug!("skipping resource definition with an empty name");
            return;
        }
        let entry = self.resources.entry(resource.to_string()).or_default();
        for action in actions {
            push_unique(entry, action.trim());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl<'de> Deserialize<'de> for ResourceDefinitions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        DefinitionValue::deserialize(deserializer).map(|value| Self::from_value(&value))
    }
}

/// Resource name -> non-CRUD actions or already composed permission names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialDefinitions {
    specials: IndexMap<String, Vec<String>>,
}

impl SpecialDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: &DefinitionValue) -> Self {
        let mut defs = Self::new();
        for (key, item) in value.entries() {
            match key {
                EntryKey::Name(resource) => defs.add(&resource, item.tokens()),
                EntryKey::Index(_) => {
                    tracing::debug!(items = ?item.tokens(), "special permissions need a resource key; skipping");
                }
            }
        }
        defs
    }

    pub fn with<'a>(mut self, resource: &str, items: impl IntoIterator<Item = &'a str>) -> Self {
        self.add(resource, items);
        self
    }

    pub fn add<'a>(&mut self, resource: &str, items: impl IntoIterator<Item = &'a str>) {
        let resource = resource.trim();
        if resource.is_empty() {
            tracing::debug!("skipping special permissions with an empty resource name");
            return;
        }
        let entry = self.specials.entry(resource.to_string()).or_default();
        for item in items {
            push_unique(entry, item.trim());
        }
    }

    pub fn get(&self, resource: &str) -> &[String] {
        self.specials.get(resource).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.specials.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.specials.is_empty()
    }
}

impl<'de> Deserialize<'de> for SpecialDefinitions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        DefinitionValue::deserialize(deserializer).map(|value| Self::from_value(&value))
    }
}

/// Role name -> raw role definition, in authoring order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDefinitions {
    roles: IndexMap<String, DefinitionValue>,
}

impl RoleDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: &DefinitionValue) -> AppResult<Self> {
        let DefinitionValue::Mapping(entries) = value else {
            return Err(AppError::definition("roles must be an object of role name to definition"));
        };

        let mut defs = Self::new();
        for (key, definition) in entries {
            let name = match key {
                EntryKey::Name(name) => name.clone(),
                EntryKey::Index(index) => index.to_string(),
            };
            defs.roles.insert(name, definition.clone());
        }
        Ok(defs)
    }

    pub fn with(mut self, role: impl Into<String>, definition: DefinitionValue) -> Self {
        self.roles.insert(role.into(), definition);
        self
    }

    pub fn get(&self, role: &str) -> Option<&DefinitionValue> {
        self.roles.get(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DefinitionValue)> {
        self.roles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl<'de> Deserialize<'de> for RoleDefinitions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = DefinitionValue::deserialize(deserializer)?;
        if let DefinitionValue::List(items) = &value {
            if items.is_empty() {
                return Ok(Self::new());
            }
        }
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digit_object_keys_are_positional() {
        let value = DefinitionValue::from_json(&json!({"0": "users", "posts": "publish"})).unwrap();
        let keys: Vec<_> = value.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![EntryKey::Index(0), EntryKey::Name("posts".into())]);
    }

    #[test]
    fn mixed_list_inlines_named_entries() {
        let value = DefinitionValue::from_json(&json!(["users", {"posts": ["publish"]}])).unwrap();
        let defs = ResourceDefinitions::from_value(&value);
        let collected: Vec<_> = defs.iter().map(|(r, a)| (r.to_string(), a.to_vec())).collect();
        assert_eq!(collected[0].0, "users");
        assert_eq!(collected[0].1.len(), 4);
        assert_eq!(collected[1], ("posts".to_string(), vec!["publish".to_string()]));
    }

    #[test]
    fn rejects_numbers_with_path() {
        let err = DefinitionValue::from_json(&json!({"users": ["read", 5]})).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("$.users[1]"), "unexpected message: {message}");
        assert!(message.contains("number"));
    }

    #[test]
    fn wildcard_detection() {
        assert!(DefinitionValue::scalar("*").is_wildcard());
        assert!(DefinitionValue::list(["*", "users"]).is_wildcard());
        assert!(!DefinitionValue::list(["users", "*"]).is_wildcard());
        assert!(!DefinitionValue::scalar("users").is_wildcard());
    }

    #[test]
    fn scalar_resource_value_is_wrapped() {
        let value = DefinitionValue::from_json(&json!({"users": "ban"})).unwrap();
        let defs = ResourceDefinitions::from_value(&value);
        assert_eq!(defs.iter().next().unwrap().1, ["ban".to_string()]);
    }

    #[test]
    fn roles_must_be_an_object() {
        let value = DefinitionValue::from_json(&json!(["admin"])).unwrap();
        assert!(RoleDefinitions::from_value(&value).is_err());
    }
}
