//! Human labels for permission names.
//!
//! Lookups go through a [`Dictionary`] keyed by locale and a namespaced key
//! (`special.*`, `dictionary.*`, `actions.*`, `resources.*`).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::{AppError, AppResult};

/// File name of the per-locale translation file inside a lang directory.
pub const LANG_FILE: &str = "permissions.json";

pub trait Dictionary: Send + Sync {
    fn get(&self, locale: &str, key: &str) -> Option<String>;

    fn has(&self, locale: &str, key: &str) -> bool {
        self.get(locale, key).is_some()
    }
}

/// In-memory dictionary, usually loaded from `lang/{locale}/permissions.json`.
#[derive(Debug, Clone, Default)]
pub struct LangDictionary {
    lines: HashMap<String, HashMap<String, String>>,
}

impl LangDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lines<K, V>(&mut self, locale: &str, lines: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let table = self.lines.entry(locale.to_string()).or_default();
        for (key, value) in lines {
            table.insert(key.into(), value.into());
        }
    }

    /// Flattens nested sections into `section.key` lines. Non-string leaves
    /// are rejected.
    pub fn add_json(&mut self, locale: &str, document: &Value) -> AppResult<()> {
        let mut flat = Vec::new();
        flatten(document, String::new(), &mut flat)?;
        self.add_lines(locale, flat);
        Ok(())
    }

    /// Loads every `{dir}/{locale}/permissions.json`. A missing directory
    /// yields an empty dictionary.
    pub fn load_dir(dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = dir.as_ref();
        let mut dictionary = Self::new();
        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "lang directory not found; labels fall back to names");
            return Ok(dictionary);
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path().join(LANG_FILE);
            if !path.is_file() {
                continue;
            }
            let locale = entry.file_name().to_string_lossy().into_owned();
            let raw = fs::read_to_string(&path)?;
            let document: Value = serde_json::from_str(&raw).map_err(|err| {
                AppError::configuration(format!("invalid translation file {}: {err}", path.display()))
            })?;
            dictionary.add_json(&locale, &document)?;
            tracing::debug!(locale = %locale, "loaded permission translations");
        }

        Ok(dictionary)
    }

    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.lines.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }
}

fn flatten(value: &Value, prefix: String, out: &mut Vec<(String, String)>) -> AppResult<()> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let next = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(child, next, out)?;
            }
            Ok(())
        }
        Value::String(label) => {
            out.push((prefix, label.clone()));
            Ok(())
        }
        _ => Err(AppError::configuration(format!(
            "translation `{prefix}` must be a string"
        ))),
    }
}

impl Dictionary for LangDictionary {
    fn get(&self, locale: &str, key: &str) -> Option<String> {
        self.lines.get(locale).and_then(|table| table.get(key)).cloned()
    }
}

/// Lowercase, trim, turn `.` `-` `:` `/` into spaces and collapse whitespace.
pub fn normalize_key(permission: &str) -> String {
    permission
        .trim()
        .to_lowercase()
        .replace(['.', '-', ':', '/'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone, Copy)]
enum Section {
    Special,
    Dictionary,
    Actions,
    Resources,
}

impl Section {
    fn prefix(self) -> &'static str {
        match self {
            Section::Special => "special",
            Section::Dictionary => "dictionary",
            Section::Actions => "actions",
            Section::Resources => "resources",
        }
    }
}

pub struct Translator<'a> {
    dictionary: &'a dyn Dictionary,
    locale: String,
    fallback_locale: Option<String>,
}

impl<'a> Translator<'a> {
    pub fn new(dictionary: &'a dyn Dictionary, locale: impl Into<String>) -> Self {
        Self {
            dictionary,
            locale: locale.into(),
            fallback_locale: None,
        }
    }

    /// Locale consulted when the active one has no entry for a key.
    pub fn with_fallback(mut self, locale: impl Into<String>) -> Self {
        let locale = locale.into();
        if locale != self.locale {
            self.fallback_locale = Some(locale);
        }
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    fn lookup(&self, section: Section, key: &str) -> Option<String> {
        let key = format!("{}.{}", section.prefix(), key);
        self.dictionary.get(&self.locale, &key).or_else(|| {
            self.fallback_locale
                .as_deref()
                .and_then(|fallback| self.dictionary.get(fallback, &key))
        })
    }

    pub fn translate(&self, permission: &str) -> String {
        let normalized = normalize_key(permission);

        if let Some(label) = self
            .lookup(Section::Special, &normalized)
            .or_else(|| self.lookup(Section::Dictionary, &normalized))
        {
            return label;
        }

        let parts: Vec<&str> = normalized.split(' ').collect();
        if parts.len() < 2 {
            return self
                .lookup(Section::Actions, &normalized)
                .or_else(|| self.lookup(Section::Resources, &normalized))
                .unwrap_or_else(|| permission.to_string());
        }

        let (action, resource) = (parts[0], parts[1..].join(" "));
        if let Some(label) = self.compose(action, &resource) {
            return label;
        }

        // Legacy names put the action last: "users create".
        let (resource, action) = (parts[..parts.len() - 1].join(" "), parts[parts.len() - 1]);
        if let Some(label) = self.compose(action, &resource) {
            return label;
        }

        permission.to_string()
    }

    /// `None` when neither side translated.
    fn compose(&self, action: &str, resource: &str) -> Option<String> {
        let translated_action = self.translate_action(action);
        let translated_resource = self.translate_resource(resource);
        if translated_action == action && translated_resource == resource {
            return None;
        }
        Some(format!("{translated_action} {translated_resource}").trim().to_string())
    }

    fn translate_action(&self, action: &str) -> String {
        self.lookup(Section::Actions, action)
            .or_else(|| self.lookup(Section::Dictionary, action))
            .unwrap_or_else(|| action.to_string())
    }

    fn translate_resource(&self, resource: &str) -> String {
        self.lookup(Section::Resources, resource)
            .or_else(|| self.lookup(Section::Dictionary, resource))
            .unwrap_or_else(|| self.translate_resource_tokens(resource))
    }

    /// Word by word, for compound resources such as `inventory_movements`.
    /// Untranslated words are kept, so the result is always space-joined.
    fn translate_resource_tokens(&self, resource: &str) -> String {
        resource
            .split([' ', '_'])
            .filter(|token| !token.is_empty())
            .map(|token| {
                self.lookup(Section::Resources, token)
                    .or_else(|| self.lookup(Section::Dictionary, token))
                    .unwrap_or_else(|| token.to_string())
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    pub fn translate_many<I, S>(&self, permissions: I) -> IndexMap<String, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        permissions
            .into_iter()
            .map(|permission| {
                let permission = permission.as_ref();
                (permission.to_string(), self.translate(permission))
            })
            .collect()
    }
}
