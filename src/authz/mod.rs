//! Authorizer boundary - super admin bypass
//!
//! The crate never checks whether a principal holds a role itself; the host
//! supplies that capability through [`RoleHolder`]. What lives here is the
//! configured super admin role set and the bypass decision built on it.

mod evaluator;
mod principal;

pub use evaluator::{BypassPolicy, SuperAdminGate};
pub use principal::{Principal, RoleHolder};

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Role used when nothing is configured.
pub const DEFAULT_SUPER_ADMIN_ROLE: &str = "admin";

/// One or more role names that bypass granular permission checks.
///
/// Accepts either a single string or a list of strings when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SuperAdminRoles(Vec<String>);

impl SuperAdminRoles {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for role in roles {
            let role = role.into();
            let role = role.trim();
            if !role.is_empty() && !names.iter().any(|existing| existing == role) {
                names.push(role.to_string());
            }
        }
        Self(names)
    }

    pub fn single(role: impl Into<String>) -> Self {
        Self::new([role.into()])
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|name| name == role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SuperAdminRoles {
    fn default() -> Self {
        Self::single(DEFAULT_SUPER_ADMIN_ROLE)
    }
}

impl<'de> Deserialize<'de> for SuperAdminRoles {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(role) => Self::single(role),
            OneOrMany::Many(roles) => Self::new(roles),
        })
    }
}
