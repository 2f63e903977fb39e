use std::collections::HashSet;

/// Capability supplied by the host: does this principal hold role `role`?
pub trait RoleHolder {
    fn has_role(&self, role: &str) -> bool;
}

/// Principal with an already loaded role set.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub id: Option<i64>,
    pub roles: HashSet<String>,
}

impl Principal {
    pub fn new(id: i64) -> Self {
        Self {
            id: Some(id),
            roles: HashSet::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = String>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }
}

impl RoleHolder for Principal {
    fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
