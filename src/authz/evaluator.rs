use super::principal::RoleHolder;
use super::SuperAdminRoles;

/// Pre-authorization hook run before any granular check.
///
/// `Some(true)` grants outright, `None` defers to the regular permission
/// check. A bypass policy never denies on its own.
pub trait BypassPolicy: Send + Sync {
    fn before(&self, principal: &dyn RoleHolder) -> Option<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct SuperAdminGate {
    roles: SuperAdminRoles,
}

impl SuperAdminGate {
    pub fn new(roles: SuperAdminRoles) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &SuperAdminRoles {
        &self.roles
    }

    pub fn is_super_admin(&self, principal: &dyn RoleHolder) -> bool {
        self.roles.iter().any(|role| principal.has_role(role))
    }
}

impl BypassPolicy for SuperAdminGate {
    fn before(&self, principal: &dyn RoleHolder) -> Option<bool> {
        if self.is_super_admin(principal) {
            tracing::debug!("super admin bypass");
            return Some(true);
        }
        None
    }
}
