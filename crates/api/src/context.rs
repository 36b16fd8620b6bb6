use std::collections::BTreeSet;

use rollcall_auth::{Principal, Role};

/// Principal context for a request (resolved identity + roles).
///
/// Inserted by the authenticate stage only when the gateway resolved a
/// principal; its absence means the request is unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn subject(&self) -> &str {
        self.principal.subject()
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        self.principal.roles()
    }
}
