use std::collections::BTreeSet;

use crate::{Credential, Role};

/// The identity attached to a single request.
///
/// Built by the identity resolver from the credential as it exists at
/// resolution time and discarded with the request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: String,
    roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            subject: subject.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Snapshot the current role set of a stored credential.
    pub fn from_credential(credential: &Credential) -> Self {
        Self {
            subject: credential.username.clone(),
            roles: credential.roles.clone(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// True when at least one of `required` is held (logical OR).
    pub fn has_any_role(&self, required: &BTreeSet<Role>) -> bool {
        !self.roles.is_disjoint(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_role_is_an_intersection_check() {
        let p = Principal::new("mia", [Role::Moderator]);
        let admin_or_mod: BTreeSet<Role> = [Role::Admin, Role::Moderator].into();
        let admin_only: BTreeSet<Role> = [Role::Admin].into();

        assert!(p.has_any_role(&admin_or_mod));
        assert!(!p.has_any_role(&admin_only));
        assert!(!p.has_any_role(&BTreeSet::new()));
    }
}
