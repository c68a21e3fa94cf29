use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trust level of a verified caller: `service > admin > owner >
/// editor > viewer`. Issued by the external authentication service;
/// this core only ever consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityRole {
    Viewer,
    Editor,
    Owner,
    Admin,
    Service,
}

impl IdentityRole {
    pub fn is_superuser(self) -> bool {
        matches!(self, IdentityRole::Admin | IdentityRole::Service)
    }

    pub fn at_least(self, required: IdentityRole) -> bool {
        self >= required
    }
}

/// The caller, as resolved at the HTTP/CLI boundary from a verified
/// JWT. `exp` is only used to reject stale tokens; this core never
/// mints or renews one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub role: IdentityRole,
    pub exp: i64,
}

impl Identity {
    pub fn service() -> Self {
        Self { id: Uuid::nil(), role: IdentityRole::Service, exp: i64::MAX }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_level_ordering_matches_the_glossary() {
        assert!(IdentityRole::Service > IdentityRole::Admin);
        assert!(IdentityRole::Admin > IdentityRole::Owner);
        assert!(IdentityRole::Owner > IdentityRole::Editor);
        assert!(IdentityRole::Editor > IdentityRole::Viewer);
    }

    #[test]
    fn admin_and_service_are_superusers_only() {
        assert!(IdentityRole::Admin.is_superuser());
        assert!(IdentityRole::Service.is_superuser());
        assert!(!IdentityRole::Owner.is_superuser());
    }
}
