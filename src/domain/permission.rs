use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Viewer,
    Editor,
    Owner,
}

impl MemberRole {
    pub fn can_write(self) -> bool {
        matches!(self, MemberRole::Editor | MemberRole::Owner)
    }

    pub fn can_administer(self) -> bool {
        matches!(self, MemberRole::Owner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "target_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Kb,
    Document,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub target_id: Uuid,
    pub target_kind: TargetKind,
    pub role: MemberRole,
    pub granted_by: Uuid,
    pub granted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_cannot_write_editor_and_owner_can() {
        assert!(!MemberRole::Viewer.can_write());
        assert!(MemberRole::Editor.can_write());
        assert!(MemberRole::Owner.can_write());
    }

    #[test]
    fn only_owner_administers() {
        assert!(!MemberRole::Editor.can_administer());
        assert!(MemberRole::Owner.can_administer());
    }
}
