use serde::{Deserialize, Serialize};

use crate::dates::overwrite;
use crate::entity::{Content, EntityKind, Record};
use crate::id::IdUuid;

pub type Team = Record<TeamContent>;

/// Team membership and scrum leadership, referencing users by `{ID, UUID}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamContent {
    pub email: String,
    pub members: Vec<IdUuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_owner: Option<IdUuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrum_master: Option<IdUuid>,
}

impl Content for TeamContent {
    const KIND: EntityKind = EntityKind::Team;

    fn email(&self) -> &str {
        &self.email
    }

    fn merge(&mut self, patch: &Self) {
        overwrite(&mut self.email, &patch.email);
        if !patch.members.is_empty() {
            self.members = patch.members.clone();
        }
        if patch.product_owner.is_some() {
            self.product_owner = patch.product_owner.clone();
        }
        if patch.scrum_master.is_some() {
            self.scrum_master = patch.scrum_master.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_leadership_when_patch_omits_it() {
        let mut content = TeamContent {
            email: "core@x".into(),
            members: vec![IdUuid::new("u1", "a")],
            product_owner: Some(IdUuid::new("u1", "a")),
            scrum_master: None,
        };
        content.merge(&TeamContent {
            scrum_master: Some(IdUuid::new("u2", "b")),
            ..TeamContent::default()
        });

        assert_eq!(content.email, "core@x");
        assert_eq!(content.members.len(), 1);
        assert_eq!(content.product_owner, Some(IdUuid::new("u1", "a")));
        assert_eq!(content.scrum_master, Some(IdUuid::new("u2", "b")));
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let content: TeamContent =
            serde_json::from_value(serde_json::json!({"email": "core@x"})).unwrap();
        assert!(content.members.is_empty());
        assert!(content.product_owner.is_none());
        assert_eq!(Team::default().kind(), EntityKind::Team);
    }
}
