use serde::{Deserialize, Serialize};

use crate::dates::overwrite;
use crate::entity::{Content, EntityKind, Record};

pub type User = Record<UserContent>;

/// Role a user plays on a project.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectRole {
    #[default]
    Unspecified,
    /// Project manager.
    Pm,
    /// Engineering manager.
    Em,
    Dev,
    Qa,
    /// Business analyst.
    Ba,
    Ux,
    /// Other.
    O,
}

/// Role a user plays in the scrum process.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScrumRole {
    #[default]
    Unspecified,
    /// Product owner.
    Po,
    /// Scrum master.
    Sm,
    Member,
    /// Other.
    O,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserContent {
    pub email: String,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub project_roles: Vec<ProjectRole>,
    pub scrum_roles: Vec<ScrumRole>,
}

impl Content for UserContent {
    const KIND: EntityKind = EntityKind::User;

    fn email(&self) -> &str {
        &self.email
    }

    fn merge(&mut self, patch: &Self) {
        overwrite(&mut self.email, &patch.email);
        overwrite(&mut self.phone, &patch.phone);
        overwrite(&mut self.first_name, &patch.first_name);
        overwrite(&mut self.last_name, &patch.last_name);
        if !patch.project_roles.is_empty() {
            self.project_roles = patch.project_roles.clone();
        }
        if !patch.scrum_roles.is_empty() {
            self.scrum_roles = patch.scrum_roles.clone();
        }
    }
}
