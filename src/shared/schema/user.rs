use serde::{Deserialize, Serialize};

use crate::shared::entity::{Entity, EntityKind};
use crate::shared::error::SharedError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
    Guest,
}

/// Payload of a user document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub name: String,
    pub email: String,
    pub color: String,
    pub user_role: UserRole,
    pub profile_picture: String,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::Users;
    const ROUTE: &'static str = "/api/users";

    fn validate(&self) -> Result<(), SharedError> {
        if self.name.trim().is_empty() {
            return Err(SharedError::validation("name", "must not be empty"));
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(SharedError::validation("email", "invalid email format"));
        }
        Ok(())
    }
}
