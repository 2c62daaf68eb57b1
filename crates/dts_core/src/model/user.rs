//! Minimal user directory model.
//!
//! Users exist so documents and checkpoints can name who created or
//! completed them. Credentials and sessions belong to the hosting layer.

use crate::model::validation::{normalize_name, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

pub const USERNAME_MAX_CHARS: usize = 150;

/// Coarse role used by front ends to gate editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Staff,
    Viewer,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "staff" => Some(Self::Staff),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub role: UserRole,
    pub is_active: bool,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn can_edit_documents(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Staff)
    }
}

/// Write model for a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub role: UserRole,
}

impl NewUser {
    /// Builds a viewer with only a username set.
    pub fn new(username: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            username: normalize_name("username", username, USERNAME_MAX_CHARS)?,
            full_name: String::new(),
            email: String::new(),
            department: String::new(),
            role: UserRole::Viewer,
        })
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_full_name(mut self, full_name: &str) -> Self {
        self.full_name = full_name.trim().to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.trim().to_string();
        self
    }

    pub fn with_department(mut self, department: &str) -> Self {
        self.department = department.trim().to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{NewUser, UserRole};

    #[test]
    fn role_round_trips_through_storage_text() {
        for role in [UserRole::Admin, UserRole::Staff, UserRole::Viewer] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("root"), None);
    }

    #[test]
    fn new_user_defaults_to_viewer() {
        let user = NewUser::new(" clerk ").unwrap();
        assert_eq!(user.username, "clerk");
        assert_eq!(user.role, UserRole::Viewer);
    }
}
