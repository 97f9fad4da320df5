use serde::{Deserialize, Serialize};

/// Role asserted for the acting user by the upstream proxy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// May create content anywhere.
    Admin,
    /// May create content anywhere.
    Editor,
    /// Read-only; every wizard entry is hidden.
    Viewer,
}

impl UserRole {
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Editor => "Editor",
            UserRole::Viewer => "Viewer",
        }
    }

    pub fn from_str(s: &str) -> Option<UserRole> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "editor" => Some(UserRole::Editor),
            "viewer" => Some(UserRole::Viewer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
            UserRole::Viewer => "viewer",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CurrentUser {
    pub username: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn new(username: impl Into<String>, role: UserRole) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous", UserRole::Viewer)
    }

    pub fn is_anonymous(&self) -> bool {
        self.username == "anonymous"
    }

    pub fn can_add_content(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Editor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(UserRole::from_str(" Editor "), Some(UserRole::Editor));
        assert_eq!(UserRole::from_str("ADMIN"), Some(UserRole::Admin));
        assert!(UserRole::from_str("owner").is_none());
    }

    #[test]
    fn anonymous_cannot_add() {
        let user = CurrentUser::anonymous();
        assert!(user.is_anonymous());
        assert!(!user.can_add_content());
        assert!(CurrentUser::new("ann", UserRole::Editor).can_add_content());
    }
}
