use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Role of an authenticated dashboard user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Operator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Operator => "operator",
        };
        write!(f, "{}", s)
    }
}

/// Capability gating a non-chat dashboard module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Documents,
    Predictions,
    Reports,
    Users,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::Documents => "documents",
            Permission::Predictions => "predictions",
            Permission::Reports => "reports",
            Permission::Users => "users",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// User
// =============================================================================

/// An authenticated user as shown in the dashboard header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name.
    pub name: String,
    pub role: Role,
    /// Municipality the user works for.
    pub municipality: String,
    /// Ordered capability list.
    pub permissions: Vec<Permission>,
}

impl User {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Header line, e.g. `تهران - مدیر سیستم`.
    pub fn header_line(&self) -> String {
        format!("{} - {}", self.municipality, self.name)
    }
}
