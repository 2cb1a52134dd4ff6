//! Credential verification.
//!
//! The dashboard login is checked by an injected [`CredentialVerifier`]. The
//! shipped implementation is a fixed demo table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Permission, Role, User};

/// Login form contents.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub municipality: String,
}

/// Outcome of a credential check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthResult {
    Authorized(User),
    Rejected,
}

/// Checks login credentials.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credentials: &Credentials) -> AuthResult;
}

struct Account {
    username: String,
    password: String,
    user: User,
}

/// Verifier backed by an in-memory account table.
pub struct StaticCredentialVerifier {
    accounts: Vec<Account>,
}

impl StaticCredentialVerifier {
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
        }
    }

    /// Add an account. Lookups use the first account with a matching username.
    pub fn with_account(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        user: User,
    ) -> Self {
        self.accounts.push(Account {
            username: username.into(),
            password: password.into(),
            user,
        });
        self
    }

    /// The three demo accounts (`admin/admin`, `manager/manager`,
    /// `operator/operator`).
    pub fn demo() -> Self {
        Self::new()
            .with_account(
                "admin",
                "admin",
                User {
                    name: "مدیر سیستم".to_string(),
                    role: Role::Admin,
                    municipality: "تهران".to_string(),
                    permissions: vec![
                        Permission::Documents,
                        Permission::Predictions,
                        Permission::Reports,
                        Permission::Users,
                    ],
                },
            )
            .with_account(
                "manager",
                "manager",
                User {
                    name: "مدیر شهرداری".to_string(),
                    role: Role::Manager,
                    municipality: "اصفهان".to_string(),
                    permissions: vec![Permission::Predictions, Permission::Reports],
                },
            )
            .with_account(
                "operator",
                "operator",
                User {
                    name: "اپراتور".to_string(),
                    role: Role::Operator,
                    municipality: "مشهد".to_string(),
                    permissions: vec![Permission::Documents],
                },
            )
    }
}

impl Default for StaticCredentialVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialVerifier for StaticCredentialVerifier {
    fn verify(&self, credentials: &Credentials) -> AuthResult {
        let username = credentials.username.trim();
        match self.accounts.iter().find(|a| a.username == username) {
            Some(account) if account.password == credentials.password => {
                debug!(username, "Credentials accepted");
                AuthResult::Authorized(account.user.clone())
            }
            _ => {
                debug!(username, "Credentials rejected");
                AuthResult::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
            municipality: String::new(),
        }
    }

    #[test]
    fn test_demo_admin_authorized() {
        let verifier = StaticCredentialVerifier::demo();
        match verifier.verify(&creds("admin", "admin")) {
            AuthResult::Authorized(user) => {
                assert_eq!(user.role, Role::Admin);
                assert_eq!(user.municipality, "تهران");
                assert_eq!(user.permissions.len(), 4);
            }
            AuthResult::Rejected => panic!("admin should be authorized"),
        }
    }

    #[test]
    fn test_demo_manager_permissions() {
        let verifier = StaticCredentialVerifier::demo();
        let AuthResult::Authorized(user) = verifier.verify(&creds("manager", "manager")) else {
            panic!("manager should be authorized");
        };
        assert_eq!(
            user.permissions,
            vec![Permission::Predictions, Permission::Reports]
        );
    }

    #[test]
    fn test_username_is_trimmed() {
        let verifier = StaticCredentialVerifier::demo();
        assert!(matches!(
            verifier.verify(&creds("  operator ", "operator")),
            AuthResult::Authorized(_)
        ));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let verifier = StaticCredentialVerifier::demo();
        assert_eq!(verifier.verify(&creds("admin", "hunter2")), AuthResult::Rejected);
    }

    #[test]
    fn test_unknown_user_rejected() {
        let verifier = StaticCredentialVerifier::demo();
        assert_eq!(verifier.verify(&creds("guest", "guest")), AuthResult::Rejected);
    }

    #[test]
    fn test_empty_table_rejects_everything() {
        let verifier = StaticCredentialVerifier::new();
        assert_eq!(verifier.verify(&creds("admin", "admin")), AuthResult::Rejected);
    }

    #[test]
    fn test_municipality_does_not_override_table() {
        let verifier = StaticCredentialVerifier::demo();
        let credentials = Credentials {
            municipality: "شیراز".to_string(),
            ..creds("operator", "operator")
        };
        let AuthResult::Authorized(user) = verifier.verify(&credentials) else {
            panic!("operator should be authorized");
        };
        assert_eq!(user.municipality, "مشهد");
    }
}
