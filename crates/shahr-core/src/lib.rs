pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod modules;
pub mod types;

pub use auth::{AuthResult, CredentialVerifier, Credentials, StaticCredentialVerifier};
pub use catalog::{DocumentCatalog, DocumentRecord, DocumentStatus};
pub use config::ShahrConfig;
pub use error::{Result, ShahrError};
pub use identity::{FileIdentityStore, IdentityStore, MemoryIdentityStore, SavedIdentity};
pub use modules::{available_modules, ModuleId};
pub use types::{Permission, Role, User};
