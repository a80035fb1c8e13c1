//! Credential store and per-session login state.
//!
//! The credential artifact is a JSON map of identity -> `{password, stores}`
//! written by `visitboard-sync-users`. Secrets are compared by exact string
//! equality and the submitted secret is dropped right after verification.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::pipeline::Selection;

/// Grant value meaning "every store"; also the label of the All option.
pub const WILDCARD: &str = "All";
pub const DEFAULT_ADMIN: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "123";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub password: String,
    #[serde(default)]
    pub stores: Vec<String>,
}

/// Stores an identity may view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    All,
    Stores(Vec<String>),
}

impl Grant {
    pub fn from_stores(stores: &[String]) -> Self {
        if stores.iter().any(|s| s == WILDCARD) {
            Grant::All
        } else {
            Grant::Stores(stores.to_vec())
        }
    }
}

/// An authenticated principal. Carries no secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub grant: Grant,
}

impl Identity {
    /// Wildcard identities also get the management view.
    pub fn is_admin(&self) -> bool {
        self.grant == Grant::All
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialStore {
    users: BTreeMap<String, Credential>,
}

impl CredentialStore {
    /// Store holding only the built-in administrator.
    pub fn with_default_admin() -> Self {
        let mut store = Self::default();
        store.users.insert(
            DEFAULT_ADMIN.to_string(),
            Credential {
                password: DEFAULT_ADMIN_PASSWORD.to_string(),
                stores: vec![WILDCARD.to_string()],
            },
        );
        store
    }

    /// Load the credential artifact, or the built-in administrator if absent.
    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        if !path.exists() {
            log::warn!(
                "Credential file {} not found, using built-in admin only",
                path.display()
            );
            return Ok(Self::with_default_admin());
        }
        let content = std::fs::read_to_string(path)?;
        let store: CredentialStore = serde_json::from_str(&content).map_err(|e| {
            DashboardError::Configuration(format!(
                "Failed to parse {}: {}",
                path.display(),
                e
            ))
        })?;
        log::info!("Loaded {} credential(s) from {}", store.len(), path.display());
        Ok(store)
    }

    /// Write the artifact atomically (temp file in the same dir, then rename).
    pub fn save(&self, path: &Path) -> Result<(), DashboardError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| DashboardError::Io(e.error))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Add `store` to `user`'s grant, creating the user with `password` if new.
    ///
    /// An existing user keeps the password it was first created with.
    pub fn grant_store(&mut self, user: &str, password: &str, store: &str) {
        match self.users.get_mut(user) {
            Some(cred) => {
                if !cred.stores.iter().any(|s| s == store) {
                    cred.stores.push(store.to_string());
                }
            }
            None => {
                self.users.insert(
                    user.to_string(),
                    Credential {
                        password: password.to_string(),
                        stores: vec![store.to_string()],
                    },
                );
            }
        }
    }

    pub fn get(&self, user: &str) -> Option<&Credential> {
        self.users.get(user)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check an identity/secret pair.
    fn verify(&self, user: &str, secret: &str) -> Option<Identity> {
        let cred = self.users.get(user)?;
        if cred.password != secret {
            return None;
        }
        Some(Identity {
            name: user.to_string(),
            grant: Grant::from_stores(&cred.stores),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous { failed: bool },
    Authenticated(Identity),
}

impl Default for AuthState {
    fn default() -> Self {
        AuthState::Anonymous { failed: false }
    }
}

/// Per-connection session: login state plus transient filter selections.
#[derive(Debug, Default)]
pub struct Session {
    auth: AuthState,
    pub selection: Selection,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.auth {
            AuthState::Authenticated(identity) => Some(identity),
            AuthState::Anonymous { .. } => None,
        }
    }

    /// True after a rejected login, until the next attempt or logout.
    pub fn login_failed(&self) -> bool {
        matches!(self.auth, AuthState::Anonymous { failed: true })
    }

    /// Verify `user`/`secret` against `store`.
    ///
    /// Takes the secret by value so it is dropped here whatever the outcome.
    /// The error does not say which half of the pair was wrong.
    pub fn login(
        &mut self,
        store: &CredentialStore,
        user: &str,
        secret: String,
    ) -> Result<&Identity, DashboardError> {
        let user = user.trim();
        let verified = store.verify(user, &secret);
        drop(secret);

        self.selection = Selection::default();
        match verified {
            Some(identity) => {
                log::info!("Login succeeded for '{}'", identity.name);
                self.auth = AuthState::Authenticated(identity);
                self.identity().ok_or(DashboardError::AuthenticationFailed)
            }
            None => {
                log::warn!("Login failed for '{}'", user);
                self.auth = AuthState::Anonymous { failed: true };
                Err(DashboardError::AuthenticationFailed)
            }
        }
    }

    /// Clear identity, selections, and the error flag.
    pub fn logout(&mut self) {
        if let Some(identity) = self.identity() {
            log::info!("Logout for '{}'", identity.name);
        }
        self.auth = AuthState::default();
        self.selection = Selection::default();
    }
}
