//! Password authentication and role checks.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;

use crate::config::{AuthMode, ShellConfig};

/// Prefix carried by role authorities.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Length of generated passwords.
const GENERATED_PASSWORD_LEN: usize = 16;

/// An authenticated SSH user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    /// Login name.
    pub name: String,
    /// Granted authorities, e.g. `ROLE_ADMIN`.
    ///
    /// `None` means the authenticator has no notion of authorities at all,
    /// which is different from an empty list.
    pub authorities: Option<Vec<String>>,
    /// Peer address, when known.
    pub remote_addr: Option<SocketAddr>,
}

impl Authentication {
    /// Create an authentication without authorities.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authorities: None,
            remote_addr: None,
        }
    }

    /// Set the granted authorities.
    #[must_use]
    pub fn with_authorities<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities = Some(authorities.into_iter().map(Into::into).collect());
        self
    }

    /// Set the peer address.
    #[must_use]
    pub const fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.remote_addr = addr;
        self
    }

    /// Whether any authority matches one of `roles`.
    ///
    /// A user without authorities is authorized.
    #[must_use]
    pub fn has_any_role(&self, roles: &[String]) -> bool {
        check_authorities(roles, self.authorities.as_deref(), true)
    }
}

/// Check whether `authorities` grant one of `authorized_roles`.
///
/// The `ROLE_` prefix is stripped from authorities before comparing.
/// `authorized_if_none` decides the outcome when there are no authorities
/// to check.
#[must_use]
pub fn check_authorities(
    authorized_roles: &[String],
    authorities: Option<&[String]>,
    authorized_if_none: bool,
) -> bool {
    let Some(authorities) = authorities else {
        return authorized_if_none;
    };
    authorities.iter().any(|authority| {
        let role = authority.strip_prefix(ROLE_PREFIX).unwrap_or(authority);
        authorized_roles.iter().any(|r| r == role)
    })
}

/// Checks login credentials.
pub trait PasswordAuthenticator: Send + Sync + fmt::Debug {
    /// Return the authentication for valid credentials, `None` otherwise.
    fn authenticate(
        &self,
        user: &str,
        password: &str,
        remote_addr: Option<SocketAddr>,
    ) -> Option<Authentication>;
}

/// A single user and password.
#[derive(Clone)]
pub struct SimpleAuthenticator {
    user: String,
    password: String,
}

impl fmt::Debug for SimpleAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleAuthenticator")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl SimpleAuthenticator {
    /// Create an authenticator for one user.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// The accepted user name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }
}

impl PasswordAuthenticator for SimpleAuthenticator {
    fn authenticate(
        &self,
        user: &str,
        password: &str,
        remote_addr: Option<SocketAddr>,
    ) -> Option<Authentication> {
        (user == self.user && password == self.password)
            .then(|| Authentication::new(user).with_remote_addr(remote_addr))
    }
}

#[derive(Clone)]
struct StoredUser {
    password: String,
    authorities: Vec<String>,
}

/// A set of users with roles.
#[derive(Clone, Default)]
pub struct UserStore {
    users: HashMap<String, StoredUser>,
}

impl fmt::Debug for UserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.users.keys().collect();
        names.sort();
        f.debug_struct("UserStore").field("users", &names).finish()
    }
}

impl UserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user. Roles are given without the `ROLE_` prefix.
    #[must_use]
    pub fn with_user<I, S>(mut self, name: impl Into<String>, password: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let authorities = roles
            .into_iter()
            .map(|r| format!("{ROLE_PREFIX}{}", r.as_ref()))
            .collect();
        self.users.insert(
            name.into(),
            StoredUser {
                password: password.into(),
                authorities,
            },
        );
        self
    }

    /// Number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the store has no users.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl PasswordAuthenticator for UserStore {
    fn authenticate(
        &self,
        user: &str,
        password: &str,
        remote_addr: Option<SocketAddr>,
    ) -> Option<Authentication> {
        let stored = self.users.get(user)?;
        (stored.password == password).then(|| {
            Authentication::new(user)
                .with_authorities(stored.authorities.iter().cloned())
                .with_remote_addr(remote_addr)
        })
    }
}

/// Generate a random alphanumeric password.
#[must_use]
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Build the authenticator described by the configuration.
///
/// In simple mode without a configured password a random one is generated
/// and logged once.
#[must_use]
pub fn from_config(config: &ShellConfig) -> Arc<dyn PasswordAuthenticator> {
    match config.auth.mode {
        AuthMode::Simple => {
            let password = config.password.clone().unwrap_or_else(|| {
                let generated = generate_password();
                tracing::info!(user = %config.user, password = %generated, "using generated password");
                generated
            });
            Arc::new(SimpleAuthenticator::new(config.user.clone(), password))
        }
        AuthMode::Users => Arc::new(config.auth.users.iter().fold(UserStore::new(), |store, u| {
            store.with_user(u.name.clone(), u.password.clone(), &u.roles)
        })),
    }
}
