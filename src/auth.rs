//! Administrative access control
//!
//! The ledger trusts a single admin principal, injected at construction.
//! Every administrative call carries the caller's identity, supplied by the
//! host environment, and is checked against it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Identity of a caller, as established by the host environment
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Principal(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Principal(s.to_string())
    }
}

impl From<String> for Principal {
    fn from(s: String) -> Self {
        Principal(s)
    }
}

/// Gate for administrative operations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessControl {
    admin: Principal,
}

impl AccessControl {
    pub fn new(admin: impl Into<Principal>) -> Self {
        AccessControl {
            admin: admin.into(),
        }
    }

    /// The current admin
    pub fn admin(&self) -> &Principal {
        &self.admin
    }

    /// Fail with `Unauthorized` unless `caller` is the admin
    pub fn ensure_admin(&self, caller: &Principal) -> Result<()> {
        if caller == &self.admin {
            Ok(())
        } else {
            Err(Error::Unauthorized {
                caller: caller.clone(),
            })
        }
    }

    /// Hand the admin role to `new_admin`; only the current admin may do this
    pub fn transfer(&mut self, caller: &Principal, new_admin: Principal) -> Result<()> {
        self.ensure_admin(caller)?;
        if new_admin.0.is_empty() {
            return Err(Error::InvalidInput("admin principal must not be empty".into()));
        }
        info!(from = %self.admin, to = %new_admin, "admin transferred");
        self.admin = new_admin;
        Ok(())
    }
}
