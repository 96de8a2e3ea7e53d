//! Caller identity and capability policy.
//!
//! Authorisation is decided at the boundary (REST handlers, CLI) before a lifecycle
//! operation runs. The state machine itself never looks at roles.

use crate::error::{LifecycleError, LifecycleResult};
use crate::validation::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Staff roles known to the ward/lab system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ChargeNurse,
    LabStaff,
    Quality,
}

/// Actions a boundary layer may need to authorise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    SubmitAddon,
    ReviewAddon,
    ViewRequests,
    ViewAnalytics,
    ViewDirectory,
    ManageDirectory,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::ChargeNurse, Role::LabStaff, Role::Quality];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ChargeNurse => "charge_nurse",
            Role::LabStaff => "lab_staff",
            Role::Quality => "quality",
        }
    }

    /// Returns true if this role is granted `capability`.
    pub fn grants(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => true,
            Role::ChargeNurse => matches!(capability, SubmitAddon | ViewRequests | ViewDirectory),
            Role::LabStaff => matches!(capability, ReviewAddon | ViewRequests | ViewDirectory),
            Role::Quality => matches!(capability, ViewRequests | ViewAnalytics | ViewDirectory),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| LifecycleError::Validation(format!("unknown role '{s}'")))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::SubmitAddon => "submit add-on requests",
            Capability::ReviewAddon => "review add-on requests",
            Capability::ViewRequests => "view add-on requests",
            Capability::ViewAnalytics => "view analytics",
            Capability::ViewDirectory => "view the ward directory",
            Capability::ManageDirectory => "maintain the ward directory",
        };
        f.write_str(name)
    }
}

/// The authenticated identity on whose behalf an operation runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: NonEmptyText,
    pub name: NonEmptyText,
    pub role: Role,
}

impl Caller {
    /// Builds a caller from raw boundary values.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] if the id or name is blank or the role is unknown.
    pub fn new(user_id: &str, name: &str, role: &str) -> LifecycleResult<Self> {
        Ok(Self {
            user_id: NonEmptyText::new("user id", user_id)?,
            name: NonEmptyText::new("user name", name)?,
            role: role.parse()?,
        })
    }

    /// Fails with [`LifecycleError::Forbidden`] unless the caller's role grants `capability`.
    pub fn require(&self, capability: Capability) -> LifecycleResult<()> {
        if self.role.grants(capability) {
            Ok(())
        } else {
            tracing::warn!(
                user = %self.user_id,
                role = %self.role,
                "denied: not permitted to {}",
                capability
            );
            Err(LifecycleError::Forbidden {
                role: self.role,
                capability,
            })
        }
    }
}
