use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Access level of a user. Variants are ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Manager,
    Admin,
    GlobalAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
            Role::GlobalAdmin => "GlobalAdmin",
        }
    }

    /// Whether a caller holding `self` may hand out `target` to another user.
    pub fn can_assign(&self, target: Role) -> bool {
        match self {
            Role::GlobalAdmin => true,
            Role::Admin => target <= Role::Admin,
            _ => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            "globaladmin" | "global_admin" => Ok(Role::GlobalAdmin),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}
