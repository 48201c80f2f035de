//! Scope Keys
//!
//! All registry and navigation state is partitioned by (user, owner).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies an end user / session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Masked form used in logs (first four hex characters)
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..4].to_string()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Masked user for log lines; `GLOBAL` when no user applies
pub fn short_user(user: Option<UserId>) -> String {
    user.map(|u| u.short()).unwrap_or_else(|| "GLOBAL".to_string())
}

/// The (user, owning process) pair that isolates per-scope state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub user: UserId,
    pub owner: String,
}

impl Scope {
    pub fn new(user: UserId, owner: impl Into<String>) -> Self {
        Self {
            user,
            owner: owner.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.user.short(), self.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_masks_user() {
        let user = UserId(Uuid::parse_str("8c754db1-3e62-498c-a664-3b38aaa799f9").unwrap());
        assert_eq!(user.short(), "8c75");
        assert_eq!(Scope::new(user, "shell").to_string(), "8c75, shell");
        assert_eq!(short_user(None), "GLOBAL");
    }
}
