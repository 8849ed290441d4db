//! Account roles issued by the remote API.

use serde::{Deserialize, Serialize};

/// Role attached to an authenticated session.
///
/// The API reports roles as upper-case strings (`"CUSTOMER"`, `"ADMIN"`).
/// Anything it reports that is not recognised is treated as a customer, so an
/// unexpected value can never grant back-office access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular shopper.
    #[default]
    Customer,
    /// Back-office user with product and order management rights.
    Admin,
}

impl Role {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Admin => "ADMIN",
        }
    }

    /// Interpret a role string leniently.
    ///
    /// Missing or unknown values map to [`Role::Customer`].
    #[must_use]
    pub fn from_lenient(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Whether this role grants back-office access.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CUSTOMER" => Ok(Self::Customer),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
