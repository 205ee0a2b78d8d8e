use serde::{Deserialize, Serialize};

/// Commercial role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular sales agent, sees catalog prices.
    #[default]
    Agent,
    /// Distributor account, internal views apply the automatic discount.
    Privileged,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Privileged => "privileged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" => Some(Self::Agent),
            "privileged" => Some(Self::Privileged),
            _ => None,
        }
    }
}

/// Account profile as held by the session (no password).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    /// Company name printed in the document header.
    #[serde(default)]
    pub commercial_name: Option<String>,
    /// Person signing the documents.
    #[serde(default)]
    pub prepared_by: Option<String>,
}

impl User {
    pub fn is_privileged(&self) -> bool {
        self.role == Role::Privileged
    }

    /// Name shown as document issuer, falling back to the account name.
    pub fn issuer_name(&self) -> &str {
        self.commercial_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(self.name.as_str())
    }
}

/// Account record as persisted under the `users` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

impl StoredUser {
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }

    /// Profile without the credential.
    pub fn to_user(&self) -> User {
        self.user.clone()
    }
}

/// Lowercased, trimmed email used as the account key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
