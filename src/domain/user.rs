//! Internal users and the external identities bound to them.

use serde::{Deserialize, Serialize};

/// A (provider, external id) pair, e.g. `("discord", "81234...")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub provider: String,
    pub external_id: String,
}

impl Identity {
    pub fn new(provider: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            external_id: external_id.into(),
        }
    }
}

/// Display attributes. Stored encrypted by every backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub display_name: String,
}

impl Profile {
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: String,
    profile: Profile,
    identities: Vec<Identity>,
}

impl User {
    pub fn new(id: String, profile: Profile, identities: Vec<Identity>) -> Self {
        Self {
            id,
            profile,
            identities,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.profile.username
    }

    pub fn display_name(&self) -> &str {
        &self.profile.display_name
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }
}
