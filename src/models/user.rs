//! Locally persisted user model.

use serde::{Deserialize, Serialize};

use super::auth::AuthResponse;

/// Role a profile plays on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileType {
    Shelter,
    Adopter,
    Admin,
}

impl std::fmt::Display for ProfileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shelter => write!(f, "SHELTER"),
            Self::Adopter => write!(f, "ADOPTER"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Display data for one of the user's profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub description: String,
    pub profile_type: ProfileType,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        profile_type: ProfileType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            profile_type,
        }
    }
}

/// What the client keeps about the signed-in user between runs.
///
/// Holds profile display data only. Credentials and tokens live in the
/// server-managed cookie and have no field here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub profiles: Vec<Profile>,
}

impl StoredUser {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self { profiles }
    }

    /// Check the invariants serde cannot express.
    ///
    /// A single bad profile invalidates the whole user.
    pub fn validate(&self) -> Result<(), String> {
        for (index, profile) in self.profiles.iter().enumerate() {
            if profile.name.is_empty() {
                return Err(format!("profiles[{index}].name is empty"));
            }
        }
        Ok(())
    }

    /// Returns true if any profile has the given type.
    pub fn has_profile_type(&self, profile_type: ProfileType) -> bool {
        self.profiles.iter().any(|p| p.profile_type == profile_type)
    }
}

impl From<&AuthResponse> for StoredUser {
    fn from(response: &AuthResponse) -> Self {
        Self {
            profiles: response.profiles.clone(),
        }
    }
}
