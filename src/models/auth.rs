//! Authentication request/response bodies.

use serde::{Deserialize, Serialize};

use super::user::Profile;

/// Credentials posted to `/auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

impl AuthRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Body returned by `/auth/login` and `/auth/refresh`.
///
/// The backend may echo token fields in the body even though the session
/// itself travels in an http-only cookie. They are accepted so the body
/// parses, never re-serialized, and never projected into [`StoredUser`].
///
/// [`StoredUser`]: super::user::StoredUser
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub refresh_token: Option<String>,
}

impl AuthResponse {
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles,
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("profiles", &self.profiles)
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::ProfileType;

    #[test]
    fn test_auth_response_parses_tokens_but_never_writes_them() {
        let body = r#"{
            "profiles": [{"name": "Shelter A", "description": "d", "profileType": "SHELTER"}],
            "accessToken": "at",
            "refreshToken": "rt"
        }"#;
        let response: AuthResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.profiles.len(), 1);
        assert_eq!(response.profiles[0].profile_type, ProfileType::Shelter);
        assert_eq!(response.access_token.as_deref(), Some("at"));

        let written = serde_json::to_string(&response).unwrap();
        assert!(!written.contains("accessToken"));
        assert!(!written.contains("refreshToken"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let request = AuthRequest::new("a@b.c", "hunter2");
        assert!(!format!("{request:?}").contains("hunter2"));

        let response = AuthResponse {
            access_token: Some("secret-token".into()),
            ..AuthResponse::default()
        };
        assert!(!format!("{response:?}").contains("secret-token"));
    }
}
