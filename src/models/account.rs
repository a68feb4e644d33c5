//! Account registration and e-mail verification bodies.

use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub terms_of_use_and_privacy_consent: bool,
}

impl std::fmt::Debug for AccountRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRequest")
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("password", &"[redacted]")
            .field(
                "terms_of_use_and_privacy_consent",
                &self.terms_of_use_and_privacy_consent,
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmEmailRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}
