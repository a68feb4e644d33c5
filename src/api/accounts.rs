//! `/accounts/*` endpoints: registration and e-mail verification.

use tracing::instrument;

use super::{require, require_email};
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::models::{AccountRequest, ConfirmEmailRequest, ResendVerificationRequest};
use crate::transport::ApiRequest;

pub const REGISTER_PATH: &str = "/accounts/register";
pub const VERIFICATION_REQUEST_PATH: &str = "/accounts/verifications/request";
pub const VERIFICATION_CONFIRM_PATH: &str = "/accounts/verifications/confirm";

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 4..=20;
const PASSWORD_CHARS: std::ops::RangeInclusive<usize> = 6..=16;

#[instrument(skip_all, fields(email = %account.email))]
pub async fn register(client: &ApiClient, account: &AccountRequest) -> Result<()> {
    validate_account(account)?;
    let request = ApiRequest::post(REGISTER_PATH).json(account)?;
    client.send_direct(request).await.map(|_| ())
}

/// Ask the backend to (re)send the verification e-mail.
#[instrument(skip_all, fields(email = %body.email))]
pub async fn request_verification(
    client: &ApiClient,
    body: &ResendVerificationRequest,
) -> Result<()> {
    require_email(&body.email)?;
    let request = ApiRequest::post(VERIFICATION_REQUEST_PATH).json(body)?;
    client.send_direct(request).await.map(|_| ())
}

#[instrument(skip_all)]
pub async fn confirm_verification(client: &ApiClient, body: &ConfirmEmailRequest) -> Result<()> {
    require("token", &body.token)?;
    let request = ApiRequest::post(VERIFICATION_CONFIRM_PATH).json(body)?;
    client.send_direct(request).await.map(|_| ())
}

fn validate_account(account: &AccountRequest) -> Result<()> {
    require_email(&account.email)?;

    let phone = account.phone_number.trim();
    if !PHONE_DIGITS.contains(&phone.len()) || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidRequest(format!(
            "phone number must be {}-{} digits",
            PHONE_DIGITS.start(),
            PHONE_DIGITS.end()
        )));
    }

    let password_len = account.password.chars().count();
    if !PASSWORD_CHARS.contains(&password_len) {
        return Err(Error::InvalidRequest(format!(
            "password must be {}-{} characters",
            PASSWORD_CHARS.start(),
            PASSWORD_CHARS.end()
        )));
    }

    if !account.terms_of_use_and_privacy_consent {
        return Err(Error::InvalidRequest(
            "terms of use must be accepted".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountRequest {
        AccountRequest {
            email: "adopter@buddy.org".into(),
            phone_number: "5511999990000".into(),
            password: "hunter22".into(),
            terms_of_use_and_privacy_consent: true,
        }
    }

    #[test]
    fn test_valid_account() {
        assert!(validate_account(&account()).is_ok());
    }

    fn assert_rejected(mutate: impl FnOnce(&mut AccountRequest)) {
        let mut a = account();
        mutate(&mut a);
        let err = validate_account(&a).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)), "{a:?} accepted");
    }

    #[test]
    fn test_rejected_accounts() {
        assert_rejected(|a| a.email = "nope".into());
        assert_rejected(|a| a.phone_number = "55ab".into());
        assert_rejected(|a| a.phone_number = "123".into());
        assert_rejected(|a| a.phone_number = "1".repeat(21));
        assert_rejected(|a| a.password = "12345".into());
        assert_rejected(|a| a.password = "x".repeat(17));
        assert_rejected(|a| a.terms_of_use_and_privacy_consent = false);
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(account()).unwrap();
        assert_eq!(value["phoneNumber"], "5511999990000");
        assert_eq!(value["termsOfUseAndPrivacyConsent"], true);
    }
}
