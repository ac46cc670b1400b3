//! Password policy checked before an account is created.

use super::AuthError;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Characters that satisfy the special-character rule.
const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

const POLICY_MESSAGE: &str = "Password must be at least 8 characters long and include an \
uppercase letter, a lowercase letter, a number, and a special character.";

/// Check a new password against the registration policy.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` with the policy text if any rule fails.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| SPECIAL_CHARACTERS.contains(c));

    if long_enough && upper && lower && digit && special {
        Ok(())
    } else {
        Err(AuthError::WeakPassword(POLICY_MESSAGE.to_owned()))
    }
}
