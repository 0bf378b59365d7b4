//! Format rules for identities, owner passwords and record fields.

use crate::errors::{VaultError, Result};

pub const MIN_IDENTITY_LEN: usize = 3;
pub const MAX_IDENTITY_LEN: usize = 20;

/// Minimum owner password length to prevent trivially weak passwords.
pub const MIN_SECRET_LEN: usize = 8;

/// Maximum length of a site label or account name.
pub const MAX_FIELD_LEN: usize = 256;

/// 3-20 characters, ASCII letters, digits and underscores only.
pub fn validate_identity(identity: &str) -> Result<()> {
    let len = identity.chars().count();
    if !(MIN_IDENTITY_LEN..=MAX_IDENTITY_LEN).contains(&len) {
        return Err(VaultError::Validation(format!(
            "username must be {MIN_IDENTITY_LEN}-{MAX_IDENTITY_LEN} characters long"
        )));
    }
    if !identity
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(VaultError::Validation(format!(
            "username '{identity}' is invalid; only letters, digits, and underscores are allowed"
        )));
    }
    Ok(())
}

/// At least 8 characters with a lowercase letter, an uppercase letter and a digit.
pub fn validate_owner_secret(secret: &str) -> Result<()> {
    if secret.chars().count() < MIN_SECRET_LEN {
        return Err(VaultError::Validation(format!(
            "password must be at least {MIN_SECRET_LEN} characters"
        )));
    }
    let has_lower = secret.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = secret.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = secret.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(VaultError::Validation(
            "password must contain a lowercase letter, an uppercase letter, and a digit".into(),
        ));
    }
    Ok(())
}

/// Site labels must be non-blank; both fields are capped in length.
pub fn validate_record_fields(site: &str, account_name: &str) -> Result<()> {
    if site.trim().is_empty() {
        return Err(VaultError::Validation("site name cannot be empty".into()));
    }
    if site.len() > MAX_FIELD_LEN || account_name.len() > MAX_FIELD_LEN {
        return Err(VaultError::Validation(format!(
            "site and username cannot exceed {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(())
}
