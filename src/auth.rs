use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::access::{Denial, Viewer};
use crate::db::AccountRecord;

pub const MIN_PASSWORD_LEN: usize = 8;

const SALT_LEN: usize = 16;

pub type HashError = argon2::password_hash::Error;

/// Hashes with Argon2id under a fresh random salt and returns the PHC string.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let mut salt_bytes = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// A stored value that is not a PHC string never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is unreadable");
            false
        }
    }
}

pub fn password_problem(password: &str) -> Option<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Some(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ))
    } else {
        None
    }
}

/// Turns a looked-up account and a presented password into a viewer.
/// Unknown accounts and wrong passwords are indistinguishable.
pub fn check_credentials(
    account: Option<AccountRecord>,
    password: &str,
) -> Result<Viewer, Denial> {
    let account = account.ok_or(Denial::NotAuthenticated)?;
    if !verify_password(password, &account.password_hash) {
        return Err(Denial::NotAuthenticated);
    }
    if account.suspended {
        tracing::warn!(account_id = %account.id, "login refused for suspended account");
        return Err(Denial::NotAuthenticated);
    }
    Ok(Viewer {
        account_id: account.id,
        username: account.username,
        role: account.role,
    })
}
