use crate::Result;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(crate::Error::Validation(format!(
            "password must have at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// Malformed hashes count as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
