//! bcrypt password hashes, cost 10 in production.

use bcrypt::BcryptError;

#[cfg(not(test))]
const HASH_COST: u32 = 10;
// bcrypt's minimum; keeps the handler tests fast.
#[cfg(test)]
const HASH_COST: u32 = 4;

pub fn hash_password(password: &str) -> Result<String, BcryptError> {
    bcrypt::hash(password, HASH_COST)
}

/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}
