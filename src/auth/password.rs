use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::error::CryptResult;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 20;
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";

pub fn hash_password(password: &str) -> CryptResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> CryptResult<bool> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// 8 to 20 characters drawn from letters, digits and `@$!%*?&`, with at least
/// one lowercase, one uppercase, one digit and one special character.
pub fn is_strong_password(password: &str) -> bool {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return false;
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c);
    if !password.chars().all(allowed) {
        return false;
    }

    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("Secret@123").unwrap();
        assert_ne!(hash, "Secret@123");
        assert!(verify_password(&hash, "Secret@123").unwrap());
        assert!(!verify_password(&hash, "secret@123").unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("not-a-phc-string", "whatever").is_err());
    }

    #[test]
    fn password_rule() {
        assert!(is_strong_password("Secret@123"));
        assert!(is_strong_password("Aa1!aaaa"));

        assert!(!is_strong_password("Aa1!aaa")); // too short
        assert!(!is_strong_password("Aa1!aaaaaaaaaaaaaaaaa")); // too long
        assert!(!is_strong_password("secret@123")); // no uppercase
        assert!(!is_strong_password("SECRET@123")); // no lowercase
        assert!(!is_strong_password("Secret@abc")); // no digit
        assert!(!is_strong_password("Secret1234")); // no special
        assert!(!is_strong_password("Secret@12 ")); // space not allowed
    }
}
