//! Password rules shared by the API and the `create_user` binary.

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

/// Returns the reason a new password is refused, if any.
pub fn check_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, HASH_COST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_rule() {
        assert!(check_password("1234567").is_err());
        assert!(check_password("12345678").is_ok());
        // Counted in characters, not bytes.
        assert!(check_password("ééééééé").is_err());
    }

    #[test]
    fn test_hash_is_bcrypt() {
        let hashed = hash_password("calibrate-me").unwrap();
        assert!(hashed.starts_with("$2"));
        assert!(bcrypt::verify("calibrate-me", &hashed).unwrap());
    }
}
