use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Plain-text password; `Debug` never prints the value.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(..)")
    }
}

/// Hash a password with Argon2id and a random salt, returning the PHC string.
pub fn hash_password(password: &Password) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// `Ok(true)` on match, `Ok(false)` on mismatch, `Err` for a corrupt hash.
pub fn verify_password(password: &Password, password_hash: &str) -> Result<bool, anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_argon2_phc_string() {
        let hash = hash_password(&Password::new("correct horse".to_string())).unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn verify_accepts_only_the_original_password() {
        let password = Password::new("correct horse".to_string());
        let hash = hash_password(&password).unwrap();

        assert!(verify_password(&password, &hash).unwrap());
        assert!(!verify_password(&Password::new("battery staple".to_string()), &hash).unwrap());
    }

    #[test]
    fn same_password_gets_a_fresh_salt() {
        let password = Password::new("correct horse".to_string());
        let first = hash_password(&password).unwrap();
        let second = hash_password(&password).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn corrupt_hash_is_an_error() {
        let password = Password::new("correct horse".to_string());
        assert!(verify_password(&password, "not-a-hash").is_err());
    }

    #[test]
    fn debug_hides_the_password() {
        let password = Password::new("correct horse".to_string());
        assert_eq!(format!("{:?}", password), "Password(..)");
    }
}
