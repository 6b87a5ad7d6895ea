/// Salted PBKDF2-SHA256 password hashing
///
/// Hashes are stored in a self-describing form so the round count can change
/// without invalidating existing accounts:
///
/// `$pbkdf2-sha256$<rounds>$<salt>$<digest>` (base64, unpadded)
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2-sha256";

#[cfg(not(test))]
pub const PBKDF2_ROUNDS: u32 = 29_000;
#[cfg(test)]
pub const PBKDF2_ROUNDS: u32 = 1_000;

pub const SALT_LENGTH: usize = 16;
pub const DIGEST_LENGTH: usize = 32;

/// Password hasher
pub struct PasswordHasher;

impl PasswordHasher {
    /// Hash a password with a fresh random salt
    pub fn hash(password: &str) -> String {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::hash_with_salt(password, &salt, PBKDF2_ROUNDS)
    }

    fn hash_with_salt(password: &str, salt: &[u8], rounds: u32) -> String {
        let digest = derive(password, salt, rounds);
        format!(
            "${}${}${}${}",
            SCHEME,
            rounds,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(digest)
        )
    }

    /// Verify a password against a stored hash
    ///
    /// Malformed hashes never match.
    pub fn verify(password: &str, encoded: &str) -> bool {
        let Some((rounds, salt, expected)) = parse(encoded) else {
            tracing::warn!("Stored password hash has an unrecognised format");
            return false;
        };

        let actual = derive(password, &salt, rounds);
        actual[..].ct_eq(&expected[..]).into()
    }
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; DIGEST_LENGTH] {
    let mut digest = [0u8; DIGEST_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut digest);
    digest
}

fn parse(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.strip_prefix('$')?.split('$');

    if parts.next()? != SCHEME {
        return None;
    }

    let rounds: u32 = parts.next()?.parse().ok()?;
    let salt = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    let digest = STANDARD_NO_PAD.decode(parts.next()?).ok()?;

    if parts.next().is_some() || rounds == 0 || digest.len() != DIGEST_LENGTH {
        return None;
    }

    Some((rounds, salt, digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = PasswordHasher::hash("senha123");
        assert!(hash.starts_with("$pbkdf2-sha256$"));
        assert!(PasswordHasher::verify("senha123", &hash));
        assert!(!PasswordHasher::verify("senha124", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let h1 = PasswordHasher::hash("password");
        let h2 = PasswordHasher::hash("password");
        assert_ne!(h1, h2);
        assert!(PasswordHasher::verify("password", &h1));
        assert!(PasswordHasher::verify("password", &h2));
    }

    #[test]
    fn test_same_salt_is_deterministic() {
        let salt = [7u8; SALT_LENGTH];
        let h1 = PasswordHasher::hash_with_salt("password", &salt, 10);
        let h2 = PasswordHasher::hash_with_salt("password", &salt, 10);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_rounds_are_read_from_hash() {
        let salt = [1u8; SALT_LENGTH];
        let hash = PasswordHasher::hash_with_salt("password", &salt, 5);
        assert!(hash.starts_with("$pbkdf2-sha256$5$"));
        assert!(PasswordHasher::verify("password", &hash));
    }

    #[test]
    fn test_malformed_hash_is_false() {
        assert!(!PasswordHasher::verify("password", ""));
        assert!(!PasswordHasher::verify("password", "plaintext"));
        assert!(!PasswordHasher::verify("password", "$bcrypt$10$abc$def"));
        assert!(!PasswordHasher::verify("password", "$pbkdf2-sha256$notanumber$abc$def"));
        assert!(!PasswordHasher::verify("password", "$pbkdf2-sha256$0$YWJj$YWJj"));
    }
}
