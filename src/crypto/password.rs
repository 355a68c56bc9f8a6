//! Password credentials for the user directory.
//!
//! Hashes are stored as `pbkdf2_sha256$<iterations>$<salt>$<hash>` with
//! base64 salt and hash, so the iteration count travels with each hash and
//! can be raised without invalidating existing accounts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::CryptoError;

pub const ALGORITHM: &str = "pbkdf2_sha256";
pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

/// Prefix marking an account that cannot log in with a password.
pub const UNUSABLE_PASSWORD_PREFIX: &str = "!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    pub iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { iterations: PBKDF2_ITERATIONS }
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self { iterations: iterations.max(1) }
    }

    /// Hash `password` with a fresh random salt.
    pub fn encode(&self, password: &str) -> String {
        self.encode_with_salt(password, &generate_salt())
    }

    pub fn encode_with_salt(&self, password: &str, salt: &[u8]) -> String {
        let mut hash = derive(password, salt, self.iterations);
        let encoded = format!(
            "{ALGORITHM}${}${}${}",
            self.iterations,
            STANDARD.encode(salt),
            STANDARD.encode(hash)
        );
        hash.zeroize();
        encoded
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Marker stored for accounts created without a password.
pub fn unusable_password() -> String {
    let mut suffix = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut suffix);
    format!("{UNUSABLE_PASSWORD_PREFIX}{}", STANDARD.encode(suffix))
}

/// Check `password` against an encoded hash in constant time.
///
/// Unusable markers never verify. A hash in an unknown format is an error,
/// not a mismatch.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, CryptoError> {
    if encoded.starts_with(UNUSABLE_PASSWORD_PREFIX) {
        return Ok(false);
    }

    let mut parts = encoded.split('$');
    let (Some(algorithm), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::MalformedHash);
    };

    if algorithm != ALGORITHM {
        return Err(CryptoError::UnsupportedAlgorithm(algorithm.to_string()));
    }
    let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
    let salt = STANDARD.decode(salt).map_err(|_| CryptoError::MalformedHash)?;
    let expected = STANDARD.decode(expected).map_err(|_| CryptoError::MalformedHash)?;
    if iterations == 0 || expected.len() != HASH_LENGTH {
        return Err(CryptoError::MalformedHash);
    }

    let mut actual = derive(password, &salt, iterations);
    let matches: bool = actual.as_slice().ct_eq(expected.as_slice()).into();
    actual.zeroize();
    Ok(matches)
}

/// Iteration count recorded in an encoded hash, if it parses.
pub fn hash_iterations(encoded: &str) -> Option<u32> {
    encoded.split('$').nth(1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[test]
    fn encode_then_verify() {
        let encoded = fast().encode("correct horse");
        assert!(encoded.starts_with("pbkdf2_sha256$1000$"));
        assert!(verify_password("correct horse", &encoded).unwrap());
        assert!(!verify_password("wrong horse", &encoded).unwrap());
    }

    #[test]
    fn same_salt_is_deterministic() {
        let salt = [7u8; SALT_LENGTH];
        assert_eq!(
            fast().encode_with_salt("pw", &salt),
            fast().encode_with_salt("pw", &salt)
        );
    }

    #[test]
    fn random_salts_differ() {
        assert_ne!(fast().encode("pw"), fast().encode("pw"));
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn unusable_password_never_verifies() {
        let marker = unusable_password();
        assert!(marker.starts_with(UNUSABLE_PASSWORD_PREFIX));
        assert!(!verify_password("", &marker).unwrap());
        assert!(!verify_password("!", "!").unwrap());
    }

    #[test]
    fn malformed_hashes_are_errors() {
        assert!(matches!(verify_password("pw", "plain"), Err(CryptoError::MalformedHash)));
        assert!(matches!(
            verify_password("pw", "pbkdf2_sha256$abc$c2FsdA==$aGFzaA=="),
            Err(CryptoError::MalformedHash)
        ));
        assert!(matches!(
            verify_password("pw", "md5$1$c2FsdA==$aGFzaA=="),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn iterations_travel_with_hash() {
        let encoded = PasswordHasher::new(2_000).encode("pw");
        assert_eq!(hash_iterations(&encoded), Some(2_000));
        // Verification reads the stored count, not the current default
        assert!(verify_password("pw", &encoded).unwrap());
    }

    #[test]
    fn default_hasher_uses_production_cost() {
        assert_eq!(PasswordHasher::default().iterations, PBKDF2_ITERATIONS);
    }
}
