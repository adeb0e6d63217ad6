// Password hashing.
//
// scrypt (N=16384, r=16, p=1, dkLen=64) with a random 16-byte salt.
// Stored format: "hex(salt):hex(key)". Verification compares in constant
// time.

use rand::RngCore;
use scrypt::{scrypt, Params};
use subtle::ConstantTimeEq;

use pitchdesk_core::error::{PitchdeskError, Result};

/// Hash a password using scrypt.
///
/// Returns a string in the format `salt:key`, both hex-encoded.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt_hex = hex::encode(salt_bytes);

    let key = derive_key(password, &salt_hex)?;
    Ok(format!("{}:{}", salt_hex, hex::encode(key)))
}

/// Verify a password against a hash produced by [`hash_password`].
pub fn verify_password(hash: &str, password: &str) -> Result<bool> {
    let (salt, key_hex) = hash
        .split_once(':')
        .ok_or_else(|| other("invalid password hash format"))?;

    let expected_key =
        hex::decode(key_hex).map_err(|e| other(format!("invalid hex in password hash: {e}")))?;

    let derived_key = derive_key(password, salt)?;

    Ok(constant_time_equal(&derived_key, &expected_key))
}

/// Derive a 64-byte key using scrypt. N=16384 means log2(N)=14.
fn derive_key(password: &str, salt: &str) -> Result<Vec<u8>> {
    let params = Params::new(14, 16, 1, 64)
        .map_err(|e| other(format!("invalid scrypt params: {e}")))?;

    let mut output = vec![0u8; 64];
    scrypt(password.as_bytes(), salt.as_bytes(), &params, &mut output)
        .map_err(|e| other(format!("scrypt failed: {e}")))?;

    Ok(output)
}

/// Compare two byte slices in constant time.
fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn other(message: impl std::fmt::Display) -> PitchdeskError {
    PitchdeskError::Other(anyhow::anyhow!("{message}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("campus-pitch-pass").unwrap();

        // 16-byte salt and 64-byte key, both hex.
        let (salt, key) = hash.split_once(':').unwrap();
        assert_eq!(salt.len(), 32);
        assert_eq!(key.len(), 128);

        assert!(verify_password(&hash, "campus-pitch-pass").unwrap());
        assert!(!verify_password(&hash, "wrong-password").unwrap());
    }

    #[test]
    fn test_different_hashes_per_call() {
        let first = hash_password("same-password").unwrap();
        let second = hash_password("same-password").unwrap();
        // Fresh salt every call.
        assert_ne!(first, second);
        assert!(verify_password(&first, "same-password").unwrap());
        assert!(verify_password(&second, "same-password").unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("no-colon-here", "password").is_err());
    }

    #[test]
    fn test_constant_time_equal() {
        assert!(constant_time_equal(b"abcdef", b"abcdef"));
        assert!(!constant_time_equal(b"abcdef", b"abcdeg"));
        // Length mismatch short-circuits to false.
        assert!(!constant_time_equal(b"abcdef", b"abcde"));
    }
}
