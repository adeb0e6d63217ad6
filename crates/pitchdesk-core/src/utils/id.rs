// ID and token generation.

use rand::RngCore;

/// Unique record ID; nanoid's 21-character default.
pub fn generate_id() -> String {
    nanoid::nanoid!()
}

/// Record ID of an arbitrary length.
pub fn generate_id_with_length(len: usize) -> String {
    nanoid::nanoid!(len)
}

/// Opaque session token: 32 random bytes, hex encoded.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
