/// Opaque invitation tokens
///
/// Invitation links carry a 64-character alphanumeric token. Only the SHA-256
/// hex digest is persisted, so a leaked database row cannot be turned back into
/// a working link.
///
/// # Example
///
/// ```
/// use teampulse_shared::auth::token::{generate_token, hash_token, is_well_formed};
///
/// let (token, hash) = generate_token();
/// assert!(is_well_formed(&token));
/// assert_eq!(hash, hash_token(&token));
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the emailed token
pub const TOKEN_LENGTH: usize = 64;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a token and its storage hash
///
/// # Returns
///
/// `(token, hash)`: the token goes into the invitation mail, the hash into
/// `invitations.token_hash`.
pub fn generate_token() -> (String, String) {
    let mut rng = rand::thread_rng();

    let token: String = (0..TOKEN_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    let hash = hash_token(&token);

    (token, hash)
}

/// SHA-256 hex digest of a token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cheap shape check run before touching the database
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.bytes().all(|b| b.is_ascii_alphanumeric())
}
