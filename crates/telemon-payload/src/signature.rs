use crate::{PayloadError, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(key: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length, so new_from_slice cannot fail.
    HmacSha256::new_from_slice(key).expect("hmac accepts any key length")
}

/// Computes the base64-encoded HMAC-SHA256 of `data` for the signature
/// header.
pub fn sign(key: &[u8], data: &[u8]) -> String {
    let mut hash = mac(key);
    hash.update(data);
    general_purpose::STANDARD.encode(hash.finalize().into_bytes())
}

/// Verifies a base64 signature header against `data`. The underlying
/// comparison is constant-time.
pub fn verify(key: &[u8], data: &[u8], header: &str) -> Result<()> {
    let expected = general_purpose::STANDARD.decode(header)?;
    let mut hash = mac(key);
    hash.update(data);
    hash.verify_slice(&expected)
        .map_err(|_| PayloadError::SignatureMismatch)
}
