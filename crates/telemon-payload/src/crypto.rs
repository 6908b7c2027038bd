use crate::{PayloadError, Result};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use std::path::Path;

// PKCS#1 v1.5 padding overhead per block.
const PKCS1V15_OVERHEAD: usize = 11;

/// Holds whichever half of an RSA keypair this process was configured with.
/// The agent loads only the public key, the server only the private one.
#[derive(Debug, Default)]
pub struct RsaProcessor {
    public_key: Option<RsaPublicKey>,
    private_key: Option<RsaPrivateKey>,
}

impl RsaProcessor {
    pub fn with_public_key(key: RsaPublicKey) -> Self {
        Self {
            public_key: Some(key),
            private_key: None,
        }
    }

    pub fn with_private_key(key: RsaPrivateKey) -> Self {
        Self {
            public_key: None,
            private_key: Some(key),
        }
    }

    /// Loads a PEM-encoded public key (SPKI) from disk.
    pub fn from_public_key_file(path: impl AsRef<Path>) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(PayloadError::KeyFile)?;
        let key = RsaPublicKey::from_public_key_pem(&pem)
            .map_err(|e| PayloadError::KeyFormat(e.to_string()))?;
        Ok(Self::with_public_key(key))
    }

    /// Loads a PEM-encoded private key from disk, accepting both PKCS#1
    /// ("RSA PRIVATE KEY") and PKCS#8 ("PRIVATE KEY") framing.
    pub fn from_private_key_file(path: impl AsRef<Path>) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(PayloadError::KeyFile)?;
        let key = RsaPrivateKey::from_pkcs1_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(&pem))
            .map_err(|e| PayloadError::KeyFormat(e.to_string()))?;
        Ok(Self::with_private_key(key))
    }

    /// Encrypts a payload of any length by splitting it into blocks that fit
    /// the key modulus.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.public_key.as_ref().ok_or(PayloadError::MissingPublicKey)?;
        let mut rng = rand::thread_rng();
        let chunk_len = key.size() - PKCS1V15_OVERHEAD;
        let mut out = Vec::with_capacity(data.len() + key.size());
        for chunk in data.chunks(chunk_len) {
            out.extend(key.encrypt(&mut rng, Pkcs1v15Encrypt, chunk)?);
        }
        Ok(out)
    }

    /// Decrypts a payload produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let key = self
            .private_key
            .as_ref()
            .ok_or(PayloadError::MissingPrivateKey)?;
        let mut out = Vec::with_capacity(data.len());
        for chunk in data.chunks(key.size()) {
            out.extend(key.decrypt(Pkcs1v15Encrypt, chunk)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (RsaProcessor, RsaProcessor) {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        (
            RsaProcessor::with_public_key(public),
            RsaProcessor::with_private_key(private),
        )
    }

    #[test]
    fn round_trips_short_payload() {
        let (enc, dec) = keypair();
        let sealed = enc.encrypt(b"hello").unwrap();
        assert_eq!(dec.decrypt(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn round_trips_payload_larger_than_one_block() {
        let (enc, dec) = keypair();
        // 2048-bit key fits 245 plaintext bytes per block.
        let payload: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();
        let sealed = enc.encrypt(&payload).unwrap();
        assert!(sealed.len() > 256);
        assert_eq!(dec.decrypt(&sealed).unwrap(), payload);
    }

    #[test]
    fn missing_keys_are_reported() {
        let empty = RsaProcessor::default();
        assert!(matches!(
            empty.encrypt(b"x"),
            Err(PayloadError::MissingPublicKey)
        ));
        assert!(matches!(
            empty.decrypt(b"x"),
            Err(PayloadError::MissingPrivateKey)
        ));
    }
}
