use crate::{crypto::RsaProcessor, gzip, signature, PayloadError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// An encoded request body plus the signature header to send with it, if
/// signing is configured.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub body: Vec<u8>,
    pub signature: Option<String>,
}

/// Applies the outbound pipeline stages (JSON, gzip, sign, encrypt) and the
/// matching inbound stages in reverse. Signing and encryption are both
/// optional and independent; the signature always covers the compressed
/// plaintext, so a decode must decrypt before it can verify.
#[derive(Debug, Clone, Default)]
pub struct PayloadCodec {
    hash_key: Option<String>,
    crypto: Option<Arc<RsaProcessor>>,
}

impl PayloadCodec {
    pub fn new(hash_key: Option<String>, crypto: Option<Arc<RsaProcessor>>) -> Self {
        Self { hash_key, crypto }
    }

    pub fn signs(&self) -> bool {
        self.hash_key.is_some()
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Sealed> {
        let json = serde_json::to_vec(value)?;
        let compressed = gzip::compress(&json)?;

        let sig = self
            .hash_key
            .as_ref()
            .map(|key| signature::sign(key.as_bytes(), &compressed));

        let body = match &self.crypto {
            Some(crypto) => crypto.encrypt(&compressed)?,
            None => compressed,
        };

        Ok(Sealed {
            body,
            signature: sig,
        })
    }

    /// Decodes a request body. A missing signature header skips verification
    /// even when a hash key is configured; a present header with no key is
    /// ignored for the same reason.
    pub fn decode<T: DeserializeOwned>(&self, body: &[u8], sig: Option<&str>) -> Result<T> {
        let compressed = match &self.crypto {
            Some(crypto) => crypto.decrypt(body)?,
            None => body.to_vec(),
        };

        if let (Some(key), Some(header)) = (&self.hash_key, sig) {
            signature::verify(key.as_bytes(), &compressed, header)?;
        }

        let json = gzip::decompress(&compressed)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use telemon_common::model::MetricUpdate;

    fn sample() -> Vec<MetricUpdate> {
        vec![
            MetricUpdate::counter("PollCount", 7),
            MetricUpdate::gauge("Alloc", 1024.5),
        ]
    }

    #[test]
    fn plain_round_trip() {
        let codec = PayloadCodec::default();
        let sealed = codec.encode(&sample()).unwrap();
        assert!(sealed.signature.is_none());
        let decoded: Vec<MetricUpdate> = codec.decode(&sealed.body, None).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn signed_round_trip_and_tamper_detection() {
        let codec = PayloadCodec::new(Some("secret".into()), None);
        let sealed = codec.encode(&sample()).unwrap();
        let sig = sealed.signature.as_deref().unwrap();

        let decoded: Vec<MetricUpdate> = codec.decode(&sealed.body, Some(sig)).unwrap();
        assert_eq!(decoded, sample());

        let mut tampered = sealed.body.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;
        assert!(matches!(
            codec.decode::<Vec<MetricUpdate>>(&tampered, Some(sig)),
            Err(PayloadError::SignatureMismatch) | Err(PayloadError::Gzip(_))
        ));
    }

    #[test]
    fn missing_header_skips_verification() {
        let codec = PayloadCodec::new(Some("secret".into()), None);
        let sealed = codec.encode(&sample()).unwrap();
        let decoded: Vec<MetricUpdate> = codec.decode(&sealed.body, None).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn encrypted_and_signed_round_trip() {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);

        let sender = PayloadCodec::new(
            Some("secret".into()),
            Some(Arc::new(RsaProcessor::with_public_key(public))),
        );
        let receiver = PayloadCodec::new(
            Some("secret".into()),
            Some(Arc::new(RsaProcessor::with_private_key(private))),
        );

        let sealed = sender.encode(&sample()).unwrap();
        let decoded: Vec<MetricUpdate> = receiver
            .decode(&sealed.body, sealed.signature.as_deref())
            .unwrap();
        assert_eq!(decoded, sample());
    }
}
