//! Transport payload pipeline shared by the agent (encode) and the server
//! (decode): JSON → gzip → optional HMAC-SHA256 signature → optional RSA
//! encryption, unwound in exactly the reverse order on the receiving side.

pub mod crypto;
pub mod gzip;
pub mod pipeline;
pub mod signature;

pub use crypto::RsaProcessor;
pub use pipeline::{PayloadCodec, Sealed};

/// Name of the HTTP header carrying the base64 HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "HashSHA256";

/// Errors raised by any stage of the payload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload: gzip error: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("payload: signature header is not valid base64: {0}")]
    SignatureEncoding(#[from] base64::DecodeError),

    #[error("payload: signature mismatch")]
    SignatureMismatch,

    #[error("payload: no public key configured for encryption")]
    MissingPublicKey,

    #[error("payload: no private key configured for decryption")]
    MissingPrivateKey,

    #[error("payload: RSA operation failed: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("payload: cannot read key file: {0}")]
    KeyFile(std::io::Error),

    #[error("payload: cannot parse key material: {0}")]
    KeyFormat(String),
}

pub type Result<T> = std::result::Result<T, PayloadError>;
