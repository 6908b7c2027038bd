use std::sync::Arc;
use telemon_payload::RsaProcessor;
use telemon_storage::MetricStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetricStore>,
    /// Shared secret for HMAC request verification; `None` disables it.
    pub hash_key: Option<Arc<String>>,
    /// RSA private key holder; `None` disables request decryption.
    pub crypto: Option<Arc<RsaProcessor>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MetricStore>,
        hash_key: Option<String>,
        crypto: Option<Arc<RsaProcessor>>,
    ) -> Self {
        Self {
            store,
            hash_key: hash_key.map(Arc::new),
            crypto,
        }
    }
}
