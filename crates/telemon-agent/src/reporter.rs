use anyhow::Context;
use reqwest::StatusCode;
use telemon_common::model::MetricUpdate;
use telemon_payload::{PayloadCodec, SIGNATURE_HEADER};
use tokio::time::{sleep, Duration};

const MAX_ATTEMPTS: u32 = 3;

/// Sends encoded metric updates to the collector over HTTP.
pub struct Reporter {
    client: reqwest::Client,
    update_url: String,
    codec: PayloadCodec,
}

impl Reporter {
    pub fn new(server_url: &str, codec: PayloadCodec) -> Self {
        Self {
            client: reqwest::Client::new(),
            update_url: format!("{}/update/", server_url.trim_end_matches('/')),
            codec,
        }
    }

    /// Posts a single update, retrying only when the server sheds load with
    /// 429. Any other failure is returned to the caller.
    pub async fn send(&self, update: &MetricUpdate) -> anyhow::Result<()> {
        let sealed = self
            .codec
            .encode(update)
            .with_context(|| format!("encoding update for '{}'", update.id))?;

        let mut attempt = 0;
        loop {
            let mut request = self
                .client
                .post(&self.update_url)
                .header("Content-Type", "application/json")
                .header("Content-Encoding", "gzip")
                .body(sealed.body.clone());
            if let Some(sig) = &sealed.signature {
                request = request.header(SIGNATURE_HEADER, sig);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("sending update for '{}'", update.id))?;
            let status = response.status();

            if status.is_success() {
                return Ok(());
            }
            attempt += 1;
            if status != StatusCode::TOO_MANY_REQUESTS || attempt == MAX_ATTEMPTS {
                anyhow::bail!("server rejected update for '{}': HTTP {status}", update.id);
            }

            tracing::warn!(
                id = %update.id,
                attempt,
                "server is shedding load, retrying"
            );
            sleep(Duration::from_millis(100 * 2u64.pow(attempt - 1))).await;
        }
    }
}
