use crate::config::AgentConfig;
use crate::error::{Result, SendError};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use hmac::{Hmac, Mac};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use sha2::Sha256;
use std::io::Write;
use tally_common::MetricEnvelope;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the transmitted body.
pub const SIGNATURE_HEADER: &str = "HashSHA256";

/// One attempt at delivering a batch. Retries are layered on top by
/// [`MetricSender`](crate::sender::MetricSender).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, batch: &[MetricEnvelope]) -> Result<()>;
}

/// JSON-over-HTTP transport posting to `<endpoint>/updates/`.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    compress: bool,
    signing_key: Option<Vec<u8>>,
}

impl HttpTransport {
    pub fn new(
        url: impl Into<String>,
        compress: bool,
        signing_key: Option<&str>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            compress,
            signing_key: signing_key
                .filter(|key| !key.is_empty())
                .map(|key| key.as_bytes().to_vec()),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::new(
            config.updates_url(),
            config.compress,
            config.signing_key.as_deref(),
            client,
        ))
    }

    fn encode(&self, batch: &[MetricEnvelope]) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(batch)?;
        if !self.compress {
            return Ok(json);
        }
        let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }
}

/// Hex-encoded HMAC-SHA256 of `body` under `key`.
pub fn sign(key: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, batch: &[MetricEnvelope]) -> Result<()> {
        let body = self.encode(batch)?;

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json");
        if self.compress {
            request = request.header(CONTENT_ENCODING, "gzip");
        }
        if let Some(key) = &self.signing_key {
            request = request.header(SIGNATURE_HEADER, sign(key, &body));
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(count = batch.len(), "Batch delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tally_common::MetricRecord;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_batch() -> Vec<MetricEnvelope> {
        vec![
            MetricEnvelope::from(&MetricRecord::gauge("Alloc", 1.5)),
            MetricEnvelope::from(&MetricRecord::counter("PollCount", 1)),
        ]
    }

    fn updates_url(server: &MockServer) -> String {
        format!("{}/updates/", server.uri())
    }

    #[tokio::test]
    async fn posts_gzipped_signed_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/updates/"))
            .and(header("content-encoding", "gzip"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(
            updates_url(&server),
            true,
            Some("secret"),
            reqwest::Client::new(),
        );
        transport.send(&sample_batch()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let request = &requests[0];
        let signature = request
            .headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert_eq!(signature, sign(b"secret", &request.body));

        let mut json = String::new();
        GzDecoder::new(request.body.as_slice())
            .read_to_string(&mut json)
            .unwrap();
        let decoded: Vec<MetricEnvelope> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, sample_batch());
    }

    #[tokio::test]
    async fn plain_body_without_key_has_no_extra_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/updates/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(updates_url(&server), false, None, reqwest::Client::new());
        transport.send(&sample_batch()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let request = &requests[0];
        assert!(request.headers.get(SIGNATURE_HEADER).is_none());
        assert!(request.headers.get("content-encoding").is_none());
        let decoded: Vec<MetricEnvelope> = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("storage down"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(updates_url(&server), true, None, reqwest::Client::new());
        let err = transport.send(&sample_batch()).await.unwrap_err();
        assert!(matches!(
            err,
            SendError::Status { status: 500, ref body } if body == "storage down"
        ));
    }

    #[test]
    fn signature_is_hex_sha256_sized() {
        let sig = sign(b"key", b"payload");
        assert_eq!(sig.len(), 64);
        assert_ne!(sig, sign(b"other", b"payload"));
    }
}
