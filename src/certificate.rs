//! Retrieval and decoding of SNS signing certificates.

use crate::error::{FetchError, VerifyError};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

/// Upper bound on a certificate response body.
pub const MAX_CERTIFICATE_BYTES: usize = 64 * 1024;

const RSA_ENCRYPTION_OID: &str = "1.2.840.113549.1.1.1";

/// Where signing certificates come from. The URL has already passed the host
/// allowlist when this is called.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

pub struct HttpCertificateSource {
    client: reqwest::Client,
}

impl HttpCertificateSource {
    /// Redirects are not followed: a redirect would leave the allow-listed host.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CertificateSource for HttpCertificateSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        get_bounded(&self.client, url, MAX_CERTIFICATE_BYTES).await
    }
}

/// GET `url` and return the body, failing on non-2xx status or oversized bodies.
pub(crate) async fn get_bounded(
    client: &reqwest::Client,
    url: &Url,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let resp = client.get(url.clone()).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    if resp.content_length().is_some_and(|len| len > limit as u64) {
        return Err(FetchError::TooLarge(limit));
    }
    let body = resp.bytes().await?;
    if body.len() > limit {
        return Err(FetchError::TooLarge(limit));
    }
    Ok(body.to_vec())
}

// ---------------------------------------------------------------------------
// Host allowlist
// ---------------------------------------------------------------------------

/// `host[:port]` of a URL, with the port only when it is written explicitly.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Parse `raw` and require an http(s) URL whose authority equals `expected`,
/// ignoring ASCII case. No request is made.
pub fn trusted_url(raw: &str, expected: &str) -> Result<Url, VerifyError> {
    let url = Url::parse(raw).map_err(|e| VerifyError::MalformedCertUrl(e.to_string()))?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(VerifyError::MalformedCertUrl(format!(
            "unsupported scheme {:?}",
            url.scheme()
        )));
    }
    let actual = authority(&url).unwrap_or_default();
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(VerifyError::WrongCertDomain {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(url)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a PEM encoded X.509 certificate and return its RSA public key.
pub fn rsa_public_key(pem_bytes: &[u8]) -> Result<RsaPublicKey, VerifyError> {
    let block = pem::parse(pem_bytes).map_err(|_| VerifyError::PemDecodeFailed)?;
    let cert = Certificate::from_der(block.contents())
        .map_err(|e| VerifyError::CertParseFailed(e.to_string()))?;

    let spki = &cert.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid.to_string() != RSA_ENCRYPTION_OID {
        return Err(VerifyError::PublicKeyNotRsa);
    }
    let der = spki
        .to_der()
        .map_err(|e| VerifyError::CertParseFailed(e.to_string()))?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| VerifyError::CertParseFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

struct CachedKey {
    key: RsaPublicKey,
    /// `None` when the TTL is too large to represent.
    expires_at: Option<Instant>,
}

impl CachedKey {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Time-bounded cache of keys that were fetched from the trusted host and
/// decoded successfully. Nothing else is ever inserted.
#[derive(Clone)]
pub struct KeyCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CachedKey>>>,
}

impl KeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, url: &str) -> Option<RsaPublicKey> {
        let entries = self.entries.read().await;
        entries
            .get(url)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.key.clone())
    }

    pub async fn insert(&self, url: String, key: RsaPublicKey) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            url,
            CachedKey {
                key,
                expires_at: now.checked_add(self.ttl),
            },
        );
    }
}

// ---------------------------------------------------------------------------
// Endpoint resolution
// ---------------------------------------------------------------------------

/// Resolve the regional (non-FIPS) SNS endpoint and return its authority.
/// Signing certificates are served from that host.
pub async fn resolve_sns_cert_host(region: &str) -> Result<String> {
    use aws_sdk_sns::config::endpoint::{DefaultResolver, Params, ResolveEndpoint};

    let params = Params::builder()
        .region(region)
        .use_fips(false)
        .use_dual_stack(false)
        .build()
        .map_err(|e| anyhow!("building SNS endpoint parameters: {e}"))?;
    let endpoint = DefaultResolver::new()
        .resolve_endpoint(&params)
        .await
        .map_err(|e| anyhow!("resolving SNS endpoint for {region}: {e}"))?;
    let url = Url::parse(endpoint.url())?;
    authority(&url).ok_or_else(|| anyhow!("SNS endpoint {} has no host", endpoint.url()))
}
