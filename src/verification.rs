//! SNS message signature verification (signature version 1).
//!
//! Steps run in a fixed order and stop at the first failure. The certificate
//! host is checked before anything is fetched, and the topic is only compared
//! once the signature has proven the message intact.

use crate::certificate::{self, CertificateSource, KeyCache};
use crate::error::VerifyError;
use crate::topic;
use crate::types::{Envelope, MessageKind, TrustContext};
use base64::Engine as _;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const SIGNATURE_VERSION: &str = "1";

/// An envelope whose signature and topic have been checked.
///
/// Only [`SignatureVerifier::verify`] produces one, so anything that takes a
/// `VerifiedEnvelope` cannot run on unauthenticated input.
#[derive(Debug, Clone)]
pub struct VerifiedEnvelope(Envelope);

impl VerifiedEnvelope {
    #[cfg(test)]
    pub(crate) fn assume_verified(envelope: Envelope) -> Self {
        Self(envelope)
    }
}

impl Deref for VerifiedEnvelope {
    type Target = Envelope;

    fn deref(&self) -> &Envelope {
        &self.0
    }
}

fn push_field(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push('\n');
    out.push_str(value);
    out.push('\n');
}

/// Build the canonical text SNS signed for this envelope.
///
/// An empty `Subject` is left out entirely; emitting an empty pair would not
/// match what SNS signed.
pub fn string_to_sign(envelope: &Envelope) -> String {
    let mut out = String::with_capacity(envelope.message.len() + 256);
    let type_name = envelope.kind.type_name();
    match &envelope.kind {
        MessageKind::Notification { subject } => {
            push_field(&mut out, "Message", &envelope.message);
            push_field(&mut out, "MessageId", &envelope.message_id);
            if let Some(subject) = subject.as_deref().filter(|s| !s.is_empty()) {
                push_field(&mut out, "Subject", subject);
            }
            push_field(&mut out, "Timestamp", &envelope.timestamp);
            push_field(&mut out, "TopicArn", &envelope.topic_arn);
            push_field(&mut out, "Type", type_name);
        }
        MessageKind::SubscriptionConfirmation(handshake)
        | MessageKind::UnsubscribeConfirmation(handshake) => {
            push_field(&mut out, "Message", &envelope.message);
            push_field(&mut out, "MessageId", &envelope.message_id);
            push_field(&mut out, "SubscribeURL", &handshake.subscribe_url);
            push_field(&mut out, "Timestamp", &envelope.timestamp);
            push_field(&mut out, "Token", &handshake.token);
            push_field(&mut out, "TopicArn", &envelope.topic_arn);
            push_field(&mut out, "Type", type_name);
        }
    }
    out
}

pub struct SignatureVerifier {
    trust: Arc<TrustContext>,
    certificates: Arc<dyn CertificateSource>,
    cache: Option<KeyCache>,
}

impl SignatureVerifier {
    pub fn new(trust: Arc<TrustContext>, certificates: Arc<dyn CertificateSource>) -> Self {
        Self {
            trust,
            certificates,
            cache: None,
        }
    }

    /// Cache decoded signing keys for `ttl`. A zero duration leaves caching off.
    pub fn with_key_cache(mut self, ttl: Duration) -> Self {
        self.cache = (!ttl.is_zero()).then(|| KeyCache::new(ttl));
        self
    }

    pub async fn verify(&self, envelope: Envelope) -> Result<VerifiedEnvelope, VerifyError> {
        if envelope.signature_version != SIGNATURE_VERSION {
            return Err(VerifyError::UnsupportedSignatureVersion(
                envelope.signature_version,
            ));
        }
        if envelope.signing_cert_url.is_empty() {
            return Err(VerifyError::MissingCertUrl);
        }
        let cert_url = certificate::trusted_url(&envelope.signing_cert_url, &self.trust.cert_host)?;

        let key = self.signing_key(&cert_url).await?;

        let signature = base64::engine::general_purpose::STANDARD.decode(&envelope.signature)?;
        let digest = Sha1::digest(string_to_sign(&envelope).as_bytes());
        key.verify(Pkcs1v15Sign::new::<Sha1>(), &digest, &signature)
            .map_err(|_| VerifyError::SignatureInvalid)?;

        topic::ensure_topic(&envelope, &self.trust.topic_arn)?;

        Ok(VerifiedEnvelope(envelope))
    }

    async fn signing_key(&self, cert_url: &Url) -> Result<RsaPublicKey, VerifyError> {
        if let Some(cache) = &self.cache {
            if let Some(key) = cache.get(cert_url.as_str()).await {
                tracing::debug!(cert_url = %cert_url, "using cached signing key");
                return Ok(key);
            }
        }

        let pem = self.certificates.fetch(cert_url).await?;
        let key = certificate::rsa_public_key(&pem)?;

        if let Some(cache) = &self.cache {
            cache.insert(cert_url.to_string(), key.clone()).await;
        }
        Ok(key)
    }
}
