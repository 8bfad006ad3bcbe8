//! Completion of the SNS subscription handshake.
//!
//! Two strategies are available. [`SnsApiConfirmer`] calls ConfirmSubscription
//! and learns whether SNS accepted it; [`SubscribeUrlConfirmer`] only learns that
//! the confirmation URL answered with a success status.

use crate::certificate::{self, MAX_CERTIFICATE_BYTES};
use crate::error::HandshakeError;
use crate::types::Handshake;
use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use std::time::Duration;

#[async_trait]
pub trait SubscriptionConfirmer: Send + Sync {
    async fn confirm(&self, topic_arn: &str, handshake: &Handshake) -> Result<(), HandshakeError>;
}

// ---------------------------------------------------------------------------
// ConfirmSubscription API
// ---------------------------------------------------------------------------

pub struct SnsApiConfirmer {
    client: aws_sdk_sns::Client,
}

impl SnsApiConfirmer {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubscriptionConfirmer for SnsApiConfirmer {
    async fn confirm(&self, topic_arn: &str, handshake: &Handshake) -> Result<(), HandshakeError> {
        let output = self
            .client
            .confirm_subscription()
            .token(&handshake.token)
            .topic_arn(topic_arn)
            .send()
            .await
            .map_err(|e| HandshakeError::Api(DisplayErrorContext(&e).to_string()))?;
        tracing::debug!(
            subscription_arn = output.subscription_arn().unwrap_or_default(),
            "ConfirmSubscription succeeded"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SubscribeURL
// ---------------------------------------------------------------------------

pub struct SubscribeUrlConfirmer {
    client: reqwest::Client,
    trusted_host: String,
}

impl SubscribeUrlConfirmer {
    pub fn new(trusted_host: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            trusted_host: trusted_host.into(),
        })
    }
}

#[async_trait]
impl SubscriptionConfirmer for SubscribeUrlConfirmer {
    async fn confirm(&self, _topic_arn: &str, handshake: &Handshake) -> Result<(), HandshakeError> {
        // Same allowlist as the signing certificate.
        let url = certificate::trusted_url(&handshake.subscribe_url, &self.trusted_host)
            .map_err(|_| HandshakeError::UntrustedUrl(handshake.subscribe_url.clone()))?;
        certificate::get_bounded(&self.client, &url, MAX_CERTIFICATE_BYTES).await?;
        Ok(())
    }
}
