use serde::Deserialize;

/// A parsed SNS delivery.
///
/// Fields shared by every message type live on the struct; the per-type fields
/// live on [`MessageKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: MessageKind,
    pub message_id: String,
    pub topic_arn: String,
    /// For notifications this is itself a JSON document.
    pub message: String,
    /// ISO-8601, kept verbatim because it is part of the signed text.
    pub timestamp: String,
    /// Base64.
    pub signature: String,
    pub signature_version: String,
    pub signing_cert_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Notification { subject: Option<String> },
    SubscriptionConfirmation(Handshake),
    UnsubscribeConfirmation(Handshake),
}

impl MessageKind {
    pub const NOTIFICATION: &'static str = "Notification";
    pub const SUBSCRIPTION_CONFIRMATION: &'static str = "SubscriptionConfirmation";
    pub const UNSUBSCRIBE_CONFIRMATION: &'static str = "UnsubscribeConfirmation";

    /// The `Type` value as it appears on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            MessageKind::Notification { .. } => Self::NOTIFICATION,
            MessageKind::SubscriptionConfirmation(_) => Self::SUBSCRIPTION_CONFIRMATION,
            MessageKind::UnsubscribeConfirmation(_) => Self::UNSUBSCRIBE_CONFIRMATION,
        }
    }
}

/// Fields only present on subscription and unsubscription confirmations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub token: String,
    pub subscribe_url: String,
}

/// CloudWatch writes these keys in lower case; both spellings are accepted.
/// A dimension carrying both spellings of the same key is a duplicate-field
/// decode error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dimension {
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "Value", alias = "value", default)]
    pub value: String,
}

/// The subset of a CloudWatch alarm state-change record this service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRecord {
    pub alarm_name: String,
    pub new_state_value: String,
    pub trigger_dimensions: Vec<Dimension>,
}

impl AlarmRecord {
    /// Value of the first trigger dimension, the configuration set to pause.
    pub fn configuration_set(&self) -> Option<&str> {
        self.trigger_dimensions.first().map(|d| d.value.as_str())
    }
}

/// Read-only trust anchors shared by every request handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustContext {
    /// Authority (`host` or `host:port`) that signing certificates must come from.
    pub cert_host: String,
    /// Topic ARN this deployment subscribes to.
    pub topic_arn: String,
}

impl TrustContext {
    pub fn new(cert_host: impl Into<String>, topic_arn: impl Into<String>) -> Self {
        Self {
            cert_host: cert_host.into(),
            topic_arn: topic_arn.into(),
        }
    }
}
