//! Decoding of the raw SNS request body. No trust decisions are made here.

use crate::error::ParseError;
use crate::types::{Envelope, Handshake, MessageKind};
use serde::Deserialize;

/// Wire shape, every member optional so that missing fields are reported by
/// name instead of as a generic serde error.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "MessageId")]
    message_id: Option<String>,
    #[serde(rename = "Token")]
    token: Option<String>,
    #[serde(rename = "TopicArn")]
    topic_arn: Option<String>,
    #[serde(rename = "Subject")]
    subject: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "SubscribeURL", alias = "SubscribeUrl")]
    subscribe_url: Option<String>,
    #[serde(rename = "Timestamp")]
    timestamp: Option<String>,
    #[serde(rename = "Signature")]
    signature: Option<String>,
    #[serde(rename = "SignatureVersion")]
    signature_version: Option<String>,
    #[serde(rename = "SigningCertURL", alias = "SigningCertUrl")]
    signing_cert_url: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ParseError> {
    value.ok_or(ParseError::MissingField(field))
}

/// Parse an SNS request body.
///
/// Unknown members are ignored. Signature related members default to empty so
/// the verifier reports them with a precise error kind.
pub fn parse(body: &[u8]) -> Result<Envelope, ParseError> {
    if body.is_empty() {
        return Err(ParseError::Empty);
    }
    let raw: RawEnvelope = serde_json::from_slice(body)?;

    let kind_name = required(raw.kind, "Type")?;
    let kind = match kind_name.as_str() {
        MessageKind::NOTIFICATION => Some(MessageKind::Notification {
            subject: raw.subject.filter(|s| !s.is_empty()),
        }),
        MessageKind::SUBSCRIPTION_CONFIRMATION | MessageKind::UNSUBSCRIBE_CONFIRMATION => {
            let handshake = Handshake {
                token: required(raw.token, "Token")?,
                subscribe_url: required(raw.subscribe_url, "SubscribeURL")?,
            };
            if kind_name == MessageKind::SUBSCRIPTION_CONFIRMATION {
                Some(MessageKind::SubscriptionConfirmation(handshake))
            } else {
                Some(MessageKind::UnsubscribeConfirmation(handshake))
            }
        }
        _ => None,
    };
    let kind = kind.ok_or(ParseError::UnknownType(kind_name))?;

    Ok(Envelope {
        kind,
        message_id: required(raw.message_id, "MessageId")?,
        topic_arn: required(raw.topic_arn, "TopicArn")?,
        message: required(raw.message, "Message")?,
        timestamp: required(raw.timestamp, "Timestamp")?,
        signature: raw.signature.unwrap_or_default(),
        signature_version: raw.signature_version.unwrap_or_default(),
        signing_cert_url: raw.signing_cert_url.unwrap_or_default(),
    })
}
