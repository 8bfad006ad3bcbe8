//! Error taxonomy for the request pipeline.
//!
//! Every stage returns its own error type; [`RequestError`] is what the HTTP
//! layer sees and decides the response status from.

use axum::http::StatusCode;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field-keyed validation messages for an alarm, e.g. `Trigger.Dimensions`.
pub type ValidationErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("SNS request body was 0 bytes")]
    Empty,

    #[error("unmarshalling SNS request body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SNS message is missing required field {0}")]
    MissingField(&'static str),

    #[error("unrecognized SNS message type {0:?}")]
    UnknownType(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("response body exceeds {0} bytes")]
    TooLarge(usize),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("wanted topic ARN {expected}, got {actual}")]
pub struct TopicMismatch {
    pub expected: String,
    pub actual: String,
}

/// Reasons an envelope failed authentication, in the order they are checked.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("unsupported signature version {0:?}")]
    UnsupportedSignatureVersion(String),

    #[error("missing signing cert URL")]
    MissingCertUrl,

    #[error("error parsing signing cert URL: {0}")]
    MalformedCertUrl(String),

    #[error("unexpected signing domain: wanted {expected}, got {actual}")]
    WrongCertDomain { expected: String, actual: String },

    #[error("fetching signing certificate: {0}")]
    CertificateFetch(#[from] FetchError),

    #[error("failed to decode PEM block from certificate")]
    PemDecodeFailed,

    #[error("failed to parse signing certificate: {0}")]
    CertParseFailed(String),

    #[error("certificate public key is not RSA")]
    PublicKeyNotRsa,

    #[error("signature is not valid base64: {0}")]
    SignatureNotBase64(#[from] base64::DecodeError),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error(transparent)]
    WrongTopic(#[from] TopicMismatch),
}

impl VerifyError {
    /// Stable identifier for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            VerifyError::UnsupportedSignatureVersion(_) => "unsupported_signature_version",
            VerifyError::MissingCertUrl => "missing_cert_url",
            VerifyError::MalformedCertUrl(_) => "malformed_cert_url",
            VerifyError::WrongCertDomain { .. } => "wrong_cert_domain",
            VerifyError::CertificateFetch(_) => "cert_fetch",
            VerifyError::PemDecodeFailed => "pem_decode_failed",
            VerifyError::CertParseFailed(_) => "cert_parse_failed",
            VerifyError::PublicKeyNotRsa => "public_key_not_rsa",
            VerifyError::SignatureNotBase64(_) => "signature_not_base64",
            VerifyError::SignatureInvalid => "signature_invalid",
            VerifyError::WrongTopic(_) => "wrong_topic",
        }
    }
}

#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("unmarshalling CloudWatch alarm from SNS message body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("one or more errors validating CloudWatch alarm: {0:?}")]
    Invalid(ValidationErrors),
}

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("ConfirmSubscription call failed: {0}")]
    Api(String),

    #[error("refusing to fetch SubscribeURL {0:?}")]
    UntrustedUrl(String),

    #[error("fetching SubscribeURL: {0}")]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Error)]
#[error("error pausing sending on configuration set {configuration_set}: {message}")]
pub struct ActionError {
    pub configuration_set: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("message type header {header:?} does not match verified type {verified}")]
    TypeHeaderMismatch {
        header: String,
        verified: &'static str,
    },

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Alarm(#[from] AlarmError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Parse(_) | RequestError::Verify(_) => StatusCode::BAD_REQUEST,
            RequestError::Dispatch(DispatchError::TypeHeaderMismatch { .. })
            | RequestError::Dispatch(DispatchError::Alarm(_)) => StatusCode::BAD_REQUEST,
            RequestError::Dispatch(DispatchError::Handshake(_))
            | RequestError::Dispatch(DispatchError::Action(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RequestError::Parse(_) => "parse",
            RequestError::Verify(e) => e.code(),
            RequestError::Dispatch(DispatchError::TypeHeaderMismatch { .. }) => {
                "type_header_mismatch"
            }
            RequestError::Dispatch(DispatchError::Handshake(_)) => "handshake",
            RequestError::Dispatch(DispatchError::Alarm(_)) => "alarm_decode",
            RequestError::Dispatch(DispatchError::Action(_)) => "action",
        }
    }
}
