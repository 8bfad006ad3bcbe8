//! Harness for end-to-end tests: a local certificate host, recording fakes for
//! the AWS side effects and a running receiver.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use base64::Engine as _;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde_json::{json, Value};
use ses_reputation_guard::action::SendingController;
use ses_reputation_guard::certificate::{HttpCertificateSource, MAX_CERTIFICATE_BYTES};
use ses_reputation_guard::error::{ActionError, HandshakeError};
use ses_reputation_guard::handshake::SubscriptionConfirmer;
use ses_reputation_guard::http_server::{self, ServerState};
use ses_reputation_guard::{Dispatcher, Handshake, SignatureVerifier, TrustContext};
use sha1::{Digest, Sha1};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");
pub const SIGNING_CERT_PEM: &str = include_str!("../fixtures/signing_cert.pem");

pub const TOPIC_ARN: &str = "arn:aws:sns:us-east-1:123456789012:platform-notifications";

#[derive(Default)]
pub struct RecordingConfirmer {
    pub tokens: Mutex<Vec<String>>,
}

#[async_trait]
impl SubscriptionConfirmer for RecordingConfirmer {
    async fn confirm(&self, _topic_arn: &str, handshake: &Handshake) -> Result<(), HandshakeError> {
        self.tokens.lock().unwrap().push(handshake.token.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingController {
    pub paused: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl SendingController for RecordingController {
    async fn disable_sending(&self, configuration_set: &str) -> Result<(), ActionError> {
        self.paused.lock().unwrap().push(configuration_set.to_string());
        if self.fail {
            return Err(ActionError {
                configuration_set: configuration_set.to_string(),
                message: "ServiceUnavailable".into(),
            });
        }
        Ok(())
    }
}

pub struct TestApp {
    pub base_url: String,
    pub cert_host: String,
    pub cert_url: String,
    pub confirmer: Arc<RecordingConfirmer>,
    pub controller: Arc<RecordingController>,
    client: reqwest::Client,
}

pub const CERT_PATH: &str = "/SimpleNotificationService-test.pem";
/// Never answers within any test timeout.
pub const STALLED_CERT_PATH: &str = "/stalled.pem";
/// Redirects to [`CERT_PATH`].
pub const REDIRECTING_CERT_PATH: &str = "/moved.pem";
/// One byte over the certificate size cap.
pub const OVERSIZED_CERT_PATH: &str = "/oversized.pem";

/// Serve the fixture certificate, plus misbehaving variants, on an ephemeral
/// port and return its address.
pub async fn start_cert_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route(CERT_PATH, get(|| async { SIGNING_CERT_PEM }))
        .route(
            STALLED_CERT_PATH,
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                SIGNING_CERT_PEM
            }),
        )
        .route(
            REDIRECTING_CERT_PATH,
            get(|| async { Redirect::temporary(CERT_PATH) }),
        )
        .route(
            OVERSIZED_CERT_PATH,
            get(|| async { vec![b'A'; MAX_CERTIFICATE_BYTES + 1] }),
        );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(RecordingController::default()).await
    }

    pub async fn spawn_with(controller: RecordingController) -> Self {
        let cert_addr = start_cert_server().await;
        let cert_host = cert_addr.to_string();

        let verifier = SignatureVerifier::new(
            Arc::new(TrustContext::new(cert_host.clone(), TOPIC_ARN)),
            Arc::new(HttpCertificateSource::new(Duration::from_secs(5)).unwrap()),
        );
        let confirmer = Arc::new(RecordingConfirmer::default());
        let controller = Arc::new(controller);
        let state = ServerState::new(
            verifier,
            Dispatcher::new(confirmer.clone(), controller.clone()),
        );
        let (addr, _handle) = http_server::start("127.0.0.1:0", state).await.unwrap();

        Self {
            base_url: format!("http://{addr}{}", http_server::REPUTATION_ALARM_PATH),
            cert_url: format!("http://{cert_host}{CERT_PATH}"),
            cert_host,
            confirmer,
            controller,
            client: reqwest::Client::new(),
        }
    }

    /// POST `body`, optionally with the SNS message type header, and return the status.
    pub async fn post(&self, body: impl Into<String>, type_header: Option<&str>) -> u16 {
        let mut req = self.client.post(&self.base_url).body(body.into());
        if let Some(t) = type_header {
            req = req.header("x-amz-sns-message-type", t);
        }
        req.send().await.unwrap().status().as_u16()
    }

    pub fn paused(&self) -> Vec<String> {
        self.controller.paused.lock().unwrap().clone()
    }

    pub fn confirmed_tokens(&self) -> Vec<String> {
        self.confirmer.tokens.lock().unwrap().clone()
    }
}

pub fn sign(text: &str) -> String {
    let key = RsaPrivateKey::from_pkcs8_pem(SIGNING_KEY_PEM).unwrap();
    let digest = Sha1::digest(text.as_bytes());
    let signature = key.sign(Pkcs1v15Sign::new::<Sha1>(), &digest).unwrap();
    base64::engine::general_purpose::STANDARD.encode(signature)
}

const NOTIFICATION_FIELDS: &[&str] = &["Message", "MessageId", "Subject", "Timestamp", "TopicArn", "Type"];
const HANDSHAKE_FIELDS: &[&str] = &[
    "Message",
    "MessageId",
    "SubscribeURL",
    "Timestamp",
    "Token",
    "TopicArn",
    "Type",
];

/// Fill in `Signature` over the canonical fields of `body`, signed with the fixture key.
pub fn sign_body(mut body: Value) -> Value {
    let fields = if body["Type"] == "Notification" {
        NOTIFICATION_FIELDS
    } else {
        HANDSHAKE_FIELDS
    };
    let mut text = String::new();
    for name in fields {
        match body.get(*name).and_then(Value::as_str) {
            Some(value) if !(*name == "Subject" && value.is_empty()) => {
                text.push_str(name);
                text.push('\n');
                text.push_str(value);
                text.push('\n');
            }
            _ => {}
        }
    }
    body["Signature"] = sign(&text).into();
    body
}

pub fn alarm_message(name: &str, dimensions: &[(&str, &str)]) -> String {
    let dimensions: Vec<Value> = dimensions
        .iter()
        .map(|(n, v)| json!({ "name": n, "value": v }))
        .collect();
    json!({
        "AlarmName": name,
        "AlarmDescription": "Bounce rate is above the critical threshold",
        "NewStateValue": "ALARM",
        "OldStateValue": "OK",
        "Trigger": {
            "MetricName": "Reputation.BounceRate",
            "Namespace": "AWS/SES",
            "Dimensions": dimensions,
        },
    })
    .to_string()
}

/// A signed notification naming `cert_url` as its signing certificate.
pub fn notification_body(cert_url: &str, topic_arn: &str, message: &str) -> Value {
    sign_body(json!({
        "Type": "Notification",
        "MessageId": "22b80b92-fdea-4c2c-8f9d-bdfb0c7bf324",
        "TopicArn": topic_arn,
        "Subject": "ALARM: \"SES-BounceRate-Critical-Identity-ExampleSet\"",
        "Message": message,
        "Timestamp": "2024-05-01T12:00:00.000Z",
        "SignatureVersion": "1",
        "SigningCertURL": cert_url,
    }))
}

impl TestApp {
    pub fn notification(&self, topic_arn: &str, message: &str) -> Value {
        notification_body(&self.cert_url, topic_arn, message)
    }

    /// URL of another path on this app's certificate host.
    pub fn cert_url_for(&self, path: &str) -> String {
        format!("http://{}{path}", self.cert_host)
    }

    pub fn handshake(&self, kind: &str) -> Value {
        sign_body(json!({
            "Type": kind,
            "MessageId": "165545c9-2a5c-472c-8df2-7ff2be2b3b1b",
            "Token": "2336412f37fb687f5d51e6e241d09c805a5a57b30d712f794cc5f6a988666d92768dd60a747ba6f3beb71854e285d6ad02428b09ceece29417f1f02d609c582afbacc99c583a916b9981dd2728f4ae6fdb82efd087cc3b7849e05798d2d2785c03b0879594eeac82c01f235d0e717736",
            "TopicArn": TOPIC_ARN,
            "Message": "You have chosen to subscribe to the topic.",
            "SubscribeURL": "https://sns.us-east-1.amazonaws.com/?Action=ConfirmSubscription",
            "Timestamp": "2024-05-01T11:59:00.000Z",
            "SignatureVersion": "1",
            "SigningCertURL": self.cert_url,
        }))
    }
}
