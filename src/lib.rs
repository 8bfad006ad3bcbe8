//! Authenticity checks and alarm dispatch for SNS deliveries carrying SES
//! reputation alarms.
//!
//! A request flows through [`envelope::parse`], [`verification::SignatureVerifier`]
//! (which ends with the [`topic`] guard) and finally [`dispatch::Dispatcher`], which
//! either completes a subscription handshake or validates the embedded CloudWatch
//! alarm and pauses sending on the named configuration set.

pub mod action;
pub mod alarm;
pub mod certificate;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod handshake;
pub mod http_server;
pub mod telemetry;
pub mod topic;
pub mod types;
pub mod verification;


pub use dispatch::{Dispatcher, Outcome};
pub use error::RequestError;
pub use types::{AlarmRecord, Dimension, Envelope, Handshake, MessageKind, TrustContext};
pub use verification::{SignatureVerifier, VerifiedEnvelope};
