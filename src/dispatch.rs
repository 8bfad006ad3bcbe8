//! Routing of verified envelopes by message type.

use crate::action::SendingController;
use crate::alarm;
use crate::error::{AlarmError, DispatchError, ValidationErrors};
use crate::handshake::SubscriptionConfirmer;
use crate::types::MessageKind;
use crate::verification::VerifiedEnvelope;
use std::sync::Arc;
use tracing::{info, warn};

/// Transport header SNS sets to advertise the message type. Advisory only.
pub const MESSAGE_TYPE_HEADER: &str = "x-amz-sns-message-type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    SubscriptionConfirmed,
    SendingPaused { configuration_set: String },
    /// The alarm was authentic but not one this service acts on.
    AlarmRejected(ValidationErrors),
    Unsubscribed,
}

pub struct Dispatcher {
    confirmer: Arc<dyn SubscriptionConfirmer>,
    sending: Arc<dyn SendingController>,
}

impl Dispatcher {
    pub fn new(
        confirmer: Arc<dyn SubscriptionConfirmer>,
        sending: Arc<dyn SendingController>,
    ) -> Self {
        Self { confirmer, sending }
    }

    /// Act on a verified envelope. `type_header` is the transport's claim about
    /// the type; if present it must agree with the signed `Type`.
    pub async fn dispatch(
        &self,
        envelope: &VerifiedEnvelope,
        type_header: Option<&str>,
    ) -> Result<Outcome, DispatchError> {
        let verified = envelope.kind.type_name();
        if let Some(header) = type_header {
            if header != verified {
                return Err(DispatchError::TypeHeaderMismatch {
                    header: header.to_string(),
                    verified,
                });
            }
        }

        match &envelope.kind {
            MessageKind::SubscriptionConfirmation(handshake) => {
                self.confirmer.confirm(&envelope.topic_arn, handshake).await?;
                info!(topic = %envelope.topic_arn, "confirmed subscription to SNS topic");
                Ok(Outcome::SubscriptionConfirmed)
            }
            MessageKind::Notification { .. } => self.deliver(envelope).await,
            MessageKind::UnsubscribeConfirmation(_) => {
                info!(topic = %envelope.topic_arn, "ignoring unsubscribe confirmation");
                Ok(Outcome::Unsubscribed)
            }
        }
    }

    async fn deliver(&self, envelope: &VerifiedEnvelope) -> Result<Outcome, DispatchError> {
        let alarm = match alarm::validate(&envelope.message) {
            Ok(alarm) => alarm,
            Err(AlarmError::Invalid(errs)) => {
                warn!(
                    message_id = %envelope.message_id,
                    errors = ?errs,
                    "CloudWatch alarm failed validation; is the subscription filter policy letting non-SES notifications through?"
                );
                return Ok(Outcome::AlarmRejected(errs));
            }
            Err(e) => return Err(e.into()),
        };

        // validate() guarantees one dimension.
        let configuration_set = alarm.configuration_set().unwrap_or_default().to_string();
        info!(
            configuration_set = %configuration_set,
            alarm = %alarm.alarm_name,
            state = %alarm.new_state_value,
            "pausing sending on SES identity via configuration set"
        );
        self.sending.disable_sending(&configuration_set).await?;
        Ok(Outcome::SendingPaused { configuration_set })
    }
}
