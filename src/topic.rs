use crate::error::TopicMismatch;
use crate::types::Envelope;

/// Check that an authenticated envelope belongs to the expected topic.
///
/// Only meaningful once the signature has been verified; the verifier calls this
/// as its last step.
pub fn ensure_topic(envelope: &Envelope, expected: &str) -> Result<(), TopicMismatch> {
    if envelope.topic_arn.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(TopicMismatch {
            expected: expected.to_string(),
            actual: envelope.topic_arn.clone(),
        })
    }
}
