use crate::error::ActionError;
use async_trait::async_trait;
use aws_sdk_ses::error::DisplayErrorContext;

/// The one side effect this service may trigger: pausing outbound mail for a
/// configuration set. Pausing an already paused set succeeds.
#[async_trait]
pub trait SendingController: Send + Sync {
    async fn disable_sending(&self, configuration_set: &str) -> Result<(), ActionError>;
}

pub struct SesSendingController {
    client: aws_sdk_ses::Client,
}

impl SesSendingController {
    pub fn new(client: aws_sdk_ses::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SendingController for SesSendingController {
    async fn disable_sending(&self, configuration_set: &str) -> Result<(), ActionError> {
        self.client
            .update_configuration_set_sending_enabled()
            .configuration_set_name(configuration_set)
            .enabled(false)
            .send()
            .await
            .map_err(|e| ActionError {
                configuration_set: configuration_set.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}
