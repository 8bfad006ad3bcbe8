//! Decoding and validation of the CloudWatch alarm carried in a notification.

use crate::error::{AlarmError, ValidationErrors};
use crate::types::{AlarmRecord, Dimension};
use serde::Deserialize;

/// Alarm names SES creates for critical bounce-rate reputation alarms.
pub const ALARM_NAME_PREFIX: &str = "SES-BounceRate-Critical-Identity-";
pub const CONFIGURATION_SET_DIMENSION: &str = "ConfigurationSetName";

#[derive(Deserialize)]
struct RawAlarm {
    #[serde(rename = "AlarmName", default)]
    alarm_name: String,
    #[serde(rename = "NewStateValue", default)]
    new_state_value: String,
    #[serde(rename = "Trigger", default)]
    trigger: RawTrigger,
}

#[derive(Deserialize, Default)]
struct RawTrigger {
    #[serde(rename = "Dimensions", default)]
    dimensions: Vec<Dimension>,
}

/// Decode the alarm JSON without judging its contents.
pub fn decode(message: &str) -> Result<AlarmRecord, AlarmError> {
    let raw: RawAlarm = serde_json::from_str(message)?;
    Ok(AlarmRecord {
        alarm_name: raw.alarm_name,
        new_state_value: raw.new_state_value,
        trigger_dimensions: raw.trigger.dimensions,
    })
}

impl AlarmRecord {
    /// Collect every rule violation. Only an empty dimension list stops early.
    pub fn validation_errors(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::new();
        if !self.alarm_name.starts_with(ALARM_NAME_PREFIX) {
            errs.insert(
                "AlarmName".into(),
                format!(
                    "expected alarm to have prefix {ALARM_NAME_PREFIX}, but name was {}",
                    self.alarm_name
                ),
            );
        }

        let Some(first) = self.trigger_dimensions.first() else {
            errs.insert(
                "Trigger.Dimensions".into(),
                "expected one trigger dimension on the alarm, got 0".into(),
            );
            return errs;
        };

        let count = self.trigger_dimensions.len();
        if count > 1 {
            errs.insert(
                "Trigger.Dimensions".into(),
                format!("expected only one trigger dimension on the alarm, got {count}"),
            );
        }
        if first.name != CONFIGURATION_SET_DIMENSION {
            errs.insert(
                "Trigger.Dimensions[0].Name".into(),
                format!(
                    "expected alarm with name {CONFIGURATION_SET_DIMENSION}, got {}",
                    first.name
                ),
            );
        }
        errs
    }
}

/// Decode and validate. A decode failure and a validation failure are
/// reported as different [`AlarmError`] variants.
pub fn validate(message: &str) -> Result<AlarmRecord, AlarmError> {
    let alarm = decode(message)?;
    let errs = alarm.validation_errors();
    if errs.is_empty() {
        Ok(alarm)
    } else {
        Err(AlarmError::Invalid(errs))
    }
}
