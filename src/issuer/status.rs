//! Issuer status value types.
//!
//! Status values are never edited in place by the reconciler: every update
//! goes through a consuming builder method that returns the next value, so a
//! caller can diff and write the result with optimistic concurrency.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum IssuerConditionType {
    Ready,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerCondition {
    #[serde(rename = "type")]
    pub condition_type: IssuerConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcmeIssuerStatus {
    /// Account URI returned by the ACME server on registration.
    #[serde(default)]
    pub uri: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<IssuerCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acme: Option<AcmeIssuerStatus>,
}

impl IssuerStatus {
    pub fn condition(&self, condition_type: IssuerConditionType) -> Option<&IssuerCondition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    pub fn ready(&self) -> Option<&IssuerCondition> {
        self.condition(IssuerConditionType::Ready)
    }

    /// Account URI on record, or `""` if the issuer has never registered.
    pub fn acme_uri(&self) -> &str {
        self.acme.as_ref().map(|a| a.uri.as_str()).unwrap_or("")
    }

    /// Returns a status with the given condition replaced.
    ///
    /// `lastTransitionTime` only moves when the condition is new or its
    /// status value changes; reason and message are always overwritten.
    pub fn with_condition(
        self,
        condition_type: IssuerConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) -> Self {
        self.with_condition_at(condition_type, status, reason, message, Utc::now())
    }

    pub(crate) fn with_condition_at(
        mut self,
        condition_type: IssuerConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let next = IssuerCondition {
            condition_type,
            status,
            last_transition_time: Some(now),
            reason: reason.to_string(),
            message: message.to_string(),
        };

        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            Some(existing) => {
                let last_transition_time = if existing.status == status {
                    existing.last_transition_time.or(Some(now))
                } else {
                    Some(now)
                };
                *existing = IssuerCondition {
                    last_transition_time,
                    ..next
                };
            }
            None => self.conditions.push(next),
        }
        self
    }

    pub fn with_acme_uri(mut self, uri: impl Into<String>) -> Self {
        self.acme.get_or_insert_with(AcmeIssuerStatus::default).uri = uri.into();
        self
    }
}
