use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Gateway intent exists, awaiting the reconciliation callback.
    #[default]
    Created,
    /// Signature verified, booking created.
    Paid,
    /// Signature rejected or the gateway reported failure.
    Failed,
    /// Verified but downstream booking creation failed.
    Errored,
}

impl PaymentState {
    /// Whether the record still awaits a verification outcome.
    pub fn is_pending(&self) -> bool {
        matches!(self, PaymentState::Created)
    }

    /// Whether the record has settled and cannot change again.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            PaymentState::Paid | PaymentState::Failed | PaymentState::Errored
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Created => "created",
            PaymentState::Paid => "paid",
            PaymentState::Failed => "failed",
            PaymentState::Errored => "errored",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
