//! Payment record aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::{BookingSnapshot, Payment};
pub use events::{
    PaymentErroredData, PaymentEvent, PaymentFailedData, PaymentInitiatedData, PaymentVerifiedData,
};
pub use state::PaymentState;

use thiserror::Error;

/// Errors that can occur during payment record operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Payment record is already initiated.
    #[error("Payment already initiated")]
    AlreadyInitiated,

    /// Payment is not in the expected state for the attempted action.
    #[error("Invalid payment state: cannot {action} from {current_state} state")]
    InvalidState {
        current_state: PaymentState,
        action: &'static str,
    },
}
