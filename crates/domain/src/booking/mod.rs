//! Booking aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Booking;
pub use commands::*;
pub use events::{
    BookingAmendedData, BookingCancelledData, BookingCompletedData, BookingConfirmedData,
    BookingCreatedData, BookingEvent, BookingPickedData, BookingRejectedData, OwnerAttachedData,
};
pub use service::BookingService;
pub use state::{BookingStatus, CodInitialStatus, DeliveryStatus};
pub use value_objects::{Contact, CustomerId, LineItem, Money, PartnerId, PaymentMethod, ProductId};

use thiserror::Error;

/// Errors that can occur during booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Booking is not in the expected state for the attempted action.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: BookingStatus,
        action: &'static str,
    },

    /// Another partner already claimed the booking.
    #[error("Booking already claimed by another partner")]
    AlreadyClaimed,

    /// Completed bookings cannot be cancelled.
    #[error("Booking already completed")]
    AlreadyCompleted,

    /// Invalid line item quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Invalid total amount.
    #[error("Invalid total: {cents} (must be greater than 0)")]
    InvalidTotal { cents: i64 },

    /// A required contact field is missing.
    #[error("Missing contact field: {field}")]
    MissingContact { field: &'static str },

    /// Booking has no line items.
    #[error("Booking has no items")]
    NoItems,

    /// Booking is already created.
    #[error("Booking already created")]
    AlreadyCreated,
}
