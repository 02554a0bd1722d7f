//! Domain layer for the Retrowoods order backend.
//!
//! This crate provides the core domain abstractions including:
//! - Aggregate trait for event-sourced entities
//! - DomainEvent trait for domain events
//! - Command trait and CommandHandler for command processing
//! - Booking aggregate implementation with the fulfillment state machine
//! - Sequence allocator for human-readable booking ids

pub mod aggregate;
pub mod booking;
pub mod command;
pub mod error;
pub mod sequence;

pub use aggregate::{Aggregate, DomainEvent};
pub use booking::{
    AdminUpdateBooking, AttachOwner, Booking, BookingError, BookingEvent, BookingService,
    BookingStatus, CancelBooking, CodInitialStatus, CompleteBooking, ConfirmBooking, Contact,
    CreateBooking, CustomerId, DeliveryStatus, LineItem, Money, PartnerId, PaymentMethod,
    PickBooking, ProductId, RejectBooking,
};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use sequence::{InMemorySequenceAllocator, SequenceAllocator, SequenceId};
