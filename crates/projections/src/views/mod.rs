//! Read model views for the query side.

pub mod booking_directory;
pub mod customer_bookings;

pub use booking_directory::{BookingDetails, BookingDirectoryView, BookingRecord, PaymentSummary};
pub use customer_bookings::{CustomerBookingSummary, CustomerBookingsView};
