//! Read models and projections for the query side.
//!
//! This crate provides the query side of the system:
//! - [`Projection`] trait for processing events into read models
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`ProjectionProcessor`] for feeding events from the store to projections
//! - Two read model views: the booking directory (admin listing with linked
//!   payments) and per-customer bookings (with guest-email merge)

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{BookingDirectoryView, CustomerBookingsView};
