//! Collaborator traits and in-memory implementations.
//!
//! The coordinator and reconciler talk to the catalog, partner directory,
//! push service and payment gateway only through these traits. The in-memory
//! implementations back the tests and the default server wiring; production
//! deployments swap in real adapters.

mod catalog;
mod gateway;
mod partners;
mod push;

pub use catalog::{CatalogDirectory, InMemoryCatalog, StockLedger};
pub use gateway::{GatewayIntent, InMemoryPaymentGateway, PaymentGateway};
pub use partners::{InMemoryPartnerDirectory, Partner, PartnerDirectory};
pub use push::{InMemoryPushSender, PushSender, SentPush};
