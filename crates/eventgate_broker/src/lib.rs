//! eventgate_broker
//!
//! The broker crate holds the event coordinator: the single task that owns the
//! table of connected clients, applies registrations, deregistrations and
//! publishes in arrival order, and fans published messages out to the clients
//! whose routing attributes match.
//!
//! Public types:
//! - `Broker`: the coordinator itself; spawn it with `Broker::start` or run
//!   `Broker::run` on a task of your choosing.
//! - `BrokerHandle`: cloneable front door used by transports and publishers.
//! - `Subscription`: a registered client's receiving end, deregistered on drop.
//! - `Message`: a published event and its routing rule.

pub mod delivery;
pub mod engine;
pub mod error;
pub mod handle;
pub mod message;
pub mod registry;

pub use delivery::Delivery;
pub use engine::Broker;
pub use error::BrokerError;
pub use handle::{BrokerHandle, Subscription};
pub use message::{Message, Route};
pub use registry::Registry;

#[cfg(test)]
mod tests;
