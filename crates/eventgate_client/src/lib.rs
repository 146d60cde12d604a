//! eventgate_client
//!
//! Types describing a connected streaming client: its identifier, the event
//! category it subscribed to, and the size-1 delivery queue the broker writes
//! into. The broker crate owns `Client` records; transports own the receiving
//! half of each queue.

pub mod client;

pub use client::{
    Category, Client, ClientId, ClientInfo, DELIVERY_QUEUE_CAPACITY, DeliveryReceiver,
    DeliverySender, Frame, Subject,
};

#[cfg(test)]
mod tests;
