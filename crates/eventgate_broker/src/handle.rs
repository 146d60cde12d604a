//! Handles onto the broker coordinator
//!
//! [`BrokerHandle`] is the only way other tasks reach the registration table.
//! Every method enqueues a command and returns; none of them touch the table
//! directly. [`Subscription`] is what a streaming connection holds for its
//! lifetime: the receiving half of its delivery queue plus a one-shot
//! deregistration guard that also fires on drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use eventgate_client::{Category, Client, ClientId, ClientInfo, DeliveryReceiver, Frame, Subject};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::engine::Command;
use crate::error::BrokerError;
use crate::message::Message;

#[derive(Debug, Clone)]
pub struct BrokerHandle {
    commands: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
}

impl BrokerHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            commands,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate a connection id no other client of this broker will ever get.
    pub fn next_client_id(&self) -> ClientId {
        ClientId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register(&self, client: Client) -> Result<(), BrokerError> {
        self.send(Command::Register(client))
    }

    /// Remove a client and close its queue. Unknown ids are ignored by the
    /// coordinator.
    pub fn deregister(&self, id: ClientId) -> Result<(), BrokerError> {
        self.send(Command::Deregister(id))
    }

    pub fn publish(&self, msg: Message) -> Result<(), BrokerError> {
        self.send(Command::Publish(msg))
    }

    /// Current registrations, as seen after every command enqueued before this
    /// call has been applied.
    pub async fn snapshot(&self) -> Result<Vec<ClientInfo>, BrokerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| BrokerError::Closed)
    }

    /// Close every client queue and stop the coordinator.
    pub fn shutdown(&self) -> Result<(), BrokerError> {
        self.send(Command::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Build a client with a fresh queue and register it.
    pub fn subscribe(
        &self,
        subject: impl Into<Subject>,
        category: Category,
    ) -> Result<Subscription, BrokerError> {
        let (client, receiver) = Client::new(self.next_client_id(), subject, category);
        let info = client.info();
        self.register(client)?;
        Ok(Subscription {
            info,
            receiver,
            broker: self.clone(),
            deregistered: false,
        })
    }

    fn send(&self, command: Command) -> Result<(), BrokerError> {
        self.commands.send(command).map_err(|_| BrokerError::Closed)
    }
}

/// A registered client as seen by the connection serving it.
#[derive(Debug)]
pub struct Subscription {
    info: ClientInfo,
    receiver: DeliveryReceiver,
    broker: BrokerHandle,
    deregistered: bool,
}

impl Subscription {
    pub fn id(&self) -> ClientId {
        self.info.id
    }

    pub fn info(&self) -> &ClientInfo {
        &self.info
    }

    /// Next delivered frame, or `None` once the broker closed the queue.
    pub async fn recv(&mut self) -> Option<Arc<Frame>> {
        self.receiver.recv().await
    }

    /// Ask the broker to deregister this client. Only the first call sends
    /// anything; later calls and the drop guard are no-ops.
    pub fn close(&mut self) {
        if std::mem::replace(&mut self.deregistered, true) {
            return;
        }
        if self.broker.deregister(self.info.id).is_err() {
            debug!("Broker already stopped while closing {}", self.info.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
