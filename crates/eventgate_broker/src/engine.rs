//! Broker engine
//!
//! The coordinator is a single task that owns the registration table and
//! applies commands one at a time, in the order they arrive:
//! - `Register` adds a client
//! - `Deregister` removes it and closes its delivery queue (no-op if absent)
//! - `Publish` fans a message out to every matching client
//! - `Snapshot` reports the current table
//! - `Shutdown` closes every queue and stops the task
//!
//! Nothing else ever touches the table, so it needs no lock. Other tasks talk
//! to the coordinator through a cloneable [`BrokerHandle`]. The coordinator
//! also stops once every handle has been dropped.
//!
//! Fan-out never waits on a client. Deliveries run on their own tasks (see
//! `delivery`), so a slow reader stalls only itself.

use eventgate_client::{Client, ClientId, ClientInfo};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::handle::BrokerHandle;
use crate::message::Message;
use crate::registry::Registry;

#[derive(Debug)]
pub enum Command {
    Register(Client),
    Deregister(ClientId),
    Publish(Message),
    Snapshot(oneshot::Sender<Vec<ClientInfo>>),
    Shutdown,
}

#[derive(Debug)]
pub struct Broker {
    registry: Registry,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Broker {
    /// Create a coordinator and the handle that feeds it. Nothing happens
    /// until [`Broker::run`] is polled.
    pub fn new() -> (Self, BrokerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let broker = Self {
            registry: Registry::new(),
            commands: rx,
        };
        (broker, BrokerHandle::new(tx))
    }

    /// Spawn the coordinator on the current runtime and return its handle.
    pub fn start() -> BrokerHandle {
        let (broker, handle) = Self::new();
        tokio::spawn(broker.run());
        handle
    }

    pub async fn run(mut self) {
        debug!("Broker coordinator started");

        while let Some(command) = self.commands.recv().await {
            if !self.apply(command) {
                break;
            }
        }

        self.commands.close();
        let remaining = self.registry.len();
        self.registry.clear();
        info!("Broker stopped, closed {remaining} client streams");
    }

    /// Apply one command. Returns `false` when the coordinator should stop.
    fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Register(client) => {
                let id = client.id;
                if let Some(previous) = self.registry.insert(client) {
                    warn!("{} replaced an existing registration", previous.id);
                }
                info!("{id} connected. Total: {}", self.registry.len());
            }
            Command::Deregister(id) => {
                if self.registry.remove(id).is_some() {
                    info!("{id} disconnected. Total: {}", self.registry.len());
                }
            }
            Command::Publish(msg) => {
                let matched = self.registry.fan_out(&msg);
                debug!(
                    "Broadcasted {:?} message to {matched} clients",
                    msg.category.as_deref().unwrap_or_default()
                );
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.registry.snapshot());
            }
            Command::Shutdown => return false,
        }
        true
    }
}
