//! Client registration table
//!
//! Maps each `ClientId` to its `Client` record and delivery lane. An entry
//! exists exactly while the client's delivery queue is open: inserting
//! creates the lane, removing drops the record (closing the queue) and the
//! lane (cancelling pending deliveries).
//!
//! The table has no interior synchronisation. The broker coordinator is its
//! only owner and applies every mutation on its own task.

use std::collections::HashMap;
use std::sync::Arc;

use eventgate_client::{Client, ClientId, ClientInfo};

use crate::delivery::Lane;
use crate::message::Message;

#[derive(Debug)]
struct Entry {
    client: Client,
    lane: Lane,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<ClientId, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client. Returns the record it replaced, if any; that record's
    /// queue is closed once the caller drops it.
    pub fn insert(&mut self, client: Client) -> Option<Client> {
        let lane = Lane::new(client.id, &client.sender);
        self.entries
            .insert(client.id, Entry { client, lane })
            .map(|old| old.client)
    }

    /// Remove a client. Absent ids are ignored.
    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        self.entries.remove(&id).map(|entry| entry.client)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Routing attributes of every registered client, ordered by id.
    pub fn snapshot(&self) -> Vec<ClientInfo> {
        let mut infos: Vec<_> = self.entries.values().map(|e| e.client.info()).collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Schedule `msg` on the lane of every matching client and return how many
    /// matched. The set of recipients is fixed here; later registrations never
    /// see this message.
    pub fn fan_out(&mut self, msg: &Message) -> usize {
        let route = msg.route();
        let frame = Arc::new(msg.frame());
        let mut matched = 0;

        for entry in self.entries.values_mut() {
            if route.accepts(&entry.client) {
                entry.lane.schedule(frame.clone());
                matched += 1;
            }
        }

        matched
    }

    /// Drop every client, closing all queues.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
