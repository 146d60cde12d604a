//! Client representation
//!
//! `Client` models one live streaming connection: who owns it, which event
//! category it listens to, and the sending half of its delivery queue. The
//! broker's registration table owns every `Client`; the streaming handler only
//! holds the receiving half returned by [`Client::new`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

/// Subject identifier of an authenticated owner.
pub type Subject = String;

/// Delivery queues are size-1 so a slow reader pushes back on its own
/// delivery chain instead of buffering unboundedly.
pub const DELIVERY_QUEUE_CAPACITY: usize = 1;

pub type DeliverySender = mpsc::Sender<Arc<Frame>>;
pub type DeliveryReceiver = mpsc::Receiver<Arc<Frame>>;

/// Connection handle. Allocated from a monotonically increasing counter, so two
/// connections never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Event category a client subscribes to.
///
/// Categories are free-form tags compared by exact string equality. The
/// wildcard `all` is what a client gets when it asks for nothing in
/// particular; it receives broadcasts and subject-targeted messages but not
/// messages tagged with some other category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category(String);

impl Category {
    pub const WILDCARD: &'static str = "all";

    pub fn all() -> Self {
        Self(Self::WILDCARD.to_string())
    }

    /// Build from an optional query value. Missing or empty means `all`.
    /// The value is kept verbatim, matching how published `Type`s compare.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw {
            Some(name) if !name.is_empty() => Self(name.to_string()),
            _ => Self::all(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::WILDCARD
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One delivered unit, already shaped for the wire: an optional event name and
/// the data payload. Built once per publish and shared between recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: Option<String>,
    pub data: String,
}

impl Frame {
    pub fn new(event: Option<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.filter(|name| !name.is_empty()),
            data: data.into(),
        }
    }
}

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub subject: Subject,
    pub category: Category,
    pub sender: DeliverySender,
}

impl Client {
    /// Create a client together with a fresh delivery queue. The returned
    /// receiver belongs to whoever serves the connection.
    pub fn new(
        id: ClientId,
        subject: impl Into<Subject>,
        category: Category,
    ) -> (Self, DeliveryReceiver) {
        let (sender, receiver) = mpsc::channel(DELIVERY_QUEUE_CAPACITY);
        let client = Self {
            id,
            subject: subject.into(),
            category,
            sender,
        };
        (client, receiver)
    }

    /// Routing attributes without the queue, for reporting.
    pub fn info(&self) -> ClientInfo {
        ClientInfo {
            id: self.id,
            subject: self.subject.clone(),
            category: self.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: ClientId,
    pub subject: Subject,
    pub category: Category,
}
