//! Per-client delivery lanes
//!
//! Fan-out spawns one delivery task per matched client so a stalled reader
//! only ever holds up its own deliveries. Tasks for the same client are
//! chained: each waits for its predecessor before touching the queue, which
//! keeps per-client order equal to publish order.
//!
//! A lane only keeps a weak reference to the client's queue. The strong
//! sender belongs to the `Client` record in the registration table, so
//! removing the record closes the queue no matter how many deliveries are
//! still pending. Dropping the lane also fires its `closed` signal, which
//! aborts deliveries that are waiting on their predecessor or on queue
//! capacity.
//!
//! Nothing bounds how far a connected reader that never reads can fall
//! behind; each lane counts its pending deliveries and warns as the backlog
//! crosses every multiple of `BACKLOG_WARN_STEP`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use eventgate_client::{ClientId, DeliverySender, Frame};
use tokio::sync::mpsc::WeakSender;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The frame was handed to the client's queue.
    Sent,
    /// The client was deregistered or stopped reading first.
    Closed,
}

pub(crate) const BACKLOG_WARN_STEP: usize = 64;

#[derive(Debug)]
pub(crate) struct Lane {
    client: ClientId,
    sender: WeakSender<Arc<Frame>>,
    closed: watch::Sender<()>,
    tail: Option<oneshot::Receiver<()>>,
    pending: Arc<AtomicUsize>,
}

/// Decrements the lane's pending count when a delivery task finishes.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Lane {
    pub(crate) fn new(client: ClientId, sender: &DeliverySender) -> Self {
        let (closed, _) = watch::channel(());
        Self {
            client,
            sender: sender.downgrade(),
            closed,
            tail: None,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Deliveries scheduled on this lane that have not finished yet.
    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Queue `frame` behind every delivery previously scheduled on this lane.
    pub(crate) fn schedule(&mut self, frame: Arc<Frame>) -> JoinHandle<Delivery> {
        let (done, next) = oneshot::channel::<()>();
        let previous = self.tail.replace(next);
        let sender = self.sender.clone();
        let mut closed = self.closed.subscribe();
        let client = self.client;

        let pending = self.pending.fetch_add(1, Ordering::Relaxed) + 1;
        if pending % BACKLOG_WARN_STEP == 0 {
            warn!("{client} has {pending} undelivered messages");
        } else {
            trace!("{client} has {pending} pending deliveries");
        }
        let guard = PendingGuard(self.pending.clone());

        tokio::spawn(async move {
            // Dropped on every exit path, which releases the next delivery.
            let _done = done;
            let _pending = guard;

            if let Some(previous) = previous {
                tokio::select! {
                    biased;
                    _ = closed.changed() => return Delivery::Closed,
                    _ = previous => {}
                }
            }

            let Some(sender) = sender.upgrade() else {
                trace!("{client} gone before delivery");
                return Delivery::Closed;
            };

            let outcome = tokio::select! {
                biased;
                _ = closed.changed() => Delivery::Closed,
                sent = sender.send(frame) => match sent {
                    Ok(()) => Delivery::Sent,
                    Err(_) => Delivery::Closed,
                },
            };
            trace!("Delivery to {client}: {outcome:?}");
            outcome
        })
    }
}
