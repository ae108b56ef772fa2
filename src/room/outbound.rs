//! Per-session outbound buffer (§5): bounded, oldest-frame-drop when full.
//!
//! A plain `tokio::sync::mpsc` channel only supports newest-drop (`try_send`
//! fails and the new frame is lost) because the sending half has no way to
//! evict from the receiving half's queue. Since a full buffer should lose
//! the *stale* frame and keep the fresh one (the next full snapshot
//! resynchronizes the session regardless, per §5), this is a small
//! `Mutex<VecDeque>` + `Notify` buffer instead, sized the way the teacher's
//! bounded outbound task in `ws/mod.rs` sizes its per-connection channel.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::protocol::ServerMessage;

struct Inner {
    queue: Mutex<VecDeque<ServerMessage>>,
    notify: Notify,
    capacity: usize,
}

/// The producing half, held by the room actor's session registry.
#[derive(Clone)]
pub struct OutboundTx(Arc<Inner>);

/// The draining half, held by the session's outbound write task.
pub struct OutboundRx(Arc<Inner>);

/// Default per-session buffer depth. A handful of snapshots' worth —
/// generous enough that a momentary stall doesn't lose state, small
/// enough that a stuck socket doesn't grow without bound.
pub const DEFAULT_CAPACITY: usize = 16;

pub fn channel(capacity: usize) -> (OutboundTx, OutboundRx) {
    let inner = Arc::new(Inner {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        notify: Notify::new(),
        capacity,
    });
    (OutboundTx(inner.clone()), OutboundRx(inner))
}

impl OutboundTx {
    /// Push a frame, dropping the oldest buffered frame first if full.
    pub fn push(&self, message: ServerMessage) {
        let mut queue = self.0.queue.lock().unwrap();
        if queue.len() >= self.0.capacity {
            queue.pop_front();
        }
        queue.push_back(message);
        drop(queue);
        self.0.notify.notify_one();
    }
}

impl OutboundRx {
    /// Wait for and return the next buffered frame, in FIFO order.
    pub async fn recv(&mut self) -> ServerMessage {
        loop {
            if let Some(message) = self.0.queue.lock().unwrap().pop_front() {
                return message;
            }
            self.0.notify.notified().await;
        }
    }
}
