//! Outbound side of the GCS link.

use std::collections::VecDeque;

use tracing::trace;

use super::messages::OutboundMessage;

/// Outbound channel to the ground station.
pub trait GcsLink {
    /// Free transmit buffer space in bytes.
    fn remaining_transmit_capacity(&self) -> usize;

    /// Queue a message for transmission. Never blocks.
    fn send(&mut self, message: OutboundMessage);
}

/// Bounded transmit buffer.
///
/// Messages that do not fit the remaining capacity are dropped and counted,
/// mirroring a serial link's transmit buffer.
#[derive(Debug, Clone)]
pub struct BufferedLink {
    capacity: usize,
    queue: VecDeque<OutboundMessage>,
    queued_bytes: usize,
    dropped: u64,
}

impl BufferedLink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: VecDeque::new(),
            queued_bytes: 0,
            dropped: 0,
        }
    }

    /// Take every queued message, freeing the buffer.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        self.queued_bytes = 0;
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    /// Messages dropped for lack of space.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl GcsLink for BufferedLink {
    fn remaining_transmit_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.queued_bytes)
    }

    fn send(&mut self, message: OutboundMessage) {
        let len = message.frame_len();
        if len > self.remaining_transmit_capacity() {
            trace!(msg_id = message.msg_id(), len, "Transmit buffer full, dropping message");
            self.dropped += 1;
            return;
        }
        self.queued_bytes += len;
        self.queue.push_back(message);
    }
}
