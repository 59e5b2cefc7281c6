//! Outbound packet sinks.
//!
//! The interpreter calls [`PacketSink::send`] in program order and never waits
//! on it. Implementations must preserve that order for a given connection.

use log::{debug, trace};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::interactions::packets::Packet;

pub trait PacketSink: Send {
    fn send(&mut self, packet: Packet);
}

impl PacketSink for Vec<Packet> {
    fn send(&mut self, packet: Packet) {
        self.push(packet);
    }
}

/// Sink that records packets in a shared buffer so the caller can inspect them
/// after handing the sink to a session.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    packets: Arc<Mutex<Vec<Packet>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every packet sent so far.
    pub fn packets(&self) -> Vec<Packet> {
        self.packets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Drain the recorded packets.
    pub fn take(&self) -> Vec<Packet> {
        std::mem::take(&mut *self.packets.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.packets.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PacketSink for RecordingSink {
    fn send(&mut self, packet: Packet) {
        self.packets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(packet);
    }
}

/// Ordered outbound queue feeding a connection writer task.
#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: UnboundedSender<Packet>,
}

impl QueueSink {
    /// Create a sink and the receiver the connection writer drains.
    pub fn channel() -> (Self, UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PacketSink for QueueSink {
    fn send(&mut self, packet: Packet) {
        trace!("queue {}", packet.name());
        if let Err(err) = self.tx.send(packet) {
            // Writer gone: the connection is closing, nothing left to deliver to.
            debug!("Dropping {} packet: connection writer closed", err.0.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_shares_buffer_between_clones() {
        let sink = RecordingSink::new();
        let mut handle: Box<dyn PacketSink> = Box::new(sink.clone());
        handle.send(Packet::InitialSubstate {
            object_id: "a".into(),
        });
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn queue_sink_preserves_order() {
        let (mut sink, mut rx) = QueueSink::channel();
        for i in 0..5 {
            sink.send(Packet::state_command("a", i, vec![]));
        }
        drop(sink);
        let mut codes = Vec::new();
        while let Ok(Packet::StateCommand { code, .. }) = rx.try_recv() {
            codes.push(code);
        }
        assert_eq!(codes, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn queue_sink_tolerates_closed_receiver() {
        let (mut sink, rx) = QueueSink::channel();
        drop(rx);
        sink.send(Packet::InitialSubstate {
            object_id: "a".into(),
        });
    }
}
