//! Interrupt-fed button edge queue.
//!
//! The GPIO interrupt (or the simulated board) is the single producer; the
//! control loop's button monitor is the single consumer. The interrupt
//! context never touches debounce or actuator state: it only records a
//! timestamped transition.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ GPIO ISR    │────▶│  Edge Queue  │────▶│ ButtonMonitor  │
//! │ (producer)  │     │  (lock-free) │     │ (control loop) │
//! └─────────────┘     └──────────────┘     └────────────────┘
//! ```

use heapless::spsc::{Consumer, Producer, Queue};

/// Queue slots. `heapless` keeps one slot free, so 31 edges fit; a bouncing
/// contact rarely produces more than a dozen between two ticks.
pub const EDGE_QUEUE_CAP: usize = 32;

/// Direction of a raw transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    /// Edge that ends at `high`.
    pub fn to_level(high: bool) -> Self {
        if high { Self::Rising } else { Self::Falling }
    }

    /// Line level after this edge.
    pub fn level_high(self) -> bool {
        matches!(self, Self::Rising)
    }
}

/// A timestamped raw transition on the button input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEdgeEvent {
    pub edge: Edge,
    /// Monotonic milliseconds, wrapping at `u32::MAX`.
    pub at_ms: u32,
}

pub type EdgeProducer = Producer<'static, ButtonEdgeEvent, EDGE_QUEUE_CAP>;
pub type EdgeConsumer = Consumer<'static, ButtonEdgeEvent, EDGE_QUEUE_CAP>;

/// Allocate a queue for one input line and split it.
///
/// The backing storage is leaked so both halves are `'static` and the
/// producer can move into an ISR closure. One queue exists per monitored
/// button for the lifetime of the process.
pub fn edge_channel() -> (EdgeProducer, EdgeConsumer) {
    let queue: &'static mut Queue<ButtonEdgeEvent, EDGE_QUEUE_CAP> =
        Box::leak(Box::new(Queue::new()));
    queue.split()
}

/// Push from interrupt context. Returns `false` if the queue is full and
/// the edge was dropped.
pub fn push_edge(producer: &mut EdgeProducer, event: ButtonEdgeEvent) -> bool {
    producer.enqueue(event).is_ok()
}

/// Drain all pending edges in FIFO order.
pub fn drain_edges(consumer: &mut EdgeConsumer, mut handler: impl FnMut(ButtonEdgeEvent)) {
    while let Some(event) = consumer.dequeue() {
        handler(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let (mut tx, mut rx) = edge_channel();
        assert!(push_edge(&mut tx, ButtonEdgeEvent { edge: Edge::Falling, at_ms: 1 }));
        assert!(push_edge(&mut tx, ButtonEdgeEvent { edge: Edge::Rising, at_ms: 2 }));

        let mut seen = Vec::new();
        drain_edges(&mut rx, |e| seen.push(e.at_ms));
        assert_eq!(seen, vec![1, 2]);
        assert!(rx.dequeue().is_none());
    }

    #[test]
    fn full_queue_drops_newest() {
        let (mut tx, mut rx) = edge_channel();
        for i in 0..EDGE_QUEUE_CAP as u32 - 1 {
            assert!(push_edge(&mut tx, ButtonEdgeEvent { edge: Edge::Rising, at_ms: i }));
        }
        assert!(!push_edge(&mut tx, ButtonEdgeEvent { edge: Edge::Rising, at_ms: 999 }));

        let mut last = 0;
        drain_edges(&mut rx, |e| last = e.at_ms);
        assert_eq!(last, EDGE_QUEUE_CAP as u32 - 2);
    }

    #[test]
    fn edge_levels() {
        assert_eq!(Edge::to_level(true), Edge::Rising);
        assert!(!Edge::Falling.level_high());
    }
}
