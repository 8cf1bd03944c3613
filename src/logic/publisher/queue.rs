//! Offline Queue - bounded FIFO of undelivered payloads
//!
//! Overflow evicts the oldest payload so the queue keeps a most-recent-data bias.

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::logic::sampling::buffer::{allocate, BufferError};

#[derive(Debug)]
pub struct OfflineQueue {
    items: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl OfflineQueue {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        Ok(Self {
            items: Mutex::new(allocate("offline queue", capacity)?),
            capacity,
        })
    }

    /// Enqueue at the tail. Returns the evicted payload when the queue was full.
    pub fn push(&self, payload: String) -> Option<String> {
        let mut items = self.items.lock();
        let evicted = if items.len() == self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(payload);
        evicted
    }

    /// Put a payload back at the head (it is the oldest again).
    ///
    /// When the queue filled up in the meantime the payload is the oldest
    /// entry, so drop-oldest discards it: returned as `Err`.
    pub fn push_front(&self, payload: String) -> Result<(), String> {
        let mut items = self.items.lock();
        if items.len() == self.capacity {
            return Err(payload);
        }
        items.push_front(payload);
        Ok(())
    }

    pub fn pop(&self) -> Option<String> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of the queued payloads, oldest first
    pub fn contents(&self) -> Vec<String> {
        self.items.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = OfflineQueue::new(4).unwrap();
        for p in ["a", "b", "c"] {
            assert!(queue.push(p.to_string()).is_none());
        }
        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert_eq!(queue.pop().as_deref(), Some("c"));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let queue = OfflineQueue::new(2).unwrap();
        queue.push("a".into());
        queue.push("b".into());
        assert_eq!(queue.push("c".into()).as_deref(), Some("a"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.contents(), vec!["b", "c"]);
    }

    #[test]
    fn test_push_front_respects_capacity() {
        let queue = OfflineQueue::new(2).unwrap();
        queue.push("b".into());
        assert!(queue.push_front("a".into()).is_ok());
        assert_eq!(queue.contents(), vec!["a", "b"]);
        assert_eq!(queue.push_front("z".into()), Err("z".to_string()));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(OfflineQueue::new(0).is_err());
    }
}
