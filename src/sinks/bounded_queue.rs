//! Lock-free FIFO with an optional capacity

use crate::core::error::{LoggerError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicUsize, Ordering};

/// FIFO shared between producer threads and the batching worker.
///
/// With a capacity, an approximate count guards admission: the count is
/// reserved before the push and released again when the reservation fails,
/// so rejected items never leave it drifting upwards. Without a capacity no
/// counting happens at all.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    limit: Option<usize>,
    counter: AtomicUsize,
}

impl<T> BoundedQueue<T> {
    pub fn new(limit: Option<usize>) -> Result<Self> {
        if limit == Some(0) {
            return Err(LoggerError::config(
                "BoundedQueue",
                "queue limit must be positive",
            ));
        }
        let (sender, receiver) = unbounded();
        Ok(Self {
            sender,
            receiver,
            limit,
            counter: AtomicUsize::new(0),
        })
    }

    /// A queue with no capacity limit
    pub fn unbounded() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            limit: None,
            counter: AtomicUsize::new(0),
        }
    }

    /// Enqueue unless the queue is full; returns `false` when rejected
    pub fn try_enqueue(&self, item: T) -> bool {
        let Some(limit) = self.limit else {
            return self.sender.send(item).is_ok();
        };

        if self.counter.fetch_add(1, Ordering::AcqRel) >= limit {
            self.counter.fetch_sub(1, Ordering::AcqRel);
            return false;
        }

        if self.sender.send(item).is_err() {
            self.counter.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    pub fn try_dequeue(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(item) => {
                if self.limit.is_some() {
                    self.counter.fetch_sub(1, Ordering::AcqRel);
                }
                Some(item)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Remove and discard everything currently queued; returns how many
    pub fn drain(&self) -> usize {
        let mut drained = 0;
        while self.try_dequeue().is_some() {
            drained += 1;
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}
