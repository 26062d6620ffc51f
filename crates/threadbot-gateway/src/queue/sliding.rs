//! Bounded drop-oldest queue
//!
//! Producers never block: when the queue is full the oldest item is discarded to make
//! room. Consumers wait asynchronously until an item arrives or the queue shuts down.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

/// Events held per connection before the oldest are dropped
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 5_000;

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
    dropped: u64,
}

/// Sliding (drop-oldest) queue
pub struct SlidingQueue<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> SlidingQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueue an item, discarding the oldest one if the queue is full
    ///
    /// Returns `false` (and drops `item`) once the queue has been shut down.
    pub fn offer(&self, item: T) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return false;
            }
            if inner.items.len() >= self.capacity {
                inner.items.pop_front();
                inner.dropped += 1;
                if inner.dropped.is_power_of_two() {
                    tracing::warn!(
                        capacity = self.capacity,
                        dropped = inner.dropped,
                        "Event queue full, dropping oldest events"
                    );
                }
            }
            inner.items.push_back(item);
        }
        self.notify.notify_one();
        true
    }

    /// Wait for the next item
    ///
    /// Returns `None` once the queue is shut down and drained.
    pub async fn take(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if let Some(item) = inner.items.pop_front() {
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Take an item without waiting
    pub fn try_take(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    /// Stop accepting items and wake every waiting consumer
    ///
    /// Items already queued can still be taken.
    pub fn shutdown(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }
}

impl<T> Default for SlidingQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_QUEUE_CAPACITY)
    }
}

impl<T> std::fmt::Debug for SlidingQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SlidingQueue")
            .field("len", &inner.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &inner.closed)
            .field("dropped", &inner.dropped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_drops_oldest_when_full() {
        let queue = SlidingQueue::new(3);
        for i in 1..=5 {
            assert!(queue.offer(i));
            assert!(queue.len() <= 3);
        }

        assert_eq!(queue.dropped(), 2);
        assert_eq!(queue.try_take(), Some(3));
        assert_eq!(queue.try_take(), Some(4));
        assert_eq!(queue.try_take(), Some(5));
        assert_eq!(queue.try_take(), None);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let queue = SlidingQueue::new(0);
        queue.offer("a");
        queue.offer("b");
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.try_take(), Some("b"));
    }

    #[tokio::test]
    async fn test_take_waits_for_offer() {
        let queue = Arc::new(SlidingQueue::new(10));

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.take().await })
        };
        tokio::task::yield_now().await;

        queue.offer(7);
        assert_eq!(consumer.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_shutdown_unblocks_waiters() {
        let queue: Arc<SlidingQueue<u32>> = Arc::new(SlidingQueue::new(10));

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.take().await })
            })
            .collect();
        tokio::task::yield_now().await;

        queue.shutdown();
        for waiter in waiters {
            let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
            assert_eq!(result.unwrap().unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_then_ends() {
        let queue = SlidingQueue::new(10);
        queue.offer(1);
        queue.offer(2);
        queue.shutdown();

        assert!(!queue.offer(3));
        assert_eq!(queue.take().await, Some(1));
        assert_eq!(queue.take().await, Some(2));
        assert_eq!(queue.take().await, None);
    }

    #[tokio::test]
    async fn test_concurrent_consumers_never_duplicate() {
        let queue = Arc::new(SlidingQueue::new(10_000));
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(item) = queue.take().await {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        for i in 0..1_000 {
            queue.offer(i);
            if i % 100 == 0 {
                tokio::task::yield_now().await;
            }
        }
        queue.shutdown();

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..1_000).collect::<Vec<_>>());
    }
}
