//! FIFO work queue with a wake signal, shared by a producer and one worker.
//!
//! Producers [`enqueue`](WorkQueue::enqueue) (append, skipping duplicates)
//! or [`replace`](WorkQueue::replace) the whole order. The worker blocks in
//! [`wait_for_work`](WorkQueue::wait_for_work), then takes items one at a
//! time with [`pop_front`](WorkQueue::pop_front) and reports each one done
//! with [`task_done`](WorkQueue::task_done).
//!
//! Waits are condition-variable waits guarded by the state they wait for,
//! so spurious wakeups are harmless. [`close`](WorkQueue::close) wakes
//! everyone and makes the worker loop exit.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    /// Items popped but not yet reported done.
    active: usize,
    closed: bool,
}

#[derive(Debug)]
pub struct WorkQueue<T> {
    state: Mutex<State<T>>,
    /// Signalled when items arrive or the queue closes.
    wake: Condvar,
    /// Signalled when the queue drains and no item is being worked on.
    idle: Condvar,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                active: 0,
                closed: false,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
        }
    }
}

impl<T: Clone + PartialEq> WorkQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless it is already queued. Returns whether it was added.
    pub fn enqueue(&self, item: T) -> bool {
        let mut state = self.lock();
        if state.closed || state.items.contains(&item) {
            return false;
        }
        state.items.push_back(item);
        self.wake.notify_all();
        true
    }

    /// Replace the pending order with `items`, dropping later duplicates.
    pub fn replace(&self, items: impl IntoIterator<Item = T>) {
        let mut state = self.lock();
        let mut order = VecDeque::new();
        for item in items {
            if !order.contains(&item) {
                order.push_back(item);
            }
        }
        state.items = order;
        if state.items.is_empty() {
            if state.active == 0 {
                self.idle.notify_all();
            }
        } else {
            self.wake.notify_all();
        }
    }

    /// Block until there is something to do. Returns `false` once closed.
    pub fn wait_for_work(&self) -> bool {
        let state = self
            .wake
            .wait_while(self.lock(), |s| s.items.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        !state.closed
    }

    /// Take the next item. The caller must call [`task_done`](Self::task_done) after it.
    pub fn pop_front(&self) -> Option<T> {
        let mut state = self.lock();
        let item = state.items.pop_front()?;
        state.active += 1;
        Some(item)
    }

    /// Mark one popped item as finished.
    pub fn task_done(&self) {
        let mut state = self.lock();
        state.active = state.active.saturating_sub(1);
        if state.active == 0 && state.items.is_empty() {
            self.idle.notify_all();
        }
    }

    /// Wait until the queue is drained and nothing is being worked on.
    /// Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let (_state, result) = self
            .idle
            .wait_timeout_while(self.lock(), timeout, |s| {
                !s.closed && (!s.items.is_empty() || s.active > 0)
            })
            .unwrap_or_else(PoisonError::into_inner);
        !result.timed_out()
    }

    /// [`wait_idle`](Self::wait_idle) without a deadline.
    pub fn join(&self) {
        let _state = self
            .idle
            .wait_while(self.lock(), |s| {
                !s.closed && (!s.items.is_empty() || s.active > 0)
            })
            .unwrap_or_else(PoisonError::into_inner);
    }

    pub fn close(&self) {
        self.lock().closed = true;
        self.wake.notify_all();
        self.idle.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn contains(&self, item: &T) -> bool {
        self.lock().items.contains(item)
    }

    /// Pending items in processing order.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_with_dedupe() {
        let queue = WorkQueue::new();
        assert!(queue.enqueue("a"));
        assert!(queue.enqueue("b"));
        assert!(!queue.enqueue("a"));
        assert_eq!(queue.snapshot(), vec!["a", "b"]);

        assert_eq!(queue.pop_front(), Some("a"));
        queue.task_done();
        assert_eq!(queue.pop_front(), Some("b"));
        queue.task_done();
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn popped_item_can_be_queued_again() {
        let queue = WorkQueue::new();
        queue.enqueue(1);
        queue.pop_front();
        assert!(queue.enqueue(1));
    }

    #[test]
    fn replace_overrides_order_and_dedupes() {
        let queue = WorkQueue::new();
        queue.enqueue("old");
        queue.replace(["s", "c", "d", "c"]);
        assert_eq!(queue.snapshot(), vec!["s", "c", "d"]);
    }

    #[test]
    fn worker_wakes_on_enqueue() {
        let queue = Arc::new(WorkQueue::new());
        let worker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                assert!(queue.wait_for_work());
                queue.pop_front()
            })
        };
        thread::sleep(Duration::from_millis(20));
        queue.enqueue(7);
        assert_eq!(worker.join().unwrap(), Some(7));
    }

    #[test]
    fn close_releases_blocked_worker() {
        let queue: Arc<WorkQueue<u32>> = Arc::new(WorkQueue::new());
        let worker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_for_work())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(!worker.join().unwrap());
        assert!(!queue.enqueue(1));
    }

    #[test]
    fn wait_idle_tracks_active_items() {
        let queue = WorkQueue::new();
        assert!(queue.wait_idle(Duration::ZERO));

        queue.enqueue(1);
        assert!(!queue.wait_idle(Duration::from_millis(10)));

        queue.pop_front();
        assert!(!queue.wait_idle(Duration::from_millis(10)));

        queue.task_done();
        assert!(queue.wait_idle(Duration::ZERO));
    }
}
