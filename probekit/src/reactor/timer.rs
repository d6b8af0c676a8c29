use super::core::Inner;
use crate::utils::{Key, Slab};

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Weak;
use std::time::Instant;

/// A one-shot action owned by the timer table.
pub(crate) type Action = Box<dyn FnOnce() + 'static>;

/// An entry in the reactor timer queue.
///
/// `TimerEntry` represents a scheduled firing at a specific deadline.
/// It does not own the action: it only names the slab slot holding it,
/// so a cancelled timer leaves a stale entry behind that is skipped
/// when it reaches the top of the heap.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Insertion sequence, used to keep equal deadlines in FIFO order.
    pub(crate) seq: u64,

    /// Slot of the action in the timer table.
    pub(crate) key: Key,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then by insertion order.
    ///
    /// Note that the comparison is **reversed** so that a
    /// `BinaryHeap<TimerEntry>` behaves as a min-heap,
    /// where the earliest deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Stale heap entries tolerated before `cancel` compacts the heap.
const COMPACT_SLACK: usize = 64;

/// Deadline heap plus the table of actions it refers to.
pub(crate) struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    actions: Slab<Action>,
    seq: u64,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            actions: Slab::new(64),
            seq: 0,
        }
    }

    /// Stores `action` and queues it for `deadline`.
    pub(crate) fn insert(&mut self, deadline: Instant, action: Action) -> Key {
        let key = self.actions.insert(action);
        let seq = self.seq;
        self.seq += 1;

        self.heap.push(TimerEntry {
            deadline,
            seq,
            key,
        });

        key
    }

    /// Removes the action under `key`, if it has not fired yet.
    ///
    /// The action is handed back rather than dropped so the caller can
    /// release its borrow of the queue first: dropping an action may drop
    /// other timers that need the queue themselves.
    pub(crate) fn cancel(&mut self, key: Key) -> Option<Action> {
        let action = self.actions.remove(key)?;

        // Cancelled entries otherwise linger until their own deadline.
        if self.heap.len() > 2 * self.actions.len() + COMPACT_SLACK {
            let actions = &self.actions;
            self.heap.retain(|entry| actions.contains(entry.key));
        }

        Some(action)
    }

    pub(crate) fn contains(&self, key: Key) -> bool {
        self.actions.contains(key)
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub(crate) fn len(&self) -> usize {
        self.actions.len()
    }

    /// Deadline of the earliest live timer.
    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_stale();
        self.heap.peek().map(|entry| entry.deadline)
    }

    /// Takes the earliest action whose deadline is at or before `now`.
    pub(crate) fn pop_expired(&mut self, now: Instant) -> Option<Action> {
        self.discard_stale();

        if self.heap.peek()?.deadline > now {
            return None;
        }

        let entry = self.heap.pop()?;
        self.actions.remove(entry.key)
    }

    /// Removes every pending action.
    pub(crate) fn drain(&mut self) -> Vec<Action> {
        self.heap.clear();
        self.actions.drain()
    }

    fn discard_stale(&mut self) {
        while let Some(entry) = self.heap.peek() {
            if self.actions.contains(entry.key) {
                break;
            }
            self.heap.pop();
        }
    }
}

/// A scheduled one-shot action.
///
/// Returned by [`Reactor::schedule`](crate::Reactor::schedule). The action
/// runs at most once, on the reactor thread. Dropping the `Timer` before
/// the deadline cancels it synchronously: once `drop` returns the action
/// can no longer fire. Dropping it afterwards is a no-op.
///
/// Use [`detach`](Self::detach) to let the action run without keeping the
/// handle around.
#[must_use = "dropping a Timer cancels it; call `detach` to keep it scheduled"]
pub struct Timer {
    reactor: Weak<Inner>,
    key: Option<Key>,
}

impl Timer {
    pub(crate) fn new(reactor: Weak<Inner>, key: Key) -> Self {
        Self {
            reactor,
            key: Some(key),
        }
    }

    /// Returns `true` while the action has neither fired nor been cancelled.
    pub fn is_pending(&self) -> bool {
        match (self.key, self.reactor.upgrade()) {
            (Some(key), Some(inner)) => inner.timers.borrow().contains(key),
            _ => false,
        }
    }

    /// Cancels the timer. Equivalent to dropping it.
    pub fn cancel(self) {}

    /// Releases the handle while leaving the action scheduled.
    pub fn detach(mut self) {
        self.key = None;
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        let Some(inner) = self.reactor.upgrade() else {
            return;
        };

        let action = inner.timers.borrow_mut().cancel(key);
        drop(action);
    }
}
