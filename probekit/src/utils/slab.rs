/// A slab allocator handing out generation-tagged keys.
///
/// A `Slab` stores values of type `T` in a contiguous array and returns
/// small indices that are reused after removal. Every insertion also
/// stamps the slot with a fresh generation, so a [`Key`] that outlived
/// its value can never reach whatever now occupies the same index.
///
/// The reactor keeps timer actions and I/O watchers here; the keys are
/// the opaque identifiers carried by [`Timer`](crate::reactor::Timer)
/// and the poller tokens.
pub(crate) struct Slab<T> {
    /// Storage for items; `None` marks a free slot.
    items: Vec<Option<Slot<T>>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
    /// Generation handed to the next inserted value.
    next_generation: u64,
}

struct Slot<T> {
    generation: u64,
    value: T,
}

/// Identifies one value stored in a [`Slab`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with room for `size` values before growing.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let slab = Slab::<i32>::new(16);
    /// ```
    pub(crate) fn new(size: usize) -> Self {
        Self {
            items: Vec::with_capacity(size),
            free: Vec::new(),
            len: 0,
            next_generation: 0,
        }
    }

    /// Inserts a value and returns its key.
    ///
    /// A free slot is reused if available, otherwise the slab grows.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let mut slab = Slab::new(1);
    /// let key = slab.insert(42);
    /// ```
    pub(crate) fn insert(&mut self, value: T) -> Key {
        let generation = self.next_generation;
        self.next_generation += 1;

        let slot = Some(Slot { generation, value });

        let index = match self.free.pop() {
            Some(index) => {
                self.items[index] = slot;
                index
            }
            None => {
                self.items.push(slot);
                self.items.len() - 1
            }
        };

        self.len += 1;

        Key { index, generation }
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// Returns `None` if the value was already removed, which makes
    /// removal idempotent for handles that may outlive their entry.
    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        if !self.contains(key) {
            return None;
        }

        let slot = self.items[key.index].take()?;
        self.free.push(key.index);
        self.len -= 1;

        Some(slot.value)
    }

    /// Returns `true` if `key` still refers to a stored value.
    pub(crate) fn contains(&self, key: Key) -> bool {
        matches!(
            self.items.get(key.index),
            Some(Some(slot)) if slot.generation == key.generation
        )
    }

    /// Returns a shared reference to the value under `key`, if present.
    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        match self.items.get(key.index) {
            Some(Some(slot)) if slot.generation == key.generation => Some(&slot.value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value under `key`, if present.
    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        match self.items.get_mut(key.index) {
            Some(Some(slot)) if slot.generation == key.generation => Some(&mut slot.value),
            _ => None,
        }
    }

    /// Returns the key currently stored at `index`, if any.
    ///
    /// The poller only carries indices, so the reactor uses this to
    /// recover the full key of a ready watcher.
    pub(crate) fn key_at(&self, index: usize) -> Option<Key> {
        match self.items.get(index) {
            Some(Some(slot)) => Some(Key {
                index,
                generation: slot.generation,
            }),
            _ => None,
        }
    }

    /// Number of stored values.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Removes every value, returning them in index order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        self.free.clear();
        self.len = 0;

        self.items
            .drain(..)
            .flatten()
            .map(|slot| slot.value)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Slab;

    #[test]
    fn test_insert_and_remove() {
        let mut slab = Slab::new(2);
        let a = slab.insert("a");
        let b = slab.insert("b");

        assert_eq!(slab.len(), 2);
        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.get(b), Some(&"b"));
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut slab = Slab::new(1);
        let key = slab.insert(10);

        assert_eq!(slab.remove(key), Some(10));
        assert_eq!(slab.remove(key), None);
        assert_eq!(slab.len(), 0);
    }

    #[test]
    fn test_stale_key_does_not_reach_reused_slot() {
        let mut slab = Slab::new(1);
        let old = slab.insert(1);
        slab.remove(old);

        let new = slab.insert(2);

        assert_eq!(old.index, new.index);
        assert!(!slab.contains(old));
        assert_eq!(slab.remove(old), None);
        assert_eq!(slab.get(new), Some(&2));
    }

    #[test]
    fn test_key_at_recovers_generation() {
        let mut slab = Slab::new(4);
        let key = slab.insert('x');

        assert_eq!(slab.key_at(key.index), Some(key));
        assert_eq!(slab.key_at(key.index + 1), None);
    }

    #[test]
    fn test_drain_empties_slab() {
        let mut slab = Slab::new(4);
        slab.insert(1);
        let k = slab.insert(2);
        slab.insert(3);
        slab.remove(k);

        assert_eq!(slab.drain(), vec![1, 3]);
        assert_eq!(slab.len(), 0);
    }
}
