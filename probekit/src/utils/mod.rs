//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the reactor.
//! In particular, it exposes a [`Slab`] allocator used for indexed storage
//! of timer actions and I/O watchers, with reuse of freed slots.

mod slab;

pub(crate) use slab::{Key, Slab};
