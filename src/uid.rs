//! Injectable uid source.
//!
//! Every scene owns a [`UidCounter`]; textures and render groups that need a
//! process-unique id draw from a clone of it. Clones share the same counter,
//! so two scenes built from separate counters produce the same id sequence,
//! which keeps tests deterministic.

use std::cell::Cell;
use std::rc::Rc;

/// A shared, monotonically increasing id source.
#[derive(Clone, Debug, Default)]
pub struct UidCounter {
    next: Rc<Cell<u64>>,
}

impl UidCounter {
    /// Create a counter whose first uid is 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a counter whose first uid is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Rc::new(Cell::new(first)),
        }
    }

    /// Hand out the next uid.
    pub fn next_uid(&self) -> u64 {
        let uid = self.next.get();
        self.next.set(uid + 1);
        uid
    }
}
