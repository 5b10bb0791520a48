//! Generational slot storage for scene nodes and render groups.
//!
//! ## Key Features
//!
//! - **Generational Indices**: a [`RawId`] contains index + generation to
//!   prevent ABA problems (detecting stale references to reallocated slots).
//!
//! - **Free List**: removed slots are reused; reuse bumps the generation so
//!   old handles stop resolving.
//!
//! - **Non-owning links**: parents and render groups refer to each other by
//!   id only, so the parent/child graph never forms an ownership cycle.

/// Unique identifier for a slot.
///
/// Uses a generational index design:
/// - `index`: Position in the slot array (reusable after removal)
/// - `generation`: Version counter that increments when a slot is reused
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct RawId {
    index: u32,
    generation: u32,
}

impl RawId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Convert to a u64 for external use.
    /// Combines generation (high bits) with index (low bits).
    pub fn as_u64(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage addressed by [`RawId`].
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_indices: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    /// Create a new empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_indices: Vec::new(),
            len: 0,
        }
    }

    /// Store a value and return its id.
    pub fn insert(&mut self, value: T) -> RawId {
        self.len += 1;
        if let Some(index) = self.free_indices.pop() {
            // Reuse a freed slot - increment generation
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            RawId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            RawId::new(index, 0)
        }
    }

    /// Remove a value, freeing its slot. Stale ids return `None`.
    pub fn remove(&mut self, id: RawId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.free_indices.push(id.index);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: RawId) -> Option<&T> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, id: RawId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_mut())
    }

    /// Check if an id refers to a live value.
    pub fn contains(&self, id: RawId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
