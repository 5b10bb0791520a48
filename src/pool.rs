//! Object recycling for per-frame scratch data.
//!
//! Hot paths (bounds measurement, batch building) need short-lived matrices,
//! bounds and batch objects every frame. A [`Pool`] keeps a free list of
//! previously used instances so those paths stop allocating once warm.
//!
//! ## Borrow discipline
//!
//! Items are moved out of the pool by value, so two live computations can
//! never alias the same backing object. Scratch borrows should still nest:
//! take them through [`Pool::borrow`], whose [`Pooled`] guard hands the item
//! back when it goes out of scope, which makes the return order LIFO by
//! construction.
//!
//! A [`PoolRegistry`] tracks one pool per type so that teardown can clear
//! every pool with a single [`PoolRegistry::release`] call.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// Lifecycle hooks for pooled objects.
pub trait Poolable {
    /// Called every time the item is handed out by [`Pool::get`].
    fn init(&mut self) {}

    /// Called when the item is handed back; must restore a neutral state.
    fn reset(&mut self);
}

/// A free list of reusable objects.
pub struct Pool<T> {
    free: RefCell<Vec<T>>,
    create: Box<dyn Fn() -> T>,
    created: Cell<usize>,
}

impl<T: Poolable + Default + 'static> Pool<T> {
    /// Create an empty pool that builds new items with `T::default()`.
    pub fn new() -> Self {
        Self::with_factory(T::default)
    }
}

impl<T: Poolable + Default + 'static> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> Pool<T> {
    /// Create an empty pool that builds new items with `create`.
    pub fn with_factory(create: impl Fn() -> T + 'static) -> Self {
        Self {
            free: RefCell::new(Vec::new()),
            create: Box::new(create),
            created: Cell::new(0),
        }
    }

    /// Pre-populate the free list with `count` fresh items.
    pub fn prepopulate(&self, count: usize) {
        let mut free = self.free.borrow_mut();
        free.reserve(count);
        for _ in 0..count {
            free.push((self.create)());
        }
        self.created.set(self.created.get() + count);
    }

    /// Take an item from the free list, or build a new one when it is empty.
    ///
    /// The item's [`Poolable::init`] hook runs before it is returned.
    pub fn get(&self) -> T {
        let recycled = self.free.borrow_mut().pop();
        let mut item = match recycled {
            Some(item) => item,
            None => {
                self.created.set(self.created.get() + 1);
                (self.create)()
            }
        };
        item.init();
        item
    }

    /// Reset `item` and push it onto the free list.
    pub fn return_item(&self, mut item: T) {
        item.reset();
        self.free.borrow_mut().push(item);
    }

    /// Borrow an item for the lifetime of the returned guard.
    pub fn borrow(&self) -> Pooled<'_, T> {
        Pooled {
            pool: self,
            item: Some(self.get()),
        }
    }

    /// Drop every item on the free list.
    pub fn clear(&self) {
        self.free.borrow_mut().clear();
    }

    /// Number of idle items ready for reuse.
    pub fn free_count(&self) -> usize {
        self.free.borrow().len()
    }

    /// Number of items this pool has ever constructed.
    pub fn created_count(&self) -> usize {
        self.created.get()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("free", &self.free.borrow().len())
            .field("created", &self.created.get())
            .finish()
    }
}

/// RAII guard for a pooled item; returns it to the pool on drop.
pub struct Pooled<'a, T: Poolable> {
    pool: &'a Pool<T>,
    item: Option<T>,
}

impl<T: Poolable> Pooled<'_, T> {
    /// Detach the item from the guard; it will not be returned automatically.
    pub fn into_inner(mut self) -> T {
        match self.item.take() {
            Some(item) => item,
            None => unreachable!("pooled item taken twice"),
        }
    }
}

impl<T: Poolable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.item {
            Some(item) => item,
            None => unreachable!("pooled item accessed after release"),
        }
    }
}

impl<T: Poolable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.item {
            Some(item) => item,
            None => unreachable!("pooled item accessed after release"),
        }
    }
}

impl<T: Poolable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.return_item(item);
        }
    }
}

/// Type-erased view of a pool used by the registry.
trait ErasedPool {
    fn clear(&self);
    fn free_count(&self) -> usize;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Poolable + 'static> ErasedPool for Pool<T> {
    fn clear(&self) {
        Pool::clear(self);
    }

    fn free_count(&self) -> usize {
        Pool::free_count(self)
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Tracks one shared pool per item type.
///
/// This is an explicit object owned by whoever needs pooling (usually the
/// scene), not a process-wide singleton.
#[derive(Default)]
pub struct PoolRegistry {
    pools: RefCell<HashMap<TypeId, Rc<dyn ErasedPool>>>,
}

impl PoolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or lazily create) the pool for `T`.
    pub fn pool<T: Poolable + Default + 'static>(&self) -> Rc<Pool<T>> {
        let erased = self
            .pools
            .borrow_mut()
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Rc::new(Pool::<T>::new()) as Rc<dyn ErasedPool>)
            .clone();

        match erased.into_any().downcast::<Pool<T>>() {
            Ok(pool) => pool,
            Err(_) => unreachable!("pool registry is keyed by TypeId"),
        }
    }

    /// Number of pools created so far.
    pub fn pool_count(&self) -> usize {
        self.pools.borrow().len()
    }

    /// Total number of idle items across every pool.
    pub fn idle_items(&self) -> usize {
        self.pools.borrow().values().map(|p| p.free_count()).sum()
    }

    /// Clear the contents of every tracked pool.
    pub fn release(&self) {
        let pools = self.pools.borrow();
        log::trace!("Releasing {} pools", pools.len());
        for pool in pools.values() {
            pool.clear();
        }
    }
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.pools.borrow().len())
            .finish()
    }
}
