/// A memoized value tagged with the tick it was computed at.
///
/// Consumers compare the stored tick against the current one and recompute
/// only when it is stale. There is no implicit getter magic: callers decide
/// when to refresh.
#[derive(Debug, Clone, Default)]
pub struct Cached<T> {
    value: T,
    computed_at: Option<u64>,
}

impl<T> Cached<T> {
    /// Wrap an initial value that has never been computed.
    pub fn new(value: T) -> Self {
        Self {
            value,
            computed_at: None,
        }
    }

    /// Whether the value was computed at `tick`.
    pub fn is_fresh(&self, tick: u64) -> bool {
        self.computed_at == Some(tick)
    }

    /// The cached value if it is fresh for `tick`.
    pub fn get(&self, tick: u64) -> Option<&T> {
        if self.is_fresh(tick) {
            Some(&self.value)
        } else {
            None
        }
    }

    /// Store a value computed at `tick`.
    pub fn store(&mut self, tick: u64, value: T) {
        self.value = value;
        self.computed_at = Some(tick);
    }

    /// Forget the stored tick so the next lookup misses.
    pub fn invalidate(&mut self) {
        self.computed_at = None;
    }
}
