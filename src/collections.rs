use crossbeam::queue::{ArrayQueue, SegQueue};

/// Bounded FIFO used as a channel buffer, with O(1) push and shift.
pub struct FixedQueue<T> {
    inner: ArrayQueue<T>,
}

impl<T> FixedQueue<T> {
    /// `size` must be positive; channel constructors validate this.
    #[inline(always)]
    pub fn new(size: usize) -> Self {
        debug_assert!(size > 0);
        Self { inner: ArrayQueue::new(size) }
    }

    /// Returns Err with the value when the queue is full.
    #[inline(always)]
    pub fn push(&self, item: T) -> Result<(), T> {
        self.inner.push(item)
    }

    #[inline(always)]
    pub fn shift(&self) -> Option<T> {
        self.inner.pop()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Buffer capacity.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.inner.capacity()
    }
}

/// Unbounded FIFO used for pending puts, pending takes and tail records.
pub struct List<T> {
    inner: SegQueue<T>,
}

impl<T> List<T> {
    #[inline(always)]
    pub fn new() -> Self {
        Self { inner: SegQueue::new() }
    }

    #[inline(always)]
    pub fn push(&self, item: T) {
        self.inner.push(item);
    }

    #[inline(always)]
    pub fn shift(&self) -> Option<T> {
        self.inner.pop()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}
