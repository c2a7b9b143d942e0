use crate::collections::{FixedQueue, List};
use crate::error::{InvalidArgument, RecvError, SendError, TryRecvError};
use crate::promise::Promise;
use crate::transform::{apply, Transform};
use log::debug;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Channel lifecycle states. Transitions are monotonic:
/// `Open` → `Closed` → `Ended`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum State {
    /// Accepting puts.
    Open,
    /// No new puts; buffered, pending and tail values still flow out.
    Closed,
    /// Fully drained. Terminal.
    Ended,
}

/// A value parked on the `puts` or `tail` queue, with the resolver that
/// fires once the value has left the queue.
pub(crate) struct Pending<T> {
    pub(crate) value: T,
    pub(crate) resolver: Promise<()>,
}

pub(crate) struct Inner<T> {
    pub(crate) state: State,
    pub(crate) buf: Option<FixedQueue<T>>,
    pub(crate) puts: List<Pending<T>>,
    pub(crate) takes: List<Promise<Option<T>>>,
    pub(crate) tail: List<Pending<T>>,
    pub(crate) waiting: Vec<Promise<()>>,
    pub(crate) pipeline: Vec<Channel<T>>,
    pub(crate) consumers: Vec<Promise<()>>,
    // transforms whose outputs are not yet fully emitted; blocks Ended
    pub(crate) inflight: usize,
    pub(crate) forwarding: bool,
    pub(crate) forward_idle: Option<Promise<()>>,
    // parked forwarder's wakeup signal; carries no value, so a forwarder
    // woken after an unpipe holds nothing that could be lost
    pub(crate) forward_wait: Option<Promise<()>>,
}

impl<T> Inner<T> {
    fn new(buf: Option<FixedQueue<T>>) -> Self {
        Self {
            state: State::Open,
            buf,
            puts: List::new(),
            takes: List::new(),
            tail: List::new(),
            waiting: Vec::new(),
            pipeline: Vec::new(),
            consumers: Vec::new(),
            inflight: 0,
            forwarding: false,
            forward_idle: None,
            forward_wait: None,
        }
    }

    /// Wake a parked pipeline forwarder, if one is waiting for work.
    pub(crate) fn wake_forwarder(&mut self) {
        if let Some(p) = self.forward_wait.take() {
            p.resolve(());
        }
    }

    #[inline(always)]
    fn buf_is_empty(&self) -> bool {
        self.buf.as_ref().map_or(true, |b| b.is_empty())
    }

    /// The Closed → Ended transition: fires once the buffer, the pending
    /// puts, the tail queue and every in-flight transform have drained.
    pub(crate) fn maybe_end(&mut self) {
        if self.state != State::Closed {
            return;
        }
        if self.inflight > 0 || !self.puts.is_empty() || !self.tail.is_empty() {
            return;
        }
        if !self.buf_is_empty() {
            return;
        }
        self.state = State::Ended;
        while let Some(t) = self.takes.shift() {
            t.resolve(None);
        }
        for w in self.waiting.drain(..) {
            w.resolve(());
        }
        self.wake_forwarder();
        debug!("channel ended");
    }

    /// Feed parked takes from the tail queue. Only legal while Closed with
    /// the primary queues empty; a no-op otherwise.
    pub(crate) fn drain_tail(&mut self) {
        if self.state != State::Closed || !self.puts.is_empty() || !self.buf_is_empty() {
            return;
        }
        while !self.takes.is_empty() {
            match self.tail.shift() {
                Some(p) => {
                    if let Some(t) = self.takes.shift() {
                        p.resolver.resolve(());
                        t.resolve(Some(p.value));
                    }
                }
                None => break,
            }
        }
    }

    /// Synchronous drain step shared by `take()`, `try_take()` and the
    /// pipeline forwarder.
    pub(crate) fn pop_ready(&mut self) -> Option<T> {
        if let Some(v) = self.buf.as_ref().and_then(|b| b.shift()) {
            // back-fill the freed slot from the oldest parked put
            if let Some(p) = self.puts.shift() {
                if let Some(buf) = self.buf.as_ref() {
                    let _ = buf.push(p.value);
                }
                p.resolver.resolve(());
            }
            self.maybe_end();
            return Some(v);
        }
        if let Some(p) = self.puts.shift() {
            p.resolver.resolve(());
            self.maybe_end();
            return Some(p.value);
        }
        if self.state == State::Closed {
            if let Some(p) = self.tail.shift() {
                p.resolver.resolve(());
                self.maybe_end();
                return Some(p.value);
            }
        }
        None
    }
}

pub(crate) struct Shared<T> {
    pub(crate) inner: Mutex<Inner<T>>,
    pub(crate) transform: Option<Mutex<Transform<T>>>,
    pub(crate) size: Option<usize>,
}

impl<T> Shared<T> {
    #[inline(always)]
    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap()
    }

    /// Place one post-transform output: resolve the oldest take, else fill
    /// the buffer, else park on `puts`. Returns the sub-resolver when the
    /// output parked; the owning put completes only after it fires.
    pub(crate) fn place(&self, value: T) -> Option<Promise<()>> {
        let mut g = self.lock();
        if let Some(t) = g.takes.shift() {
            t.resolve(Some(value));
            return None;
        }
        if let Some(buf) = g.buf.as_ref() {
            match buf.push(value) {
                Ok(()) => {
                    g.wake_forwarder();
                    return None;
                }
                Err(back) => {
                    let p = Promise::new();
                    g.puts.push(Pending { value: back, resolver: p.clone() });
                    g.wake_forwarder();
                    return Some(p);
                }
            }
        }
        let p = Promise::new();
        g.puts.push(Pending { value, resolver: p.clone() });
        g.wake_forwarder();
        Some(p)
    }

    /// Place one post-transform output on the tail queue. Tail records only
    /// drain while the channel is Closed, after `buf` and `puts` empty.
    pub(crate) fn place_tail(&self, value: T) -> Option<Promise<()>> {
        let mut g = self.lock();
        let p = Promise::new();
        g.tail.push(Pending { value, resolver: p.clone() });
        g.drain_tail();
        g.wake_forwarder();
        Some(p)
    }
}

/// An asynchronous CSP channel with an optional bounded buffer, an optional
/// per-value transform and a pipeline of downstream channels.
///
/// `Channel<T>` is a cheap handle; clones share the same state.
pub struct Channel<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let g = self.shared.lock();
        write!(
            f,
            "Channel(state={:?}, len={}, takes={})",
            g.state,
            g.puts.len() + g.buf.as_ref().map_or(0, |b| b.len()),
            g.takes.len()
        )
    }
}

impl<T> Channel<T> {
    fn construct(buf: Option<FixedQueue<T>>, transform: Option<Transform<T>>) -> Self {
        let size = buf.as_ref().map(|b| b.size());
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::new(buf)),
                transform: transform.map(Mutex::new),
                size,
            }),
        }
    }

    /// An unbuffered channel: every put rendezvouses with a take.
    pub fn new() -> Self {
        Self::construct(None, None)
    }

    /// A channel whose buffer absorbs up to `size` values before puts park.
    pub fn bounded(size: usize) -> Result<Self, InvalidArgument> {
        if size == 0 {
            return Err(InvalidArgument::ZeroCapacity);
        }
        Ok(Self::construct(Some(FixedQueue::new(size)), None))
    }

    /// An unbuffered channel with a transform applied to every put.
    pub fn with_transform(transform: Transform<T>) -> Self {
        Self::construct(None, Some(transform))
    }

    /// A buffered channel with a transform applied to every put.
    pub fn bounded_with_transform(
        size: usize, transform: Transform<T>,
    ) -> Result<Self, InvalidArgument> {
        if size == 0 {
            return Err(InvalidArgument::ZeroCapacity);
        }
        Ok(Self::construct(Some(FixedQueue::new(size)), Some(transform)))
    }

    /// A channel pre-filled from `iter`, buffered to the materialized
    /// length. Starts Closed (so it ends once drained) unless `keep_open`.
    pub fn from_iter<I: IntoIterator<Item = T>>(iter: I, keep_open: bool) -> Self {
        let values: Vec<T> = iter.into_iter().collect();
        let buf = if values.is_empty() {
            None
        } else {
            let q = FixedQueue::new(values.len());
            for v in values {
                let _ = q.push(v);
            }
            Some(q)
        };
        let ch = Self::construct(buf, None);
        if !keep_open {
            ch.close();
        }
        ch
    }

    /// Current lifecycle state.
    #[inline(always)]
    pub fn state(&self) -> State {
        self.shared.lock().state
    }

    /// Buffer capacity, None when unbuffered.
    #[inline(always)]
    pub fn size(&self) -> Option<usize> {
        self.shared.size
    }

    /// Values held by the channel: buffered plus parked puts.
    #[inline(always)]
    pub fn len(&self) -> usize {
        let g = self.shared.lock();
        g.puts.len() + g.buf.as_ref().map_or(0, |b| b.len())
    }

    /// True iff `len() == 0`. Parked takes do not count.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn buf_len(&self) -> usize {
        self.shared.lock().buf.as_ref().map_or(0, |b| b.len())
    }

    #[inline(always)]
    pub fn puts_len(&self) -> usize {
        self.shared.lock().puts.len()
    }

    #[inline(always)]
    pub fn takes_len(&self) -> usize {
        self.shared.lock().takes.len()
    }

    #[inline(always)]
    pub fn tail_len(&self) -> usize {
        self.shared.lock().tail.len()
    }

    #[inline(always)]
    pub fn pipeline_len(&self) -> usize {
        self.shared.lock().pipeline.len()
    }

    #[inline(always)]
    pub fn waiting_len(&self) -> usize {
        self.shared.lock().waiting.len()
    }

    #[inline(always)]
    pub fn has_transform(&self) -> bool {
        self.shared.transform.is_some()
    }

    /// Stop accepting puts. An idle empty channel ends immediately;
    /// otherwise the channel drains through takes and ends on the take that
    /// empties the last queue. Idempotent.
    pub fn close(&self) {
        let mut g = self.shared.lock();
        if g.state != State::Open {
            return;
        }
        g.state = State::Closed;
        debug!("channel closed");
        g.drain_tail();
        g.maybe_end();
        g.wake_forwarder();
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Channel<T> {
    /// Put a value through the transform and into the channel.
    ///
    /// Completes once the transform has settled and every emitted output has
    /// been handed to a take, buffered, or (after parking) left the put
    /// queue. Returns Err with the value when the channel is not open.
    pub async fn put(&self, value: T) -> Result<(), SendError<T>> {
        {
            let mut g = self.shared.lock();
            if g.state != State::Open {
                return Err(SendError(value));
            }
            g.inflight += 1;
        }
        let pending = apply(&self.shared, value, false).await;
        {
            let mut g = self.shared.lock();
            g.inflight -= 1;
            g.maybe_end();
        }
        for p in pending {
            p.await;
        }
        Ok(())
    }

    /// Take the oldest value.
    ///
    /// Drains the buffer (back-filling from parked puts), then parked puts,
    /// then the tail queue while Closed; parks otherwise. Returns Err once
    /// the channel has ended.
    pub async fn take(&self) -> Result<T, RecvError> {
        let parked = {
            let mut g = self.shared.lock();
            if let Some(v) = g.pop_ready() {
                return Ok(v);
            }
            if g.state == State::Ended {
                return Err(RecvError);
            }
            let p = Promise::new();
            g.takes.push(p.clone());
            p
        };
        match parked.await {
            Some(v) => Ok(v),
            None => Err(RecvError),
        }
    }

    /// Non-parking variant of `take()`.
    pub fn try_take(&self) -> Result<T, TryRecvError> {
        let mut g = self.shared.lock();
        if let Some(v) = g.pop_ready() {
            return Ok(v);
        }
        if g.state == State::Ended {
            return Err(TryRecvError::Ended);
        }
        Err(TryRecvError::Empty)
    }

    /// Put a value behind everything else: tail outputs are delivered only
    /// while the channel is Closed, after the buffer and the put queue have
    /// drained, and before the channel ends.
    ///
    /// The value passes through the transform like an ordinary put, and the
    /// returned future completes once every output has left the tail queue.
    pub async fn tail(&self, value: T) -> Result<(), SendError<T>> {
        {
            let mut g = self.shared.lock();
            if g.state != State::Open {
                return Err(SendError(value));
            }
            g.inflight += 1;
        }
        let pending = apply(&self.shared, value, true).await;
        {
            let mut g = self.shared.lock();
            g.inflight -= 1;
            g.maybe_end();
        }
        for p in pending {
            p.await;
        }
        Ok(())
    }

    /// Resolves once the channel has ended and every consume loop registered
    /// so far has drained its in-flight value.
    pub async fn done(&self) {
        let (gate, consumers) = {
            let mut g = self.shared.lock();
            let gate = if g.state == State::Ended {
                None
            } else {
                let p = Promise::new();
                g.waiting.push(p.clone());
                Some(p)
            };
            (gate, g.consumers.clone())
        };
        if let Some(p) = gate {
            p.await;
        }
        for c in consumers {
            c.await;
        }
    }

    /// Resolves on the Ended transition alone, ignoring consumers. Used by
    /// close-all propagation and merge supervision.
    pub(crate) async fn ended(&self) {
        let gate = {
            let mut g = self.shared.lock();
            if g.state == State::Ended {
                None
            } else {
                let p = Promise::new();
                g.waiting.push(p.clone());
                Some(p)
            }
        };
        if let Some(p) = gate {
            p.await;
        }
    }

    /// Resolves once the pipeline forwarder (if any) has gone idle.
    pub(crate) async fn forwarder_idle(&self) {
        let idle = self.shared.lock().forward_idle.clone();
        if let Some(p) = idle {
            p.await;
        }
    }
}
