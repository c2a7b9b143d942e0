use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// One-shot completion primitive.
///
/// Every clone shares the same slot: `resolve()` fires at most once, and any
/// number of clones can be awaited, each yielding a copy of the value. Used
/// for put sub-resolvers, parked takes, `done()` waiters and forwarder-idle
/// signals.
pub struct Promise<T>(Arc<Mutex<PromiseInner<T>>>);

struct PromiseInner<T> {
    value: Option<T>,
    wakers: Vec<Waker>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Promise(resolved={})", self.is_resolved())
    }
}

impl<T> Promise<T> {
    #[inline(always)]
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(PromiseInner { value: None, wakers: Vec::new() })))
    }

    /// Complete the promise and wake every waiter.
    ///
    /// Returns false when the promise was already resolved; the first value
    /// wins and later calls are no-ops.
    pub fn resolve(&self, value: T) -> bool {
        let wakers = {
            let mut inner = self.0.lock().unwrap();
            if inner.value.is_some() {
                return false;
            }
            inner.value = Some(value);
            std::mem::take(&mut inner.wakers)
        };
        for w in wakers {
            w.wake();
        }
        true
    }

    #[inline(always)]
    pub fn is_resolved(&self) -> bool {
        self.0.lock().unwrap().value.is_some()
    }
}

impl<T: Clone> Promise<T> {
    /// Peek at the value without awaiting.
    #[inline(always)]
    pub fn try_get(&self) -> Option<T> {
        self.0.lock().unwrap().value.clone()
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, ctx: &mut Context) -> Poll<Self::Output> {
        let mut inner = self.0.lock().unwrap();
        if let Some(v) = inner.value.as_ref() {
            return Poll::Ready(v.clone());
        }
        if !inner.wakers.iter().any(|w| w.will_wake(ctx.waker())) {
            inner.wakers.push(ctx.waker().clone());
        }
        Poll::Pending
    }
}
