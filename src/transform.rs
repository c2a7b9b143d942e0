use crate::channel::Shared;
use crate::promise::Promise;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Per-value transform applied by a channel to every accepted put.
///
/// A transform maps one input to zero or more outputs, synchronously or
/// asynchronously. The five constructors replace the source-arity detection
/// of dynamic hosts; pick the one matching the shape of the closure:
///
/// - [`Transform::map`] / [`Transform::map_async`]: one input, at most one
///   output; `None` drops the value (filter).
/// - [`Transform::push`] / [`Transform::push_async`]: one input, any number
///   of outputs emitted through an [`Emitter`]; completion is the closure
///   return (or the returned future settling).
/// - [`Transform::push_done`]: outputs may keep arriving after the closure
///   returns, from timers or other tasks, until [`Emitter::done`] is called.
pub struct Transform<T>(Kind<T>);

enum Kind<T> {
    Map(Box<dyn FnMut(T) -> Option<T> + Send>),
    MapAsync(Box<dyn FnMut(T) -> BoxFuture<'static, Option<T>> + Send>),
    Push(Box<dyn FnMut(T, &Emitter<T>) + Send>),
    PushAsync(Box<dyn FnMut(T, Emitter<T>) -> BoxFuture<'static, ()> + Send>),
    PushDone(Box<dyn FnMut(T, Emitter<T>) + Send>),
}

impl<T: Send + 'static> Transform<T> {
    /// Pure mapping; return `None` to drop the value.
    pub fn map<F>(f: F) -> Self
    where
        F: FnMut(T) -> Option<T> + Send + 'static,
    {
        Self(Kind::Map(Box::new(f)))
    }

    /// Asynchronous mapping; the emitted value is the awaited result.
    pub fn map_async<F, Fut>(mut f: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        Self(Kind::MapAsync(Box::new(move |v| Box::pin(f(v)))))
    }

    /// Synchronous multi-emit: call `emitter.push(out)` zero or more times;
    /// the invocation completes on return.
    pub fn push<F>(f: F) -> Self
    where
        F: FnMut(T, &Emitter<T>) + Send + 'static,
    {
        Self(Kind::Push(Box::new(f)))
    }

    /// Asynchronous multi-emit: the invocation completes when the returned
    /// future settles; pushes before and between awaits all count.
    pub fn push_async<F, Fut>(mut f: F) -> Self
    where
        F: FnMut(T, Emitter<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Kind::PushAsync(Box::new(move |v, e| Box::pin(f(v, e)))))
    }

    /// Explicit completion: the invocation stays in flight after the closure
    /// returns, accepting pushes from anywhere, until `emitter.done()`.
    pub fn push_done<F>(f: F) -> Self
    where
        F: FnMut(T, Emitter<T>) + Send + 'static,
    {
        Self(Kind::PushDone(Box::new(f)))
    }
}

/// Output handle given to multi-emit transforms.
///
/// Cloneable and sendable, so `push_done` transforms can move it into timer
/// callbacks or spawned tasks. Outputs are placed in push order.
pub struct Emitter<T> {
    shared: Arc<Shared<T>>,
    state: Arc<EmitterState>,
    to_tail: bool,
}

struct EmitterState {
    pending: Mutex<Vec<Promise<()>>>,
    done: Promise<()>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone(), state: self.state.clone(), to_tail: self.to_tail }
    }
}

impl<T> Emitter<T> {
    fn new(shared: Arc<Shared<T>>, to_tail: bool) -> Self {
        Self {
            shared,
            state: Arc::new(EmitterState { pending: Mutex::new(Vec::new()), done: Promise::new() }),
            to_tail,
        }
    }

    /// Emit one output for the current invocation.
    pub fn push(&self, value: T) {
        let parked = if self.to_tail {
            self.shared.place_tail(value)
        } else {
            self.shared.place(value)
        };
        if let Some(p) = parked {
            self.state.pending.lock().unwrap().push(p);
        }
    }

    /// Mark a `push_done` invocation complete. Idempotent.
    pub fn done(&self) {
        self.state.done.resolve(());
    }

    fn take_pending(&self) -> Vec<Promise<()>> {
        std::mem::take(&mut *self.state.pending.lock().unwrap())
    }
}

enum Step<T> {
    Settled,
    MapFut(BoxFuture<'static, Option<T>>),
    UnitFut(BoxFuture<'static, ()>),
    AwaitDone,
}

/// Run one transform invocation for `value` and place every output.
///
/// Returns the sub-resolvers of outputs that parked; the caller awaits them
/// so the outer put/tail future completes only once all outputs have left
/// their queues. The transform mutex is never held across an await.
pub(crate) async fn apply<T: Send + 'static>(
    shared: &Arc<Shared<T>>, value: T, to_tail: bool,
) -> Vec<Promise<()>> {
    let emitter = Emitter::new(shared.clone(), to_tail);
    let step = match shared.transform.as_ref() {
        None => {
            emitter.push(value);
            Step::Settled
        }
        Some(t) => {
            let mut t = t.lock().unwrap();
            match &mut t.0 {
                Kind::Map(f) => {
                    if let Some(out) = f(value) {
                        emitter.push(out);
                    }
                    Step::Settled
                }
                Kind::MapAsync(f) => Step::MapFut(f(value)),
                Kind::Push(f) => {
                    f(value, &emitter);
                    Step::Settled
                }
                Kind::PushAsync(f) => Step::UnitFut(f(value, emitter.clone())),
                Kind::PushDone(f) => {
                    f(value, emitter.clone());
                    Step::AwaitDone
                }
            }
        }
    };
    match step {
        Step::Settled => {}
        Step::MapFut(fut) => {
            if let Some(out) = fut.await {
                emitter.push(out);
            }
        }
        Step::UnitFut(fut) => fut.await,
        Step::AwaitDone => emitter.state.done.clone().await,
    }
    emitter.take_pending()
}
