use crate::channel::{Channel, State};
use crate::promise::Promise;
use log::trace;
use std::future::Future;
use tokio::task::JoinHandle;

impl<T: Clone + Send + 'static> Channel<T> {
    /// Feed the channel from `f` in a background loop.
    ///
    /// Each iteration awaits `f()` and puts the result; the put parks while
    /// the channel is full, so production is automatically paced by
    /// consumption. The loop stops when `f` returns `None`, when the channel
    /// leaves the Open state, or when a put is refused.
    pub fn produce<F, Fut>(&self, mut f: F) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let ch = self.clone();
        tokio::spawn(async move {
            loop {
                if ch.state() != State::Open {
                    break;
                }
                match f().await {
                    Some(v) => {
                        if ch.put(v).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            trace!("producer stopped");
        })
    }

    /// Drain the channel into `f` in a background loop.
    ///
    /// Each value is awaited through `f` before the next take, so a slow
    /// consumer exerts backpressure. The loop exits once the channel ends;
    /// [`Channel::done`] on this channel resolves only after that exit, so
    /// "drained" includes the value the consumer is still processing.
    pub fn consume<F, Fut>(&self, mut f: F) -> JoinHandle<()>
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let drained = Promise::new();
        self.shared.lock().consumers.push(drained.clone());
        let ch = self.clone();
        tokio::spawn(async move {
            loop {
                match ch.take().await {
                    Ok(v) => f(v).await,
                    Err(_) => break,
                }
            }
            drained.resolve(());
            trace!("consumer drained");
        })
    }
}
