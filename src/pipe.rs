use crate::channel::{Channel, State};
use crate::error::InvalidArgument;
use crate::promise::Promise;
use crate::transform::Transform;
use futures::future::join_all;
use log::{trace, warn};
use std::sync::Arc;

// The forwarder's next step, decided under a single lock acquisition.
enum Forward<T> {
    // a value plus the pipeline snapshot taken in the same critical section
    Deliver(T, Vec<Channel<T>>),
    Park(Promise<()>),
    Exit,
}

impl<T: Clone + Send + 'static> Channel<T> {
    /// Forward every value of this channel into `target`.
    ///
    /// Returns a handle to `target` so pipes chain: `a.pipe(&b).pipe(&c)`
    /// wires a → b → c.
    ///
    /// Must be called inside a tokio runtime: forwarding runs on a spawned
    /// background task, started lazily on the first pipe.
    pub fn pipe(&self, target: &Channel<T>) -> Channel<T> {
        self.pipe_all(std::slice::from_ref(target))
    }

    /// Forward every value of this channel into each of `targets`.
    ///
    /// All targets receive a value before the next one is taken, so the
    /// slowest consumer paces the whole fan-out. Returns the last target.
    pub fn pipe_all(&self, targets: &[Channel<T>]) -> Channel<T> {
        {
            let mut g = self.shared.lock();
            for t in targets {
                g.pipeline.push(t.clone());
            }
        }
        self.ensure_forwarder();
        targets.last().cloned().unwrap_or_else(|| self.clone())
    }

    /// Remove `target` from the pipeline.
    ///
    /// The forwarder observes the removal from its next value on. A value
    /// already parked inside the removed downstream stays delivered.
    pub fn unpipe(&self, target: &Channel<T>) -> &Self {
        let mut g = self.shared.lock();
        g.pipeline.retain(|c| !Arc::ptr_eq(&c.shared, &target.shared));
        g.wake_forwarder();
        self
    }

    /// Decide the forwarder's next step. A value is only removed from the
    /// channel once the pipeline has been confirmed non-empty under the same
    /// lock, so an unpipe racing a parked forwarder can never strand one.
    /// The Exit branch retires the forwarder under that same lock; a pipe
    /// that still sees `forwarding` set is guaranteed a live forwarder that
    /// will observe its targets on the next poll.
    fn poll_forward(&self) -> Forward<T> {
        let mut g = self.shared.lock();
        if g.pipeline.is_empty() || g.state == State::Ended {
            g.forwarding = false;
            if let Some(p) = g.forward_idle.take() {
                p.resolve(());
            }
            return Forward::Exit;
        }
        if let Some(v) = g.pop_ready() {
            let targets = g.pipeline.clone();
            return Forward::Deliver(v, targets);
        }
        let p = Promise::new();
        g.forward_wait = Some(p.clone());
        Forward::Park(p)
    }

    // One forwarder per channel; the flag keeps re-pipes from doubling it.
    fn ensure_forwarder(&self) {
        {
            let mut g = self.shared.lock();
            if g.forwarding || g.pipeline.is_empty() {
                return;
            }
            g.forwarding = true;
            g.forward_idle = Some(Promise::new());
        }
        let ch = self.clone();
        tokio::spawn(async move {
            trace!("pipeline forwarder started");
            loop {
                match ch.poll_forward() {
                    Forward::Deliver(v, targets) => {
                        let results = join_all(targets.iter().map(|t| t.put(v.clone()))).await;
                        if results.iter().any(|r| r.is_err()) {
                            warn!("pipeline target refused a forwarded value");
                        }
                    }
                    Forward::Park(wait) => wait.await,
                    Forward::Exit => break,
                }
            }
            trace!("pipeline forwarder stopped");
        });
    }

    /// Fan-in: a fresh channel fed by this channel and every channel in
    /// `others`. The returned channel ends only after every source has ended
    /// and finished forwarding.
    pub fn merge(&self, others: &[Channel<T>]) -> Channel<T> {
        let out = Channel::new();
        let mut sources = Vec::with_capacity(others.len() + 1);
        sources.push(self.clone());
        sources.extend(others.iter().cloned());
        for s in &sources {
            s.pipe(&out);
        }
        let sink = out.clone();
        tokio::spawn(async move {
            for s in sources {
                s.ended().await;
                s.forwarder_idle().await;
            }
            sink.close();
        });
        out
    }

    /// Close this channel; once it has ended and its forwarder has gone
    /// idle, close every pipeline target the same way, cascading the
    /// shutdown through the whole graph.
    pub fn close_all(&self) {
        self.close();
        let ch = self.clone();
        tokio::spawn(async move {
            ch.ended().await;
            ch.forwarder_idle().await;
            let targets = ch.shared.lock().pipeline.clone();
            for t in targets {
                t.close_all();
            }
        });
    }

    /// Build a chain of channels, one per transform, piped in order.
    ///
    /// Returns the first and last channel of the chain; values put on the
    /// first come out of the last with every transform applied. Closing the
    /// first with [`Channel::close_all`] shuts down the whole chain.
    pub fn pipeline(
        transforms: Vec<Transform<T>>,
    ) -> Result<(Channel<T>, Channel<T>), InvalidArgument> {
        if transforms.is_empty() {
            return Err(InvalidArgument::EmptyPipeline);
        }
        let channels: Vec<Channel<T>> =
            transforms.into_iter().map(Channel::with_transform).collect();
        for i in 0..channels.len() - 1 {
            channels[i].pipe(&channels[i + 1]);
        }
        let first = channels[0].clone();
        let last = channels[channels.len() - 1].clone();
        Ok((first, last))
    }
}
