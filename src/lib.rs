//! # Flowgate
//!
//! Composable asynchronous CSP channels: bounded buffers, per-value
//! transforms with variable fan-out, multi-way pipelines and automatic
//! producers/consumers, all built around backpressure. A slow consumer
//! throttles a fast producer without loss, duplication or reordering.
//!
//! ## Model
//!
//! A [`Channel`] accepts values via `put`, hands them out via `take`, and
//! optionally runs every accepted value through a [`Transform`] that may
//! emit zero, one or many outputs, synchronously or asynchronously. Each
//! output either satisfies a waiting take, lands in the bounded buffer, or
//! parks the put until a consumer makes room. Channels wire together with
//! `pipe`/`unpipe`/`merge` into dataflow graphs where the slowest consumer
//! paces every upstream producer.
//!
//! Closing a channel stops new puts while everything already accepted keeps
//! flowing; once the buffer, pending puts, tail values and in-flight
//! transforms have drained, the channel ends and all `done()` waiters fire.
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! flowgate = "0.1"
//! tokio = "1"
//! ```
//!
//! ```rust
//! use flowgate::Channel;
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//!
//! rt.block_on(async move {
//!     let ch = Channel::bounded(10).unwrap();
//!     let tx = ch.clone();
//!     tokio::spawn(async move {
//!         for i in 0i32..100 {
//!             let _ = tx.put(i).await;
//!         }
//!         tx.close();
//!     });
//!
//!     loop {
//!         match ch.take().await {
//!             Ok(v) => println!("took {}", v),
//!             Err(_) => break,
//!         }
//!     }
//! });
//! ```
//!
//! ## Scheduling
//!
//! Pipelines, producers and consumers run as spawned tokio tasks, so the
//! wiring methods must be called inside a runtime. The channel state itself
//! is a single mutex, never held across an await; channels work on both the
//! current-thread and the multi-thread scheduler.

extern crate crossbeam;
extern crate futures;

mod channel;
pub use channel::{Channel, State};
mod collections;
pub use collections::{FixedQueue, List};
mod error;
pub use error::*;
mod feed;
mod pipe;
mod promise;
pub use promise::Promise;
pub mod stream;
pub use stream::ChannelStream;
mod time;
pub use time::timeout;
mod transform;
pub use transform::{Emitter, Transform};

#[cfg(test)]
mod tests;
