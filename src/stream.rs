use crate::channel::Channel;
use crate::error::RecvError;
use futures::future::BoxFuture;
use futures::stream;
use std::pin::Pin;
use std::task::*;

/// `futures::Stream` adapter over a channel; yields values until the
/// channel ends.
pub struct ChannelStream<T> {
    ch: Channel<T>,
    pending: Option<BoxFuture<'static, Result<T, RecvError>>>,
    ended: bool,
}

impl<T: Clone + Send + 'static> Channel<T> {
    pub fn into_stream(self) -> ChannelStream<T> {
        ChannelStream { ch: self, pending: None, ended: false }
    }
}

impl<T: Clone + Send + 'static> stream::Stream for ChannelStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, ctx: &mut Context) -> Poll<Option<Self::Item>> {
        let _self = self.get_mut();
        if _self.ended {
            return Poll::Ready(None);
        }
        let mut fut = match _self.pending.take() {
            Some(f) => f,
            None => {
                let ch = _self.ch.clone();
                Box::pin(async move { ch.take().await })
            }
        };
        match fut.as_mut().poll(ctx) {
            Poll::Pending => {
                _self.pending = Some(fut);
                Poll::Pending
            }
            Poll::Ready(Ok(v)) => Poll::Ready(Some(v)),
            Poll::Ready(Err(_)) => {
                _self.ended = true;
                Poll::Ready(None)
            }
        }
    }
}

impl<T: Clone + Send + 'static> stream::FusedStream for ChannelStream<T> {
    fn is_terminated(&self) -> bool {
        self.ended
    }
}

#[cfg(test)]
mod tests {
    use crate::Channel;
    use futures::stream::{FusedStream, StreamExt};

    #[tokio::test]
    async fn test_into_stream() {
        let total_message = 100;
        let ch = Channel::bounded(2).unwrap();
        let tx = ch.clone();
        tokio::spawn(async move {
            for i in 0i32..total_message {
                tx.put(i).await.expect("put");
            }
            tx.close();
        });
        let mut s = ch.into_stream();
        for i in 0..total_message {
            assert_eq!(s.next().await, Some(i));
        }
        assert_eq!(s.next().await, None);
        assert!(s.is_terminated());
    }
}
