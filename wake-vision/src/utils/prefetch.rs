use crate::common::*;
use tokio::task::JoinHandle;

/// Runs a stream ahead of its consumer on a spawned task.
///
/// At most `buf_size` elements are buffered in a bounded channel. Dropping
/// the consumer aborts the producer task. It must be created within a tokio
/// runtime.
pub struct Prefetch<T> {
    stream: BoxStream<'static, T>,
    worker: JoinHandle<()>,
}

impl<T> Prefetch<T>
where
    T: 'static + Send,
{
    pub fn new<S>(stream: S, buf_size: usize) -> Self
    where
        S: 'static + Send + Stream<Item = T>,
    {
        let (tx, rx) = flume::bounded(buf_size);

        let worker = tokio::spawn(async move {
            futures::pin_mut!(stream);
            while let Some(item) = stream.next().await {
                if tx.send_async(item).await.is_err() {
                    break;
                }
            }
        });

        Self {
            stream: rx.into_stream().boxed(),
            worker,
        }
    }
}

impl<T> Drop for Prefetch<T> {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

impl<T> Stream for Prefetch<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }
}
