use crate::common::*;

/// Random order emission from a bounded reservoir.
///
/// The buffer is filled up to its capacity before an element is emitted.
/// An error skips the buffer and is forwarded as soon as it arrives, after
/// which the stream ends and the buffered elements are dropped.
pub struct ShuffleBuffer<S, T> {
    stream: Option<S>,
    buffer: Vec<T>,
    capacity: usize,
    rng: StdRng,
}

impl<S, T> ShuffleBuffer<S, T> {
    pub fn new(stream: S, capacity: usize, rng: StdRng) -> Self {
        let capacity = capacity.max(1);
        Self {
            stream: Some(stream),
            buffer: Vec::with_capacity(capacity),
            capacity,
            rng,
        }
    }
}

impl<S, T> Stream for ShuffleBuffer<S, T>
where
    S: Stream<Item = Result<T>> + Unpin,
    T: Unpin,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        while this.buffer.len() < this.capacity {
            let stream = match this.stream.as_mut() {
                Some(stream) => stream,
                None => break,
            };

            match stream.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(item))) => this.buffer.push(item),
                Poll::Ready(Some(Err(err))) => {
                    this.stream = None;
                    this.buffer = vec![];
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.stream = None,
                Poll::Pending => return Poll::Pending,
            }
        }

        if this.buffer.is_empty() {
            return Poll::Ready(None);
        }
        let index = this.rng.gen_range(0..this.buffer.len());
        Poll::Ready(Some(Ok(this.buffer.swap_remove(index))))
    }
}
