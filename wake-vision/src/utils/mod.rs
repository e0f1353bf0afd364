//! Stream adapters and value types shared by the pipeline stages.

mod prefetch;
mod ratio;
mod shuffle;

pub use prefetch::*;
pub use ratio::*;
pub use shuffle::*;

use crate::common::*;

/// Stream combinators used by the curation pipeline.
pub trait StreamUtilsExt
where
    Self: Stream + Sized,
{
    /// Emit elements in random order from a reservoir of `capacity` elements.
    fn shuffle_buffer<T>(self, capacity: usize, rng: StdRng) -> ShuffleBuffer<Self, T>
    where
        Self: Stream<Item = Result<T>> + Unpin,
    {
        ShuffleBuffer::new(self, capacity, rng)
    }

    /// Pull elements ahead of the consumer into a bounded buffer.
    fn prefetch(self, buf_size: usize) -> Prefetch<Self::Item>
    where
        Self: 'static + Send,
        Self::Item: 'static + Send,
    {
        Prefetch::new(self, buf_size)
    }
}

impl<S> StreamUtilsExt for S where S: Stream {}
