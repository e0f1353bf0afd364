//! Annotated records and the sources that stream them.

mod jsonl;
mod memory;
mod record;
mod source;

pub use jsonl::*;
pub use memory::*;
pub use record::*;
pub use source::*;
