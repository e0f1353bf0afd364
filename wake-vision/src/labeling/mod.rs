//! Person label derivation from detection annotations.

mod deriver;
mod significance;

pub use deriver::*;
pub use significance::*;
