//! Curation of the Wake Vision person/non-person dataset.
//!
//! Raw detection records are labeled from their annotations, balanced
//! between the person and non-person classes, then preprocessed into
//! batches for training and evaluation.

mod common;

pub mod balance;
pub mod config;
pub mod dataset;
pub mod error;
pub mod labeling;
pub mod pipeline;
pub mod processor;
pub mod subsets;
pub mod utils;

pub use config::Config;
pub use error::CurationError;
pub use pipeline::{BatchStream, Splits, WakeVision};
