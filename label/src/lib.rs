//! Person labels, annotated detections and the concept vocabularies.

pub mod concepts;
mod detection;
mod label;

pub use concepts::{Concept, ConceptId, ConceptRules, BBOX_RULES, IMAGE_LEVEL_RULES};
pub use detection::*;
pub use label::*;
