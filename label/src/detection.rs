use crate::ConceptId;
use bbox::TLBR;

/// An image-level annotation, i.e. a concept verified with a confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDetection {
    pub concept: ConceptId,
    pub confidence: f64,
}

/// A bounding box annotation in normalized coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxDetection {
    pub concept: ConceptId,
    pub rect: TLBR<f64>,
    /// Set if the box shows a drawing, statue or photo of the concept.
    pub is_depiction: bool,
}
