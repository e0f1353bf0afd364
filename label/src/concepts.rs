//! Concept vocabularies that decide the person label.
//!
//! Each label mode owns two disjoint id lists. A match on the core list makes
//! a record a person candidate, while a match on the ambiguous list (body
//! parts) makes it undecidable. Ids differ between image-level and bounding
//! box annotations since the two come from different vocabularies.

/// The semantic category id in the source detection vocabulary.
pub type ConceptId = i64;

/// A concept id with its human readable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Concept {
    pub id: ConceptId,
    pub name: &'static str,
}

/// The core and ambiguous concept lists of one label mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptRules {
    core: &'static [Concept],
    ambiguous: &'static [Concept],
}

impl ConceptRules {
    pub const fn new(core: &'static [Concept], ambiguous: &'static [Concept]) -> Self {
        Self { core, ambiguous }
    }

    pub fn core(&self) -> &'static [Concept] {
        self.core
    }

    pub fn ambiguous(&self) -> &'static [Concept] {
        self.ambiguous
    }

    pub fn core_ids(&self) -> impl Iterator<Item = ConceptId> {
        self.core.iter().map(|concept| concept.id)
    }

    pub fn ambiguous_ids(&self) -> impl Iterator<Item = ConceptId> {
        self.ambiguous.iter().map(|concept| concept.id)
    }

    pub fn is_core(&self, id: ConceptId) -> bool {
        self.core.iter().any(|concept| concept.id == id)
    }

    pub fn is_ambiguous(&self, id: ConceptId) -> bool {
        self.ambiguous.iter().any(|concept| concept.id == id)
    }

    /// Look up the name of a concept in either list.
    pub fn name(&self, id: ConceptId) -> Option<&'static str> {
        self.core
            .iter()
            .chain(self.ambiguous)
            .find(|concept| concept.id == id)
            .map(|concept| concept.name)
    }
}

const fn concept(id: ConceptId, name: &'static str) -> Concept {
    Concept { id, name }
}

const IMAGE_LEVEL_CORE: &[Concept] = &[
    concept(14048, "Person"),
    concept(20610, "Woman"),
    concept(11417, "Man"),
    concept(8000, "Girl"),
    concept(2519, "Boy"),
    concept(9270, "Human body"),
    concept(9274, "Human face"),
    concept(9279, "Human head"),
    concept(9266, "Human"),
    concept(6713, "Female person"),
    concept(11395, "Male person"),
    concept(3895, "Child"),
    concept(10483, "Lady"),
    concept(139, "Adolescent"),
    concept(20808, "Youth"),
];

const IMAGE_LEVEL_AMBIGUOUS: &[Concept] = &[
    concept(9273, "Human eye"),
    concept(17150, "Skull"),
    concept(9282, "Human mouth"),
    concept(9272, "Human ear"),
    concept(9283, "Human nose"),
    concept(9276, "Human hair"),
    concept(9278, "Human hand"),
    concept(9275, "Human foot"),
    concept(9269, "Human arm"),
    concept(9281, "Human leg"),
    concept(1661, "Beard"),
];

const BBOX_CORE: &[Concept] = &[
    concept(68, "Person"),
    concept(227, "Woman"),
    concept(307, "Man"),
    concept(332, "Girl"),
    concept(50, "Boy"),
    concept(176, "Human body"),
    concept(501, "Human face"),
    concept(291, "Human head"),
];

const BBOX_AMBIGUOUS: &[Concept] = &[
    concept(14, "Human eye"),
    concept(29, "Skull"),
    concept(147, "Human mouth"),
    concept(223, "Human ear"),
    concept(567, "Human nose"),
    concept(252, "Human hair"),
    concept(572, "Human hand"),
    concept(213, "Human foot"),
    concept(502, "Human arm"),
    concept(220, "Human leg"),
    concept(20, "Beard"),
];

/// Concepts of image-level annotations.
pub const IMAGE_LEVEL_RULES: ConceptRules = ConceptRules::new(IMAGE_LEVEL_CORE, IMAGE_LEVEL_AMBIGUOUS);

/// Concepts of bounding box annotations.
pub const BBOX_RULES: ConceptRules = ConceptRules::new(BBOX_CORE, BBOX_AMBIGUOUS);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_well_formed(rules: &ConceptRules) {
        let core: HashSet<_> = rules.core_ids().collect();
        let ambiguous: HashSet<_> = rules.ambiguous_ids().collect();
        assert_eq!(core.len(), rules.core().len(), "duplicated core concept");
        assert_eq!(
            ambiguous.len(),
            rules.ambiguous().len(),
            "duplicated ambiguous concept"
        );
        assert!(core.is_disjoint(&ambiguous));
    }

    #[test]
    fn concept_rules_are_disjoint() {
        assert_well_formed(&IMAGE_LEVEL_RULES);
        assert_well_formed(&BBOX_RULES);
    }

    #[test]
    fn concept_rules_membership() {
        assert_eq!(IMAGE_LEVEL_RULES.core().len(), 15);
        assert_eq!(IMAGE_LEVEL_RULES.ambiguous().len(), 11);
        assert_eq!(BBOX_RULES.core().len(), 8);
        assert_eq!(BBOX_RULES.ambiguous().len(), 11);

        assert!(IMAGE_LEVEL_RULES.is_core(11417));
        assert!(IMAGE_LEVEL_RULES.is_ambiguous(1661));
        assert!(BBOX_RULES.is_core(176));
        assert!(!BBOX_RULES.is_ambiguous(176));
        assert_eq!(BBOX_RULES.name(14), Some("Human eye"));
        assert_eq!(BBOX_RULES.name(9999), None);
    }
}
