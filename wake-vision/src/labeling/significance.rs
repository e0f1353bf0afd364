use crate::common::*;

/// Decides whether a concept is present from image-level annotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageLevelTest {
    min_confidence: f64,
}

impl ImageLevelTest {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Check if any annotation of the concept reaches the confidence threshold.
    pub fn is_present(&self, detections: &[ImageDetection], concept: ConceptId) -> bool {
        detections
            .iter()
            .any(|det| det.concept == concept && det.confidence >= self.min_confidence)
    }
}

/// Decides whether a concept is large enough to see after the center crop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BboxLevelTest {
    min_bbox_size: f64,
}

impl BboxLevelTest {
    pub fn new(min_bbox_size: f64) -> Self {
        Self { min_bbox_size }
    }

    pub fn min_bbox_size(&self) -> f64 {
        self.min_bbox_size
    }

    /// Check if some real, non-depicted box of the concept covers more than
    /// the minimum area fraction of the cropped image.
    ///
    /// Boxes are judged one at a time. Their areas are never summed.
    pub fn is_significant(
        &self,
        crop: &CenterCrop,
        detections: &[BoxDetection],
        concept: ConceptId,
    ) -> bool {
        detections
            .iter()
            .filter(|det| !det.is_depiction && det.concept == concept)
            .any(|det| crop.projected_area(&det.rect) > self.min_bbox_size)
    }

    /// The largest projected area among real boxes of the selected concepts.
    ///
    /// Boxes missing the crop window are not counted.
    pub fn largest_area<F>(
        &self,
        crop: &CenterCrop,
        detections: &[BoxDetection],
        mut select: F,
    ) -> Option<f64>
    where
        F: FnMut(ConceptId) -> bool,
    {
        detections
            .iter()
            .filter(|det| !det.is_depiction && select(det.concept))
            .filter_map(|det| crop.project(&det.rect))
            .map(|rect| rect.area())
            .fold(None, |max: Option<f64>, area| {
                Some(max.map_or(area, |max| max.max(area)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_crop() -> CenterCrop {
        let size = HW::try_from_positive_hw([224usize, 224]).unwrap();
        CenterCrop::new(size, size).unwrap()
    }

    fn det(concept: ConceptId, tlbr: [f64; 4], is_depiction: bool) -> BoxDetection {
        BoxDetection {
            concept,
            rect: TLBR::try_from_ratio_tlbr(tlbr).unwrap(),
            is_depiction,
        }
    }

    #[test]
    fn image_level_confidence_threshold() {
        let test = ImageLevelTest::new(0.7);
        let detections = vec![
            ImageDetection {
                concept: 14048,
                confidence: 0.7,
            },
            ImageDetection {
                concept: 9273,
                confidence: 0.2,
            },
        ];
        assert!(test.is_present(&detections, 14048));
        assert!(!test.is_present(&detections, 9273));
        assert!(!test.is_present(&detections, 11417));
    }

    #[test]
    fn bbox_level_area_threshold() {
        let crop = square_crop();
        let test = BboxLevelTest::new(0.05);

        // two small boxes are not merged
        let small = vec![
            det(68, [0.0, 0.0, 0.2, 0.2], false),
            det(68, [0.5, 0.5, 0.7, 0.7], false),
        ];
        assert!(!test.is_significant(&crop, &small, 68));

        let large = vec![det(68, [0.0, 0.0, 0.5, 0.5], false)];
        assert!(test.is_significant(&crop, &large, 68));
        assert!(!test.is_significant(&crop, &large, 227));

        let depicted = vec![det(68, [0.0, 0.0, 1.0, 1.0], true)];
        assert!(!test.is_significant(&crop, &depicted, 68));
    }

    #[test]
    fn bbox_level_largest_area() {
        let crop = square_crop();
        let test = BboxLevelTest::new(0.05);
        let detections = vec![
            det(68, [0.0, 0.0, 0.5, 0.5], false),
            det(227, [0.0, 0.0, 0.5, 1.0], false),
            det(307, [0.0, 0.0, 1.0, 1.0], true),
            det(14, [0.0, 0.0, 1.0, 1.0], false),
        ];

        let area = test
            .largest_area(&crop, &detections, |id| [68, 227, 307].contains(&id))
            .unwrap();
        assert!((area - 0.5).abs() < 1e-2);
        assert_eq!(test.largest_area(&crop, &detections, |id| id == 501), None);
    }
}
