use super::{BboxLevelTest, ImageLevelTest};
use crate::{
    common::*,
    config::{InputShape, LabelType, LabelingConfig},
    dataset::AnnotatedRecord,
};
use label::{BBOX_RULES, IMAGE_LEVEL_RULES};

/// Derives the person label of a record.
///
/// The derivation is a pure function of the record and the configuration.
#[derive(Debug, Clone)]
pub struct LabelDeriver {
    label_type: LabelType,
    target_size: HW<usize>,
    image_test: ImageLevelTest,
    bbox_test: BboxLevelTest,
}

impl LabelDeriver {
    pub fn new(labeling: &LabelingConfig, input_shape: &InputShape) -> Result<Self> {
        let target_size = input_shape.hw()?;
        Ok(Self {
            label_type: labeling.label_type,
            target_size,
            image_test: ImageLevelTest::new(labeling.min_image_level_confidence.to_f64()),
            bbox_test: BboxLevelTest::new(labeling.min_bbox_size.to_f64()),
        })
    }

    pub fn label_type(&self) -> LabelType {
        self.label_type
    }

    pub fn target_size(&self) -> &HW<usize> {
        &self.target_size
    }

    /// Derive the label, failing on malformed records.
    pub fn derive(&self, record: &AnnotatedRecord) -> Result<Label> {
        match self.label_type {
            LabelType::Image => self.derive_from_image_level(record),
            LabelType::Bbox => self.derive_from_bboxes(record),
        }
    }

    fn derive_from_image_level(&self, record: &AnnotatedRecord) -> Result<Label> {
        record.image_size()?;
        let detections = record.image_detections()?;
        let rules = &IMAGE_LEVEL_RULES;
        let present = |concept| self.image_test.is_present(&detections, concept);

        let label = if rules.core_ids().any(|id| present(id)) {
            Label::Positive
        } else if rules.ambiguous_ids().any(|id| present(id)) {
            Label::Ambiguous
        } else {
            Label::Negative
        };
        Ok(label)
    }

    fn derive_from_bboxes(&self, record: &AnnotatedRecord) -> Result<Label> {
        let orig_size = record.image_size()?;
        let detections = record.box_detections()?;

        // nothing is known about images without boxes
        if detections.is_empty() {
            return Ok(Label::Ambiguous);
        }

        let crop = CenterCrop::new(orig_size, self.target_size)?;
        let rules = &BBOX_RULES;

        let label = if rules
            .core_ids()
            .any(|id| self.bbox_test.is_significant(&crop, &detections, id))
        {
            Label::Positive
        } else if detections
            .iter()
            .any(|det| rules.is_core(det.concept) || rules.is_ambiguous(det.concept))
        {
            // body parts, depicted persons and boxes too small to see
            Label::Ambiguous
        } else {
            Label::Negative
        };
        Ok(label)
    }

    /// The largest projected area among real person boxes of the record.
    ///
    /// It returns `None` if the record has no box annotations or no person box
    /// overlaps the crop window.
    pub fn person_area(&self, record: &AnnotatedRecord) -> Result<Option<f64>> {
        if record.bobjects.is_none() {
            return Ok(None);
        }
        let orig_size = record.image_size()?;
        let detections = record.box_detections()?;
        let crop = CenterCrop::new(orig_size, self.target_size)?;
        Ok(self
            .bbox_test
            .largest_area(&crop, &detections, |id| BBOX_RULES.is_core(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dataset::{BoxObjects, ImageLevelObjects},
        error::CurationError,
        utils::Ratio,
    };

    fn deriver(label_type: LabelType) -> LabelDeriver {
        let labeling = LabelingConfig {
            label_type,
            min_image_level_confidence: Ratio::try_from(0.7).unwrap(),
            min_bbox_size: Ratio::try_from(0.05).unwrap(),
        };
        let input_shape = InputShape {
            height: 224,
            width: 224,
            channels: 3,
        };
        LabelDeriver::new(&labeling, &input_shape).unwrap()
    }

    fn image_record(objects: &[(ConceptId, f32)]) -> AnnotatedRecord {
        let mut record = AnnotatedRecord::new(Array3::zeros((224, 224, 3)));
        record.objects = Some(ImageLevelObjects {
            label: objects.iter().map(|&(id, _)| id).collect(),
            confidence: objects.iter().map(|&(_, conf)| conf).collect(),
        });
        record
    }

    fn bbox_record(size: (usize, usize), boxes: &[(ConceptId, [f32; 4], bool)]) -> AnnotatedRecord {
        let mut record = AnnotatedRecord::new(Array3::zeros((size.0, size.1, 3)));
        record.bobjects = Some(BoxObjects {
            label: boxes.iter().map(|&(id, _, _)| id).collect(),
            bbox: boxes.iter().map(|&(_, bbox, _)| bbox).collect(),
            is_depiction: boxes.iter().map(|&(_, _, dep)| dep).collect(),
        });
        record
    }

    #[test]
    fn image_level_labels() {
        let deriver = deriver(LabelType::Image);

        let label = deriver.derive(&image_record(&[(11417, 1.0)])).unwrap();
        assert_eq!(label, Label::Positive);

        // a confident person wins over body parts
        let label = deriver
            .derive(&image_record(&[(9273, 1.0), (14048, 0.9)]))
            .unwrap();
        assert_eq!(label, Label::Positive);

        let label = deriver.derive(&image_record(&[(1661, 0.8)])).unwrap();
        assert_eq!(label, Label::Ambiguous);

        // unconfident annotations are verified negatives
        let label = deriver
            .derive(&image_record(&[(14048, 0.0), (9273, 0.0)]))
            .unwrap();
        assert_eq!(label, Label::Negative);

        let label = deriver.derive(&image_record(&[])).unwrap();
        assert_eq!(label, Label::Negative);
    }

    #[test]
    fn bbox_level_labels() {
        let deriver = deriver(LabelType::Bbox);

        let label = deriver
            .derive(&bbox_record((224, 224), &[(68, [0.0, 0.0, 0.5, 0.5], false)]))
            .unwrap();
        assert_eq!(label, Label::Positive);

        let label = deriver
            .derive(&bbox_record((224, 224), &[(14, [0.0, 0.0, 1.0, 0.5], false)]))
            .unwrap();
        assert_eq!(label, Label::Ambiguous);

        // depicted persons and tiny persons are not negatives either
        let label = deriver
            .derive(&bbox_record((224, 224), &[(68, [0.0, 0.0, 1.0, 1.0], true)]))
            .unwrap();
        assert_eq!(label, Label::Ambiguous);
        let label = deriver
            .derive(&bbox_record((224, 224), &[(227, [0.4, 0.4, 0.5, 0.5], false)]))
            .unwrap();
        assert_eq!(label, Label::Ambiguous);

        let label = deriver
            .derive(&bbox_record((224, 224), &[(1, [0.0, 0.0, 1.0, 1.0], false)]))
            .unwrap();
        assert_eq!(label, Label::Negative);
    }

    #[test]
    fn bbox_level_person_cropped_away() {
        let deriver = deriver(LabelType::Bbox);

        // the portrait image loses its top and bottom quarters
        let record = bbox_record((1000, 500), &[(68, [0.0, 0.0, 0.2, 1.0], false)]);
        assert_eq!(deriver.derive(&record).unwrap(), Label::Ambiguous);
        assert_eq!(deriver.person_area(&record).unwrap(), None);

        let record = bbox_record((1000, 500), &[(68, [0.3, 0.1, 0.7, 0.5], false)]);
        assert_eq!(deriver.derive(&record).unwrap(), Label::Positive);
    }

    #[test]
    fn derivation_is_repeatable() {
        let records = [
            bbox_record((1000, 500), &[(68, [0.3, 0.1, 0.7, 0.5], false)]),
            bbox_record((224, 224), &[(14, [0.0, 0.0, 1.0, 0.5], false)]),
            bbox_record((640, 480), &[(1, [0.1, 0.1, 0.9, 0.9], false)]),
        ];

        for label_type in [LabelType::Bbox, LabelType::Image] {
            let deriver = deriver(label_type);
            for record in &records {
                let first = deriver.derive(record).map_err(|err| err.to_string());
                let second = deriver.derive(record).map_err(|err| err.to_string());
                assert_eq!(first, second);
            }
        }

        let record = image_record(&[(9273, 0.9), (14048, 0.5)]);
        let deriver = deriver(LabelType::Image);
        let labels: Vec<_> = (0..3).map(|_| deriver.derive(&record).unwrap()).collect();
        assert_eq!(labels, vec![Label::Ambiguous; 3]);
    }

    #[test]
    fn bbox_mode_without_boxes_is_ambiguous() {
        let deriver = deriver(LabelType::Bbox);
        let mut record = bbox_record((224, 224), &[]);
        record.objects = Some(ImageLevelObjects {
            label: vec![14048],
            confidence: vec![1.0],
        });
        assert_eq!(deriver.derive(&record).unwrap(), Label::Ambiguous);
    }

    #[test]
    fn malformed_records_fail() {
        let deriver = deriver(LabelType::Bbox);
        let record = image_record(&[(14048, 1.0)]);
        let err = deriver.derive(&record).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CurationError>(),
            Some(CurationError::Schema { field, .. }) if field == "bobjects"
        ));

        let deriver = self::deriver(LabelType::Image);
        let mut record = image_record(&[(14048, 1.0)]);
        record.image = Array3::zeros((10, 10, 4));
        assert!(deriver.derive(&record).is_err());
    }
}
