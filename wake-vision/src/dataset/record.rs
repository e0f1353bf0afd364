use crate::{common::*, error::CurationError};

/// A raw record with its embedded image and detection annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    /// Source identifier for diagnostics.
    #[serde(default)]
    pub id: Option<String>,
    /// The pixels in HWC order.
    pub image: Array3<u8>,
    /// Image-level annotations.
    #[serde(default)]
    pub objects: Option<ImageLevelObjects>,
    /// Bounding box annotations.
    #[serde(default)]
    pub bobjects: Option<BoxObjects>,
    /// Per-person demographic annotations.
    #[serde(default)]
    pub miap: Option<Vec<PersonAttributes>>,
}

/// Parallel arrays of image-level annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageLevelObjects {
    pub label: Vec<ConceptId>,
    pub confidence: Vec<f32>,
}

/// Parallel arrays of bounding box annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxObjects {
    pub label: Vec<ConceptId>,
    /// Boxes in normalized `[y_min, x_min, y_max, x_max]` order.
    pub bbox: Vec<[f32; 4]>,
    pub is_depiction: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderPresentation {
    Feminine,
    Masculine,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgePresentation {
    Young,
    Middle,
    Older,
    Unknown,
}

/// The perceived attributes of one annotated person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonAttributes {
    pub gender_presentation: GenderPresentation,
    pub age_presentation: AgePresentation,
}

impl AnnotatedRecord {
    /// Build a record with an image and no annotations.
    pub fn new(image: Array3<u8>) -> Self {
        Self {
            id: None,
            image,
            objects: None,
            bobjects: None,
            miap: None,
        }
    }

    /// The image size, failing if the image is empty or is not RGB.
    pub fn image_size(&self) -> Result<HW<usize>> {
        let (h, w, c) = self.image.dim();
        if c != 3 {
            return Err(
                CurationError::schema("image", format!("expect 3 channels, but get {}", c)).into(),
            );
        }
        HW::try_from_positive_hw([h, w]).map_err(|_| {
            CurationError::schema("image", format!("the image size {}x{} is empty", h, w)).into()
        })
    }

    /// Validated image-level detections.
    pub fn image_detections(&self) -> Result<Vec<ImageDetection>> {
        let objects = self.objects.as_ref().ok_or_else(|| {
            CurationError::schema("objects", "image-level annotations are missing")
        })?;
        let ImageLevelObjects { label, confidence } = objects;

        if label.len() != confidence.len() {
            return Err(CurationError::schema(
                "objects.confidence",
                format!(
                    "expect {} entries to match 'objects.label', but get {}",
                    label.len(),
                    confidence.len()
                ),
            )
            .into());
        }

        label
            .iter()
            .zip(confidence)
            .map(|(&concept, &confidence)| -> Result<_> {
                if !confidence.is_finite() {
                    return Err(CurationError::schema(
                        "objects.confidence",
                        format!("non-finite confidence for concept {}", concept),
                    )
                    .into());
                }
                Ok(ImageDetection {
                    concept,
                    confidence: confidence as f64,
                })
            })
            .collect()
    }

    /// Validated bounding box detections.
    pub fn box_detections(&self) -> Result<Vec<BoxDetection>> {
        let bobjects = self.bobjects.as_ref().ok_or_else(|| {
            CurationError::schema("bobjects", "bounding box annotations are missing")
        })?;
        let BoxObjects {
            label,
            bbox,
            is_depiction,
        } = bobjects;

        for (field, len) in [
            ("bobjects.bbox", bbox.len()),
            ("bobjects.is_depiction", is_depiction.len()),
        ] {
            if len != label.len() {
                return Err(CurationError::schema(
                    field,
                    format!(
                        "expect {} entries to match 'bobjects.label', but get {}",
                        label.len(),
                        len
                    ),
                )
                .into());
            }
        }

        izip!(label, bbox, is_depiction)
            .enumerate()
            .map(|(index, (&concept, &[t, l, b, r], &is_depiction))| -> Result<_> {
                let tlbr = [t as f64, l as f64, b as f64, r as f64];
                let rect = TLBR::try_from_ratio_tlbr(tlbr).map_err(|err| {
                    CurationError::schema("bobjects.bbox", format!("box {}: {}", index, err))
                })?;
                Ok(BoxDetection {
                    concept,
                    rect,
                    is_depiction,
                })
            })
            .collect()
    }
}

/// A record with its derived person label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub record: AnnotatedRecord,
    pub label: Label,
}
