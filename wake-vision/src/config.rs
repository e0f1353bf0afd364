//! Curation pipeline configuration format.

use crate::{common::*, dataset::Split, error::CurationError, utils::Ratio};

pub use dataset::*;
pub use labeling::*;
pub use preprocessor::*;
pub use subsets::*;

/// The main curation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub labeling: LabelingConfig,
    pub preprocessor: PreprocessorConfig,
    #[serde(default)]
    pub subsets: SubsetConfig,
}

impl Config {
    /// Load a json5 configuration file and validate it.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let config: Self = json5::from_str(&text)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value constraint, failing with [CurationError::Config].
    pub fn validate(&self) -> Result<()> {
        self.dataset.validate()?;
        self.labeling.validate()?;
        self.preprocessor.validate()?;
        self.subsets.validate()?;
        Ok(())
    }
}

fn check(cond: bool, field: &str, reason: impl FnOnce() -> String) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(CurationError::config(field, reason()).into())
    }
}

mod dataset {
    use super::*;

    /// Dataset location and class balancing options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        /// Directory with one `<split>.jsonl` file per split.
        pub dir: PathBuf,
        /// Number of samples drawn from each class, per split.
        pub count_person_samples: SplitCounts,
        /// Probability to draw a person sample when interleaving the classes.
        #[serde(default = "default_positive_weight")]
        pub positive_weight: Ratio,
        /// Seed of the interleaving order. A random seed is drawn if not set.
        pub seed: Option<u64>,
    }

    impl DatasetConfig {
        pub(super) fn validate(&self) -> Result<()> {
            let SplitCounts {
                train,
                validation,
                test,
            } = self.count_person_samples;
            for (name, count) in [("train", train), ("validation", validation), ("test", test)] {
                check(count > 0, &format!("count_person_samples.{}", name), || {
                    "the sample count must be positive".into()
                })?;
            }

            let weight = self.positive_weight.to_f64();
            check(weight > 0.0 && weight < 1.0, "positive_weight", || {
                format!("expect a value within (0, 1), but get {}", weight)
            })?;
            Ok(())
        }
    }

    /// Per-split sample counts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SplitCounts {
        pub train: usize,
        pub validation: usize,
        pub test: usize,
    }

    impl SplitCounts {
        pub fn get(&self, split: Split) -> usize {
            match split {
                Split::Train => self.train,
                Split::Validation => self.validation,
                Split::Test => self.test,
            }
        }
    }

    fn default_positive_weight() -> Ratio {
        Ratio::new_unchecked(r64(0.5))
    }
}

mod labeling {
    use super::*;

    /// Label derivation options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LabelingConfig {
        pub label_type: LabelType,
        /// Minimum confidence of a verified image-level annotation.
        pub min_image_level_confidence: Ratio,
        /// Minimum area fraction of a person box after the center crop.
        pub min_bbox_size: Ratio,
    }

    impl LabelingConfig {
        pub(super) fn validate(&self) -> Result<()> {
            let size = self.min_bbox_size.to_f64();
            check(size > 0.0 && size < 1.0, "min_bbox_size", || {
                format!("expect a value within (0, 1), but get {}", size)
            })?;
            Ok(())
        }
    }

    /// The annotation kind the person label is derived from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum LabelType {
        Image,
        Bbox,
    }

    impl LabelType {
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Image => "image",
                Self::Bbox => "bbox",
            }
        }
    }

    impl FromStr for LabelType {
        type Err = CurationError;

        fn from_str(text: &str) -> Result<Self, Self::Err> {
            let label_type = match text {
                "image" => Self::Image,
                "bbox" => Self::Bbox,
                _ => {
                    return Err(CurationError::config(
                        "label_type",
                        format!("expect \"image\" or \"bbox\", but get \"{}\"", text),
                    ))
                }
            };
            Ok(label_type)
        }
    }

    impl fmt::Display for LabelType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.as_str())
        }
    }

    impl Serialize for LabelType {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            self.as_str().serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for LabelType {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(D::Error::custom)
        }
    }
}

mod preprocessor {
    use super::*;

    /// Image preprocessing options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PreprocessorConfig {
        pub input_shape: InputShape,
        pub batch_size: NonZeroUsize,
        pub shuffle_buffer_size: NonZeroUsize,
        /// Number of prefetched batches, twice the number of CPUs if not set.
        pub prefetch_size: Option<NonZeroUsize>,
        #[serde(default)]
        pub normalization: NormalizationConfig,
        #[serde(default)]
        pub inception_crop: InceptionCropConfig,
        #[serde(default = "default_flip_prob")]
        pub horizontal_flip_prob: Ratio,
        /// Seed of the random augmentation. Augmentation is not reproducible if not set.
        pub seed: Option<u64>,
    }

    impl PreprocessorConfig {
        pub(super) fn validate(&self) -> Result<()> {
            self.input_shape.validate()?;

            let NormalizationConfig { scale, offset } = self.normalization;
            check(scale.raw() != 0.0, "normalization.scale", || {
                "the scale must be non-zero".into()
            })?;
            check(offset.raw().is_finite(), "normalization.offset", || {
                "the offset must be finite".into()
            })?;

            self.inception_crop.validate()?;
            Ok(())
        }
    }

    /// The model input shape in HWC order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct InputShape {
        pub height: usize,
        pub width: usize,
        #[serde(default = "default_channels")]
        pub channels: usize,
    }

    impl InputShape {
        pub fn hw(&self) -> Result<HW<usize>> {
            self.validate()?;
            HW::try_from_positive_hw([self.height, self.width])
        }

        fn validate(&self) -> Result<()> {
            check(self.height > 0, "input_shape.height", || {
                "the crop height must be positive".into()
            })?;
            check(self.width > 0, "input_shape.width", || {
                "the crop width must be positive".into()
            })?;
            check(self.channels == 3, "input_shape.channels", || {
                format!("only 3 channels are supported, but get {}", self.channels)
            })?;
            Ok(())
        }
    }

    /// The affine map `x * scale + offset` applied to `[0, 255]` pixels.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct NormalizationConfig {
        pub scale: R64,
        pub offset: R64,
    }

    impl Default for NormalizationConfig {
        fn default() -> Self {
            Self {
                scale: r64(1.0 / 127.5),
                offset: r64(-1.0),
            }
        }
    }

    /// Sampling ranges of the random area and aspect ratio crop.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct InceptionCropConfig {
        pub min_area: Ratio,
        pub max_area: Ratio,
        pub min_aspect_ratio: R64,
        pub max_aspect_ratio: R64,
        pub max_attempts: usize,
    }

    impl InceptionCropConfig {
        fn validate(&self) -> Result<()> {
            let Self {
                min_area,
                max_area,
                min_aspect_ratio,
                max_aspect_ratio,
                max_attempts,
            } = *self;

            check(
                min_area.to_f64() > 0.0 && min_area <= max_area,
                "inception_crop.min_area",
                || format!("expect 0 < min_area <= max_area, but get {}", min_area),
            )?;
            check(
                min_aspect_ratio > 0.0 && min_aspect_ratio <= max_aspect_ratio,
                "inception_crop.min_aspect_ratio",
                || {
                    format!(
                        "expect 0 < min_aspect_ratio <= max_aspect_ratio, but get {}",
                        min_aspect_ratio
                    )
                },
            )?;
            check(max_attempts > 0, "inception_crop.max_attempts", || {
                "at least one attempt is required".into()
            })?;
            Ok(())
        }
    }

    impl Default for InceptionCropConfig {
        fn default() -> Self {
            Self {
                min_area: Ratio::new_unchecked(r64(0.05)),
                max_area: Ratio::new_unchecked(r64(1.0)),
                min_aspect_ratio: r64(3.0 / 4.0),
                max_aspect_ratio: r64(4.0 / 3.0),
                max_attempts: 10,
            }
        }
    }

    fn default_channels() -> usize {
        3
    }

    fn default_flip_prob() -> Ratio {
        Ratio::new_unchecked(r64(0.5))
    }
}

mod subsets {
    use super::*;

    /// Thresholds of the evaluation subsets.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct SubsetConfig {
        #[serde(default)]
        pub lighting: LightingConfig,
        #[serde(default)]
        pub distance: DistanceConfig,
    }

    impl SubsetConfig {
        pub(super) fn validate(&self) -> Result<()> {
            let LightingConfig { low_max, high_min } = self.lighting;
            check(
                low_max >= 0.0 && low_max <= high_min && high_min <= 255.0,
                "subsets.lighting",
                || {
                    format!(
                        "expect 0 <= low_max <= high_min <= 255, but get {} and {}",
                        low_max, high_min
                    )
                },
            )?;

            let DistanceConfig { far_max, near_min } = self.distance;
            check(far_max <= near_min, "subsets.distance", || {
                format!(
                    "expect far_max <= near_min, but get {} and {}",
                    far_max, near_min
                )
            })?;
            Ok(())
        }
    }

    /// Mean luma bounds on the `[0, 255]` scale.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct LightingConfig {
        pub low_max: R64,
        pub high_min: R64,
    }

    impl Default for LightingConfig {
        fn default() -> Self {
            Self {
                low_max: r64(85.0),
                high_min: r64(170.0),
            }
        }
    }

    /// Person box area bounds after the center crop.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct DistanceConfig {
        pub far_max: Ratio,
        pub near_min: Ratio,
    }

    impl Default for DistanceConfig {
        fn default() -> Self {
            Self {
                far_max: Ratio::new_unchecked(r64(0.1)),
                near_min: Ratio::new_unchecked(r64(0.6)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        dataset: {
            dir: "data",
            count_person_samples: { train: 100, validation: 10, test: 20 },
            seed: 7,
        },
        labeling: {
            label_type: "bbox",
            min_image_level_confidence: 0.7,
            min_bbox_size: 0.05,
        },
        preprocessor: {
            input_shape: { height: 224, width: 224 },
            batch_size: 32,
            shuffle_buffer_size: 1000,
        },
    }"#;

    fn config_error(config: &Config) -> CurationError {
        config
            .validate()
            .unwrap_err()
            .downcast::<CurationError>()
            .unwrap()
    }

    #[test]
    fn parse_config_with_defaults() {
        let config: Config = json5::from_str(CONFIG).unwrap();
        config.validate().unwrap();

        assert_eq!(config.labeling.label_type, LabelType::Bbox);
        assert_eq!(config.dataset.count_person_samples.get(Split::Test), 20);
        assert_eq!(config.dataset.positive_weight.to_f64(), 0.5);
        assert_eq!(config.preprocessor.input_shape.channels, 3);
        assert_eq!(config.preprocessor.normalization.offset, -1.0);
        assert_eq!(config.preprocessor.inception_crop.max_attempts, 10);
        assert_eq!(config.subsets.lighting.high_min, 170.0);
    }

    #[test]
    fn parse_label_type() {
        assert_eq!("image".parse::<LabelType>().unwrap(), LabelType::Image);
        assert_eq!(
            "points".parse::<LabelType>().unwrap_err(),
            CurationError::config("label_type", "expect \"image\" or \"bbox\", but get \"points\"")
        );

        let text = CONFIG.replace("\"bbox\"", "\"points\"");
        assert!(json5::from_str::<Config>(&text).is_err());
    }

    #[test]
    fn reject_invalid_values() {
        let config: Config = json5::from_str(CONFIG).unwrap();

        let mut invalid = config.clone();
        invalid.preprocessor.input_shape.height = 0;
        assert!(matches!(
            config_error(&invalid),
            CurationError::Config { field, .. } if field == "input_shape.height"
        ));

        let mut invalid = config.clone();
        invalid.preprocessor.input_shape.channels = 1;
        assert!(matches!(config_error(&invalid), CurationError::Config { .. }));

        let mut invalid = config.clone();
        invalid.labeling.min_bbox_size = Ratio::new_unchecked(r64(0.0));
        assert!(matches!(
            config_error(&invalid),
            CurationError::Config { field, .. } if field == "min_bbox_size"
        ));

        let mut invalid = config.clone();
        invalid.dataset.count_person_samples.validation = 0;
        assert!(matches!(config_error(&invalid), CurationError::Config { .. }));

        let mut invalid = config;
        invalid.subsets.lighting.low_max = r64(200.0);
        assert!(matches!(config_error(&invalid), CurationError::Config { .. }));
    }
}
