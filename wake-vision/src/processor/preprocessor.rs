use super::{
    center_crop, flip_horizontal, resize, to_array, to_float_image, FloatImage, InceptionCrop,
    InceptionCropInit, Normalize,
};
use crate::{common::*, config::PreprocessorConfig, dataset::LabeledRecord};

/// A decoded image with its class, before augmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: FloatImage,
    pub class: Class,
}

/// A preprocessed model input in HWC order.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub input: Array3<f32>,
    pub class: Class,
}

/// A batch of inputs in NHWC order and their scalar targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Array4<f32>,
    pub labels: Array1<i64>,
}

impl Batch {
    pub fn from_examples(examples: &[Example]) -> Result<Self> {
        ensure!(!examples.is_empty(), "cannot build an empty batch");
        let views: Vec<_> = examples.iter().map(|example| example.input.view()).collect();
        let inputs = ndarray::stack(Axis(0), &views)?;
        let labels: Array1<i64> = examples
            .iter()
            .map(|example| example.class.index() as i64)
            .collect();
        Ok(Self { inputs, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_positives(&self) -> usize {
        self.labels
            .iter()
            .filter(|&&label| label == Class::Person.index() as i64)
            .count()
    }
}

/// The image preprocessing of training and evaluation examples.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    target_size: HW<usize>,
    normalize: Normalize,
    inception_crop: InceptionCrop,
    flip_prob: f64,
}

impl Preprocessor {
    pub fn new(config: &PreprocessorConfig) -> Result<Self> {
        let target_size = config.input_shape.hw()?;
        let normalize = Normalize::new(&config.normalization)?;
        let inception_crop = InceptionCropInit::from(&config.inception_crop).build()?;

        Ok(Self {
            target_size,
            normalize,
            inception_crop,
            flip_prob: config.horizontal_flip_prob.to_f64(),
        })
    }

    pub fn target_size(&self) -> &HW<usize> {
        &self.target_size
    }

    /// Cast the record image to floats.
    ///
    /// Ambiguous records carry no class and are rejected.
    pub fn cast(&self, record: LabeledRecord) -> Result<Sample> {
        let LabeledRecord { record, label } = record;
        let class = label
            .class()
            .ok_or_else(|| format_err!("the ambiguous record {:?} has no class", record.id))?;
        let image = to_float_image(&record.image)?;
        Ok(Sample { image, class })
    }

    /// Random crop, resize, random flip and normalization.
    pub fn train_forward<R>(&self, sample: Sample, rng: &mut R) -> Result<Example>
    where
        R: Rng,
    {
        let Sample { image, class } = sample;
        let image = self.inception_crop.forward(image, rng)?;
        let image = resize(image, &self.target_size);
        let image = if rng.gen_bool(self.flip_prob) {
            flip_horizontal(&image)
        } else {
            image
        };
        self.pack(image, class)
    }

    /// Short side resize, center crop and normalization.
    pub fn eval_forward(&self, sample: Sample) -> Result<Example> {
        let Sample { image, class } = sample;
        let image = center_crop(image, &self.target_size)?;
        self.pack(image, class)
    }

    fn pack(&self, image: FloatImage, class: Class) -> Result<Example> {
        let image = self.normalize.forward(image);
        let input = to_array(&image)?;
        Ok(Example { input, class })
    }
}
