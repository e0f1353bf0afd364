//! Named filters that carve evaluation subsets out of a labeled stream.

use crate::{
    common::*,
    config::{DistanceConfig, LightingConfig},
    dataset::{AgePresentation, GenderPresentation, LabeledRecord, PersonAttributes},
    error::CurationError,
    labeling::LabelDeriver,
};

pub type SubsetPredicate = Arc<dyn Fn(&LabeledRecord) -> Result<bool> + Send + Sync>;

/// A named record filter.
#[derive(Clone)]
pub struct EvalSubset {
    pub name: String,
    pub predicate: SubsetPredicate,
}

impl EvalSubset {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: 'static + Fn(&LabeledRecord) -> Result<bool> + Send + Sync,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn matches(&self, record: &LabeledRecord) -> Result<bool> {
        (self.predicate)(record)
    }
}

impl Debug for EvalSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalSubset")
            .field("name", &self.name)
            .finish()
    }
}

/// Mean Rec.601 luma on the `[0, 255]` scale.
pub fn mean_luma(image: &Array3<u8>) -> Result<f64> {
    let (h, w, c) = image.dim();
    if c != 3 || h == 0 || w == 0 {
        return Err(CurationError::schema(
            "image",
            format!("expect a non-empty RGB image, but get shape {}x{}x{}", h, w, c),
        )
        .into());
    }

    let sum: f64 = image
        .lanes(Axis(2))
        .into_iter()
        .map(|pixel| 0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64)
        .sum();
    Ok(sum / (h * w) as f64)
}

/// The `low_light`, `medium_light` and `high_light` subsets, for both classes.
pub fn lighting(config: &LightingConfig) -> Vec<EvalSubset> {
    let low_max = config.low_max.raw();
    let high_min = config.high_min.raw();

    vec![
        EvalSubset::new("low_light", move |record| {
            Ok(mean_luma(&record.record.image)? < low_max)
        }),
        EvalSubset::new("medium_light", move |record| {
            let luma = mean_luma(&record.record.image)?;
            Ok(luma >= low_max && luma < high_min)
        }),
        EvalSubset::new("high_light", move |record| {
            Ok(mean_luma(&record.record.image)? >= high_min)
        }),
    ]
}

/// The `far`, `mid` and `near` subsets.
///
/// Person records are placed by their largest person box after the center
/// crop. Those without a visible person box are left out. Non-person records
/// belong to every subset.
pub fn distance(config: &DistanceConfig, deriver: Arc<LabelDeriver>) -> Vec<EvalSubset> {
    let far_max = config.far_max.to_f64();
    let near_min = config.near_min.to_f64();

    let subset = |name: &str, accept: fn(f64, f64, f64) -> bool| {
        let deriver = deriver.clone();
        EvalSubset::new(name, move |record| {
            let keep = match record.label {
                Label::Negative => true,
                Label::Ambiguous => false,
                Label::Positive => deriver
                    .person_area(&record.record)?
                    .map_or(false, |area| accept(area, far_max, near_min)),
            };
            Ok(keep)
        })
    };

    vec![
        subset("far", |area, far_max, _| area < far_max),
        subset("mid", |area, far_max, near_min| {
            area >= far_max && area < near_min
        }),
        subset("near", |area, _, near_min| area >= near_min),
    ]
}

/// The perceived gender and age subsets from MIAP annotations.
///
/// A person record belongs to a subset if any of its annotated persons has the
/// attribute. Non-person records belong to every subset.
pub fn demographic() -> Vec<EvalSubset> {
    let gender = [
        ("female", GenderPresentation::Feminine),
        ("male", GenderPresentation::Masculine),
        ("gender_unknown", GenderPresentation::Unknown),
    ]
    .into_iter()
    .map(|(name, gender)| {
        attribute_subset(name, move |person| person.gender_presentation == gender)
    });

    let age = [
        ("young", AgePresentation::Young),
        ("middle", AgePresentation::Middle),
        ("older", AgePresentation::Older),
        ("age_unknown", AgePresentation::Unknown),
    ]
    .into_iter()
    .map(|(name, age)| attribute_subset(name, move |person| person.age_presentation == age));

    gender.chain(age).collect()
}

fn attribute_subset<F>(name: &str, has_attribute: F) -> EvalSubset
where
    F: 'static + Fn(&PersonAttributes) -> bool + Send + Sync,
{
    EvalSubset::new(name, move |record| {
        let keep = match record.label {
            Label::Negative => true,
            Label::Ambiguous => false,
            Label::Positive => record
                .record
                .miap
                .iter()
                .flatten()
                .any(|person| has_attribute(person)),
        };
        Ok(keep)
    })
}
