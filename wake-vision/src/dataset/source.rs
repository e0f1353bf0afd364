use super::{AnnotatedRecord, LabeledRecord};
use crate::{common::*, error::CurationError};

/// A pass over the records of one split.
pub type RecordStream = BoxStream<'static, Result<AnnotatedRecord>>;

/// A pass over labeled records.
pub type LabeledStream = BoxStream<'static, Result<LabeledRecord>>;

/// The dataset partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Split {
    type Err = CurationError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|split| split.as_str() == text)
            .ok_or_else(|| CurationError::config("split", format!("unknown split \"{}\"", text)))
    }
}

/// The provider of annotated records.
///
/// Each call to [stream](RecordSource::stream) starts an independent pass, so
/// the class balancer can read a split once per class.
pub trait RecordSource
where
    Self: Debug + Send + Sync,
{
    fn stream(&self, split: Split) -> Result<RecordStream>;
}
