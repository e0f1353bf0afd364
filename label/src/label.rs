use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

/// The person label derived for a record.
///
/// `Ambiguous` marks records whose annotations can neither confirm nor deny
/// the presence of a person. Such records are excluded from both classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Positive,
    Negative,
    Ambiguous,
}

impl Label {
    /// The signed integer encoding, `1`, `0` or `-1`.
    pub fn to_i64(self) -> i64 {
        match self {
            Self::Positive => 1,
            Self::Negative => 0,
            Self::Ambiguous => -1,
        }
    }

    /// The training class, or `None` for ambiguous records.
    pub fn class(self) -> Option<Class> {
        match self {
            Self::Positive => Some(Class::Person),
            Self::Negative => Some(Class::NonPerson),
            Self::Ambiguous => None,
        }
    }
}

impl TryFrom<i64> for Label {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let label = match value {
            1 => Self::Positive,
            0 => Self::Negative,
            -1 => Self::Ambiguous,
            _ => bail!("invalid label value {}, expect 1, 0 or -1", value),
        };
        Ok(label)
    }
}

impl From<Class> for Label {
    fn from(class: Class) -> Self {
        match class {
            Class::Person => Self::Positive,
            Class::NonPerson => Self::Negative,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Ambiguous => "ambiguous",
        };
        write!(f, "{}", text)
    }
}

/// One of the two training classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Class {
    NonPerson,
    Person,
}

impl Class {
    pub const ALL: [Class; 2] = [Class::Person, Class::NonPerson];

    /// The scalar target fed to the model.
    pub fn index(self) -> usize {
        match self {
            Self::NonPerson => 0,
            Self::Person => 1,
        }
    }
}
