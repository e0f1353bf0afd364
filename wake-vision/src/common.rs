pub use anyhow::{ensure, format_err, Context as _, Error, Result};
pub use bbox::{prelude::*, CenterCrop, HW, TLBR};
pub use futures::{
    future,
    stream::{self, BoxStream, Stream, StreamExt as _, TryStreamExt as _},
};
pub use image::{imageops, ImageBuffer, Rgb};
pub use indexmap::IndexMap;
pub use itertools::{izip, Itertools as _};
pub use label::{BoxDetection, Class, ConceptId, ImageDetection, Label};
pub use log::{debug, info, warn};
pub use ndarray::{Array1, Array3, Array4, Axis};
pub use noisy_float::prelude::*;
pub use par_stream::prelude::*;
pub use rand::{distributions::WeightedIndex, prelude::*, rngs::StdRng};
pub use serde::{
    de::Error as _, Deserialize, Deserializer, Serialize, Serializer,
};
pub use std::{
    collections::HashMap,
    convert::TryFrom,
    fmt,
    fmt::Debug,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::Pin,
    str::FromStr,
    sync::Arc,
    task::{Context, Poll},
};

pub type Fallible<T> = Result<T, Error>;
