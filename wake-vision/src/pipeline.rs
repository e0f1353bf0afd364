//! Assembly of the labeled, balanced and preprocessed streams.

use crate::{
    balance::{BalanceSpec, ClassBalancer},
    common::*,
    config::Config,
    dataset::{AnnotatedRecord, LabeledRecord, LabeledStream, RecordSource, Split},
    labeling::LabelDeriver,
    processor::{Batch, Example, Preprocessor},
    subsets::{self, EvalSubset},
    utils::StreamUtilsExt as _,
};

/// A stream of preprocessed batches.
pub type BatchStream = BoxStream<'static, Result<Batch>>;

/// The batch streams of all splits.
pub struct Splits {
    pub train: BatchStream,
    pub validation: BatchStream,
    pub test: BatchStream,
}

/// The curated person/non-person dataset.
///
/// Streams built from it are lazy and must be polled within a tokio runtime.
#[derive(Debug, Clone)]
pub struct WakeVision {
    config: Arc<Config>,
    source: Arc<dyn RecordSource>,
    deriver: Arc<LabelDeriver>,
    preprocessor: Arc<Preprocessor>,
    balance_seed: u64,
}

impl WakeVision {
    pub fn new(config: Arc<Config>, source: Arc<dyn RecordSource>) -> Result<Self> {
        config.validate()?;

        let deriver = LabelDeriver::new(&config.labeling, &config.preprocessor.input_shape)?;
        let preprocessor = Preprocessor::new(&config.preprocessor)?;
        let balance_seed = config
            .dataset
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen());
        info!(
            "derive labels from {} annotations, balancing seed {}",
            deriver.label_type(),
            balance_seed
        );

        Ok(Self {
            config,
            source,
            deriver: Arc::new(deriver),
            preprocessor: Arc::new(preprocessor),
            balance_seed,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn deriver(&self) -> &Arc<LabelDeriver> {
        &self.deriver
    }

    /// One pass over a split with a derived label on every record.
    pub fn labeled_stream(&self, split: Split) -> Result<LabeledStream> {
        let deriver = self.deriver.clone();

        let stream = self
            .source
            .stream(split)?
            .try_par_map(None, move |record: AnnotatedRecord| {
                let deriver = deriver.clone();

                move || -> Result<LabeledRecord> {
                    let label = deriver.derive(&record).with_context(|| match &record.id {
                        Some(id) => format!("unable to label record '{}'", id),
                        None => "unable to label record".to_string(),
                    })?;
                    Ok(LabeledRecord { record, label })
                }
            })
            .boxed();

        Ok(stream)
    }

    fn balancer(&self, split: Split) -> Result<ClassBalancer> {
        let quota = self.config.dataset.count_person_samples.get(split);
        let spec = BalanceSpec {
            positive_weight: self.config.dataset.positive_weight.to_f64(),
            ..BalanceSpec::equal(quota)
        };

        // only the training order changes between passes
        ClassBalancer::new(spec, split == Split::Train, self.balance_seed)
    }

    /// One class-balanced pass over a split.
    pub fn balanced_stream(&self, split: Split, pass: usize) -> Result<LabeledStream> {
        let this = self.clone();
        let stream = self
            .balancer(split)?
            .balance(pass, move || this.labeled_stream(split))?
            .boxed();
        Ok(stream)
    }

    /// Class-balanced passes over a split, repeated indefinitely.
    pub fn repeated_balanced_stream(&self, split: Split) -> Result<LabeledStream> {
        let this = self.clone();
        let stream = self
            .balancer(split)?
            .passes(move || this.labeled_stream(split))
            .boxed();
        Ok(stream)
    }

    /// The endless, shuffled and augmented training batches.
    pub fn train_stream(&self) -> Result<BatchStream> {
        let shuffle_buffer_size = self.config.preprocessor.shuffle_buffer_size.get();
        let seed = self.config.preprocessor.seed;
        info!(
            "build train stream with shuffle buffer size {}",
            shuffle_buffer_size
        );

        // repeating
        let stream = self.repeated_balanced_stream(Split::Train)?;

        // cast to floats
        let stream = {
            let preprocessor = self.preprocessor.clone();
            stream
                .try_par_map(None, move |record| {
                    let preprocessor = preprocessor.clone();
                    move || preprocessor.cast(record)
                })
                .boxed()
        };

        // shuffle
        let stream = stream.shuffle_buffer(shuffle_buffer_size, item_rng(seed, 0));

        // augment
        let stream = {
            let preprocessor = self.preprocessor.clone();
            stream
                .enumerate()
                .map(|(index, result)| result.map(|sample| (index, sample)))
                .try_par_map(None, move |(index, sample)| {
                    let preprocessor = preprocessor.clone();

                    move || -> Result<Example> {
                        let mut rng = item_rng(seed, index + 1);
                        preprocessor.train_forward(sample, &mut rng)
                    }
                })
        };

        Ok(self.batch_and_prefetch(stream))
    }

    /// Deterministic evaluation batches of one balanced pass.
    pub fn eval_stream(&self, split: Split) -> Result<BatchStream> {
        info!("build {} stream", split);
        let stream = self.balanced_stream(split, 0)?;
        Ok(self.eval_batches(stream))
    }

    pub fn splits(&self) -> Result<Splits> {
        Ok(Splits {
            train: self.train_stream()?,
            validation: self.eval_stream(Split::Validation)?,
            test: self.eval_stream(Split::Test)?,
        })
    }

    /// The `low_light`, `medium_light` and `high_light` evaluation streams.
    pub fn lighting(&self, split: Split) -> Result<IndexMap<String, BatchStream>> {
        self.subset_streams(split, subsets::lighting(&self.config.subsets.lighting))
    }

    /// The `far`, `mid` and `near` evaluation streams.
    pub fn distance(&self, split: Split) -> Result<IndexMap<String, BatchStream>> {
        self.subset_streams(
            split,
            subsets::distance(&self.config.subsets.distance, self.deriver.clone()),
        )
    }

    /// The perceived gender and age evaluation streams.
    pub fn demographic(&self, split: Split) -> Result<IndexMap<String, BatchStream>> {
        self.subset_streams(split, subsets::demographic())
    }

    /// Evaluation streams of arbitrary subsets, keyed by subset name.
    pub fn subset_streams(
        &self,
        split: Split,
        subsets: Vec<EvalSubset>,
    ) -> Result<IndexMap<String, BatchStream>> {
        subsets
            .into_iter()
            .map(|subset| -> Result<_> {
                let EvalSubset { name, predicate } = subset;
                debug!("build subset '{}' of {} split", name, split);

                let stream = self
                    .balanced_stream(split, 0)?
                    .try_filter_map(move |record| {
                        future::ready(predicate(&record).map(|keep| keep.then(|| record)))
                    })
                    .boxed();
                Ok((name, self.eval_batches(stream)))
            })
            .collect()
    }

    fn eval_batches(&self, stream: LabeledStream) -> BatchStream {
        let preprocessor = self.preprocessor.clone();
        let stream = stream.try_par_map(None, move |record| {
            let preprocessor = preprocessor.clone();

            move || -> Result<Example> {
                let sample = preprocessor.cast(record)?;
                preprocessor.eval_forward(sample)
            }
        });
        self.batch_and_prefetch(stream)
    }

    fn batch_and_prefetch<S>(&self, stream: S) -> BatchStream
    where
        S: 'static + Send + Stream<Item = Result<Example>>,
    {
        let batch_size = self.config.preprocessor.batch_size.get();
        let prefetch_size = self
            .config
            .preprocessor
            .prefetch_size
            .map(|size| size.get())
            .unwrap_or_else(|| num_cpus::get() * 2);

        stream
            .chunks(batch_size)
            .map(|results| -> Result<Batch> {
                let examples: Vec<_> = results.into_iter().try_collect()?;
                Batch::from_examples(&examples)
            })
            // nothing follows a failed batch
            .scan(false, |failed, result| {
                let item = (!*failed).then(|| {
                    *failed = result.is_err();
                    result
                });
                future::ready(item)
            })
            .prefetch(prefetch_size)
            .boxed()
    }
}

fn item_rng(seed: Option<u64>, index: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
        None => StdRng::from_entropy(),
    }
}
