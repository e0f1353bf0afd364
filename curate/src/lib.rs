//! The command line driver of the Wake Vision curation pipeline.

use anyhow::Result;
use futures::{
    future,
    stream::{StreamExt as _, TryStreamExt as _},
};
use indexmap::IndexMap;
use label::Label;
use std::{path::PathBuf, sync::Arc};
use structopt::StructOpt;
use tracing::{info, info_span, Instrument};
use wake_vision::{
    config::LabelType,
    dataset::{JsonLinesSource, Split},
    BatchStream, Config, WakeVision,
};

#[derive(Debug, Clone, StructOpt)]
/// Curate the Wake Vision dataset and report its statistics
pub struct Args {
    #[structopt(long, default_value = "curate.json5")]
    /// configuration file
    pub config_file: PathBuf,
    #[structopt(long)]
    /// override the label type, "image" or "bbox"
    pub label_type: Option<LabelType>,
    #[structopt(long, default_value = "10")]
    /// number of training batches to draw
    pub train_steps: usize,
}

/// Label counts of one pass over a split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelStats {
    pub positive: usize,
    pub negative: usize,
    pub ambiguous: usize,
}

impl LabelStats {
    pub fn add(mut self, label: Label) -> Self {
        match label {
            Label::Positive => self.positive += 1,
            Label::Negative => self.negative += 1,
            Label::Ambiguous => self.ambiguous += 1,
        }
        self
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.ambiguous
    }
}

/// Example counts of a batch stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub batches: usize,
    pub examples: usize,
    pub positives: usize,
}

/// The entry of the curation program.
pub async fn start(config: Arc<Config>, train_steps: usize) -> Result<()> {
    let source = JsonLinesSource::new(&config.dataset.dir)?;
    let dataset = WakeVision::new(config, Arc::new(source))?;

    // label statistics
    for split in Split::ALL {
        let stats = label_stats(&dataset, split)
            .instrument(info_span!("label_stats", %split))
            .await?;
        info!(
            "{} split: {} records, {} positive, {} negative, {} ambiguous",
            split,
            stats.total(),
            stats.positive,
            stats.negative,
            stats.ambiguous
        );
    }

    // training batches
    {
        let stats = batch_stats(dataset.train_stream()?.take(train_steps).boxed()).await?;
        info!(
            "drew {} training batches with {} examples, {} positive",
            stats.batches, stats.examples, stats.positives
        );
    }

    // evaluation splits and subsets
    for split in [Split::Validation, Split::Test] {
        let stats = batch_stats(dataset.eval_stream(split)?).await?;
        info!(
            "{} split: {} batches with {} examples, {} positive",
            split, stats.batches, stats.examples, stats.positives
        );

        let subsets = vec![
            dataset.lighting(split)?,
            dataset.distance(split)?,
            dataset.demographic(split)?,
        ];
        report_subsets(split, subsets).await?;
    }

    Ok(())
}

/// Count the labels of one unbalanced pass.
pub async fn label_stats(dataset: &WakeVision, split: Split) -> Result<LabelStats> {
    dataset
        .labeled_stream(split)?
        .try_fold(LabelStats::default(), |stats, record| {
            future::ready(Ok(stats.add(record.label)))
        })
        .await
}

/// Drain a batch stream and count its examples.
pub async fn batch_stats(stream: BatchStream) -> Result<BatchStats> {
    stream
        .try_fold(BatchStats::default(), |mut stats, batch| {
            stats.batches += 1;
            stats.examples += batch.len();
            stats.positives += batch.num_positives();
            future::ready(Ok(stats))
        })
        .await
}

async fn report_subsets(split: Split, groups: Vec<IndexMap<String, BatchStream>>) -> Result<()> {
    for (name, stream) in groups.into_iter().flatten() {
        let stats = batch_stats(stream).await?;
        info!(
            "{} subset '{}': {} examples, {} positive",
            split, name, stats.examples, stats.positives
        );
    }
    Ok(())
}
