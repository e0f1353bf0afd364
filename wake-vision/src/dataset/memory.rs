use super::{AnnotatedRecord, RecordSource, RecordStream, Split};
use crate::common::*;

/// A record source backed by in-memory record lists.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    splits: HashMap<Split, Arc<Vec<AnnotatedRecord>>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_split(mut self, split: Split, records: Vec<AnnotatedRecord>) -> Self {
        self.insert(split, records);
        self
    }

    pub fn insert(&mut self, split: Split, records: Vec<AnnotatedRecord>) {
        self.splits.insert(split, Arc::new(records));
    }

    pub fn num_records(&self, split: Split) -> usize {
        self.splits.get(&split).map(|records| records.len()).unwrap_or(0)
    }
}

impl RecordSource for InMemorySource {
    fn stream(&self, split: Split) -> Result<RecordStream> {
        let records = self
            .splits
            .get(&split)
            .ok_or_else(|| format_err!("the split '{}' is not available", split))?
            .clone();
        let stream = stream::iter(0..records.len())
            .map(move |index| Ok(records[index].clone()))
            .boxed();
        Ok(stream)
    }
}
