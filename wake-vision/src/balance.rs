//! Class balancing by weighted random interleaving.

use crate::{
    common::*,
    dataset::{LabeledRecord, LabeledStream},
    error::CurationError,
};

/// Per-class quotas and the draw weight of the person class.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSpec {
    pub positive_quota: usize,
    pub negative_quota: usize,
    pub positive_weight: f64,
}

impl BalanceSpec {
    /// Equal quotas and equal weights.
    pub fn equal(quota: usize) -> Self {
        Self {
            positive_quota: quota,
            negative_quota: quota,
            positive_weight: 0.5,
        }
    }

    pub fn quota(&self, class: Class) -> usize {
        match class {
            Class::Person => self.positive_quota,
            Class::NonPerson => self.negative_quota,
        }
    }

    pub fn weight(&self, class: Class) -> f64 {
        match class {
            Class::Person => self.positive_weight,
            Class::NonPerson => 1.0 - self.positive_weight,
        }
    }
}

/// Builds class-balanced passes over a labeled stream.
#[derive(Debug, Clone)]
pub struct ClassBalancer {
    spec: BalanceSpec,
    rerandomize_each_pass: bool,
    seed: u64,
}

impl ClassBalancer {
    pub fn new(spec: BalanceSpec, rerandomize_each_pass: bool, seed: u64) -> Result<Self> {
        if spec.positive_quota == 0 || spec.negative_quota == 0 {
            return Err(CurationError::config("quota", "class quotas must be positive").into());
        }
        let weight = spec.positive_weight;
        if !(weight > 0.0 && weight < 1.0) {
            return Err(CurationError::config(
                "positive_weight",
                format!("expect a value within (0, 1), but get {}", weight),
            )
            .into());
        }

        Ok(Self {
            spec,
            rerandomize_each_pass,
            seed,
        })
    }

    pub fn spec(&self) -> &BalanceSpec {
        &self.spec
    }

    /// Build one balanced pass.
    ///
    /// The factory is called once per class. Each call must start a fresh
    /// pass over the same labeled records.
    pub fn balance<F>(&self, pass: usize, mut make_stream: F) -> Result<Interleave<LabeledStream>>
    where
        F: FnMut() -> Result<LabeledStream>,
    {
        let sources: Vec<_> = Class::ALL
            .iter()
            .map(|&class| -> Result<_> {
                let quota = self.spec.quota(class);
                let stream = make_stream()?
                    .try_filter(move |record| future::ready(record.label.class() == Some(class)))
                    .take(quota)
                    .boxed();
                Ok((stream, self.spec.weight(class)))
            })
            .collect::<Result<_>>()?;

        debug!("start balanced pass {}", pass);
        Interleave::new(sources, self.pass_rng(pass))
    }

    /// Repeat balanced passes indefinitely, with increasing pass indexes.
    pub fn passes<F>(self, make_stream: F) -> Passes<F>
    where
        F: FnMut() -> Result<LabeledStream>,
    {
        Passes {
            balancer: self,
            make_stream,
            pass: 0,
            current: None,
            emitted: 0,
            done: false,
        }
    }

    fn pass_rng(&self, pass: usize) -> StdRng {
        let seed = if self.rerandomize_each_pass {
            self.seed.wrapping_add(pass as u64)
        } else {
            self.seed
        };
        StdRng::seed_from_u64(seed)
    }
}

/// Merges sub-streams by weighted random draws.
///
/// Exhausted sub-streams leave the draw. The merge ends when all sub-streams
/// are exhausted, or right after forwarding the first error.
#[derive(Debug)]
pub struct Interleave<S> {
    sources: Vec<Option<S>>,
    weights: Vec<f64>,
    rng: StdRng,
    pending: Option<usize>,
    done: bool,
}

impl<S> Interleave<S> {
    pub fn new(sources: Vec<(S, f64)>, rng: StdRng) -> Result<Self> {
        ensure!(
            sources
                .iter()
                .all(|(_, weight)| weight.is_finite() && *weight > 0.0),
            "interleave weights must be positive"
        );
        let (sources, weights): (Vec<_>, Vec<_>) = sources
            .into_iter()
            .map(|(stream, weight)| (Some(stream), weight))
            .unzip();

        Ok(Self {
            sources,
            weights,
            rng,
            pending: None,
            done: false,
        })
    }

    fn draw(&mut self) -> Result<Option<usize>> {
        let active: Vec<usize> = self
            .sources
            .iter()
            .enumerate()
            .filter(|(_, source)| source.is_some())
            .map(|(index, _)| index)
            .collect();

        let index = match active.len() {
            0 => None,
            1 => Some(active[0]),
            _ => {
                let weights = active.iter().map(|&index| self.weights[index]);
                let dist = WeightedIndex::new(weights)?;
                Some(active[dist.sample(&mut self.rng)])
            }
        };
        Ok(index)
    }
}

impl<S, T> Stream for Interleave<S>
where
    S: Stream<Item = Result<T>> + Unpin,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.done {
                return Poll::Ready(None);
            }

            // a draw is kept until the chosen source answers
            let drawn = match this.pending {
                Some(index) => Ok(Some(index)),
                None => this.draw(),
            };
            let index = match drawn {
                Ok(Some(index)) => index,
                Ok(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Err(err) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
            };
            this.pending = Some(index);

            let source = match this.sources[index].as_mut() {
                Some(source) => source,
                None => {
                    this.pending = None;
                    continue;
                }
            };

            match source.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(item))) => {
                    this.pending = None;
                    return Poll::Ready(Some(Ok(item)));
                }
                Poll::Ready(Some(Err(err))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    debug!("interleaved source {} is exhausted", index);
                    this.sources[index] = None;
                    this.pending = None;
                }
            }
        }
    }
}

/// Endless balanced passes, see [ClassBalancer::passes].
///
/// It stops after forwarding an error, or if a pass yields nothing.
pub struct Passes<F> {
    balancer: ClassBalancer,
    make_stream: F,
    pass: usize,
    current: Option<Interleave<LabeledStream>>,
    emitted: usize,
    done: bool,
}

impl<F> Stream for Passes<F>
where
    F: FnMut() -> Result<LabeledStream> + Unpin,
{
    type Item = Result<LabeledRecord>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.done {
                return Poll::Ready(None);
            }

            if this.current.is_none() {
                match this.balancer.balance(this.pass, &mut this.make_stream) {
                    Ok(stream) => {
                        this.current = Some(stream);
                        this.emitted = 0;
                    }
                    Err(err) => {
                        this.done = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                }
            }

            let current = match this.current.as_mut() {
                Some(current) => current,
                None => continue,
            };

            match current.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(record))) => {
                    this.emitted += 1;
                    return Poll::Ready(Some(Ok(record)));
                }
                Poll::Ready(Some(Err(err))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.current = None;
                    if this.emitted == 0 {
                        warn!("balanced pass {} is empty, stop repeating", this.pass);
                        this.done = true;
                    } else {
                        this.pass += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::AnnotatedRecord;
    use futures::executor::block_on;

    fn labeled(id: usize, label: Label) -> LabeledRecord {
        let mut record = AnnotatedRecord::new(Array3::zeros((1, 1, 3)));
        record.id = Some(id.to_string());
        LabeledRecord { record, label }
    }

    /// Records in a mixed order, `n_pos` positives, `n_neg` negatives and
    /// `n_amb` ambiguous ones.
    fn records(n_pos: usize, n_neg: usize, n_amb: usize) -> Vec<LabeledRecord> {
        let labels = std::iter::repeat(Label::Positive)
            .take(n_pos)
            .interleave(std::iter::repeat(Label::Ambiguous).take(n_amb))
            .interleave(std::iter::repeat(Label::Negative).take(n_neg));
        labels
            .enumerate()
            .map(|(id, label)| labeled(id, label))
            .collect()
    }

    fn factory(records: Vec<LabeledRecord>) -> impl FnMut() -> Result<LabeledStream> + Unpin {
        move || Ok(stream::iter(records.clone()).map(Ok).boxed())
    }

    fn ids(records: &[LabeledRecord]) -> Vec<String> {
        records
            .iter()
            .map(|record| record.record.id.clone().unwrap())
            .collect()
    }

    fn count(records: &[LabeledRecord], label: Label) -> usize {
        records.iter().filter(|record| record.label == label).count()
    }

    #[test]
    fn balance_respects_quotas() -> Result<()> {
        let balancer = ClassBalancer::new(
            BalanceSpec {
                positive_quota: 4,
                negative_quota: 20,
                positive_weight: 0.5,
            },
            false,
            1,
        )?;
        let output: Vec<_> = block_on(
            balancer
                .balance(0, factory(records(10, 7, 5)))?
                .try_collect(),
        )?;

        assert_eq!(count(&output, Label::Positive), 4);
        assert_eq!(count(&output, Label::Negative), 7);
        assert_eq!(count(&output, Label::Ambiguous), 0);
        Ok(())
    }

    #[test]
    fn balance_continues_after_one_class_is_exhausted() -> Result<()> {
        let balancer = ClassBalancer::new(BalanceSpec::equal(5), false, 3)?;
        let output: Vec<_> =
            block_on(balancer.balance(0, factory(records(5, 1, 0)))?.try_collect())?;
        assert_eq!(output.len(), 6);
        assert_eq!(count(&output, Label::Negative), 1);
        Ok(())
    }

    #[test]
    fn balance_keeps_class_order() -> Result<()> {
        let balancer = ClassBalancer::new(BalanceSpec::equal(100), false, 5)?;
        let input = records(8, 8, 3);
        let output: Vec<_> = block_on(balancer.balance(0, factory(input.clone()))?.try_collect())?;

        for label in [Label::Positive, Label::Negative] {
            let expect: Vec<_> = input
                .iter()
                .filter(|record| record.label == label)
                .cloned()
                .collect();
            let actual: Vec<_> = output
                .iter()
                .filter(|record| record.label == label)
                .cloned()
                .collect();
            assert_eq!(ids(&expect), ids(&actual));
        }
        Ok(())
    }

    #[test]
    fn balance_reseeds_each_pass() -> Result<()> {
        let input = records(10, 10, 0);
        let run = |balancer: &ClassBalancer, pass: usize| -> Result<Vec<String>> {
            let output: Vec<_> =
                block_on(balancer.balance(pass, factory(input.clone()))?.try_collect())?;
            Ok(ids(&output))
        };

        let fixed = ClassBalancer::new(BalanceSpec::equal(10), false, 42)?;
        let first = run(&fixed, 0)?;
        for pass in 1..4 {
            assert_eq!(run(&fixed, pass)?, first);
        }

        let reseeded = ClassBalancer::new(BalanceSpec::equal(10), true, 42)?;
        let first = run(&reseeded, 0)?;
        assert_eq!(run(&reseeded, 0)?, first);
        let changed = (1..6)
            .map(|pass| run(&reseeded, pass))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .any(|order| order != first);
        assert!(changed);
        Ok(())
    }

    #[test]
    fn balance_follows_weights() -> Result<()> {
        let balancer = ClassBalancer::new(
            BalanceSpec {
                positive_quota: 2000,
                negative_quota: 2000,
                positive_weight: 0.8,
            },
            false,
            11,
        )?;
        let output: Vec<_> = block_on(
            balancer
                .balance(0, factory(records(2000, 2000, 0)))?
                .take(500)
                .try_collect(),
        )?;

        let positives = count(&output, Label::Positive);
        assert!((340..=460).contains(&positives), "{} positives", positives);
        Ok(())
    }

    #[test]
    fn balance_forwards_first_error() -> Result<()> {
        let balancer = ClassBalancer::new(BalanceSpec::equal(10), false, 0)?;
        let make_stream = || -> Result<LabeledStream> {
            let items = vec![
                Ok(labeled(0, Label::Positive)),
                Ok(labeled(1, Label::Negative)),
                Err(format_err!("broken record")),
                Ok(labeled(2, Label::Positive)),
                Ok(labeled(3, Label::Negative)),
            ];
            Ok(stream::iter(items).boxed())
        };
        let results: Vec<_> = block_on(balancer.balance(0, make_stream)?.collect());

        assert!(results.last().unwrap().is_err());
        assert_eq!(results.iter().filter(|result| result.is_err()).count(), 1);
        Ok(())
    }

    #[test]
    fn interleave_requires_positive_weights() -> Result<()> {
        let source = |values: Vec<usize>| stream::iter(values).map(Ok::<_, Error>);
        let rng = || StdRng::seed_from_u64(0);

        assert!(Interleave::new(vec![(source(vec![0]), 0.0), (source(vec![1]), 1.0)], rng()).is_err());
        assert!(Interleave::new(vec![(source(vec![0]), f64::NAN)], rng()).is_err());

        // a tiny weight is still drawable once the other source is exhausted
        let interleave = Interleave::new(
            vec![(source(vec![0, 1, 2]), 1e-300), (source(vec![3, 4]), 1.0)],
            rng(),
        )?;
        let mut output: Vec<usize> = block_on(interleave.try_collect())?;
        output.sort_unstable();
        assert_eq!(output, vec![0, 1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn passes_repeat_balanced_stream() -> Result<()> {
        let balancer = ClassBalancer::new(BalanceSpec::equal(3), true, 9)?;
        let output: Vec<_> = block_on(
            balancer
                .passes(factory(records(5, 2, 4)))
                .take(5 * 4)
                .try_collect(),
        )?;

        assert_eq!(output.len(), 20);
        assert_eq!(count(&output, Label::Positive), 12);
        assert_eq!(count(&output, Label::Negative), 8);
        Ok(())
    }

    #[test]
    fn passes_stop_on_empty_pass() -> Result<()> {
        let balancer = ClassBalancer::new(BalanceSpec::equal(3), true, 9)?;
        let output: Vec<_> =
            block_on(balancer.passes(factory(records(0, 0, 4))).try_collect())?;
        assert!(output.is_empty());
        Ok(())
    }

    #[test]
    fn reject_invalid_spec() {
        assert!(ClassBalancer::new(BalanceSpec::equal(0), false, 0).is_err());
        let spec = BalanceSpec {
            positive_weight: 1.0,
            ..BalanceSpec::equal(1)
        };
        assert!(ClassBalancer::new(spec, false, 0).is_err());
    }
}
