//! Stratified train / validation / test split

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

/// Sample indices of each split
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split `indices` so every class keeps its share in both parts.
/// Returns `(kept, held_out)`.
pub fn stratified_holdout<R: Rng>(
    indices: &[usize],
    labels: &[usize],
    fraction: f32,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &i in indices {
        by_class.entry(labels[i]).or_default().push(i);
    }

    let mut kept = Vec::with_capacity(indices.len());
    let mut held_out = Vec::new();

    for (_, mut members) in by_class {
        members.shuffle(rng);
        let take = ((members.len() as f32 * fraction).round() as usize).min(members.len());
        held_out.extend_from_slice(&members[..take]);
        kept.extend_from_slice(&members[take..]);
    }

    kept.shuffle(rng);
    held_out.shuffle(rng);
    (kept, held_out)
}

/// Hold out the test split first, then carve validation out of the rest
/// so it is `validation_fraction` of the whole dataset.
pub fn train_val_test_split<R: Rng>(
    labels: &[usize],
    validation_fraction: f32,
    test_fraction: f32,
    rng: &mut R,
) -> SplitIndices {
    let all: Vec<usize> = (0..labels.len()).collect();
    let (rest, test) = stratified_holdout(&all, labels, test_fraction, rng);

    let remaining = 1.0 - test_fraction;
    let relative = if remaining > 0.0 { validation_fraction / remaining } else { 0.0 };
    let (train, validation) = stratified_holdout(&rest, labels, relative, rng);

    SplitIndices { train, validation, test }
}
