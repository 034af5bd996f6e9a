//! Stratified train/test split.

use rand::SeedableRng as _;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;

/// Row indices of each side of a split, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Splits rows so each class keeps its proportion on both sides.
///
/// `train_ratio` is the fraction of each class placed in training. Every
/// class with at least two rows contributes at least one row to each side;
/// a singleton class goes to training. Identical `seed` gives an identical
/// split.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn stratified_split(targets: &[bool], train_ratio: f64, seed: u64) -> TrainTestSplit {
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut train = Vec::with_capacity(targets.len());
    let mut test = Vec::new();

    for class in [false, true] {
        let mut rows: Vec<usize> = targets
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == class)
            .map(|(i, _)| i)
            .collect();
        rows.shuffle(&mut rng);

        let n = rows.len();
        let n_test = if n < 2 {
            0
        } else {
            let wanted = (n as f64 * (1.0 - train_ratio)).round() as usize;
            wanted.clamp(1, n - 1)
        };
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    TrainTestSplit { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(negatives: usize, positives: usize) -> Vec<bool> {
        let mut t = vec![false; negatives];
        t.extend(vec![true; positives]);
        t
    }

    #[test]
    fn preserves_class_proportions() {
        let targets = targets(70, 30);
        let split = stratified_split(&targets, 0.7, 42);
        assert_eq!(split.train.len() + split.test.len(), 100);
        let test_pos = split.test.iter().filter(|&&i| targets[i]).count();
        assert_eq!(split.test.len(), 30);
        assert_eq!(test_pos, 9);
    }

    #[test]
    fn partitions_every_row_once() {
        let targets = targets(13, 8);
        let split = stratified_split(&targets, 0.6, 7);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..21).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_split() {
        let targets = targets(40, 25);
        assert_eq!(
            stratified_split(&targets, 0.7, 3),
            stratified_split(&targets, 0.7, 3)
        );
        assert_ne!(
            stratified_split(&targets, 0.7, 3),
            stratified_split(&targets, 0.7, 4)
        );
    }

    #[test]
    fn small_classes_reach_both_sides() {
        let targets = targets(10, 2);
        let split = stratified_split(&targets, 0.9, 1);
        assert!(split.test.iter().any(|&i| targets[i]));
        assert!(split.train.iter().any(|&i| targets[i]));
    }
}
