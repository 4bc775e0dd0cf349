//! Cartesian product of per-variable example sets.
//!
//! Enumeration is first-variable-slowest: the last variable varies fastest, so
//! `[x: [1,2], y: [a,b]]` yields `[1,a], [1,b], [2,a], [2,b]`. The same rule
//! applies for every arity; zero sets yield zero tuples.

use crate::core::types::InputTuple;

/// Number of combinations the product of `sets` contains.
///
/// Returns `None` if the count overflows `usize`. Any empty set makes the
/// count zero, however large the other sets are.
pub fn combination_count(sets: &[Vec<String>]) -> Option<usize> {
    if sets.is_empty() || sets.iter().any(Vec::is_empty) {
        return Some(0);
    }
    sets.iter().try_fold(1usize, |acc, set| acc.checked_mul(set.len()))
}

/// Collect the full cartesian product of `sets` in enumeration order.
///
/// Returns `None` if the combination count overflows `usize`.
pub fn cartesian_product(sets: &[Vec<String>]) -> Option<Vec<InputTuple>> {
    Combinations::new(sets).map(Iterator::collect)
}

/// Lazy odometer over the cartesian product of `sets`.
///
/// Holds one index per set; each step clones the selected values into a fresh
/// tuple and advances the rightmost index, carrying leftwards.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    sets: &'a [Vec<String>],
    indices: Vec<usize>,
    remaining: usize,
}

impl<'a> Combinations<'a> {
    /// Start at the first combination of `sets`.
    ///
    /// Returns `None` if the combination count overflows `usize`, since the
    /// iterator could not report its exact length.
    pub fn new(sets: &'a [Vec<String>]) -> Option<Self> {
        let remaining = combination_count(sets)?;
        Some(Self {
            sets,
            indices: vec![0; sets.len()],
            remaining,
        })
    }

    fn advance(&mut self) {
        for (position, set) in self.sets.iter().enumerate().rev() {
            self.indices[position] += 1;
            if self.indices[position] < set.len() {
                return;
            }
            self.indices[position] = 0;
        }
    }
}

impl Iterator for Combinations<'_> {
    type Item = InputTuple;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let tuple = self
            .indices
            .iter()
            .zip(self.sets)
            .map(|(&index, set)| set[index].clone())
            .collect();
        self.remaining -= 1;
        if self.remaining > 0 {
            self.advance();
        }
        Some(tuple)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Combinations<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sets(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|set| set.iter().map(|value| value.to_string()).collect())
            .collect()
    }

    fn tuples(raw: &[&[&str]]) -> Vec<InputTuple> {
        sets(raw)
    }

    fn collect_product(input: &[Vec<String>]) -> Vec<InputTuple> {
        cartesian_product(input).expect("count fits in usize")
    }

    #[test]
    fn two_variables_enumerate_first_variable_slowest() {
        let product = collect_product(&sets(&[&["1", "2"], &["a", "b"]]));
        assert_eq!(
            product,
            tuples(&[&["1", "a"], &["1", "b"], &["2", "a"], &["2", "b"]])
        );
    }

    #[test]
    fn no_sets_yield_no_tuples() {
        assert!(collect_product(&[]).is_empty());
        assert_eq!(combination_count(&[]), Some(0));
    }

    #[test]
    fn single_set_yields_one_singleton_per_example() {
        let product = collect_product(&sets(&[&["p", "q", "r"]]));
        assert_eq!(product, tuples(&[&["p"], &["q"], &["r"]]));
    }

    #[test]
    fn empty_set_anywhere_yields_no_tuples() {
        let product = collect_product(&sets(&[&["1", "2"], &[], &["a"]]));
        assert!(product.is_empty());
        assert_eq!(combination_count(&sets(&[&["1", "2"], &[]])), Some(0));
    }

    #[test]
    fn product_matches_mathematical_cartesian_product() {
        let input = sets(&[&["1", "2", "3"], &["a", "b"], &["x", "y", "z", "w"]]);
        let product = collect_product(&input);

        assert_eq!(product.len(), 3 * 2 * 4);
        assert_eq!(combination_count(&input), Some(product.len()));
        assert!(product.iter().all(|tuple| tuple.len() == 3));

        let unique: HashSet<&InputTuple> = product.iter().collect();
        assert_eq!(unique.len(), product.len(), "no duplicates");

        for first in &input[0] {
            for second in &input[1] {
                for third in &input[2] {
                    let expected = vec![first.clone(), second.clone(), third.clone()];
                    assert!(unique.contains(&expected), "missing {expected:?}");
                }
            }
        }
    }

    #[test]
    fn last_variable_varies_fastest() {
        let product = collect_product(&sets(&[&["1", "2"], &["a", "b", "c"]]));
        let firsts: Vec<&str> = product.iter().map(|tuple| tuple[0].as_str()).collect();
        assert_eq!(firsts, vec!["1", "1", "1", "2", "2", "2"]);
    }

    #[test]
    fn generation_is_repeatable() {
        let input = sets(&[&["1", "2"], &["a", "b"], &["t"]]);
        assert_eq!(collect_product(&input), collect_product(&input));
    }

    #[test]
    fn iterator_reports_exact_size() {
        let input = sets(&[&["1", "2"], &["a", "b", "c"]]);
        let mut iter = Combinations::new(&input).expect("count fits in usize");
        assert_eq!(iter.len(), 6);
        iter.next();
        assert_eq!(iter.len(), 5);
    }

    #[test]
    fn count_overflow_is_reported() {
        let big: Vec<String> = (0..256).map(|n| n.to_string()).collect();
        let input = vec![big; 16];
        assert_eq!(combination_count(&input), None);
        assert!(Combinations::new(&input).is_none());
        assert!(cartesian_product(&input).is_none());
    }

    #[test]
    fn empty_set_wins_over_overflow() {
        let big: Vec<String> = (0..256).map(|n| n.to_string()).collect();
        let mut input = vec![big; 16];
        input.push(Vec::new());
        assert_eq!(combination_count(&input), Some(0));
        assert_eq!(Combinations::new(&input).map(|iter| iter.len()), Some(0));
    }
}
