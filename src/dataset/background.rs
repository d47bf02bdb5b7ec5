//! Background sample for the attribution estimator

use crate::error::{CardioError, Result};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Reference rows the explainer compares an instance against.
///
/// Immutable once drawn; shared read-only by all attribution requests.
#[derive(Debug, Clone)]
pub struct BackgroundSample {
    rows: Array2<f64>,
}

impl BackgroundSample {
    pub fn new(rows: Array2<f64>) -> Result<Self> {
        if rows.nrows() == 0 || rows.ncols() == 0 {
            return Err(CardioError::DataError("background sample is empty".to_string()));
        }
        Ok(Self { rows })
    }

    /// Pick `min(size, candidates.len())` distinct rows of `features` among `candidates`
    pub(crate) fn draw(features: &Array2<f64>, candidates: &[usize], size: usize, seed: u64) -> Result<Self> {
        if candidates.is_empty() {
            return Err(CardioError::DataError(
                "population dataset has no complete rows to sample".to_string(),
            ));
        }

        let picked: Vec<usize> = if candidates.len() <= size {
            candidates.to_vec()
        } else {
            let mut rng = StdRng::seed_from_u64(seed);
            rand::seq::index::sample(&mut rng, candidates.len(), size)
                .into_iter()
                .map(|i| candidates[i])
                .collect()
        };

        Self::new(features.select(Axis(0), &picked))
    }

    pub fn rows(&self) -> &Array2<f64> {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    pub fn n_features(&self) -> usize {
        self.rows.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as f64)
    }

    #[test]
    fn test_draw_is_bounded_and_distinct() {
        let features = population(200);
        let candidates: Vec<usize> = (0..200).collect();
        let bg = BackgroundSample::draw(&features, &candidates, 50, 7).unwrap();
        assert_eq!(bg.len(), 50);
        assert_eq!(bg.n_features(), 3);

        let mut firsts: Vec<i64> = bg.rows().column(0).iter().map(|v| *v as i64).collect();
        firsts.sort_unstable();
        firsts.dedup();
        assert_eq!(firsts.len(), 50);
    }

    #[test]
    fn test_draw_same_seed_same_rows() {
        let features = population(100);
        let candidates: Vec<usize> = (0..100).collect();
        let a = BackgroundSample::draw(&features, &candidates, 10, 42).unwrap();
        let b = BackgroundSample::draw(&features, &candidates, 10, 42).unwrap();
        assert_eq!(a.rows(), b.rows());
    }

    #[test]
    fn test_small_population_uses_every_row() {
        let features = population(5);
        let bg = BackgroundSample::draw(&features, &[0, 2, 4], 50, 0).unwrap();
        assert_eq!(bg.len(), 3);
        assert_eq!(bg.rows()[[1, 0]], 6.0);
    }

    #[test]
    fn test_no_candidates() {
        let features = population(5);
        assert!(BackgroundSample::draw(&features, &[], 50, 0).is_err());
    }
}
