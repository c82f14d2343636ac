//! Without-replacement mini-batch sampling.
//!
//! Every sample is visited exactly once per epoch. When the dataset width is not
//! a multiple of the chunk size, the last draw of an epoch is a short batch
//! holding the leftovers.

use ndarray::{Array2, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::data::embed_input;
use super::{HnnError, HnnResult};

/**
 * Draw `min(chunk, pool.len())` column indices uniformly without replacement.
 *
 * Returns the selected input columns zero-padded to `d` rows, the matching
 * target columns and the pool with the drawn indices removed.
 */
pub fn get_random_sample<R: Rng + ?Sized>(
    input: ArrayView2<'_, f64>,
    target: ArrayView2<'_, f64>,
    mut pool: Vec<usize>,
    chunk: usize,
    d: usize,
    rng: &mut R,
) -> HnnResult<(Array2<f64>, Array2<f64>, Vec<usize>)> {
    if chunk == 0 {
        return Err(HnnError::InvalidConfiguration(
            "Chunk size must be greater than 0".to_string(),
        ));
    }
    if input.ncols() != target.ncols() {
        return Err(HnnError::DimensionMismatch(format!(
            "Input has {} samples but target has {}",
            input.ncols(),
            target.ncols()
        )));
    }
    if let Some(&bad) = pool.iter().find(|&&i| i >= input.ncols()) {
        return Err(HnnError::DimensionMismatch(format!(
            "Pool index {} out of range for {} samples",
            bad,
            input.ncols()
        )));
    }

    let take = chunk.min(pool.len());
    let (chosen, _) = pool.partial_shuffle(rng, take);
    let drawn = chosen.to_vec();
    pool.retain(|i| !drawn.contains(i));

    let batch_input = embed_input(input.select(Axis(1), &drawn).view(), d)?;
    let batch_target = target.select(Axis(1), &drawn);

    Ok((batch_input, batch_target, pool))
}

/// One mini-batch together with where it came from.
#[derive(Debug, Clone)]
pub struct SampledBatch {
    /// Padded input columns, `d × width`
    pub input: Array2<f64>,
    /// Target columns, `output_dim × width`
    pub target: Array2<f64>,
    /// Dataset column indices in batch order
    pub indices: Vec<usize>,
    /// Zero-based epoch the batch belongs to
    pub epoch: usize,
}

impl SampledBatch {
    pub fn width(&self) -> usize {
        self.input.ncols()
    }
}

/// Seedable sampler that refills its pool with `0..total` whenever it runs dry.
#[derive(Debug, Clone)]
pub struct BatchSampler {
    total: usize,
    chunk: usize,
    pool: Vec<usize>,
    epoch: usize,
    draws_in_epoch: usize,
    rng: ChaCha8Rng,
}

impl BatchSampler {
    pub fn new(total: usize, chunk: usize, seed: Option<u64>) -> HnnResult<Self> {
        if total == 0 {
            return Err(HnnError::InvalidConfiguration(
                "Cannot sample from an empty dataset".to_string(),
            ));
        }
        if chunk == 0 {
            return Err(HnnError::InvalidConfiguration(
                "Chunk size must be greater than 0".to_string(),
            ));
        }

        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            total,
            chunk,
            pool: (0..total).collect(),
            epoch: 0,
            draws_in_epoch: 0,
            rng,
        })
    }

    /// Draw the next batch from `input`/`target` (both with `total` columns).
    pub fn next_batch(
        &mut self,
        input: ArrayView2<'_, f64>,
        target: ArrayView2<'_, f64>,
        d: usize,
    ) -> HnnResult<SampledBatch> {
        if input.ncols() != self.total || target.ncols() != self.total {
            return Err(HnnError::DimensionMismatch(format!(
                "Sampler expects {} samples, got input {} and target {}",
                self.total,
                input.ncols(),
                target.ncols()
            )));
        }

        if self.pool.is_empty() {
            self.pool = (0..self.total).collect();
            self.epoch += 1;
            self.draws_in_epoch = 0;
            log::debug!("Sampler starting epoch {}", self.epoch);
        }

        let take = self.chunk.min(self.pool.len());
        let (chosen, _) = self.pool.partial_shuffle(&mut self.rng, take);
        let indices = chosen.to_vec();
        self.pool.retain(|i| !indices.contains(i));
        self.draws_in_epoch += 1;

        Ok(SampledBatch {
            input: embed_input(input.select(Axis(1), &indices).view(), d)?,
            target: target.select(Axis(1), &indices),
            indices,
            epoch: self.epoch,
        })
    }

    /// Zero-based index of the epoch currently being drawn
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Number of epochs whose samples have all been drawn
    pub fn epochs_completed(&self) -> usize {
        if self.pool.is_empty() {
            self.epoch + 1
        } else {
            self.epoch
        }
    }

    /// ⌈total / chunk⌉
    pub fn draws_per_epoch(&self) -> usize {
        (self.total + self.chunk - 1) / self.chunk
    }

    pub fn draws_in_epoch(&self) -> usize {
        self.draws_in_epoch
    }

    pub fn remaining(&self) -> usize {
        self.pool.len()
    }
}

// === TESTS ===

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use std::collections::HashSet;

    fn dataset(total: usize) -> (Array2<f64>, Array2<f64>) {
        let input = Array2::from_shape_fn((2, total), |(r, c)| (c * 10 + r) as f64);
        let target = Array1::from_shape_fn(total, |c| c as f64).insert_axis(Axis(0));
        (input, target)
    }

    #[test]
    fn test_get_random_sample_shrinks_pool() {
        let (input, target) = dataset(10);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (x, c, pool) =
            get_random_sample(input.view(), target.view(), (0..10).collect(), 4, 3, &mut rng).unwrap();

        assert_eq!(x.dim(), (3, 4));
        assert_eq!(c.dim(), (1, 4));
        assert_eq!(pool.len(), 6);
        assert!(x.row(2).iter().all(|&v| v == 0.0));

        for col in 0..4 {
            let idx = c[[0, col]] as usize;
            assert!(!pool.contains(&idx));
            assert_eq!(x[[0, col]], (idx * 10) as f64);
            assert_eq!(x[[1, col]], (idx * 10 + 1) as f64);
        }
    }

    #[test]
    fn test_get_random_sample_short_pool() {
        let (input, target) = dataset(10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (x, _, pool) =
            get_random_sample(input.view(), target.view(), vec![3, 7], 4, 2, &mut rng).unwrap();
        assert_eq!(x.ncols(), 2);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_get_random_sample_rejects_bad_pool() {
        let (input, target) = dataset(5);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = get_random_sample(input.view(), target.view(), vec![9], 2, 2, &mut rng);
        assert!(matches!(result, Err(HnnError::DimensionMismatch(_))));
    }

    #[test]
    fn test_epoch_covers_every_sample_once() {
        let (input, target) = dataset(10);
        let mut sampler = BatchSampler::new(10, 3, Some(5)).unwrap();
        assert_eq!(sampler.draws_per_epoch(), 4);

        let mut seen = HashSet::new();
        let mut widths = Vec::new();
        for _ in 0..sampler.draws_per_epoch() {
            let batch = sampler.next_batch(input.view(), target.view(), 2).unwrap();
            assert_eq!(batch.epoch, 0);
            widths.push(batch.width());
            for idx in batch.indices {
                assert!(seen.insert(idx), "index {} drawn twice", idx);
            }
        }

        assert_eq!(seen.len(), 10);
        assert_eq!(widths, vec![3, 3, 3, 1]);
        assert_eq!(sampler.epochs_completed(), 1);

        let next = sampler.next_batch(input.view(), target.view(), 2).unwrap();
        assert_eq!(next.epoch, 1);
        assert_eq!(next.width(), 3);
        assert_eq!(sampler.remaining(), 7);
    }

    #[test]
    fn test_seeded_sampler_is_reproducible() {
        let (input, target) = dataset(20);
        let mut a = BatchSampler::new(20, 6, Some(11)).unwrap();
        let mut b = BatchSampler::new(20, 6, Some(11)).unwrap();
        for _ in 0..7 {
            let x = a.next_batch(input.view(), target.view(), 2).unwrap();
            let y = b.next_batch(input.view(), target.view(), 2).unwrap();
            assert_eq!(x.indices, y.indices);
        }
    }

    #[test]
    fn test_sampler_validates_inputs() {
        assert!(BatchSampler::new(0, 3, None).is_err());
        assert!(BatchSampler::new(3, 0, None).is_err());

        let (input, target) = dataset(4);
        let mut sampler = BatchSampler::new(5, 2, Some(0)).unwrap();
        assert!(matches!(
            sampler.next_batch(input.view(), target.view(), 2),
            Err(HnnError::DimensionMismatch(_))
        ));
    }
}
