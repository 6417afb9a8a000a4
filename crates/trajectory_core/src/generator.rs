//! Correlated random return paths.
//!
//! Every path owns an independent random stream seeded from
//! `derive_path_seed(run_seed, path_index)`, so a path's draws depend only
//! on the run seed and its index. Paths can therefore be generated in any
//! order, on any number of threads, with bit-identical results.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng, distr::Distribution};
use rand_distr::StandardNormal;
#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::InvalidConfigError;
use crate::factorization::{CovarianceFactor, FactorMethod};
use crate::model::{PriceHistory, ReturnKind, ReturnModel};

/// Mix a run seed and a path index into the seed of that path's stream
/// (SplitMix64 finalizer).
#[must_use]
pub fn derive_path_seed(run_seed: u64, path: usize) -> u64 {
    let mut z = run_seed
        .wrapping_add((path as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A run seed drawn from OS entropy
#[must_use]
pub fn fresh_seed() -> u64 {
    rand::rng().random()
}

/// Returns for one path, laid out `[step][asset]`
#[derive(Debug, Clone, PartialEq)]
pub struct PathReturns {
    num_assets: usize,
    data: Vec<f64>,
}

impl PathReturns {
    /// Wrap `[step][asset]` returns; `data.len()` must be a multiple of
    /// `num_assets`
    #[must_use]
    pub fn new(num_assets: usize, data: Vec<f64>) -> Self {
        debug_assert!(num_assets > 0 && data.len() % num_assets == 0);
        Self { num_assets, data }
    }

    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.data.len() / self.num_assets
    }

    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.num_assets
    }

    /// Per-asset returns at a 0-based step index
    #[inline]
    #[must_use]
    pub fn step(&self, index: usize) -> &[f64] {
        &self.data[index * self.num_assets..(index + 1) * self.num_assets]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Source of per-path return blocks
pub trait ReturnSampler: Send + Sync {
    fn num_assets(&self) -> usize;

    /// How sampled returns translate into growth
    fn kind(&self) -> ReturnKind;

    /// Returns for one path; a pure function of `(run_seed, path, num_steps)`
    fn sample_path(&self, run_seed: u64, path: usize, num_steps: usize) -> PathReturns;
}

/// Multivariate normal sampler: `mean + L * z` with `L * L^T = Σ`
#[derive(Debug, Clone)]
pub struct PathGenerator {
    model: ReturnModel,
    factor: CovarianceFactor,
}

impl PathGenerator {
    /// Factor a model whose periods are already one simulation step long
    #[must_use]
    pub fn new(model: &ReturnModel) -> Self {
        Self::with_step_length(model, 1)
    }

    /// Factor a model after aggregating `step_length` periods into one step
    #[must_use]
    pub fn with_step_length(model: &ReturnModel, step_length: u32) -> Self {
        let model = if step_length == 1 {
            model.clone()
        } else {
            model.scaled(step_length)
        };
        let factor = CovarianceFactor::new(model.covariance());
        Self { model, factor }
    }

    #[must_use]
    pub fn factor_method(&self) -> FactorMethod {
        self.factor.method()
    }

    #[must_use]
    pub fn model(&self) -> &ReturnModel {
        &self.model
    }
}

impl ReturnSampler for PathGenerator {
    fn num_assets(&self) -> usize {
        self.model.num_assets()
    }

    fn kind(&self) -> ReturnKind {
        self.model.kind()
    }

    fn sample_path(&self, run_seed: u64, path: usize, num_steps: usize) -> PathReturns {
        let n = self.num_assets();
        let mut rng = SmallRng::seed_from_u64(derive_path_seed(run_seed, path));
        let mut z = vec![0.0; n];
        let mut data = vec![0.0; num_steps * n];

        for step in data.chunks_exact_mut(n) {
            for zi in z.iter_mut() {
                *zi = StandardNormal.sample(&mut rng);
            }
            self.factor.correlate(self.model.mean(), &z, step);
        }

        PathReturns { num_assets: n, data }
    }
}

/// Block bootstrap over whole historical periods.
///
/// Each draw copies every asset's return for the same period, preserving
/// cross-asset correlation; contiguous blocks also preserve
/// autocorrelation.
#[derive(Debug, Clone)]
pub struct BlockBootstrap {
    rows: Vec<Vec<f64>>,
    block_size: usize,
    circular: bool,
    step_length: usize,
    kind: ReturnKind,
}

impl BlockBootstrap {
    pub fn new(
        history: &PriceHistory,
        kind: ReturnKind,
        block_size: usize,
        circular: bool,
        step_length: u32,
    ) -> Result<Self, InvalidConfigError> {
        Self::from_rows(
            history.return_rows(kind),
            kind,
            block_size,
            circular,
            step_length,
        )
    }

    /// Build from returns laid out `rows[period][asset]`
    pub fn from_rows(
        rows: Vec<Vec<f64>>,
        kind: ReturnKind,
        block_size: usize,
        circular: bool,
        step_length: u32,
    ) -> Result<Self, InvalidConfigError> {
        let history_len = rows.len();
        if block_size == 0 || history_len == 0 || (!circular && block_size > history_len) {
            return Err(InvalidConfigError::InvalidBlockSize {
                block_size,
                history_len,
            });
        }
        if step_length == 0 {
            return Err(InvalidConfigError::ZeroStepLength);
        }
        Ok(Self {
            rows,
            block_size,
            circular,
            step_length: step_length as usize,
            kind,
        })
    }

    fn sample_periods<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<usize> {
        let len = self.rows.len();
        let max_start = if self.circular {
            len
        } else {
            len - self.block_size + 1
        };
        let mut periods = Vec::with_capacity(n);
        while periods.len() < n {
            let start = rng.random_range(0..max_start);
            for i in 0..self.block_size {
                if periods.len() >= n {
                    break;
                }
                periods.push((start + i) % len);
            }
        }
        periods
    }
}

impl ReturnSampler for BlockBootstrap {
    fn num_assets(&self) -> usize {
        self.rows[0].len()
    }

    fn kind(&self) -> ReturnKind {
        self.kind
    }

    fn sample_path(&self, run_seed: u64, path: usize, num_steps: usize) -> PathReturns {
        let n = self.num_assets();
        let mut rng = SmallRng::seed_from_u64(derive_path_seed(run_seed, path));
        let periods = self.sample_periods(&mut rng, num_steps * self.step_length);

        let mut data = Vec::with_capacity(num_steps * n);
        for step in periods.chunks_exact(self.step_length) {
            for asset in 0..n {
                data.push(
                    self.kind
                        .compound(step.iter().map(|&period| self.rows[period][asset])),
                );
            }
        }

        PathReturns { num_assets: n, data }
    }
}

/// The full `paths x steps x assets` ensemble of sampled returns
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTensor {
    num_paths: usize,
    num_steps: usize,
    num_assets: usize,
    data: Vec<f64>,
}

impl ReturnTensor {
    /// Sample every path up front
    #[must_use]
    pub fn generate<S: ReturnSampler + ?Sized>(
        sampler: &S,
        run_seed: u64,
        num_paths: usize,
        num_steps: usize,
    ) -> Self {
        #[cfg(feature = "parallel")]
        let blocks: Vec<PathReturns> = (0..num_paths)
            .into_par_iter()
            .map(|path| sampler.sample_path(run_seed, path, num_steps))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let blocks: Vec<PathReturns> = (0..num_paths)
            .map(|path| sampler.sample_path(run_seed, path, num_steps))
            .collect();

        let num_assets = sampler.num_assets();
        let mut data = Vec::with_capacity(num_paths * num_steps * num_assets);
        for block in blocks {
            data.extend_from_slice(block.as_slice());
        }

        Self {
            num_paths,
            num_steps,
            num_assets,
            data,
        }
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.num_paths, self.num_steps, self.num_assets)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, path: usize, step: usize, asset: usize) -> f64 {
        self.data[(path * self.num_steps + step) * self.num_assets + asset]
    }

    /// All returns of one path, laid out `[step][asset]`
    #[must_use]
    pub fn path(&self, path: usize) -> &[f64] {
        let len = self.num_steps * self.num_assets;
        &self.data[path * len..(path + 1) * len]
    }
}
