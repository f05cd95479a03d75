//! Seeded row sampling for scatter views.

use crate::config::InsightsConfig;
use crate::error::{InsightsError, Result};
use polars::prelude::*;
use rand::prelude::*;
use tracing::debug;

/// Frames up to this many rows are plotted whole.
pub const SCATTER_MIN_ROWS: usize = 200;

/// Keeps a fixed fraction of rows once a frame is large enough to need it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterSampler {
    fraction: f64,
    seed: u64,
    min_rows: usize,
}

impl ScatterSampler {
    pub fn new(fraction: f64, seed: u64, min_rows: usize) -> Result<Self> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(InsightsError::InvalidConfig(format!(
                "sample fraction {fraction} must be in (0, 1]"
            )));
        }
        Ok(Self {
            fraction,
            seed,
            min_rows,
        })
    }

    pub fn from_config(config: &InsightsConfig) -> Result<Self> {
        Self::new(config.sample_fraction, config.sample_seed, SCATTER_MIN_ROWS)
    }

    /// Sampled copy of `df`, original row order kept.
    ///
    /// Frames at or below `min_rows` rows come back whole. The same seed
    /// always picks the same rows.
    pub fn sample(&self, df: &DataFrame) -> Result<DataFrame> {
        let height = df.height();
        if height <= self.min_rows {
            return Ok(df.clone());
        }

        let amount = ((height as f64 * self.fraction).round() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let rows: Vec<usize> = (0..height).collect();
        let mut picked: Vec<IdxSize> = rows
            .choose_multiple(&mut rng, amount)
            .map(|&i| i as IdxSize)
            .collect();
        picked.sort_unstable();
        debug!("Sampled {} of {} rows", picked.len(), height);

        let idx = IdxCa::from_vec("idx".into(), picked);
        Ok(df.take(&idx)?)
    }
}
