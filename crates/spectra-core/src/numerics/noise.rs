use crate::domain::SpectraError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianNoiseInput {
    pub snr: f64,
    pub seed: Option<u64>,
    pub n_bins: Option<usize>,
}

impl GaussianNoiseInput {
    pub fn new(snr: f64) -> Self {
        Self {
            snr,
            seed: None,
            n_bins: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = Some(n_bins);
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NoiseError {
    #[error("signal-to-noise ratio must be finite and > 0, got {value}")]
    InvalidSnr { value: f64 },
    #[error("noise draws {n_bins} samples but the target has {target} bins")]
    BinCountMismatch { n_bins: usize, target: usize },
}

impl From<NoiseError> for SpectraError {
    fn from(error: NoiseError) -> Self {
        SpectraError::configuration("CONFIG.NOISE", error.to_string())
    }
}

/// Draws `n_bins` samples of N(0, 1/snr) and adds them to `target` in place.
///
/// With a seed the draws come from `StdRng::seed_from_u64`, so identical
/// `(seed, n_bins)` pairs produce identical noise. Without a seed the generator
/// is seeded from OS entropy.
pub fn add_gaussian_noise(
    target: &mut [f64],
    input: GaussianNoiseInput,
) -> Result<(), NoiseError> {
    if !input.snr.is_finite() || input.snr <= 0.0 {
        return Err(NoiseError::InvalidSnr { value: input.snr });
    }

    let n_bins = input.n_bins.unwrap_or(target.len());
    if n_bins != target.len() {
        return Err(NoiseError::BinCountMismatch {
            n_bins,
            target: target.len(),
        });
    }

    let distribution =
        Normal::new(0.0, 1.0 / input.snr).map_err(|_| NoiseError::InvalidSnr { value: input.snr })?;
    let mut rng = match input.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for value in target.iter_mut() {
        *value += distribution.sample(&mut rng);
    }

    Ok(())
}
