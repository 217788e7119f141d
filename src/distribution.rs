//! Normal-distribution fit over density samples
//!
//! Maximum-likelihood estimates for a normal distribution: `mu` is the sample
//! mean and `sigma` is the **population** standard deviation (divide by n).
//! This is the estimator the ensemble and per-run configuration summaries
//! report, and it intentionally differs from the n − 1 deviation that
//! `block_stats` reports across the blocks of a single configuration.

use crate::block_stats::mean_and_population_std_dev;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Fitted normal distribution parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalFit {
    pub mu: f64,
    pub sigma: f64,
    /// Number of observations the fit was made from
    pub samples: usize,
}

impl NormalFit {
    /// Fit a normal distribution to `values`
    ///
    /// # Example
    /// ```
    /// use pufstat::distribution::NormalFit;
    ///
    /// let fit = NormalFit::fit(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    /// assert!((fit.mu - 5.0).abs() < 1e-6);
    /// assert!((fit.sigma - 2.0).abs() < 1e-6);
    /// ```
    ///
    /// # Errors
    /// `DegenerateSample` on empty input.
    pub fn fit(values: &[f64]) -> Result<Self> {
        let (mu, sigma) = mean_and_population_std_dev(values)?;
        Ok(Self {
            mu,
            sigma,
            samples: values.len(),
        })
    }
}
