//! # Affinity matrices
//!
//! Each reduction method starts by turning the data into a symmetric matrix whose
//! eigenstructure drives the reduction, together with a [`Projection`] telling the
//! spectral step how to map eigenvectors back to coordinates.
//!
//! ## Methods
//! - **PCA**: unbiased sample covariance of the centered data (`d × d`)
//! - **Normalized PCA**: sum of per-row outer products scaled by the squared row norm (`d × d`)
//! - **Exponential MDS**: doubly-centered, power-transformed pairwise distances (`n × n`)

mod covariance;
mod distance;

use crate::error::{ReduceError, Result};
use crate::input::DataMatrix;
use log::debug;
use ndarray::{Array2, ArrayView2};
use std::fmt;

/// How eigenvectors of an affinity matrix become output coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Project the centered data onto the eigenvectors (PCA family).
    Project { centered: Array2<f64> },
    /// Scale eigenvectors by `sqrt(|λ|)` (MDS, where the affinity is `n × n`).
    Embed,
}

/// A symmetric matrix ready for eigendecomposition plus its projection rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Affinity {
    matrix: Array2<f64>,
    projection: Projection,
}

impl Affinity {
    pub fn new(matrix: Array2<f64>, projection: Projection) -> Self {
        Affinity { matrix, projection }
    }

    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn into_parts(self) -> (Array2<f64>, Projection) {
        (self.matrix, self.projection)
    }
}

/// Builds the affinity matrix for one reduction strategy.
pub trait AffinityBuilder {
    fn build(&self, data: &DataMatrix) -> Result<Affinity>;
}

/// Plain covariance, the classic PCA affinity.
pub struct Covariance;

impl AffinityBuilder for Covariance {
    fn build(&self, data: &DataMatrix) -> Result<Affinity> {
        let centered = covariance::center(data.view())?;
        let matrix = covariance::covariance(&centered);
        Ok(Affinity::new(matrix, Projection::Project { centered }))
    }
}

/// Covariance where every centered row is normalized to unit squared norm.
pub struct NormalizedCovariance;

impl AffinityBuilder for NormalizedCovariance {
    fn build(&self, data: &DataMatrix) -> Result<Affinity> {
        let centered = covariance::center(data.view())?;
        let matrix = covariance::normalized_covariance(data.view(), &centered)?;
        Ok(Affinity::new(matrix, Projection::Project { centered }))
    }
}

/// Doubly-centered pairwise distances raised to `alpha`.
///
/// Squared distances are raised to `alpha / 2` and then squared again by the
/// double-centering step, so `alpha = 1` is classical MDS on Euclidean distances.
/// For other exponents the result is generally not positive semi-definite.
pub struct ExponentialDistance {
    alpha: f64,
}

impl ExponentialDistance {
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(ReduceError::InvalidExponent { alpha });
        }
        Ok(ExponentialDistance { alpha })
    }
}

impl AffinityBuilder for ExponentialDistance {
    fn build(&self, data: &DataMatrix) -> Result<Affinity> {
        let dissimilarity = distance::exponential_dissimilarity(data.view(), self.alpha);
        let matrix = distance::double_center(&dissimilarity)?;
        Ok(Affinity::new(matrix, Projection::Embed))
    }
}

pub const DEFAULT_ALPHA: f64 = 1.0;

/// The closed set of supported reduction methods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReductionMethod {
    Pca,
    NormalizedPca,
    ExponentialMds { alpha: f64 },
}

impl Default for ReductionMethod {
    fn default() -> Self {
        Self::Pca
    }
}

impl ReductionMethod {
    /// Side length of the affinity matrix this method builds for an `n_rows × n_cols` input.
    pub fn affinity_dimension(&self, n_rows: usize, n_cols: usize) -> usize {
        match self {
            ReductionMethod::Pca | ReductionMethod::NormalizedPca => n_cols,
            ReductionMethod::ExponentialMds { .. } => n_rows,
        }
    }

    /// Checks method parameters without touching any data.
    pub fn validate(&self) -> Result<()> {
        if let ReductionMethod::ExponentialMds { alpha } = *self {
            ExponentialDistance::new(alpha)?;
        }
        Ok(())
    }

    pub fn build_affinity(&self, data: &DataMatrix) -> Result<Affinity> {
        debug!(
            "Building {} affinity for {} × {} data",
            self,
            data.nrows(),
            data.ncols()
        );
        match *self {
            ReductionMethod::Pca => Covariance.build(data),
            ReductionMethod::NormalizedPca => NormalizedCovariance.build(data),
            ReductionMethod::ExponentialMds { alpha } => ExponentialDistance::new(alpha)?.build(data),
        }
    }
}

impl fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReductionMethod::Pca => write!(f, "PCA"),
            ReductionMethod::NormalizedPca => write!(f, "normalized PCA"),
            ReductionMethod::ExponentialMds { alpha } => {
                write!(f, "exponential MDS (alpha = {alpha})")
            }
        }
    }
}
