//! # Spectral projection
//!
//! Eigendecomposes a symmetric affinity matrix, orders the eigenpairs by descending
//! eigenvalue, keeps the leading `k` and maps them to output coordinates according
//! to the affinity's [`Projection`].
//!
//! Eigenvector signs are arbitrary in any eigensolver. Each kept eigenvector is
//! flipped so that its largest-magnitude entry is positive, which makes the output
//! reproducible across runs and solvers.

use crate::affinity::{Affinity, Projection};
use crate::error::{ReduceError, Result};
use log::{debug, warn};
use nalgebra::SymmetricEigen;
use nshare::{IntoNalgebra, IntoNdarray2};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};

pub const DEFAULT_COMPONENTS: usize = 2;

const ITERATIONS_PER_DIMENSION: usize = 100;

/// Eigenpairs of a symmetric matrix, sorted by descending eigenvalue.
///
/// Column `i` of `vectors` is the unit eigenvector of `values[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenSystem {
    values: Array1<f64>,
    vectors: Array2<f64>,
}

impl EigenSystem {
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn vectors(&self) -> &Array2<f64> {
        &self.vectors
    }

    /// Sum of absolute eigenvalues over the whole spectrum.
    pub fn total_magnitude(&self) -> f64 {
        self.values.iter().map(|v| v.abs()).sum()
    }

    /// Leading `k` eigenpairs with the sign convention applied.
    fn leading(&self, k: usize) -> (Array1<f64>, Array2<f64>) {
        let values = self.values.iter().take(k).copied().collect::<Array1<f64>>();
        let mut vectors = self.vectors.slice(s![.., ..k]).to_owned();
        for mut column in vectors.columns_mut() {
            let pivot = column
                .iter()
                .copied()
                .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
            if pivot < 0.0 {
                column.mapv_inplace(|v| -v);
            }
        }
        (values, vectors)
    }
}

/// Output of [`SpectralProjector::decompose_and_project`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralProjection {
    coordinates: Array2<f64>,
    eigenvalues: Array1<f64>,
    total_magnitude: f64,
}

impl SpectralProjection {
    /// `n × k` coordinates, column `i` belonging to the `i`-th largest eigenvalue.
    pub fn coordinates(&self) -> &Array2<f64> {
        &self.coordinates
    }

    pub fn into_coordinates(self) -> Array2<f64> {
        self.coordinates
    }

    /// The `k` kept eigenvalues, descending.
    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    /// Sum of absolute eigenvalues of the full spectrum.
    pub fn total_magnitude(&self) -> f64 {
        self.total_magnitude
    }

    /// Share of the spectrum carried by each kept component.
    ///
    /// For covariance affinities this is the explained variance ratio. Ratios use
    /// absolute eigenvalues so that non-Euclidean MDS spectra stay within `[0, 1]`.
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        if self.total_magnitude > 0.0 {
            self.eigenvalues.mapv(|v| v.abs() / self.total_magnitude)
        } else {
            Array1::zeros(self.eigenvalues.len())
        }
    }

    pub fn cumulative_explained_variance_ratio(&self) -> Array1<f64> {
        let ratios = self.explained_variance_ratio();
        let mut cumulative = Array1::zeros(ratios.len());
        let mut sum = 0.0;
        for (i, &ratio) in ratios.iter().enumerate() {
            sum += ratio;
            cumulative[i] = sum;
        }
        cumulative
    }
}

/// Symmetric eigendecomposition followed by projection onto the leading components.
#[derive(Debug, Clone)]
pub struct SpectralProjector {
    n_components: usize,
    max_iterations: Option<usize>,
}

impl Default for SpectralProjector {
    fn default() -> Self {
        Self::new(DEFAULT_COMPONENTS)
    }
}

impl SpectralProjector {
    pub fn new(n_components: usize) -> Self {
        SpectralProjector {
            n_components,
            max_iterations: None,
        }
    }

    /// Caps the number of implicit QR steps of the eigensolver.
    ///
    /// Defaults to a multiple of the matrix dimension. `0` removes the cap.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Fails with [`ReduceError::InvalidComponentCount`] unless `1 <= k <= dimension`.
    pub fn check_components(&self, dimension: usize) -> Result<()> {
        if self.n_components == 0 || self.n_components > dimension {
            return Err(ReduceError::InvalidComponentCount {
                requested: self.n_components,
                available: dimension,
            });
        }
        Ok(())
    }

    /// Eigendecomposes `matrix`, which the caller guarantees to be symmetric.
    pub fn decompose(&self, matrix: ArrayView2<f64>) -> Result<EigenSystem> {
        let dim = matrix.nrows();
        if dim != matrix.ncols() {
            return Err(ReduceError::decomposition(format!(
                "affinity matrix is {} × {}, expected a square matrix",
                dim,
                matrix.ncols()
            )));
        }
        if let Some(((row, column), value)) =
            matrix.indexed_iter().find(|(_, v)| !v.is_finite())
        {
            return Err(ReduceError::decomposition(format!(
                "non-finite entry {value} at ({row}, {column})"
            )));
        }

        let max_iterations = self
            .max_iterations
            .unwrap_or(ITERATIONS_PER_DIMENSION * dim.max(1));
        let eigen = SymmetricEigen::try_new(
            matrix.into_nalgebra().clone_owned(),
            f64::EPSILON,
            max_iterations,
        )
        .ok_or_else(|| {
            ReduceError::decomposition(format!(
                "no convergence within {max_iterations} iterations"
            ))
        })?;

        let raw_values = eigen.eigenvalues.iter().copied().collect::<Vec<f64>>();
        if raw_values.iter().any(|v| !v.is_finite()) {
            return Err(ReduceError::decomposition("solver produced non-finite eigenvalues"));
        }
        let raw_vectors = eigen.eigenvectors.into_ndarray2().into_owned();

        // Stable sort, so tied eigenvalues keep the solver's order.
        let mut order = (0..dim).collect::<Vec<_>>();
        order.sort_by(|&a, &b| raw_values[b].total_cmp(&raw_values[a]));

        let values = order.iter().map(|&i| raw_values[i]).collect::<Array1<f64>>();
        let vectors = raw_vectors.select(Axis(1), &order);

        debug!("Eigenvalues (descending): {}", values);

        Ok(EigenSystem { values, vectors })
    }

    /// Decomposes the affinity and maps the leading eigenvectors to coordinates.
    pub fn decompose_and_project(&self, affinity: Affinity) -> Result<SpectralProjection> {
        self.check_components(affinity.dim())?;

        let (matrix, projection) = affinity.into_parts();
        let system = self.decompose(matrix.view())?;
        let (eigenvalues, vectors) = system.leading(self.n_components);

        let coordinates = match projection {
            Projection::Project { centered } => centered.dot(&vectors),
            Projection::Embed => {
                if let Some(negative) = eigenvalues.iter().find(|&&v| v < 0.0) {
                    warn!(
                        "Kept eigenvalue {} is negative, embedding uses its absolute value",
                        negative
                    );
                }
                let mut embedded = vectors;
                for (mut column, &value) in embedded.columns_mut().into_iter().zip(eigenvalues.iter()) {
                    column *= value.abs().sqrt();
                }
                embedded
            }
        };

        Ok(SpectralProjection {
            coordinates,
            eigenvalues,
            total_magnitude: system.total_magnitude(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;

    #[test]
    fn test_decompose_sorts_descending() {
        let m = array![[1.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 3.0]];
        let system = SpectralProjector::default().decompose(m.view()).unwrap();

        assert_abs_diff_eq!(*system.values(), array![5.0, 3.0, 1.0], epsilon = 1e-12);
        assert_abs_diff_eq!(system.vectors()[[1, 0]].abs(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(system.vectors()[[2, 1]].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_decompose_reconstructs_matrix() {
        let m = array![[4.0, 1.0, 0.5], [1.0, 3.0, -1.0], [0.5, -1.0, 2.0]];
        let system = SpectralProjector::default().decompose(m.view()).unwrap();

        let v = system.vectors();
        let reconstructed = v.dot(&Array2::from_diag(system.values())).dot(&v.t());
        assert_abs_diff_eq!(reconstructed, m, epsilon = 1e-10);

        let identity = v.t().dot(v);
        assert_abs_diff_eq!(identity, Array2::<f64>::eye(3), epsilon = 1e-10);
    }

    #[test]
    fn test_decompose_rejects_non_finite_input() {
        let m = array![[1.0, f64::NAN], [f64::NAN, 1.0]];
        let err = SpectralProjector::default().decompose(m.view()).unwrap_err();

        assert!(matches!(err, ReduceError::NumericDecompositionFailure { .. }));
    }

    #[test]
    fn test_component_count_bounds() {
        let affinity = Affinity::new(Array2::<f64>::eye(2), Projection::Embed);

        for k in [0, 3] {
            let err = SpectralProjector::new(k)
                .decompose_and_project(affinity.clone())
                .unwrap_err();
            assert!(matches!(
                err,
                ReduceError::InvalidComponentCount { available: 2, .. }
            ));
        }
    }

    #[test]
    fn test_leading_vectors_have_positive_pivot() {
        let m = array![[2.0, -1.0], [-1.0, 2.0]];
        let system = SpectralProjector::default().decompose(m.view()).unwrap();
        let (_, vectors) = system.leading(2);

        for column in vectors.columns() {
            let pivot = column
                .iter()
                .copied()
                .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
            assert!(pivot > 0.0);
        }
    }

    #[test]
    fn test_embed_scales_by_root_of_absolute_eigenvalue() {
        let m = array![[4.0, 0.0], [0.0, -9.0]];
        let projection = SpectralProjector::new(2)
            .decompose_and_project(Affinity::new(m, Projection::Embed))
            .unwrap();

        assert_abs_diff_eq!(*projection.eigenvalues(), array![4.0, -9.0], epsilon = 1e-12);
        assert_abs_diff_eq!(
            *projection.coordinates(),
            array![[2.0, 0.0], [0.0, 3.0]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_project_uses_centered_data() {
        let centered = array![[-1.0, 0.0], [1.0, 0.0]];
        let m = array![[2.0, 0.0], [0.0, 0.0]];
        let projection = SpectralProjector::new(1)
            .decompose_and_project(Affinity::new(m, Projection::Project { centered }))
            .unwrap();

        assert_eq!(projection.coordinates().dim(), (2, 1));
        assert_abs_diff_eq!(*projection.coordinates(), array![[-1.0], [1.0]], epsilon = 1e-12);
    }

    #[test]
    fn test_explained_variance_ratio() {
        let m = array![[6.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 1.0]];
        let projection = SpectralProjector::new(2)
            .decompose_and_project(Affinity::new(m, Projection::Embed))
            .unwrap();

        assert_relative_eq!(projection.total_magnitude(), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            projection.explained_variance_ratio(),
            array![0.6, 0.3],
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            projection.cumulative_explained_variance_ratio(),
            array![0.6, 0.9],
            epsilon = 1e-12
        );
    }
}
