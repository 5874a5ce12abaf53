use crate::error::{ReduceError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use rayon::prelude::*;

const CENTERING_ULPS: f64 = 4.0;

/// Subtracts the column means from every row.
pub(crate) fn center(x: ArrayView2<f64>) -> Result<Array2<f64>> {
    let mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| ReduceError::unreadable("cannot center a table without rows"))?;

    let mut centered = x.to_owned();
    centered
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| {
            row -= &mean;
        });

    Ok(centered)
}

/// Unbiased sample covariance (divides by `n - 1`) of already centered data,
/// columns as variables.
pub(crate) fn covariance(centered: &Array2<f64>) -> Array2<f64> {
    let n_samples = centered.nrows();
    let mut cov = centered.t().dot(centered);
    cov /= (n_samples - 1) as f64;
    symmetrize(cov)
}

/// `Σ_i x_i x_iᵀ / ‖x_i‖²` over the centered rows.
///
/// Every row contributes a rank-1 term of unit trace, so rows far from the mean
/// carry the same weight as rows close to it. A row indistinguishable from the
/// column means has no direction and is rejected with [`ReduceError::DegenerateRow`].
///
/// `data` is the uncentered input; its column magnitudes bound the rounding error
/// left behind by [`center`].
pub(crate) fn normalized_covariance(
    data: ArrayView2<f64>,
    centered: &Array2<f64>,
) -> Result<Array2<f64>> {
    let n_samples = centered.nrows();
    let tolerance = data.fold_axis(Axis(0), 0.0_f64, |&max, &v| max.max(v.abs()))
        * (CENTERING_ULPS * n_samples as f64 * f64::EPSILON);

    if let Some(row) = centered.rows().into_iter().position(|row| {
        row.iter()
            .zip(tolerance.iter())
            .all(|(&v, &tol)| v.abs() <= tol)
    }) {
        return Err(ReduceError::DegenerateRow { row });
    }

    // Rows are scaled by their max-abs entry first so the squared norm cannot overflow.
    let row_scales: Array1<f64> = centered
        .rows()
        .into_iter()
        .map(|row| row.fold(0.0_f64, |max, &v| max.max(v.abs())))
        .collect();
    if let Some(row) = row_scales.iter().position(|scale| !scale.is_finite()) {
        return Err(ReduceError::decomposition(format!(
            "centered row {row} is not finite"
        )));
    }

    let mut scaled = centered.clone();
    Zip::from(scaled.rows_mut())
        .and(&row_scales)
        .par_for_each(|mut row, &scale| {
            row /= scale;
        });

    let mut weighted = scaled.clone();
    weighted
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| {
            let norm_sq = row.dot(&row);
            row /= norm_sq;
        });

    Ok(symmetrize(scaled.t().dot(&weighted)))
}

// Matrix products only give symmetry up to rounding; the eigensolver wants it exact.
pub(crate) fn symmetrize(m: Array2<f64>) -> Array2<f64> {
    (&m + &m.t()) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_center_zeroes_column_means() {
        let x = array![[1.0, 10.0], [3.0, 20.0], [5.0, 60.0]];
        let centered = center(x.view()).unwrap();

        assert_abs_diff_eq!(centered, array![[-2.0, -20.0], [0.0, -10.0], [2.0, 30.0]]);
    }

    #[test]
    fn test_covariance_matches_unbiased_estimator() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 9.0]];
        let centered = center(x.view()).unwrap();
        let cov = covariance(&centered);

        // var(col0) = 4, var(col1) = 13, cov = 7
        assert_abs_diff_eq!(cov, array![[4.0, 7.0], [7.0, 13.0]], epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_covariance_has_unit_trace_per_row() {
        let x = array![[0.0, 0.0], [10.0, 0.0], [0.0, 1.0], [2.0, 3.0]];
        let centered = center(x.view()).unwrap();
        let c = normalized_covariance(x.view(), &centered).unwrap();

        assert_abs_diff_eq!(c.diag().sum(), 4.0, epsilon = 1e-12);
        assert_eq!(c[[0, 1]], c[[1, 0]]);
    }

    #[test]
    fn test_normalized_covariance_ignores_row_magnitude() {
        let small = array![[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0], [0.0, -1.0]];
        let large = array![[100.0, 0.0], [-100.0, 0.0], [0.0, 1.0], [0.0, -1.0]];

        let c_small = normalized_covariance(small.view(), &center(small.view()).unwrap()).unwrap();
        let c_large = normalized_covariance(large.view(), &center(large.view()).unwrap()).unwrap();

        assert_abs_diff_eq!(c_small, c_large, epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_covariance_rejects_row_at_mean() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let centered = center(x.view()).unwrap();

        assert!(matches!(
            normalized_covariance(x.view(), &centered),
            Err(ReduceError::DegenerateRow { row: 1 })
        ));
    }

    #[test]
    fn test_normalized_covariance_rejects_row_at_mean_after_rounding() {
        let x = array![[0.1, 0.2], [0.2, 0.4], [0.3, 0.6]];
        let centered = center(x.view()).unwrap();

        assert!(matches!(
            normalized_covariance(x.view(), &centered),
            Err(ReduceError::DegenerateRow { row: 1 })
        ));
    }

    #[test]
    fn test_normalized_covariance_keeps_small_offsets_from_large_means() {
        let x = array![[1e6, 0.0], [1e6 + 1e-3, 1.0], [1e6 + 2e-3, 0.5]];
        let centered = center(x.view()).unwrap();
        let c = normalized_covariance(x.view(), &centered).unwrap();

        assert_abs_diff_eq!(c.diag().sum(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalized_covariance_survives_huge_rows() {
        let unit = array![[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0], [0.0, -1.0]];
        let huge = array![[1e200, 0.0], [-1e200, 0.0], [0.0, 1.0], [0.0, -1.0]];

        let c_unit = normalized_covariance(unit.view(), &center(unit.view()).unwrap()).unwrap();
        let c_huge = normalized_covariance(huge.view(), &center(huge.view()).unwrap()).unwrap();

        assert_abs_diff_eq!(c_huge, array![[2.0, 0.0], [0.0, 2.0]], epsilon = 1e-12);
        assert_abs_diff_eq!(c_huge, c_unit, epsilon = 1e-12);
    }
}
