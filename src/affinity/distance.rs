use crate::error::{ReduceError, Result};
use ndarray::{Array2, ArrayView2, Axis, Zip};

/// Full `n × n` matrix of squared Euclidean distances raised to `alpha / 2`.
///
/// Each entry is computed independently, so the result is exactly symmetric
/// with a zero diagonal.
pub(crate) fn exponential_dissimilarity(x: ArrayView2<f64>, alpha: f64) -> Array2<f64> {
    let n_samples = x.nrows();
    let exponent = alpha / 2.0;
    let mut dissimilarity = Array2::zeros((n_samples, n_samples));

    Zip::from(dissimilarity.rows_mut())
        .and(x.rows())
        .par_for_each(|mut out, a| {
            for (j, b) in x.rows().into_iter().enumerate() {
                let squared = a
                    .iter()
                    .zip(b.iter())
                    .map(|(&p, &q)| (p - q) * (p - q))
                    .sum::<f64>();
                out[j] = squared.powf(exponent);
            }
        });

    dissimilarity
}

/// `-½ · H · (D ∘ D) · H` with `H = I - J / n`.
///
/// Uses the row-mean form of the centering product; `D` is symmetric so the
/// row means double as column means.
pub(crate) fn double_center(dissimilarity: &Array2<f64>) -> Result<Array2<f64>> {
    let squared = dissimilarity.mapv(|d| d * d);
    let means = squared
        .mean_axis(Axis(1))
        .ok_or_else(|| ReduceError::unreadable("cannot double-center an empty matrix"))?;
    let grand_mean = means
        .mean()
        .ok_or_else(|| ReduceError::unreadable("cannot double-center an empty matrix"))?;

    Ok(Array2::from_shape_fn(squared.dim(), |(i, j)| {
        -0.5 * (squared[[i, j]] - (means[i] + means[j]) + grand_mean)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_dissimilarity_alpha_one_is_euclidean_distance() {
        let x = array![[0.0, 0.0], [3.0, 4.0], [0.0, 1.0]];
        let d = exponential_dissimilarity(x.view(), 1.0);

        assert_abs_diff_eq!(
            d,
            array![
                [0.0, 5.0, 1.0],
                [5.0, 0.0, 18.0_f64.sqrt()],
                [1.0, 18.0_f64.sqrt(), 0.0]
            ],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_dissimilarity_alpha_two_is_squared_distance() {
        let x = array![[0.0, 0.0], [3.0, 4.0]];
        let d = exponential_dissimilarity(x.view(), 2.0);

        assert_abs_diff_eq!(d, array![[0.0, 25.0], [25.0, 0.0]], epsilon = 1e-12);
    }

    #[test]
    fn test_double_center_recovers_gram_matrix() {
        // Centered points on a line: -1, 0, 1. Gram matrix is x xᵀ.
        let x = array![[-1.0, 0.0], [0.0, 0.0], [1.0, 0.0]];
        let d = exponential_dissimilarity(x.view(), 1.0);
        let b = double_center(&d).unwrap();

        assert_abs_diff_eq!(
            b,
            array![[1.0, 0.0, -1.0], [0.0, 0.0, 0.0], [-1.0, 0.0, 1.0]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_double_center_rows_sum_to_zero() {
        let x = array![[0.3, 1.0], [2.0, -1.0], [4.0, 4.0], [-2.0, 0.5]];
        let b = double_center(&exponential_dissimilarity(x.view(), 0.7)).unwrap();

        for row in b.rows() {
            assert_abs_diff_eq!(row.sum(), 0.0, epsilon = 1e-10);
        }
        assert_eq!(b, b.t());
    }
}
