use placeholder_util::log2_ceil;

use crate::fft::ifft;
use crate::polynomial::{PolynomialCoeffs, PolynomialValues};
use crate::types::Field;

/// The unique interpolant of degree `< points.len()`, computed by evaluating the barycentric form
/// over a power-of-two subgroup and inverting the FFT.
pub fn interpolant<F: Field>(points: &[(F, F)]) -> PolynomialCoeffs<F> {
    let n = points.len();
    let n_log = log2_ceil(n);

    let subgroup = F::two_adic_subgroup(n_log);
    let barycentric_weights = barycentric_weights(points);
    let subgroup_evals = subgroup
        .into_iter()
        .map(|x| interpolate(points, x, &barycentric_weights))
        .collect();

    let mut coeffs = ifft(PolynomialValues::new(subgroup_evals));
    coeffs.trim();
    coeffs
}

/// Evaluates the interpolant of `points` at `x`.
pub fn interpolate<F: Field>(points: &[(F, F)], x: F, barycentric_weights: &[F]) -> F {
    if let Some(&(_, y)) = points.iter().find(|&&(x_i, _)| x_i == x) {
        return y;
    }

    let l_x: F = points.iter().map(|&(x_i, _)| x - x_i).product();
    let denominators = F::batch_multiplicative_inverse(
        &points.iter().map(|&(x_i, _)| x - x_i).collect::<Vec<_>>(),
    );

    let sum: F = points
        .iter()
        .zip(barycentric_weights)
        .zip(denominators)
        .map(|((&(_, y_i), &w_i), d_i)| w_i * d_i * y_i)
        .sum();

    l_x * sum
}

pub fn barycentric_weights<F: Field>(points: &[(F, F)]) -> Vec<F> {
    let n = points.len();
    F::batch_multiplicative_inverse(
        &(0..n)
            .map(|i| {
                (0..n)
                    .filter(|&j| j != i)
                    .map(|j| points[i].0 - points[j].0)
                    .product::<F>()
            })
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goldilocks_field::GoldilocksField;
    use crate::types::Sample;

    fn eval_naive<F: Field>(coeffs: &PolynomialCoeffs<F>, domain: &[F]) -> Vec<(F, F)> {
        domain.iter().map(|&x| (x, coeffs.eval(x))).collect()
    }

    #[test]
    fn interpolant_random() {
        type F = GoldilocksField;

        for deg in 0..10 {
            let domain = F::rand_vec(deg);
            let coeffs = PolynomialCoeffs::new(F::rand_vec(deg));
            let points = eval_naive(&coeffs, &domain);
            assert_eq!(interpolant(&points), coeffs);
        }
    }

    #[test]
    fn interpolant_random_overspecified() {
        type F = GoldilocksField;

        for deg in 0..6 {
            let domain = F::rand_vec(deg + 5);
            let coeffs = PolynomialCoeffs::new(F::rand_vec(deg));
            let points = eval_naive(&coeffs, &domain);
            assert_eq!(interpolant(&points), coeffs);
        }
    }

    #[test]
    fn interpolate_matches_interpolant() {
        type F = GoldilocksField;
        let points = (0..4).map(|_| (F::rand(), F::rand())).collect::<Vec<_>>();
        let x = F::rand();
        let weights = barycentric_weights(&points);
        assert_eq!(interpolant(&points).eval(x), interpolate(&points, x, &weights));
        assert_eq!(interpolate(&points, points[2].0, &weights), points[2].1);
    }
}
