pub(crate) mod division;

use std::cmp::max;
use std::ops::{Add, AddAssign, MulAssign};

use serde::{Deserialize, Serialize};

use crate::fft::{fft_with_options, ifft, FftRootTable};
use crate::types::Field;

/// A polynomial in point-value form.
///
/// The points are implicitly `g^i`, where `g` generates the subgroup whose size equals the number
/// of points.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PolynomialValues<F: Field> {
    pub values: Vec<F>,
}

impl<F: Field> PolynomialValues<F> {
    pub fn new(values: Vec<F>) -> Self {
        PolynomialValues { values }
    }

    pub fn zero(len: usize) -> Self {
        Self::new(vec![F::ZERO; len])
    }

    /// Returns the polynomial whole value is one at the given index, and zero elsewhere.
    pub fn selector(len: usize, index: usize) -> Self {
        let mut result = Self::zero(len);
        result.values[index] = F::ONE;
        result
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ifft(self) -> PolynomialCoeffs<F> {
        ifft(self)
    }

    /// The polynomial whose evaluations over `shift * H` are `self`.
    pub fn coset_ifft(self, shift: F) -> PolynomialCoeffs<F> {
        let mut shifted_coeffs = self.ifft();
        shifted_coeffs
            .coeffs
            .iter_mut()
            .zip(shift.inverse().powers())
            .for_each(|(c, r)| {
                *c *= r;
            });
        shifted_coeffs
    }
}

impl<F: Field> From<Vec<F>> for PolynomialValues<F> {
    fn from(values: Vec<F>) -> Self {
        Self::new(values)
    }
}

/// A polynomial in coefficient form, lowest degree first.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PolynomialCoeffs<F: Field> {
    pub coeffs: Vec<F>,
}

impl<F: Field> PolynomialCoeffs<F> {
    pub fn new(coeffs: Vec<F>) -> Self {
        PolynomialCoeffs { coeffs }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The number of stored coefficients, which may exceed the degree plus one.
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn chunks(&self, chunk_size: usize) -> Vec<Self> {
        self.coeffs
            .chunks(chunk_size)
            .map(|chunk| PolynomialCoeffs::new(chunk.to_vec()))
            .collect()
    }

    pub fn eval(&self, x: F) -> F {
        self.coeffs
            .iter()
            .rev()
            .fold(F::ZERO, |acc, &c| acc * x + c)
    }

    pub fn lde(&self, rate_bits: usize) -> Self {
        self.padded(self.len() << rate_bits)
    }

    /// Zero-extends to `new_len`. Shorter targets leave the polynomial unchanged.
    pub fn padded(&self, new_len: usize) -> Self {
        let mut poly = self.clone();
        if new_len > poly.len() {
            poly.coeffs.resize(new_len, F::ZERO);
        }
        poly
    }

    pub fn trim(&mut self) {
        self.coeffs.truncate(self.degree_plus_one());
    }

    /// Degree of the polynomial + 1, or 0 for a polynomial with no non-zero coefficients.
    pub fn degree_plus_one(&self) -> usize {
        (0usize..self.len())
            .rev()
            .find(|&i| self.coeffs[i].is_nonzero())
            .map_or(0, |i| i + 1)
    }

    /// Evaluations over the coset `shift * H`, `|H| = self.len()`.
    pub fn coset_fft(&self, shift: F) -> PolynomialValues<F> {
        self.coset_fft_with_options(shift, None)
    }

    pub fn coset_fft_with_options(
        &self,
        shift: F,
        root_table: Option<&FftRootTable<F>>,
    ) -> PolynomialValues<F> {
        let modified_poly: Self = shift
            .powers()
            .zip(&self.coeffs)
            .map(|(r, &c)| r * c)
            .collect::<Vec<_>>()
            .into();
        fft_with_options(modified_poly, root_table)
    }
}

impl<F: Field> PartialEq for PolynomialCoeffs<F> {
    fn eq(&self, other: &Self) -> bool {
        let max_terms = self.coeffs.len().max(other.coeffs.len());
        (0..max_terms).all(|i| {
            let self_i = self.coeffs.get(i).copied().unwrap_or(F::ZERO);
            let other_i = other.coeffs.get(i).copied().unwrap_or(F::ZERO);
            self_i == other_i
        })
    }
}

impl<F: Field> Eq for PolynomialCoeffs<F> {}

impl<F: Field> From<Vec<F>> for PolynomialCoeffs<F> {
    fn from(coeffs: Vec<F>) -> Self {
        Self::new(coeffs)
    }
}

impl<F: Field> Add for &PolynomialCoeffs<F> {
    type Output = PolynomialCoeffs<F>;

    fn add(self, rhs: Self) -> Self::Output {
        let len = max(self.len(), rhs.len());
        let a = self.padded(len).coeffs;
        let b = rhs.padded(len).coeffs;
        let coeffs = a.into_iter().zip(b).map(|(x, y)| x + y).collect();
        PolynomialCoeffs::new(coeffs)
    }
}

impl<F: Field> AddAssign<&Self> for PolynomialCoeffs<F> {
    fn add_assign(&mut self, rhs: &Self) {
        let len = max(self.len(), rhs.len());
        self.coeffs.resize(len, F::ZERO);
        for (l, &r) in self.coeffs.iter_mut().zip(&rhs.coeffs) {
            *l += r;
        }
    }
}

impl<F: Field> MulAssign<F> for PolynomialCoeffs<F> {
    fn mul_assign(&mut self, rhs: F) {
        self.coeffs.iter_mut().for_each(|x| *x *= rhs);
    }
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, Rng};

    use super::*;
    use crate::goldilocks_field::GoldilocksField;
    use crate::types::Sample;

    #[test]
    fn test_trim() {
        type F = GoldilocksField;

        let mut empty = PolynomialCoeffs::<F>::empty();
        empty.trim();
        assert!(empty.is_empty());
        let mut poly = PolynomialCoeffs::<F>::new(vec![F::ONE, F::TWO, F::ZERO, F::ZERO]);
        poly.trim();
        assert_eq!(poly.coeffs, vec![F::ONE, F::TWO]);
        assert_eq!(PolynomialCoeffs::new(vec![F::ZERO; 3]).degree_plus_one(), 0);
    }

    #[test]
    fn test_coset_fft_roundtrips_through_naive_evaluation() {
        type F = GoldilocksField;

        let k = 6;
        let n = 1 << k;
        let poly = PolynomialCoeffs::new(F::rand_vec(n));
        let shift = F::rand();
        let coset_evals = poly.coset_fft(shift).values;

        let generator = F::primitive_root_of_unity(k);
        let naive_coset_evals = F::cyclic_subgroup_coset_known_order(generator, shift, n)
            .into_iter()
            .map(|x| poly.eval(x))
            .collect::<Vec<_>>();
        assert_eq!(coset_evals, naive_coset_evals);

        let ifft_coeffs = PolynomialValues::new(coset_evals).coset_ifft(shift);
        assert_eq!(poly, ifft_coeffs);
    }

    #[test]
    fn test_low_degree_extension_onto_coset() {
        type F = GoldilocksField;

        let coeffs = PolynomialValues::new(F::rand_vec(16)).ifft();
        let lde = coeffs.lde(2).coset_fft(F::coset_shift());
        assert_eq!(lde.len(), 64);

        let points = F::cyclic_subgroup_coset_known_order(
            F::primitive_root_of_unity(6),
            F::coset_shift(),
            64,
        );
        for (x, y) in points.into_iter().zip(lde.values) {
            assert_eq!(coeffs.eval(x), y);
        }
    }

    #[test]
    fn test_sum_and_scaling() {
        type F = GoldilocksField;
        let mut rng = thread_rng();
        let (a_len, b_len) = (rng.gen_range(1..100), rng.gen_range(1..100));
        let a = PolynomialCoeffs::new(F::rand_vec(a_len));
        let b = PolynomialCoeffs::new(F::rand_vec(b_len));
        let sum = &a + &b;
        let mut accumulated = a.clone();
        accumulated += &b;
        assert_eq!(sum, accumulated);

        let c = F::rand();
        let mut scaled = sum.clone();
        scaled *= c;
        for _ in 0..20 {
            let x = F::rand();
            assert_eq!(scaled.eval(x), c * (a.eval(x) + b.eval(x)));
        }
    }

    #[test]
    fn eq_ignores_trailing_zeros() {
        type F = GoldilocksField;
        assert_eq!(
            PolynomialCoeffs::<F>::new(vec![]),
            PolynomialCoeffs::new(vec![F::ZERO])
        );
        assert_eq!(
            PolynomialCoeffs::<F>::new(vec![F::ONE]),
            PolynomialCoeffs::new(vec![F::ONE, F::ZERO])
        );
        assert_ne!(
            PolynomialCoeffs::<F>::new(vec![F::ZERO]),
            PolynomialCoeffs::new(vec![F::ZERO, F::ONE])
        );
    }
}
