use std::borrow::Borrow;

use placeholder_field::polynomial::PolynomialCoeffs;
use placeholder_field::types::Field;

/// Horner evaluation of `sum alpha^i * x_i` that remembers how many times it multiplied by
/// `alpha`, so that consecutive sums can be chained with [`ReducingFactor::shift`].
#[derive(Debug, Clone)]
pub struct ReducingFactor<F: Field> {
    base: F,
    count: u64,
}

impl<F: Field> ReducingFactor<F> {
    pub fn new(base: F) -> Self {
        Self { base, count: 0 }
    }

    fn mul(&mut self, x: F) -> F {
        self.count += 1;
        self.base * x
    }

    fn mul_poly(&mut self, p: &mut PolynomialCoeffs<F>) {
        self.count += 1;
        *p *= self.base;
    }

    pub fn reduce(&mut self, iter: impl DoubleEndedIterator<Item = impl Borrow<F>>) -> F {
        iter.rev()
            .fold(F::ZERO, |acc, x| self.mul(acc) + *x.borrow())
    }

    pub fn reduce_polys(
        &mut self,
        polys: impl DoubleEndedIterator<Item = impl Borrow<PolynomialCoeffs<F>>>,
    ) -> PolynomialCoeffs<F> {
        polys.rev().fold(PolynomialCoeffs::empty(), |mut acc, x| {
            self.mul_poly(&mut acc);
            acc += x.borrow();
            acc
        })
    }

    /// Multiplies `x` by `base^count` and restarts the count.
    pub fn shift(&mut self, x: F) -> F {
        let shifted = self.base.exp_u64(self.count) * x;
        self.count = 0;
        shifted
    }

    pub fn shift_poly(&mut self, p: &mut PolynomialCoeffs<F>) {
        *p *= self.base.exp_u64(self.count);
        self.count = 0;
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// `sum alpha^i * terms[i]`.
pub fn reduce_with_powers<'a, F: Field, T: IntoIterator<Item = &'a F>>(terms: T, alpha: F) -> F
where
    T::IntoIter: DoubleEndedIterator,
{
    terms
        .into_iter()
        .rev()
        .fold(F::ZERO, |acc, &term| acc * alpha + term)
}

#[cfg(test)]
mod tests {
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::Sample;

    use super::*;

    type F = GoldilocksField;

    #[test]
    fn reduce_matches_powers() {
        let alpha = F::rand();
        let terms = F::rand_vec(7);
        let expected: F = alpha.powers().zip(&terms).map(|(a, &t)| a * t).sum();
        assert_eq!(reduce_with_powers(&terms, alpha), expected);
        assert_eq!(ReducingFactor::new(alpha).reduce(terms.iter()), expected);
    }

    #[test]
    fn shift_chains_two_sums() {
        let alpha = F::rand();
        let (xs, ys) = (F::rand_vec(3), F::rand_vec(4));
        let mut factor = ReducingFactor::new(alpha);
        let first = factor.reduce(xs.iter());
        factor.reset();
        let second = factor.reduce(ys.iter());
        let chained = factor.shift(first) + second;
        let all: Vec<F> = ys.iter().chain(&xs).copied().collect();
        assert_eq!(chained, reduce_with_powers(&all, alpha));
    }

    #[test]
    fn reduce_polys_matches_pointwise() {
        let alpha = F::rand();
        let polys = (0..3)
            .map(|_| PolynomialCoeffs::new(F::rand_vec(5)))
            .collect::<Vec<_>>();
        let combined = ReducingFactor::new(alpha).reduce_polys(polys.iter());
        let x = F::rand();
        let evals = polys.iter().map(|p| p.eval(x)).collect::<Vec<_>>();
        assert_eq!(combined.eval(x), reduce_with_powers(&evals, alpha));
    }
}
