use core::fmt::{Debug, Display};
use core::hash::Hash;
use core::iter::{Product, Sum};
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use placeholder_util::bits_u64;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::ops::Square;

/// Uniform sampling of values, used for blinding and for test data.
pub trait Sample: Sized {
    fn sample<R: RngCore + ?Sized>(rng: &mut R) -> Self;

    fn rand() -> Self {
        Self::sample(&mut OsRng)
    }

    fn rand_vec(n: usize) -> Vec<Self> {
        (0..n).map(|_| Self::rand()).collect()
    }
}

/// A finite field with a large power-of-two multiplicative subgroup.
pub trait Field:
    'static
    + Copy
    + Eq
    + Hash
    + Neg<Output = Self>
    + Add<Self, Output = Self>
    + AddAssign<Self>
    + Sum
    + Sub<Self, Output = Self>
    + SubAssign<Self>
    + Mul<Self, Output = Self>
    + MulAssign<Self>
    + Square
    + Product
    + Div<Self, Output = Self>
    + DivAssign<Self>
    + Debug
    + Default
    + Display
    + Sample
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
{
    const ZERO: Self;
    const ONE: Self;
    const TWO: Self;
    const NEG_ONE: Self;

    /// `log2` of the largest power of two dividing `p - 1`.
    const TWO_ADICITY: usize;
    /// Generates the whole multiplicative group. Also the shift of every coset domain.
    const MULTIPLICATIVE_GROUP_GENERATOR: Self;
    /// Generates the subgroup of order `2^TWO_ADICITY`.
    const POWER_OF_TWO_GENERATOR: Self;

    fn from_canonical_u64(n: u64) -> Self;

    /// Reduces any `u64` modulo `p`.
    fn from_noncanonical_u64(n: u64) -> Self;

    /// Reduces any `u128` modulo `p`.
    fn from_noncanonical_u128(n: u128) -> Self;

    fn try_inverse(&self) -> Option<Self>;

    fn from_canonical_u32(n: u32) -> Self {
        Self::from_canonical_u64(n as u64)
    }

    fn from_canonical_u8(n: u8) -> Self {
        Self::from_canonical_u64(n as u64)
    }

    fn from_canonical_usize(n: usize) -> Self {
        Self::from_canonical_u64(n as u64)
    }

    fn from_bool(b: bool) -> Self {
        if b {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    #[inline]
    fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    #[inline]
    fn is_nonzero(&self) -> bool {
        *self != Self::ZERO
    }

    #[inline]
    fn is_one(&self) -> bool {
        *self == Self::ONE
    }

    #[inline]
    fn double(&self) -> Self {
        *self + *self
    }

    /// Panics on zero.
    fn inverse(&self) -> Self {
        match self.try_inverse() {
            Some(inverse) => inverse,
            None => panic!("zero has no inverse"),
        }
    }

    /// `2^-exp`.
    fn inverse_2exp(exp: usize) -> Self {
        Self::TWO.inverse().exp_u64(exp as u64)
    }

    /// Inverts every element with a single field inversion. Panics if any element is zero.
    fn batch_multiplicative_inverse(xs: &[Self]) -> Vec<Self> {
        // prefixes[i] = x_0 ... x_{i-1}
        let prefixes = xs
            .iter()
            .scan(Self::ONE, |acc, &x| {
                let prefix = *acc;
                *acc *= x;
                Some(prefix)
            })
            .collect::<Vec<_>>();
        let Some(&last) = xs.last() else {
            return Vec::new();
        };
        let mut suffix_inv = (prefixes[xs.len() - 1] * last).inverse();
        let mut inverses = vec![Self::ZERO; xs.len()];
        for (i, &x) in xs.iter().enumerate().rev() {
            inverses[i] = suffix_inv * prefixes[i];
            suffix_inv *= x;
        }
        inverses
    }

    /// Generator of the subgroup of order `2^n_log`.
    fn primitive_root_of_unity(n_log: usize) -> Self {
        assert!(
            n_log <= Self::TWO_ADICITY,
            "no subgroup of order 2^{n_log}"
        );
        Self::POWER_OF_TWO_GENERATOR.exp_power_of_2(Self::TWO_ADICITY - n_log)
    }

    /// The subgroup of order `2^n_log`, starting from one.
    fn two_adic_subgroup(n_log: usize) -> Vec<Self> {
        Self::primitive_root_of_unity(n_log)
            .powers()
            .take(1 << n_log)
            .collect()
    }

    /// `shift * generator^i` for `i < order`.
    fn cyclic_subgroup_coset_known_order(generator: Self, shift: Self, order: usize) -> Vec<Self> {
        generator.shifted_powers(shift).take(order).collect()
    }

    fn coset_shift() -> Self {
        Self::MULTIPLICATIVE_GROUP_GENERATOR
    }

    fn exp_power_of_2(&self, power_log: usize) -> Self {
        (0..power_log).fold(*self, |acc, _| acc.square())
    }

    fn exp_u64(&self, power: u64) -> Self {
        let mut square = *self;
        let mut product = Self::ONE;
        for bit in 0..bits_u64(power) {
            if (power >> bit) & 1 == 1 {
                product *= square;
            }
            square = square.square();
        }
        product
    }

    fn powers(&self) -> Powers<Self> {
        self.shifted_powers(Self::ONE)
    }

    /// `start, start * self, start * self^2, ...`
    fn shifted_powers(&self, start: Self) -> Powers<Self> {
        Powers {
            base: *self,
            current: start,
        }
    }
}

/// A prime field whose order fits into 64 bits.
pub trait PrimeField64: Field {
    const ORDER: u64;

    fn to_canonical_u64(&self) -> u64;
}

/// Infinite iterator over consecutive powers of `base`.
#[must_use = "iterators are lazy and do nothing unless consumed"]
#[derive(Clone, Debug)]
pub struct Powers<F: Field> {
    base: F,
    current: F,
}

impl<F: Field> Iterator for Powers<F> {
    type Item = F;

    fn next(&mut self) -> Option<F> {
        let power = self.current;
        self.current *= self.base;
        Some(power)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }

    fn nth(&mut self, n: usize) -> Option<F> {
        self.current *= self.base.exp_u64(n as u64);
        self.next()
    }
}

#[cfg(test)]
mod tests {
    use super::{Field, Sample};
    use crate::goldilocks_field::GoldilocksField;

    type F = GoldilocksField;

    #[test]
    fn test_powers_nth() {
        let powers = F::TWO.powers().take(10).collect::<Vec<_>>();
        for (n, &expected) in powers.iter().enumerate() {
            let mut iter = F::TWO.powers();
            assert_eq!(iter.nth(n), Some(expected));
            assert!(iter.zip(&powers[n + 1..]).all(|(a, &b)| a == b));
        }
    }

    #[test]
    fn test_coset_is_shifted_subgroup() {
        let shift = F::coset_shift();
        let coset = F::cyclic_subgroup_coset_known_order(F::primitive_root_of_unity(3), shift, 8);
        let subgroup = F::two_adic_subgroup(3);
        for (c, s) in coset.into_iter().zip(subgroup) {
            assert_eq!(c, s * shift);
        }
    }

    #[test]
    fn test_batch_inverse_of_one_element() {
        let x = F::rand();
        if x.is_nonzero() {
            assert_eq!(F::batch_multiplicative_inverse(&[x]), vec![x.inverse()]);
        }
    }
}
