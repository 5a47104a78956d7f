use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

use crate::types::{Field, PrimeField64, Sample};

/// `2^64 mod p`.
const EPSILON: u64 = (1 << 32) - 1;

/// The prime field of order `p = 2^64 - 2^32 + 1`.
///
/// The inner value is any `u64` congruent to the element; it may exceed `p` until it is
/// canonicalized. Equality, hashing and formatting all go through the canonical form.
#[derive(Copy, Clone, Serialize, Deserialize)]
#[repr(transparent)]
pub struct GoldilocksField(pub u64);

const_assert_eq!(core::mem::size_of::<GoldilocksField>(), 8);

impl GoldilocksField {
    /// `(a + b) mod p` for arbitrary representatives, without canonicalizing.
    #[inline]
    fn add_mod(a: u64, b: u64) -> u64 {
        let (sum, carry) = a.overflowing_add(b);
        let (sum, carry) = sum.overflowing_add(EPSILON * carry as u64);
        // A second carry needs both inputs above p, and then cannot carry again.
        sum.wrapping_add(EPSILON * carry as u64)
    }

    #[inline]
    fn sub_mod(a: u64, b: u64) -> u64 {
        let (diff, borrow) = a.overflowing_sub(b);
        let (diff, borrow) = diff.overflowing_sub(EPSILON * borrow as u64);
        diff.wrapping_sub(EPSILON * borrow as u64)
    }

    /// Folds a 128-bit value using `2^64 = EPSILON` and `2^96 = -1`.
    #[inline]
    fn reduce128(x: u128) -> Self {
        let low = x as u64;
        let high = (x >> 64) as u64;
        let (high_hi, high_lo) = (high >> 32, high & EPSILON);
        let folded = Self::sub_mod(low, high_hi);
        Self(Self::add_mod(folded, high_lo * EPSILON))
    }
}

impl Default for GoldilocksField {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for GoldilocksField {
    fn eq(&self, other: &Self) -> bool {
        self.to_canonical_u64() == other.to_canonical_u64()
    }
}

impl Eq for GoldilocksField {}

impl Hash for GoldilocksField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.to_canonical_u64())
    }
}

impl Display for GoldilocksField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_u64())
    }
}

impl Debug for GoldilocksField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_u64())
    }
}

impl Sample for GoldilocksField {
    fn sample<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(0..Self::ORDER))
    }
}

impl Field for GoldilocksField {
    const ZERO: Self = Self(0);
    const ONE: Self = Self(1);
    const TWO: Self = Self(2);
    const NEG_ONE: Self = Self(Self::ORDER - 1);

    const TWO_ADICITY: usize = 32;
    const MULTIPLICATIVE_GROUP_GENERATOR: Self = Self(7);
    /// `7^((p - 1) / 2^32)`.
    const POWER_OF_TWO_GENERATOR: Self = Self(1753635133440165772);

    #[inline]
    fn from_canonical_u64(n: u64) -> Self {
        debug_assert!(n < Self::ORDER);
        Self(n)
    }

    #[inline]
    fn from_noncanonical_u64(n: u64) -> Self {
        Self(n)
    }

    fn from_noncanonical_u128(n: u128) -> Self {
        Self::reduce128(n)
    }

    /// Fermat inversion.
    fn try_inverse(&self) -> Option<Self> {
        self.is_nonzero().then(|| self.exp_u64(Self::ORDER - 2))
    }

    fn inverse_2exp(exp: usize) -> Self {
        // For exp <= 32, 2^exp divides p - 1 and 2^-exp = p - (p - 1) / 2^exp.
        if exp <= Self::TWO_ADICITY {
            Self(Self::ORDER - ((Self::ORDER - 1) >> exp))
        } else {
            Self::TWO.exp_u64(exp as u64).inverse()
        }
    }
}

impl PrimeField64 for GoldilocksField {
    const ORDER: u64 = 0xFFFF_FFFF_0000_0001;

    #[inline]
    fn to_canonical_u64(&self) -> u64 {
        // Every u64 is below 2p.
        if self.0 >= Self::ORDER {
            self.0 - Self::ORDER
        } else {
            self.0
        }
    }
}

impl Neg for GoldilocksField {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(Self::sub_mod(0, self.to_canonical_u64()))
    }
}

impl Add for GoldilocksField {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(Self::add_mod(self.0, rhs.0))
    }
}

impl Sub for GoldilocksField {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(Self::sub_mod(self.0, rhs.0))
    }
}

impl Mul for GoldilocksField {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::reduce128(self.0 as u128 * rhs.0 as u128)
    }
}

impl Div for GoldilocksField {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, rhs: Self) -> Self {
        self * rhs.inverse()
    }
}

impl AddAssign for GoldilocksField {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for GoldilocksField {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for GoldilocksField {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl DivAssign for GoldilocksField {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Sum for GoldilocksField {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Product for GoldilocksField {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ONE, Mul::mul)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_field_arithmetic;

    test_field_arithmetic!(crate::goldilocks_field::GoldilocksField);

    type F = GoldilocksField;

    #[test]
    fn test_reduction_edge_cases() {
        let max = F::NEG_ONE;
        assert_eq!(max * max, F::ONE);
        assert_eq!(max + F::ONE, F::ZERO);
        assert_eq!(F::ZERO - F::ONE, max);
        assert_eq!(-F::ZERO, F::ZERO);
        assert_eq!(F::from_noncanonical_u64(u64::MAX), F::from_canonical_u64(EPSILON - 1));
        // 2^128 - 1 = EPSILON^2 - 1 = -2^32 - 1 (mod p).
        assert_eq!(
            F::from_noncanonical_u128(u128::MAX),
            -F::from_canonical_u64((1 << 32) + 1)
        );
    }

    #[test]
    fn test_non_canonical_operands() {
        // Both representatives of 5 below 2^64.
        let (a, b) = (GoldilocksField(5), GoldilocksField(F::ORDER + 5));
        assert_eq!(a, b);
        assert_eq!(b + b, F::from_canonical_u64(10));
        assert_eq!(b - a, F::ZERO);
        assert_eq!(b * b, F::from_canonical_u64(25));
        assert_eq!(-b, F::from_canonical_u64(F::ORDER - 5));
    }
}
