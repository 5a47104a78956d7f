//! Where committed polynomials live, and how arguments read their values.

use std::collections::{BTreeMap, BTreeSet};

use static_assertions::const_assert;

use crate::fri::structure::{
    FriBatchInfo, FriInstanceInfo, FriOpeningBatch, FriOpenings, FriOracleInfo, FriPolynomialInfo,
};
use crate::hash::hash_types::RichField;

/// Permutation identities and sigmas, `q_last`, `q_blind`, constant and selector columns.
pub const FIXED_VALUES_BATCH: usize = 0;
/// Witness columns followed by public input columns.
pub const VARIABLE_VALUES_BATCH: usize = 1;
/// Permutation accumulators followed by the lookup sum `U` and its helpers.
pub const PERMUTATION_BATCH: usize = 2;
pub const QUOTIENT_BATCH: usize = 3;
/// Lookup multiplicities.
pub const LOOKUP_BATCH: usize = 4;

/// Number of argument parts weighted into the quotient: three permutation parts, four lookup
/// parts and the gate part.
pub const NUM_F_PARTS: usize = 8;
const_assert!(NUM_F_PARTS == 3 + 4 + 1);

/// Values of committed polynomials at some point `x` and its rotations `x * w^r`.
pub trait BatchValues<F> {
    fn get(&self, batch: usize, poly: usize, rotation: i32) -> F;
}

/// `x * w^rotation` with `w` the generator of the trace domain.
pub fn rotated_point<F: RichField>(x: F, rotation: i32, degree_bits: usize) -> F {
    let n = 1i64 << degree_bits;
    x * F::primitive_root_of_unity(degree_bits).exp_u64((rotation as i64).rem_euclid(n) as u64)
}

/// Rotations at which every committed polynomial is opened, per batch.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OpeningLayout {
    /// Batch id to the sorted rotations of each of its polynomials.
    pub batches: BTreeMap<usize, Vec<Vec<i32>>>,
}

impl OpeningLayout {
    pub fn insert(&mut self, batch: usize, rotations: Vec<BTreeSet<i32>>) {
        self.batches.insert(
            batch,
            rotations
                .into_iter()
                .map(|r| r.into_iter().collect())
                .collect(),
        );
    }

    pub fn contains(&self, batch: usize) -> bool {
        self.batches.contains_key(&batch)
    }

    pub fn num_polys(&self, batch: usize) -> usize {
        self.batches.get(&batch).map_or(0, Vec::len)
    }

    pub fn rotations(&self, batch: usize, poly: usize) -> &[i32] {
        &self.batches[&batch][poly]
    }

    /// Every rotation used by some polynomial, ascending.
    fn all_rotations(&self) -> BTreeSet<i32> {
        self.batches.values().flatten().flatten().copied().collect()
    }

    /// The committed batches in id order, which is also the order of their Merkle caps.
    pub fn fri_oracles(&self) -> Vec<FriOracleInfo> {
        self.batches
            .values()
            .map(|polys| FriOracleInfo {
                num_polys: polys.len(),
            })
            .collect()
    }

    /// One FRI batch per rotation, each opening the polynomials read at `y * w^rotation`.
    pub fn fri_instance<F: RichField>(&self, y: F, degree_bits: usize) -> FriInstanceInfo<F> {
        let batches = self
            .all_rotations()
            .into_iter()
            .map(|rotation| FriBatchInfo {
                point: rotated_point(y, rotation, degree_bits),
                polynomials: self
                    .batches
                    .values()
                    .enumerate()
                    .flat_map(|(oracle_index, polys)| {
                        polys
                            .iter()
                            .enumerate()
                            .filter(move |(_, rotations)| rotations.contains(&rotation))
                            .map(move |(polynomial_index, _)| FriPolynomialInfo {
                                oracle_index,
                                polynomial_index,
                            })
                    })
                    .collect(),
            })
            .collect();
        FriInstanceInfo {
            oracles: self.fri_oracles(),
            batches,
        }
    }

    /// Rearranges opened values, stored per polynomial, into the per-point batches of
    /// [`OpeningLayout::fri_instance`].
    pub fn fri_openings<F: RichField>(&self, values: &BTreeMap<usize, Vec<Vec<F>>>) -> FriOpenings<F> {
        let batches = self
            .all_rotations()
            .into_iter()
            .map(|rotation| FriOpeningBatch {
                values: self
                    .batches
                    .iter()
                    .flat_map(|(batch, polys)| {
                        polys.iter().enumerate().filter_map(move |(poly, rotations)| {
                            let position = rotations.iter().position(|&r| r == rotation)?;
                            Some(values[batch][poly][position])
                        })
                    })
                    .collect(),
            })
            .collect();
        FriOpenings { batches }
    }
}

/// Values of every committed polynomial over a coset of size `size = n * step`, read at one
/// point of that coset.
#[derive(Copy, Clone, Debug)]
pub struct ExtendedPoint<'a, F> {
    pub values: &'a BTreeMap<usize, Vec<Vec<F>>>,
    pub index: usize,
    /// Distance between a point and its rotation by `w`.
    pub step: usize,
}

impl<F: Copy> BatchValues<F> for ExtendedPoint<'_, F> {
    fn get(&self, batch: usize, poly: usize, rotation: i32) -> F {
        let column = &self.values[&batch][poly];
        let len = column.len() as i64;
        let at = (self.index as i64 + rotation as i64 * self.step as i64).rem_euclid(len);
        column[at as usize]
    }
}

#[cfg(test)]
mod tests {
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::{Field, Sample};

    use super::*;

    type F = GoldilocksField;

    fn layout() -> OpeningLayout {
        let mut layout = OpeningLayout::default();
        layout.insert(
            VARIABLE_VALUES_BATCH,
            vec![BTreeSet::from([-1, 0]), BTreeSet::from([0])],
        );
        layout.insert(FIXED_VALUES_BATCH, vec![BTreeSet::from([0, 1])]);
        layout
    }

    #[test]
    fn instance_groups_by_rotation() {
        let layout = layout();
        let y = F::rand();
        let instance = layout.fri_instance(y, 3);
        assert_eq!(instance.oracles.len(), 2);
        assert_eq!(instance.batches.len(), 3);
        let w = F::primitive_root_of_unity(3);
        assert_eq!(instance.batches[0].point * w, y);
        assert_eq!(instance.batches[2].point, y * w);
        // Rotation zero opens all three polynomials, fixed batch first.
        let zero = &instance.batches[1].polynomials;
        assert_eq!(zero.len(), 3);
        assert_eq!(zero[0].oracle_index, 0);
        assert_eq!(zero[2].polynomial_index, 1);

        let values = BTreeMap::from([
            (FIXED_VALUES_BATCH, vec![vec![F::ONE, F::TWO]]),
            (
                VARIABLE_VALUES_BATCH,
                vec![vec![F::NEG_ONE, F::ZERO], vec![F::from_canonical_u64(5)]],
            ),
        ]);
        let openings = layout.fri_openings(&values);
        assert_eq!(openings.batches[0].values, vec![F::NEG_ONE]);
        assert_eq!(
            openings.batches[1].values,
            vec![F::ONE, F::ZERO, F::from_canonical_u64(5)]
        );
        assert_eq!(openings.batches[2].values, vec![F::TWO]);
    }

    #[test]
    fn extended_point_wraps() {
        let values = BTreeMap::from([(0, vec![(0..16).map(F::from_canonical_u64).collect()])]);
        let point = ExtendedPoint {
            values: &values,
            index: 1,
            step: 4,
        };
        assert_eq!(point.get(0, 0, 0), F::ONE);
        assert_eq!(point.get(0, 0, 1), F::from_canonical_u64(5));
        assert_eq!(point.get(0, 0, -1), F::from_canonical_u64(13));
    }
}
