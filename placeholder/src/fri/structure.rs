//! Which polynomials are opened at which points.

use crate::hash::hash_types::RichField;

/// A committed batch of polynomials.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FriOracleInfo {
    pub num_polys: usize,
}

/// Position of a polynomial inside the committed batches.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FriPolynomialInfo {
    pub oracle_index: usize,
    pub polynomial_index: usize,
}

/// Polynomials opened at a common point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FriBatchInfo<F: RichField> {
    pub point: F,
    pub polynomials: Vec<FriPolynomialInfo>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FriInstanceInfo<F: RichField> {
    pub oracles: Vec<FriOracleInfo>,
    pub batches: Vec<FriBatchInfo<F>>,
}

/// Claimed values, one per polynomial of the matching [`FriBatchInfo`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FriOpeningBatch<F: RichField> {
    pub values: Vec<F>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FriOpenings<F: RichField> {
    pub batches: Vec<FriOpeningBatch<F>>,
}
