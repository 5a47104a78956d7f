//! Sponge parameters shared by the transcript.

use crate::hash::hash_types::RichField;

pub const SPONGE_RATE: usize = 8;
pub const SPONGE_CAPACITY: usize = 4;
pub const SPONGE_WIDTH: usize = SPONGE_RATE + SPONGE_CAPACITY;

/// Permutation of the sponge state used by the [`Challenger`](crate::iop::challenger::Challenger).
pub trait PlonkyPermutation<F: RichField> {
    fn permute(input: [F; SPONGE_WIDTH]) -> [F; SPONGE_WIDTH];
}
