//! Components shared by the end-to-end scenarios: 256-bit word arithmetic over 16-bit chunks,
//! and circuits driven by static and dynamic lookup tables.

use anyhow::Result;
use num::{BigUint, One, Zero};
use placeholder_field::types::PrimeField64;

use crate::circuit::context::Context;
use crate::circuit::variable::ColumnKind;

pub mod add_sub;
pub mod byte_or;
pub mod copy_table;
pub mod less_than;
pub mod state_revert;

/// Chunks of a 256-bit word.
pub const WORD_CHUNKS: usize = 16;
pub const CHUNK_BITS: usize = 16;
const CHUNK_MASK: u64 = (1 << CHUNK_BITS) - 1;

/// `2^256`.
pub fn word_modulus() -> BigUint {
    BigUint::one() << (WORD_CHUNKS * CHUNK_BITS)
}

/// Little-endian 16-bit chunks of `value mod 2^256`.
pub fn word_chunks(value: &BigUint) -> [u64; WORD_CHUNKS] {
    let digits = value.to_u64_digits();
    core::array::from_fn(|i| {
        let digit = digits.get(i / 4).copied().unwrap_or(0);
        (digit >> (CHUNK_BITS * (i % 4))) & CHUNK_MASK
    })
}

pub fn word_from_chunks<F: PrimeField64>(chunks: &[F]) -> BigUint {
    chunks.iter().rev().fold(BigUint::zero(), |acc, chunk| {
        (acc << CHUNK_BITS) + chunk.to_canonical_u64()
    })
}

/// Writes the chunks of `value` into rows `0..16` of public input column `column`.
pub fn public_word<F: PrimeField64, C: Context<F>>(
    ctx: &mut C,
    value: &BigUint,
    column: usize,
) -> Result<Vec<C::Value>> {
    word_chunks(value)
        .into_iter()
        .enumerate()
        .map(|(row, chunk)| {
            let mut cell = ctx.witness(F::from_canonical_u64(chunk));
            ctx.allocate(&mut cell, column, row, ColumnKind::PublicInput)?;
            Ok(cell)
        })
        .collect()
}

/// Publishes `values` into public input column `column` and links them to their cells.
pub fn publish<F: PrimeField64, C: Context<F>>(
    ctx: &mut C,
    values: &[C::Value],
    column: usize,
) -> Result<Vec<C::Value>> {
    values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            let mut cell = ctx.witness(ctx.value(value));
            ctx.allocate(&mut cell, column, row, ColumnKind::PublicInput)?;
            ctx.copy_constrain(&cell, value)?;
            Ok(cell)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::Field;

    use super::*;

    type F = GoldilocksField;

    #[test]
    fn chunks_are_little_endian_and_wrap() {
        let value = (BigUint::from(0xabcdu64) << 32) + 7u64;
        let chunks = word_chunks(&value);
        assert_eq!(&chunks[..3], &[7, 0, 0xabcd]);
        assert!(chunks[3..].iter().all(|&c| c == 0));

        let minus_one = word_modulus() - 1u64;
        assert!(word_chunks(&minus_one).iter().all(|&c| c == CHUNK_MASK));
        assert_eq!(word_chunks(&word_modulus()), [0; WORD_CHUNKS]);

        let elements = word_chunks(&minus_one).map(F::from_canonical_u64);
        assert_eq!(word_from_chunks(&elements), minus_one);
    }
}
