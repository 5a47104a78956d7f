//! `x < y` on 256-bit words, unsigned or two's complement.
//!
//! Row 0 holds the addition `y + (x - y) = x + lt 2^256`, whose final carry `lt` is set exactly
//! when `x < y`. For the signed comparison row 1 decomposes the top chunks of `x` and `y` into
//! bits to expose their signs. The result sits on row 1, column 32, and is published in public
//! input column 2.

use anyhow::Result;
use placeholder_field::types::PrimeField64;

use crate::circuit::component::{Component, TableParams};
use crate::circuit::context::Context;
use crate::circuit::variable::ColumnKind;
use crate::components::add_sub::{
    addition_row, form_word_pair, word_pair_requirements, wrapping_sub, WordPair, WordPairInput,
};
use crate::components::{publish, CHUNK_BITS, WORD_CHUNKS};

const RESULT_COLUMN: usize = 2 * CHUNK_BITS;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LessThanInfo {
    pub signed: bool,
}

pub struct LessThan;

/// Allocates the bits of `chunk` on `row` from `first_column` on and ties them to it.
fn decompose_chunk<F: PrimeField64, C: Context<F>>(
    ctx: &mut C,
    chunk: &C::Value,
    first_column: usize,
    row: usize,
) -> Result<Vec<C::Value>> {
    let value = ctx.value(chunk).to_canonical_u64();
    let mut bits = Vec::with_capacity(CHUNK_BITS);
    let mut recomposed = C::Value::from(F::ZERO);
    for j in 0..CHUNK_BITS {
        let mut bit = ctx.witness(F::from_bool((value >> j) & 1 == 1));
        ctx.allocate(&mut bit, first_column + j, row, ColumnKind::Witness)?;
        ctx.constrain(
            bit.clone() * (bit.clone() - C::Value::from(F::ONE)),
            "sign bit",
        )?;
        recomposed = recomposed + bit.clone() * C::Value::from(F::from_canonical_u64(1 << j));
        bits.push(bit);
    }
    ctx.constrain(recomposed - chunk.clone(), "chunk bits")?;
    Ok(bits)
}

impl<F: PrimeField64> Component<F> for LessThan {
    type StaticInfo = LessThanInfo;
    type RawInput = WordPair;
    type Input<V: Clone> = WordPairInput<V>;
    type Output<V: Clone> = V;

    fn minimal_requirements(_info: &LessThanInfo) -> TableParams {
        word_pair_requirements(0)
    }

    fn form_input<C: Context<F>>(
        ctx: &mut C,
        raw: &WordPair,
        _info: &LessThanInfo,
    ) -> Result<WordPairInput<C::Value>> {
        form_word_pair(ctx, raw)
    }

    fn construct<C: Context<F>>(
        ctx: &mut C,
        input: WordPairInput<C::Value>,
        info: &LessThanInfo,
        make_links: bool,
    ) -> Result<C::Value> {
        let x = input.a.iter().map(|v| ctx.value(v)).collect::<Vec<_>>();
        let y = input.b.iter().map(|v| ctx.value(v)).collect::<Vec<_>>();
        let line = addition_row(ctx, &y, &wrapping_sub(&x, &y), 0)?;
        if make_links {
            for i in 0..WORD_CHUNKS {
                ctx.copy_constrain(&line.lhs[i], &input.b[i])?;
                ctx.copy_constrain(&line.sum[i], &input.a[i])?;
            }
        }
        let lt = line.carries[WORD_CHUNKS - 1].clone();
        let one = C::Value::from(F::ONE);

        let expected = if info.signed {
            let x_bits = decompose_chunk(ctx, &line.sum[WORD_CHUNKS - 1], 0, 1)?;
            let y_bits = decompose_chunk(ctx, &line.lhs[WORD_CHUNKS - 1], CHUNK_BITS, 1)?;
            let (sx, sy) = (x_bits[CHUNK_BITS - 1].clone(), y_bits[CHUNK_BITS - 1].clone());
            // Negative beats non-negative; equal signs fall back to the unsigned order.
            lt.clone()
                + sx.clone() * (one.clone() - sy.clone()) * (one.clone() - lt.clone())
                - sy * (one - sx) * lt
        } else {
            lt
        };

        let mut result = ctx.witness(ctx.value(&expected));
        ctx.allocate(&mut result, RESULT_COLUMN, 1, ColumnKind::Witness)?;
        ctx.constrain(result.clone() - expected, "comparison result")?;
        publish(ctx, &[result.clone()], 2)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use num::BigUint;
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::Field;

    use super::*;
    use crate::circuit::builder::CircuitBuilder;
    use crate::components::word_modulus;

    type F = GoldilocksField;

    fn compare(signed: bool, x: BigUint, y: BigUint) -> Result<F> {
        let builder = CircuitBuilder::<F, LessThan>::new(LessThanInfo { signed }, None)?;
        let (table, result) = builder.assign(&WordPair { a: x, b: y })?;
        builder.is_satisfied(&table)?;
        Ok(result)
    }

    #[test]
    fn unsigned_order() -> Result<()> {
        assert_eq!(compare(false, 3u64.into(), 5u64.into())?, F::ONE);
        assert_eq!(compare(false, 5u64.into(), 3u64.into())?, F::ZERO);
        assert_eq!(compare(false, 5u64.into(), 5u64.into())?, F::ZERO);
        assert_eq!(compare(false, word_modulus() - 1u64, 1u64.into())?, F::ZERO);
        Ok(())
    }

    #[test]
    fn signed_order() -> Result<()> {
        let minus_one = word_modulus() - 1u64;
        let minus_two = word_modulus() - 2u64;
        assert_eq!(compare(true, minus_one.clone(), 1u64.into())?, F::ONE);
        assert_eq!(compare(true, 1u64.into(), minus_one.clone())?, F::ZERO);
        assert_eq!(compare(true, minus_two, minus_one)?, F::ONE);
        assert_eq!(compare(true, 3u64.into(), 5u64.into())?, F::ONE);
        Ok(())
    }
}
