//! 256-bit addition and subtraction.
//!
//! A single line over 64 witness columns `[a_0..a_15, b_0..b_15, s_0..s_15, c_0..c_15]` holds
//! `a + b = s + c_15 2^256` chunk by chunk: `a_i + b_i + c_(i-1) - s_i - c_i 2^16 = 0`, with
//! boolean carries.

use anyhow::Result;
use num::BigUint;
use placeholder_field::types::PrimeField64;

use crate::circuit::component::{Component, TableParams};
use crate::circuit::context::Context;
use crate::circuit::variable::ColumnKind;
use crate::components::{
    public_word, publish, word_chunks, word_from_chunks, word_modulus, CHUNK_BITS, WORD_CHUNKS,
};

/// Witness columns of one addition line.
pub const ADDITION_COLUMNS: usize = 4 * WORD_CHUNKS;

/// Cells of one addition line.
#[derive(Clone, Debug)]
pub struct AdditionRow<V> {
    pub lhs: Vec<V>,
    pub rhs: Vec<V>,
    pub sum: Vec<V>,
    pub carries: Vec<V>,
}

/// Lays out `lhs + rhs` on `row` of `ctx`, starting at witness column zero.
pub fn addition_row<F: PrimeField64, C: Context<F>>(
    ctx: &mut C,
    lhs: &[F],
    rhs: &[F],
    row: usize,
) -> Result<AdditionRow<C::Value>> {
    let mut sum = Vec::with_capacity(WORD_CHUNKS);
    let mut carries = Vec::with_capacity(WORD_CHUNKS);
    let mut carry = 0;
    for (l, r) in lhs.iter().zip(rhs) {
        let total = l.to_canonical_u64() + r.to_canonical_u64() + carry;
        sum.push(F::from_canonical_u64(total & ((1 << CHUNK_BITS) - 1)));
        carry = total >> CHUNK_BITS;
        carries.push(F::from_canonical_u64(carry));
    }

    let mut place = |values: &[F], first_column: usize| -> Result<Vec<C::Value>> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let mut cell = ctx.witness(v);
                ctx.allocate(&mut cell, first_column + i, row, ColumnKind::Witness)?;
                Ok(cell)
            })
            .collect()
    };
    let line = AdditionRow {
        lhs: place(lhs, 0)?,
        rhs: place(rhs, WORD_CHUNKS)?,
        sum: place(&sum, 2 * WORD_CHUNKS)?,
        carries: place(&carries, 3 * WORD_CHUNKS)?,
    };

    let base = C::Value::from(F::from_canonical_u64(1 << CHUNK_BITS));
    for i in 0..WORD_CHUNKS {
        let carry_in = if i == 0 {
            C::Value::from(F::ZERO)
        } else {
            line.carries[i - 1].clone()
        };
        ctx.constrain(
            line.lhs[i].clone() + line.rhs[i].clone() + carry_in
                - line.sum[i].clone()
                - line.carries[i].clone() * base.clone(),
            "chunk sum",
        )?;
        let c = line.carries[i].clone();
        ctx.constrain(c.clone() * (c - C::Value::from(F::ONE)), "carry bit")?;
    }
    Ok(line)
}

/// Two 256-bit operands.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WordPair {
    pub a: BigUint,
    pub b: BigUint,
}

#[derive(Clone, Debug)]
pub struct WordPairInput<V> {
    pub a: Vec<V>,
    pub b: Vec<V>,
}

/// Places `a` and `b` into public input columns 0 and 1.
pub fn form_word_pair<F: PrimeField64, C: Context<F>>(
    ctx: &mut C,
    raw: &WordPair,
) -> Result<WordPairInput<C::Value>> {
    Ok(WordPairInput {
        a: public_word(ctx, &raw.a, 0)?,
        b: public_word(ctx, &raw.b, 1)?,
    })
}

pub fn word_pair_requirements(extra_witnesses: usize) -> TableParams {
    TableParams {
        witnesses: ADDITION_COLUMNS + extra_witnesses,
        public_inputs: 3,
        constants: 0,
        rows: WORD_CHUNKS,
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AddSubOp {
    Add,
    Sub,
}

pub struct AddSub;

#[derive(Clone, Debug)]
pub struct AddSubOutput<V> {
    /// `a + b` or `a - b` modulo `2^256`, also published in public input column 2.
    pub result: Vec<V>,
    /// Overflow of the addition, or borrow of the subtraction.
    pub carry: V,
}

impl<F: PrimeField64> Component<F> for AddSub {
    type StaticInfo = AddSubOp;
    type RawInput = WordPair;
    type Input<V: Clone> = WordPairInput<V>;
    type Output<V: Clone> = AddSubOutput<V>;

    fn minimal_requirements(_op: &AddSubOp) -> TableParams {
        word_pair_requirements(0)
    }

    fn form_input<C: Context<F>>(
        ctx: &mut C,
        raw: &WordPair,
        _op: &AddSubOp,
    ) -> Result<WordPairInput<C::Value>> {
        form_word_pair(ctx, raw)
    }

    fn construct<C: Context<F>>(
        ctx: &mut C,
        input: WordPairInput<C::Value>,
        op: &AddSubOp,
        make_links: bool,
    ) -> Result<AddSubOutput<C::Value>> {
        let a = input.a.iter().map(|v| ctx.value(v)).collect::<Vec<_>>();
        let b = input.b.iter().map(|v| ctx.value(v)).collect::<Vec<_>>();
        let (line, result) = match op {
            AddSubOp::Add => {
                let line = addition_row(ctx, &a, &b, 0)?;
                if make_links {
                    for i in 0..WORD_CHUNKS {
                        ctx.copy_constrain(&line.lhs[i], &input.a[i])?;
                        ctx.copy_constrain(&line.rhs[i], &input.b[i])?;
                    }
                }
                let result = line.sum.clone();
                (line, result)
            }
            // `b + (a - b) = a + borrow 2^256`.
            AddSubOp::Sub => {
                let difference = wrapping_sub(&a, &b);
                let line = addition_row(ctx, &b, &difference, 0)?;
                if make_links {
                    for i in 0..WORD_CHUNKS {
                        ctx.copy_constrain(&line.lhs[i], &input.b[i])?;
                        ctx.copy_constrain(&line.sum[i], &input.a[i])?;
                    }
                }
                let result = line.rhs.clone();
                (line, result)
            }
        };
        publish(ctx, &result, 2)?;
        Ok(AddSubOutput {
            result,
            carry: line.carries[WORD_CHUNKS - 1].clone(),
        })
    }
}

/// Chunks of `(a - b) mod 2^256`.
pub(crate) fn wrapping_sub<F: PrimeField64>(a: &[F], b: &[F]) -> Vec<F> {
    let a = word_from_chunks(a);
    let b = word_from_chunks(b);
    let difference = (a + word_modulus() - b) % word_modulus();
    word_chunks(&difference)
        .into_iter()
        .map(F::from_canonical_u64)
        .collect()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::Field;

    use super::*;
    use crate::circuit::builder::CircuitBuilder;

    type F = GoldilocksField;

    fn pair(a: u64, b: u64) -> WordPair {
        WordPair {
            a: BigUint::from(a),
            b: BigUint::from(b),
        }
    }

    #[test]
    fn carries_ripple_through_chunks() -> Result<()> {
        let builder = CircuitBuilder::<F, AddSub>::new(AddSubOp::Add, None)?;
        assert_eq!(builder.constraint_system().copy_constraints.len(), 3 * WORD_CHUNKS);
        let (table, output) = builder.assign(&pair(0xffff_ffff, 1))?;
        builder.is_satisfied(&table)?;
        assert_eq!(word_from_chunks(&output.result), BigUint::from(1u64 << 32));
        assert_eq!(output.carry, F::ZERO);
        Ok(())
    }

    #[test]
    fn subtraction_wraps_and_borrows() -> Result<()> {
        let builder = CircuitBuilder::<F, AddSub>::new(AddSubOp::Sub, None)?;
        let (table, output) = builder.assign(&pair(1, 2))?;
        builder.is_satisfied(&table)?;
        assert_eq!(word_from_chunks(&output.result), word_modulus() - 1u64);
        assert_eq!(output.carry, F::ONE);
        Ok(())
    }
}
