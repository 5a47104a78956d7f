//! Bitwise OR of nibbles through a static table.

use anyhow::Result;
use itertools::Itertools;
use placeholder_field::types::PrimeField64;

use crate::circuit::component::{Component, TableParams};
use crate::circuit::context::Context;
use crate::circuit::lookup_table::LookupTable;
use crate::circuit::variable::ColumnKind;

pub const BYTE_OR_TABLE: &str = "byte_or";
const NIBBLES: u64 = 16;

/// `(a, b, a | b)` for every pair of nibbles, one byte `16 a + b` per row.
pub fn byte_or_table<F: PrimeField64>() -> Result<LookupTable<F>> {
    let (a, (b, or)): (Vec<_>, (Vec<_>, Vec<_>)) = (0..NIBBLES)
        .cartesian_product(0..NIBBLES)
        .map(|(a, b)| {
            (
                F::from_canonical_u64(a),
                (F::from_canonical_u64(b), F::from_canonical_u64(a | b)),
            )
        })
        .unzip();
    LookupTable::new(BYTE_OR_TABLE, vec![a, b, or])
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ByteOrInfo {
    pub rows: usize,
}

/// `z = x | y` on every row, with `x` and `y` read from public input columns 0 and 1.
pub struct ByteOr;

impl<F: PrimeField64> Component<F> for ByteOr {
    type StaticInfo = ByteOrInfo;
    type RawInput = Vec<(u64, u64)>;
    type Input<V: Clone> = Vec<(V, V)>;
    type Output<V: Clone> = Vec<V>;

    fn minimal_requirements(info: &ByteOrInfo) -> TableParams {
        TableParams {
            witnesses: 3,
            public_inputs: 2,
            constants: 0,
            rows: info.rows,
        }
    }

    fn lookup_tables(_info: &ByteOrInfo) -> Result<Vec<LookupTable<F>>> {
        Ok(vec![byte_or_table()?])
    }

    fn form_input<C: Context<F>>(
        ctx: &mut C,
        raw: &Vec<(u64, u64)>,
        info: &ByteOrInfo,
    ) -> Result<Vec<(C::Value, C::Value)>> {
        (0..info.rows)
            .map(|row| {
                let (x, y) = raw.get(row).copied().unwrap_or_default();
                let mut x = ctx.witness(F::from_canonical_u64(x));
                let mut y = ctx.witness(F::from_canonical_u64(y));
                ctx.allocate(&mut x, 0, row, ColumnKind::PublicInput)?;
                ctx.allocate(&mut y, 1, row, ColumnKind::PublicInput)?;
                Ok((x, y))
            })
            .collect()
    }

    fn construct<C: Context<F>>(
        ctx: &mut C,
        input: Vec<(C::Value, C::Value)>,
        _info: &ByteOrInfo,
        make_links: bool,
    ) -> Result<Vec<C::Value>> {
        let mut outputs = Vec::with_capacity(input.len());
        for (row, (x_in, y_in)) in input.into_iter().enumerate() {
            let (x_val, y_val) = (ctx.value(&x_in), ctx.value(&y_in));
            let z_val = x_val.to_canonical_u64() | y_val.to_canonical_u64();
            let mut x = ctx.witness(x_val);
            let mut y = ctx.witness(y_val);
            let mut z = ctx.witness(F::from_canonical_u64(z_val));
            ctx.allocate(&mut x, 0, row, ColumnKind::Witness)?;
            ctx.allocate(&mut y, 1, row, ColumnKind::Witness)?;
            ctx.allocate(&mut z, 2, row, ColumnKind::Witness)?;
            if make_links {
                ctx.copy_constrain(&x, &x_in)?;
                ctx.copy_constrain(&y, &y_in)?;
            }
            ctx.lookup(vec![x, y, z.clone()], BYTE_OR_TABLE)?;
            outputs.push(z);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::Field;

    use super::*;
    use crate::circuit::builder::CircuitBuilder;
    use crate::error::ConstraintError;

    type F = GoldilocksField;

    #[test]
    fn table_covers_every_nibble_pair() -> Result<()> {
        let table = byte_or_table::<F>()?;
        assert_eq!(table.rows(), 256);
        let row = 16 * 0b1010 + 0b0110;
        assert_eq!(table.columns[2][row], F::from_canonical_u64(0b1110));
        Ok(())
    }

    #[test]
    fn wide_operands_miss_the_table() -> Result<()> {
        let builder = CircuitBuilder::<F, ByteOr>::new(ByteOrInfo { rows: 4 }, None)?;
        // 256 table rows do not fit into 2^8 rows next to the zero row.
        assert_eq!(builder.description().rows_amount, 512);

        let (table, outputs) = builder.assign(&vec![(1, 2), (15, 15)])?;
        builder.is_satisfied(&table)?;
        assert_eq!(outputs[0], F::from_canonical_u64(3));

        let (table, _) = builder.assign(&vec![(16, 1)])?;
        let err = builder.is_satisfied(&table).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConstraintError>(),
            Some(ConstraintError::LookupViolated { row: 1, .. })
        ));
        Ok(())
    }
}
