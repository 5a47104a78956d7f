//! The gate argument: `F_gate = sum_g sel_g * sum_k theta^k C_k`, where the powers of `theta` run
//! over all constraints of all gates.

use crate::circuit::expression::Expression;
use crate::circuit::variable::ColumnKind;
use crate::hash::hash_types::RichField;
use crate::plonk::preprocessor::CommonData;
use crate::plonk::vars::BatchValues;

/// Value of a relative expression at the point `vars` is read at.
pub fn evaluate_expression<F: RichField, V: BatchValues<F>>(
    common: &CommonData<F>,
    expression: &Expression<F>,
    vars: &V,
) -> F {
    expression.evaluate(&|v| {
        let (batch, poly) = common.variable_position(v);
        vars.get(batch, poly, v.rotation)
    })
}

pub fn eval_gate_constraints<F: RichField, V: BatchValues<F>>(
    common: &CommonData<F>,
    vars: &V,
    theta: F,
) -> F {
    let mut theta_power = F::ONE;
    let mut sum = F::ZERO;
    for gate in &common.constraint_system.gates {
        let mut gate_sum = F::ZERO;
        for constraint in &gate.constraints {
            gate_sum += theta_power * evaluate_expression(common, constraint, vars);
            theta_power *= theta;
        }
        let (batch, poly) = common.column_position((ColumnKind::Selector, gate.selector));
        sum += vars.get(batch, poly, 0) * gate_sum;
    }
    sum
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anyhow::Result;
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::{Field, Sample};

    use super::*;
    use crate::circuit::assignment::TableDescription;
    use crate::circuit::constraint_system::{ConstraintSystem, Gate};
    use crate::circuit::variable::Variable;
    use crate::plonk::config::PlaceholderConfig;
    use crate::plonk::vars::{ExtendedPoint, FIXED_VALUES_BATCH, VARIABLE_VALUES_BATCH};

    type F = GoldilocksField;

    /// Fibonacci: `w0(r+1) = w1(r)` and `w1(r+1) = w0(r) + w1(r)` wherever selector 0 is set.
    fn fibonacci() -> Result<CommonData<F>> {
        let w = |i, r| Expression::<F>::from(Variable::witness(i, r));
        let cs = ConstraintSystem {
            gates: vec![Gate {
                selector: 0,
                constraints: vec![w(0, 1) - w(1, 0), w(1, 1) - w(0, 0) - w(1, 0)],
            }],
            ..Default::default()
        };
        let description = TableDescription {
            witness_columns: 2,
            public_input_columns: 0,
            constant_columns: 0,
            selector_columns: 1,
            usable_rows_amount: 7,
            rows_amount: 8,
        };
        CommonData::new(cs, description, PlaceholderConfig::standard_test_config())
    }

    fn values(a: Vec<u64>, b: Vec<u64>) -> BTreeMap<usize, Vec<Vec<F>>> {
        let column = |v: Vec<u64>| v.into_iter().map(F::from_canonical_u64).collect::<Vec<_>>();
        let selector = vec![1, 1, 1, 1, 1, 0, 0, 0];
        BTreeMap::from([
            (
                FIXED_VALUES_BATCH,
                vec![vec![F::ZERO; 8], vec![F::ZERO; 8], column(selector)],
            ),
            (VARIABLE_VALUES_BATCH, vec![column(a), column(b)]),
        ])
    }

    #[test]
    fn fibonacci_rows_vanish() -> Result<()> {
        let common = fibonacci()?;
        let theta = F::rand();
        let good = values(vec![1, 1, 2, 3, 5, 8, 0, 0], vec![1, 2, 3, 5, 8, 13, 0, 0]);
        for index in 0..8 {
            let point = ExtendedPoint {
                values: &good,
                index,
                step: 1,
            };
            assert_eq!(eval_gate_constraints(&common, &point, theta), F::ZERO);
        }

        let bad = values(vec![1, 1, 2, 3, 5, 8, 0, 0], vec![1, 2, 4, 5, 8, 13, 0, 0]);
        let point = ExtendedPoint {
            values: &bad,
            index: 1,
            step: 1,
        };
        assert_ne!(eval_gate_constraints(&common, &point, theta), F::ZERO);
        Ok(())
    }
}
