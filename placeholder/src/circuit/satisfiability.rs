//! Direct evaluation of a constraint system against an assignment, used before proving and in
//! tests.

use anyhow::{Error, Result};
use hashbrown::HashSet;
use log::error;
use placeholder_field::types::Field;

use crate::circuit::assignment::AssignmentTable;
use crate::circuit::constraint_system::ConstraintSystem;
use crate::circuit::variable::{ColumnKind, Variable};
use crate::error::ConstraintError;

/// Value of a relative variable read from row `row`, wrapping around the table.
pub fn cell_at<F: Field>(table: &AssignmentTable<F>, var: &Variable, row: usize, rows: usize) -> F {
    let r = (row as i64 + var.rotation as i64).rem_euclid(rows as i64) as usize;
    table.get(var.kind, var.index, r)
}

/// Tuples of every lookup table, indexed by table id.
pub fn table_tuples<F: Field>(
    cs: &ConstraintSystem<F>,
    table: &AssignmentTable<F>,
) -> Vec<HashSet<Vec<F>>> {
    let rows = table.rows_amount();
    cs.lookup_tables
        .iter()
        .map(|info| {
            let mut tuples = HashSet::new();
            for row in 0..rows {
                if table
                    .get(ColumnKind::Selector, info.tag_selector, row)
                    .is_zero()
                {
                    continue;
                }
                for option in &info.options {
                    tuples.insert(option.iter().map(|v| cell_at(table, v, row, rows)).collect());
                }
            }
            tuples
        })
        .collect()
}

/// Every violated gate, lookup and copy constraint.
pub fn check_satisfiability<F: Field>(
    cs: &ConstraintSystem<F>,
    table: &AssignmentTable<F>,
) -> Vec<ConstraintError> {
    let rows = table.rows_amount();
    let mut violations = Vec::new();
    let selected = |selector: usize| {
        (0..rows).filter(move |&row| {
            table
                .get(ColumnKind::Selector, selector, row)
                .is_nonzero()
        })
    };

    for (gate_index, gate) in cs.gates.iter().enumerate() {
        for row in selected(gate.selector) {
            for (constraint_index, constraint) in gate.constraints.iter().enumerate() {
                let value = constraint.evaluate(&|v| cell_at(table, v, row, rows));
                if value.is_nonzero() {
                    violations.push(ConstraintError::GateViolated {
                        gate: gate_index,
                        constraint: constraint_index,
                        row,
                        expression: constraint.to_string(),
                    });
                }
            }
        }
    }

    let tuples = table_tuples(cs, table);
    for (gate_index, gate) in cs.lookup_gates.iter().enumerate() {
        for row in selected(gate.selector) {
            for (constraint_index, constraint) in gate.constraints.iter().enumerate() {
                let tuple = constraint
                    .inputs
                    .iter()
                    .map(|e| e.evaluate(&|v| cell_at(table, v, row, rows)))
                    .collect::<Vec<_>>();
                if !tuples[constraint.table_id].contains(&tuple) {
                    violations.push(ConstraintError::LookupViolated {
                        gate: gate_index,
                        constraint: constraint_index,
                        row,
                        table: cs.lookup_tables[constraint.table_id].name.clone(),
                    });
                }
            }
        }
    }

    for copy in &cs.copy_constraints {
        let (left, right) = (
            table.get_variable(&copy.left),
            table.get_variable(&copy.right),
        );
        if left != right {
            violations.push(ConstraintError::CopyViolated {
                left: format!("{} = {left}", copy.left),
                right: format!("{} = {right}", copy.right),
            });
        }
    }

    for violation in &violations {
        error!("{violation}");
    }
    violations
}

/// Fails with the first violation, if any.
pub fn is_satisfied<F: Field>(cs: &ConstraintSystem<F>, table: &AssignmentTable<F>) -> Result<()> {
    match check_satisfiability(cs, table).into_iter().next() {
        Some(violation) => Err(Error::from(violation)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use placeholder_field::goldilocks_field::GoldilocksField;

    use super::*;
    use crate::circuit::constraint_system::{
        CopyConstraint, Gate, LookupConstraint, LookupGate, LookupTableInfo,
    };
    use crate::circuit::expression::Expression;

    type F = GoldilocksField;

    /// `w0[0] + w0[1] = w1[0]` on rows 1..=3, a lookup of `w1` into constant column 0 tagged by
    /// selector 1, and a copy between `w0` at rows 1 and 3.
    fn system(w0: [u64; 4], w1: [u64; 3]) -> (ConstraintSystem<F>, AssignmentTable<F>) {
        let w = |i, r| Expression::<F>::from(Variable::witness(i, r));
        let cs = ConstraintSystem {
            gates: vec![Gate {
                selector: 0,
                constraints: vec![w(0, 0) + w(0, 1) - w(1, 0)],
            }],
            copy_constraints: vec![CopyConstraint {
                left: Variable::absolute(ColumnKind::Witness, 0, 1),
                right: Variable::absolute(ColumnKind::Witness, 0, 3),
            }],
            lookup_gates: vec![LookupGate {
                selector: 0,
                constraints: vec![LookupConstraint {
                    table_id: 0,
                    inputs: vec![w(1, 0)],
                }],
            }],
            lookup_tables: vec![LookupTableInfo {
                name: "sums".into(),
                tag_selector: 1,
                options: vec![vec![Variable::constant(0, 0)]],
                dynamic: false,
            }],
        };
        let f = F::from_canonical_u64;
        let mut table = AssignmentTable::new(2, 0, 1, 2);
        for (row, v) in w0.into_iter().enumerate() {
            table.set(ColumnKind::Witness, 0, row + 1, f(v));
        }
        for (row, v) in w1.into_iter().enumerate() {
            table.set(ColumnKind::Witness, 1, row + 1, f(v));
            table.set(ColumnKind::Selector, 0, row + 1, F::ONE);
        }
        for (row, v) in [3, 4].into_iter().enumerate() {
            table.set(ColumnKind::Constant, 0, row + 1, f(v));
            table.set(ColumnKind::Selector, 1, row + 1, F::ONE);
        }
        table.pad_to(8);
        (cs, table)
    }

    #[test]
    fn satisfied_system() -> Result<()> {
        let (cs, table) = system([1, 2, 1, 3], [3, 3, 4]);
        is_satisfied(&cs, &table)
    }

    #[test]
    fn violations_are_reported() {
        let (cs, table) = system([1, 2, 2, 3], [3, 5, 4]);
        let violations = check_satisfiability(&cs, &table);
        assert!(violations
            .iter()
            .any(|v| matches!(v, ConstraintError::GateViolated { row: 3, .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, ConstraintError::LookupViolated { row: 2, .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, ConstraintError::CopyViolated { .. })));
        let err = is_satisfied(&cs, &table).unwrap_err();
        assert!(err.downcast_ref::<ConstraintError>().is_some());
    }
}
