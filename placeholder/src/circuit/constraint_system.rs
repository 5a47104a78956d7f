use std::collections::BTreeSet;

use placeholder_field::types::Field;
use serde::{Deserialize, Serialize};

use crate::circuit::expression::Expression;
use crate::circuit::variable::{ColumnKind, Variable};

/// Constraints that hold on every row where selector column `selector` is one.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Gate<F: Field> {
    pub selector: usize,
    pub constraints: Vec<Expression<F>>,
}

/// Two absolute cells that must hold the same value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CopyConstraint {
    pub left: Variable,
    pub right: Variable,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct LookupConstraint<F: Field> {
    pub table_id: usize,
    pub inputs: Vec<Expression<F>>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct LookupGate<F: Field> {
    pub selector: usize,
    pub constraints: Vec<LookupConstraint<F>>,
}

/// A lookup table as committed: rows where `tag_selector` is one hold the table tuples in the
/// columns of each option.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LookupTableInfo {
    pub name: String,
    pub tag_selector: usize,
    /// Every option is one copy of the table's columns, as rotation-zero variables.
    pub options: Vec<Vec<Variable>>,
    pub dynamic: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ConstraintSystem<F: Field> {
    pub gates: Vec<Gate<F>>,
    pub copy_constraints: Vec<CopyConstraint>,
    pub lookup_gates: Vec<LookupGate<F>>,
    pub lookup_tables: Vec<LookupTableInfo>,
}

impl<F: Field> ConstraintSystem<F> {
    pub fn table_id(&self, name: &str) -> Option<usize> {
        self.lookup_tables.iter().position(|t| t.name == name)
    }

    pub fn num_lookup_inputs(&self) -> usize {
        self.lookup_gates.iter().map(|g| g.constraints.len()).sum()
    }

    pub fn num_lookup_options(&self) -> usize {
        self.lookup_tables.iter().map(|t| t.options.len()).sum()
    }

    pub fn has_lookups(&self) -> bool {
        self.num_lookup_inputs() > 0
    }

    /// Every variable that gates, lookup inputs and lookup tables read.
    fn visit_variables(&self, f: &mut impl FnMut(&Variable)) {
        for gate in &self.gates {
            f(&Variable::selector(gate.selector, 0));
            gate.constraints.iter().for_each(|c| c.visit_variables(f));
        }
        for gate in &self.lookup_gates {
            f(&Variable::selector(gate.selector, 0));
            for constraint in &gate.constraints {
                constraint.inputs.iter().for_each(|e| e.visit_variables(f));
            }
        }
        for table in &self.lookup_tables {
            f(&Variable::selector(table.tag_selector, 0));
            table.options.iter().flatten().for_each(&mut *f);
        }
    }

    /// Rotations at which column `(kind, index)` is read, always including zero.
    pub fn rotations(&self, kind: ColumnKind, index: usize) -> BTreeSet<i32> {
        let mut rotations = BTreeSet::from([0]);
        self.visit_variables(&mut |v| {
            if v.kind == kind && v.index == index {
                rotations.insert(v.rotation);
            }
        });
        rotations
    }

    /// Largest degree of `selector * constraint` over all gates.
    pub fn max_gate_degree(&self) -> usize {
        self.gates
            .iter()
            .flat_map(|g| g.constraints.iter().map(|c| c.max_degree() + 1))
            .max()
            .unwrap_or(0)
    }

    /// Largest degree of a compressed lookup input `selector * (id + 1 + sum theta^k e_k)`.
    pub fn max_lookup_input_degree(&self) -> usize {
        self.lookup_gates
            .iter()
            .flat_map(|g| {
                g.constraints.iter().map(|c| {
                    1 + c.inputs.iter().map(Expression::max_degree).max().unwrap_or(0)
                })
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use placeholder_field::goldilocks_field::GoldilocksField;

    use super::*;

    type F = GoldilocksField;

    #[test]
    fn rotations_and_degrees() {
        let w = |i, r| Expression::<F>::from(Variable::witness(i, r));
        let cs = ConstraintSystem {
            gates: vec![Gate {
                selector: 0,
                constraints: vec![w(0, -1) * w(1, 0) - w(0, 1)],
            }],
            copy_constraints: vec![],
            lookup_gates: vec![LookupGate {
                selector: 1,
                constraints: vec![LookupConstraint {
                    table_id: 0,
                    inputs: vec![w(1, 1)],
                }],
            }],
            lookup_tables: vec![LookupTableInfo {
                name: "t".into(),
                tag_selector: 2,
                options: vec![vec![Variable::constant(0, 0)]],
                dynamic: false,
            }],
        };
        assert_eq!(
            cs.rotations(ColumnKind::Witness, 0).into_iter().collect::<Vec<_>>(),
            vec![-1, 0, 1]
        );
        assert_eq!(cs.rotations(ColumnKind::Witness, 1).len(), 2);
        assert_eq!(cs.rotations(ColumnKind::Constant, 0).len(), 1);
        assert_eq!(cs.max_gate_degree(), 3);
        assert_eq!(cs.max_lookup_input_degree(), 2);
        assert_eq!(cs.table_id("t"), Some(0));
        assert!(cs.has_lookups());
    }
}
