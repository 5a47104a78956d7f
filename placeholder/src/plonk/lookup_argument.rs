//! The logUp lookup argument.
//!
//! Every lookup input `j` is compressed into `L_j = sel * (id + 1 + sum_k theta^(k+1) e_k)` and
//! every table option `i` into `T_i = tag * (id + 1 + sum_k theta^(k+1) col_k)`. With helpers
//! `H_j = -1 / (alpha - L_j)` and `G_i = m_i / (alpha - T_i)`, the running sum
//! `U(w^(r+1)) = U(w^r) + sum_j H_j + sum_i G_i` starts and ends at zero exactly when every input
//! is counted by the multiplicities `m_i`.

use ahash::RandomState;
use anyhow::{ensure, Result};
use hashbrown::HashMap;
use log::warn;
use placeholder_field::polynomial::PolynomialValues;
use placeholder_field::types::Field;
use placeholder_maybe_rayon::*;

use crate::circuit::assignment::AssignmentTable;
use crate::circuit::constraint_system::{ConstraintSystem, LookupConstraint};
use crate::circuit::satisfiability::cell_at;
use crate::circuit::variable::ColumnKind;
use crate::error::CryptographicError;
use crate::hash::hash_types::RichField;
use crate::plonk::gate_argument::evaluate_expression;
use crate::plonk::preprocessor::CommonData;
use crate::plonk::vars::{BatchValues, FIXED_VALUES_BATCH, LOOKUP_BATCH, PERMUTATION_BATCH};

/// Challenges of the lookup argument, in the order they are drawn.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LookupChallenges<F> {
    /// Compresses tuples, drawn before the multiplicities are committed.
    pub theta: F,
    pub alpha: F,
    /// Separates the input terms of the first part.
    pub h: F,
    /// Separates the table terms of the first part.
    pub g: F,
}

/// Every lookup input with the selector of its gate, in gate order.
pub(crate) fn lookup_inputs<F: Field>(
    cs: &ConstraintSystem<F>,
) -> impl Iterator<Item = (usize, &LookupConstraint<F>)> {
    cs.lookup_gates
        .iter()
        .flat_map(|gate| gate.constraints.iter().map(move |c| (gate.selector, c)))
}

/// `id + 1 + sum_k theta^(k+1) values_k`.
fn compress<F: Field>(table_id: usize, values: impl Iterator<Item = F>, theta: F) -> F {
    let mut power = F::ONE;
    values.fold(F::from_canonical_usize(table_id + 1), |acc, value| {
        power *= theta;
        acc + power * value
    })
}

/// The compressed lookup inputs `L_j` over the `n` rows of `table`.
pub(crate) fn compressed_inputs<F: RichField>(
    common: &CommonData<F>,
    table: &AssignmentTable<F>,
    theta: F,
) -> Vec<Vec<F>> {
    let n = common.degree();
    lookup_inputs(&common.constraint_system)
        .map(|(selector, constraint)| {
            (0..n)
                .into_par_iter()
                .map(|row| {
                    let sel = table.get(ColumnKind::Selector, selector, row);
                    if sel.is_zero() {
                        return F::ZERO;
                    }
                    let values = constraint
                        .inputs
                        .iter()
                        .map(|e| e.evaluate(&|v| cell_at(table, v, row, n)));
                    sel * compress(constraint.table_id, values, theta)
                })
                .collect()
        })
        .collect()
}

/// The compressed table options `T_i` over the `n` rows of `table`.
pub(crate) fn compressed_options<F: RichField>(
    common: &CommonData<F>,
    table: &AssignmentTable<F>,
    theta: F,
) -> Vec<Vec<F>> {
    let n = common.degree();
    common
        .lookup_options()
        .into_iter()
        .map(|(table_id, columns)| {
            let tag = common.constraint_system.lookup_tables[table_id].tag_selector;
            (0..n)
                .into_par_iter()
                .map(|row| {
                    let tag = table.get(ColumnKind::Selector, tag, row);
                    let values = columns.iter().map(|v| cell_at(table, v, row, n));
                    tag * compress(table_id, values, theta)
                })
                .collect()
        })
        .collect()
}

/// Counts every input value among the first `usable` rows against the first option entry
/// holding it, scanning options in order and rows upwards.
pub(crate) fn multiplicities<F: Field>(
    inputs: &[Vec<F>],
    options: &[Vec<F>],
    usable: usize,
) -> Vec<PolynomialValues<F>> {
    let mut first_entry = HashMap::with_hasher(RandomState::new());
    for (option, values) in options.iter().enumerate() {
        for (row, &value) in values[..usable].iter().enumerate() {
            first_entry.entry(value).or_insert((option, row));
        }
    }

    let n = options.first().map_or(usable, Vec::len);
    let mut counts = vec![PolynomialValues::zero(n); options.len()];
    for (j, values) in inputs.iter().enumerate() {
        for (row, value) in values[..usable].iter().enumerate() {
            match first_entry.get(value) {
                Some(&(option, entry)) => counts[option].values[entry] += F::ONE,
                None => warn!("lookup input {j} at row {row} matches no table entry"),
            }
        }
    }
    counts
}

/// The sum `U` followed by the helpers `H_j` and `G_i`.
pub(crate) fn lookup_polys<F: Field>(
    inputs: &[Vec<F>],
    options: &[Vec<F>],
    multiplicities: &[PolynomialValues<F>],
    alpha: F,
) -> Result<Vec<PolynomialValues<F>>> {
    let n = inputs[0].len();
    let shifted = inputs
        .iter()
        .chain(options)
        .flatten()
        .map(|&x| alpha - x)
        .collect::<Vec<_>>();
    ensure!(
        shifted.iter().all(|x| x.is_nonzero()),
        CryptographicError::ChallengeCollision
    );
    let inverses = F::batch_multiplicative_inverse(&shifted);
    let (input_inverses, option_inverses) = inverses.split_at(inputs.len() * n);

    let helpers_h = input_inverses
        .chunks(n)
        .map(|chunk| PolynomialValues::new(chunk.iter().map(|&x| -x).collect()))
        .collect::<Vec<_>>();
    let helpers_g = option_inverses
        .chunks(n)
        .zip(multiplicities)
        .map(|(chunk, m)| {
            PolynomialValues::new(chunk.iter().zip(&m.values).map(|(&x, &m)| m * x).collect())
        })
        .collect::<Vec<_>>();

    let mut sum = Vec::with_capacity(n);
    let mut acc = F::ZERO;
    for row in 0..n {
        sum.push(acc);
        acc += helpers_h
            .iter()
            .chain(&helpers_g)
            .map(|p| p.values[row])
            .sum::<F>();
    }

    Ok([vec![PolynomialValues::new(sum)], helpers_h, helpers_g].concat())
}

/// `[F0, F1, F2, F3]` of the lookup argument at the point `vars` is read at.
///
/// `F0` ties the helpers to the compressed values, `F1 = L_0 U` and `F2 = q_last U` pin both ends
/// of the sum, and `F3 = (q_last + q_blind - 1)(U(w X) - U - sum H - sum G)` accumulates it.
pub fn eval_lookup_constraints<F: RichField, V: BatchValues<F>>(
    common: &CommonData<F>,
    vars: &V,
    l_0: F,
    challenges: &LookupChallenges<F>,
) -> [F; 4] {
    if !common.has_lookups() {
        return [F::ZERO; 4];
    }
    let LookupChallenges { theta, alpha, h, g } = *challenges;
    let cs = &common.constraint_system;

    let u = vars.get(PERMUTATION_BATCH, common.lookup_sum_index(), 0);
    let u_next = vars.get(PERMUTATION_BATCH, common.lookup_sum_index(), 1);
    let q_last = vars.get(FIXED_VALUES_BATCH, common.q_last_index(), 0);
    let q_blind = vars.get(FIXED_VALUES_BATCH, common.q_blind_index(), 0);

    let mut tie = F::ZERO;
    let mut increment = F::ZERO;
    let mut h_power = F::ONE;
    for (j, (selector, constraint)) in lookup_inputs(cs).enumerate() {
        let (batch, poly) = common.column_position((ColumnKind::Selector, selector));
        let sel = vars.get(batch, poly, 0);
        let values = constraint
            .inputs
            .iter()
            .map(|e| evaluate_expression(common, e, vars));
        let compressed = sel * compress(constraint.table_id, values, theta);
        let helper = vars.get(PERMUTATION_BATCH, common.lookup_input_helper_index(j), 0);
        tie += h_power * (helper * (alpha - compressed) + F::ONE);
        increment += helper;
        h_power *= h;
    }

    let mut g_power = F::ONE;
    for (i, (table_id, columns)) in common.lookup_options().into_iter().enumerate() {
        let (batch, poly) = common.column_position((
            ColumnKind::Selector,
            cs.lookup_tables[table_id].tag_selector,
        ));
        let tag = vars.get(batch, poly, 0);
        let values = columns.iter().map(|v| {
            let (batch, poly) = common.variable_position(v);
            vars.get(batch, poly, v.rotation)
        });
        let compressed = tag * compress(table_id, values, theta);
        let helper = vars.get(PERMUTATION_BATCH, common.lookup_table_helper_index(i), 0);
        let multiplicity = vars.get(LOOKUP_BATCH, i, 0);
        tie += g_power * (helper * (alpha - compressed) - multiplicity);
        increment += helper;
        g_power *= g;
    }

    [
        tie,
        l_0 * u,
        q_last * u,
        (q_last + q_blind - F::ONE) * (u_next - u - increment),
    ]
}
