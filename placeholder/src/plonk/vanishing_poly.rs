use itertools::Itertools;

use crate::hash::hash_types::RichField;
use crate::plonk::gate_argument::eval_gate_constraints;
use crate::plonk::lookup_argument::{eval_lookup_constraints, LookupChallenges};
use crate::plonk::permutation_argument::eval_permutation_constraints;
use crate::plonk::preprocessor::CommonData;
use crate::plonk::vars::{BatchValues, NUM_F_PARTS};

/// Challenges the argument parts depend on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArgumentChallenges<F> {
    /// Permutation challenges, zero when the circuit has no copy constraints.
    pub perm_beta: F,
    pub perm_gamma: F,
    pub lookup: Option<LookupChallenges<F>>,
    /// Weights of the permutation parts, empty unless the permutation is split.
    pub perm_part_alphas: Vec<F>,
    pub gate_theta: F,
    /// Weights of the argument parts in the quotient.
    pub alphas: [F; NUM_F_PARTS],
}

/// The three permutation parts, the four lookup parts and the gate part.
pub fn eval_constraint_parts<F: RichField, V: BatchValues<F>>(
    common: &CommonData<F>,
    vars: &V,
    l_0: F,
    challenges: &ArgumentChallenges<F>,
) -> [F; NUM_F_PARTS] {
    let [p0, p1, p2] = eval_permutation_constraints(
        common,
        vars,
        l_0,
        challenges.perm_beta,
        challenges.perm_gamma,
        &challenges.perm_part_alphas,
    );
    let [u0, u1, u2, u3] = challenges
        .lookup
        .map_or([F::ZERO; 4], |c| eval_lookup_constraints(common, vars, l_0, &c));
    let gate = eval_gate_constraints(common, vars, challenges.gate_theta);
    [p0, p1, p2, u0, u1, u2, u3, gate]
}

/// `F = sum_k alpha_k F_k`, which vanishes on the trace domain exactly when every argument holds.
pub fn eval_combined_constraints<F: RichField, V: BatchValues<F>>(
    common: &CommonData<F>,
    vars: &V,
    l_0: F,
    challenges: &ArgumentChallenges<F>,
) -> F {
    challenges
        .alphas
        .iter()
        .zip_eq(eval_constraint_parts(common, vars, l_0, challenges))
        .map(|(&alpha, part)| alpha * part)
        .sum()
}
