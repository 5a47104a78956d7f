use anyhow::{ensure, Result};
use itertools::Itertools;
use log::{debug, error};

use crate::circuit::assignment::trim_trailing_zeros;
use crate::error::CryptographicError;
use crate::fri::verifier::verify_fri_proof;
use crate::hash::hash_types::RichField;
use crate::plonk::config::GenericConfig;
use crate::plonk::preprocessor::{CommonData, VerifierOnlyData};
use crate::plonk::proof::{PlaceholderProof, ProofChallenges};
use crate::plonk::validate_shape::validate_proof_shape;
use crate::plonk::vanishing_poly::eval_combined_constraints;
use crate::plonk::vars::{BatchValues, FIXED_VALUES_BATCH, QUOTIENT_BATCH, VARIABLE_VALUES_BATCH};

/// Checks `proof` against the circuit and the claimed public input columns.
pub fn verify_proof<F: RichField, C: GenericConfig<F = F>>(
    verifier_only: &VerifierOnlyData<C>,
    common: &CommonData<F>,
    public_inputs: &[Vec<F>],
    proof: &PlaceholderProof<F, C>,
) -> Result<()> {
    validate_proof_shape(proof, public_inputs, common)?;
    let challenges = proof.get_challenges(public_inputs, verifier_only, common)?;
    verify_with_challenges(proof, public_inputs, &challenges, verifier_only, common)
}

/// Like [`verify_proof`], logging the reason of a rejection.
pub fn verify<F: RichField, C: GenericConfig<F = F>>(
    verifier_only: &VerifierOnlyData<C>,
    common: &CommonData<F>,
    public_inputs: &[Vec<F>],
    proof: &PlaceholderProof<F, C>,
) -> bool {
    match verify_proof(verifier_only, common, public_inputs, proof) {
        Ok(()) => true,
        Err(e) => {
            error!("proof rejected: {e}");
            false
        }
    }
}

pub(crate) fn verify_with_challenges<F: RichField, C: GenericConfig<F = F>>(
    proof: &PlaceholderProof<F, C>,
    public_inputs: &[Vec<F>],
    challenges: &ProofChallenges<F>,
    verifier_only: &VerifierOnlyData<C>,
    common: &CommonData<F>,
) -> Result<()> {
    let degree_bits = common.degree_bits();
    let n = F::from_canonical_usize(common.degree());
    let y = challenges.y;
    let y_pow_n = y.exp_power_of_2(degree_bits);
    let z_h_y = y_pow_n - F::ONE;
    let vars = proof.openings.at(&common.layout);

    // Each public input column must open to the interpolation of its claimed values.
    let omega = F::primitive_root_of_unity(degree_bits);
    for (column, values) in public_inputs.iter().enumerate() {
        let values = trim_trailing_zeros(values);
        let points = omega.powers().take(values.len()).collect_vec();
        let denominators = points.iter().map(|&w| n * (y - w)).collect_vec();
        let expected = F::batch_multiplicative_inverse(&denominators)
            .into_iter()
            .zip_eq(points)
            .zip_eq(values)
            .map(|((inverse, w), &value)| value * w * z_h_y * inverse)
            .sum::<F>();
        let position = common.description.witness_columns + column;
        ensure!(
            vars.get(VARIABLE_VALUES_BATCH, position, 0) == expected,
            CryptographicError::PublicInputMismatch { column }
        );
    }

    // Check the quotient relation `F(y) = Z_H(y) * sum_i T_i(y) y^(n i)` at the challenge point.
    let l_0 = z_h_y * (n * (y - F::ONE)).inverse();
    let combined = eval_combined_constraints(common, &vars, l_0, &challenges.arguments);
    let quotient = y_pow_n
        .powers()
        .zip(&proof.openings.values[&QUOTIENT_BATCH])
        .map(|(y_power, chunk)| y_power * chunk[0])
        .sum::<F>();
    ensure!(
        combined == z_h_y * quotient,
        CryptographicError::EvaluationMismatch
    );
    debug!("quotient relation holds at the challenge point");

    let initial_caps = common
        .layout
        .batches
        .keys()
        .map(|batch| match *batch {
            FIXED_VALUES_BATCH => verifier_only.fixed_values_cap.clone(),
            batch => proof.commitments[&batch].clone(),
        })
        .collect_vec();
    verify_fri_proof::<F, C>(
        &common.layout.fri_instance(y, degree_bits),
        &proof.openings.to_fri_openings(&common.layout),
        &challenges.fri_challenges,
        &initial_caps,
        &proof.fri_proof,
        &common.fri_params,
    )
}
