use anyhow::{ensure, Result};
use placeholder_field::interpolation::{barycentric_weights, interpolate};
use placeholder_field::types::Field;

use crate::error::{CryptographicError, FormatError};
use crate::fri::challenges::proof_of_work_zeros;
use crate::fri::proof::{FriChallenges, FriInitialTreeProof, FriProof, FriQueryRound};
use crate::fri::structure::{FriBatchInfo, FriInstanceInfo, FriOpenings};
use crate::fri::FriParams;
use crate::hash::hash_types::RichField;
use crate::hash::merkle_proofs::verify_merkle_proof_to_cap;
use crate::hash::merkle_tree::MerkleCap;
use crate::plonk::config::GenericConfig;
use crate::util::reducing::ReducingFactor;
use crate::util::{reverse_bits, reverse_index_bits_in_place};

/// Computes P'(x^arity) from {P(x*g^i)}_(i=0..arity), where g is a `arity`-th root of unity
/// and P' is the FRI reduced polynomial.
pub(crate) fn compute_evaluation<F: Field>(
    x: F,
    x_index_within_coset: usize,
    arity_bits: usize,
    evals: &[F],
    beta: F,
) -> F {
    let arity = 1 << arity_bits;
    debug_assert_eq!(evals.len(), arity);

    let g = F::primitive_root_of_unity(arity_bits);

    // The evaluations are committed in bit-reversed order.
    let mut evals = evals.to_vec();
    reverse_index_bits_in_place(&mut evals);
    let rev_x_index_within_coset = reverse_bits(x_index_within_coset, arity_bits);
    let coset_start = x * g.exp_u64((arity - rev_x_index_within_coset) as u64);
    let points = g
        .powers()
        .map(|y| coset_start * y)
        .zip(evals)
        .collect::<Vec<_>>();
    let barycentric_weights = barycentric_weights(&points);
    interpolate(&points, beta, &barycentric_weights)
}

pub fn verify_fri_proof<F: RichField, C: GenericConfig<F = F>>(
    instance: &FriInstanceInfo<F>,
    openings: &FriOpenings<F>,
    challenges: &FriChallenges<F>,
    initial_merkle_caps: &[MerkleCap<F, C::Hasher>],
    proof: &FriProof<F, C::Hasher>,
    params: &FriParams,
) -> Result<()> {
    ensure!(
        proof.final_poly.len() <= params.final_poly_len(),
        CryptographicError::FinalPolynomialTooLarge {
            len: proof.final_poly.len(),
            max: params.final_poly_len(),
        }
    );
    ensure!(
        proof.commit_phase_merkle_caps.len() == params.reduction_arity_bits.len()
            && challenges.fri_betas.len() == params.reduction_arity_bits.len(),
        FormatError::BatchInfoMismatch("number of FRI rounds".into())
    );
    ensure!(
        params.config.num_query_rounds == proof.query_round_proofs.len()
            && challenges.fri_query_indices.len() == proof.query_round_proofs.len(),
        FormatError::BatchInfoMismatch("number of FRI queries".into())
    );
    ensure!(
        initial_merkle_caps.len() == instance.oracles.len()
            && openings.batches.len() == instance.batches.len(),
        FormatError::BatchInfoMismatch("number of committed batches".into())
    );

    let bits = params.config.proof_of_work_bits;
    ensure!(
        proof_of_work_zeros::<F, C::Hasher>(&challenges.fri_pow_seed, proof.pow_witness) >= bits,
        CryptographicError::InsufficientPow { bits }
    );

    let precomputed_reduced_evals =
        PrecomputedReducedOpenings::from_os_and_alpha(openings, challenges.fri_alpha);
    for (&x_index, round_proof) in challenges
        .fri_query_indices
        .iter()
        .zip(&proof.query_round_proofs)
    {
        check_query_shape::<F, C>(instance, round_proof, params)?;
        fri_verifier_query_round::<F, C>(
            instance,
            challenges,
            &precomputed_reduced_evals,
            initial_merkle_caps,
            proof,
            x_index,
            round_proof,
            params,
        )?;
    }

    Ok(())
}

fn check_query_shape<F: RichField, C: GenericConfig<F = F>>(
    instance: &FriInstanceInfo<F>,
    round_proof: &FriQueryRound<F, C::Hasher>,
    params: &FriParams,
) -> Result<()> {
    let coset = 1 << params.leaf_bits();
    let initial = &round_proof.initial_trees_proof.evals_proofs;
    ensure!(
        initial.len() == instance.oracles.len()
            && initial
                .iter()
                .zip(&instance.oracles)
                .all(|((evals, _), oracle)| evals.len() == oracle.num_polys * coset),
        FormatError::BatchInfoMismatch("initial openings of a query".into())
    );
    ensure!(
        round_proof.steps.len() == params.reduction_arity_bits.len()
            && round_proof
                .steps
                .iter()
                .zip(&params.reduction_arity_bits)
                .all(|(step, &bits)| step.evals.len() == 1 << bits),
        FormatError::BatchInfoMismatch("folding steps of a query".into())
    );
    Ok(())
}

fn fri_verify_initial_proof<F: RichField, C: GenericConfig<F = F>>(
    leaf_index: usize,
    proof: &FriInitialTreeProof<F, C::Hasher>,
    initial_merkle_caps: &[MerkleCap<F, C::Hasher>],
) -> Result<()> {
    for ((evals, merkle_proof), cap) in proof.evals_proofs.iter().zip(initial_merkle_caps) {
        verify_merkle_proof_to_cap(evals, leaf_index, cap, merkle_proof)?;
    }
    Ok(())
}

/// Value at `subgroup_x` of the combined quotient `sum_i alpha^(k_i) (F_i(X) - F_i(z_i)) / (X - z_i)`,
/// read from position `offset` of the opened cosets.
pub(crate) fn fri_combine_initial<F: RichField, C: GenericConfig<F = F>>(
    instance: &FriInstanceInfo<F>,
    proof: &FriInitialTreeProof<F, C::Hasher>,
    alpha: F,
    subgroup_x: F,
    precomputed_reduced_evals: &PrecomputedReducedOpenings<F>,
    coset_size: usize,
    offset: usize,
) -> Result<F> {
    let mut alpha = ReducingFactor::new(alpha);
    let mut sum = F::ZERO;

    for (batch, reduced_openings) in instance
        .batches
        .iter()
        .zip(&precomputed_reduced_evals.reduced_openings_at_point)
    {
        let FriBatchInfo { point, polynomials } = batch;
        let evals = polynomials
            .iter()
            .map(|p| proof.eval(p.oracle_index, p.polynomial_index, coset_size, offset))
            .collect::<Vec<_>>();
        let reduced_evals = alpha.reduce(evals.iter());
        let numerator = reduced_evals - *reduced_openings;
        let denominator = subgroup_x - *point;
        ensure!(
            denominator.is_nonzero(),
            CryptographicError::ChallengeCollision
        );
        sum = alpha.shift(sum);
        sum += numerator / denominator;
    }

    Ok(sum)
}

fn fri_verifier_query_round<F: RichField, C: GenericConfig<F = F>>(
    instance: &FriInstanceInfo<F>,
    challenges: &FriChallenges<F>,
    precomputed_reduced_evals: &PrecomputedReducedOpenings<F>,
    initial_merkle_caps: &[MerkleCap<F, C::Hasher>],
    proof: &FriProof<F, C::Hasher>,
    mut x_index: usize,
    round_proof: &FriQueryRound<F, C::Hasher>,
    params: &FriParams,
) -> Result<()> {
    let log_n = params.lde_bits();
    let leaf_bits = params.leaf_bits();
    let coset_size = 1 << leaf_bits;
    let leaf_index = x_index >> leaf_bits;
    fri_verify_initial_proof::<F, C>(
        leaf_index,
        &round_proof.initial_trees_proof,
        initial_merkle_caps,
    )?;

    let point_at = |index: usize| {
        F::coset_shift() * F::primitive_root_of_unity(log_n).exp_u64(reverse_bits(index, log_n) as u64)
    };

    // The combined codeword on the whole opened coset, which is the first folded leaf.
    let initial_values = (0..coset_size)
        .map(|offset| {
            fri_combine_initial::<F, C>(
                instance,
                &round_proof.initial_trees_proof,
                challenges.fri_alpha,
                point_at((leaf_index << leaf_bits) + offset),
                precomputed_reduced_evals,
                coset_size,
                offset,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let mut subgroup_x = point_at(x_index);
    let mut old_eval = initial_values[x_index & (coset_size - 1)];

    for (i, &arity_bits) in params.reduction_arity_bits.iter().enumerate() {
        let arity = 1 << arity_bits;
        let evals = &round_proof.steps[i].evals;

        let coset_index = x_index >> arity_bits;
        let x_index_within_coset = x_index & (arity - 1);

        let consistent = if i == 0 {
            *evals == initial_values
        } else {
            evals[x_index_within_coset] == old_eval
        };
        ensure!(consistent, CryptographicError::FoldingMismatch { round: i });

        old_eval = compute_evaluation(
            subgroup_x,
            x_index_within_coset,
            arity_bits,
            evals,
            challenges.fri_betas[i],
        );

        verify_merkle_proof_to_cap(
            evals,
            coset_index,
            &proof.commit_phase_merkle_caps[i],
            &round_proof.steps[i].merkle_proof,
        )?;

        subgroup_x = subgroup_x.exp_power_of_2(arity_bits);
        x_index = coset_index;
    }

    ensure!(
        proof.final_poly.eval(subgroup_x) == old_eval,
        CryptographicError::FoldingMismatch {
            round: params.reduction_arity_bits.len()
        }
    );

    Ok(())
}

/// For each opening point, the alpha-reduced claimed values of the polynomials opened there.
#[derive(Clone, Debug)]
pub(crate) struct PrecomputedReducedOpenings<F: RichField> {
    pub reduced_openings_at_point: Vec<F>,
}

impl<F: RichField> PrecomputedReducedOpenings<F> {
    pub(crate) fn from_os_and_alpha(openings: &FriOpenings<F>, alpha: F) -> Self {
        let reduced_openings_at_point = openings
            .batches
            .iter()
            .map(|batch| ReducingFactor::new(alpha).reduce(batch.values.iter()))
            .collect();
        Self {
            reduced_openings_at_point,
        }
    }
}
