use anyhow::{anyhow, Result};
use placeholder_field::polynomial::{PolynomialCoeffs, PolynomialValues};
use placeholder_maybe_rayon::*;

use crate::error::CryptographicError;
use crate::fri::challenges::proof_of_work_zeros;
use crate::fri::proof::{FriInitialTreeProof, FriProof, FriQueryRound, FriQueryStep};
use crate::fri::FriParams;
use crate::hash::hash_types::{HashOut, RichField};
use crate::hash::merkle_tree::MerkleTree;
use crate::iop::challenger::Challenger;
use crate::plonk::config::{GenericConfig, Hasher};
use crate::timed;
use crate::util::reducing::reduce_with_powers;
use crate::util::reverse_index_bits_in_place;
use crate::util::timing::TimingTree;

/// Builds a FRI proof.
pub fn fri_proof<F: RichField, C: GenericConfig<F = F>>(
    initial_merkle_trees: &[&MerkleTree<F, C::Hasher>],
    // Coefficients of the polynomial on which the LDT is performed. Only the first `1/rate`
    // coefficients are non-zero.
    lde_polynomial_coeffs: PolynomialCoeffs<F>,
    // Evaluation of the polynomial on the large domain.
    lde_polynomial_values: PolynomialValues<F>,
    challenger: &mut Challenger<F, C::Hasher>,
    fri_params: &FriParams,
    timing: &mut TimingTree,
) -> Result<FriProof<F, C::Hasher>> {
    let n = lde_polynomial_values.len();
    assert_eq!(lde_polynomial_coeffs.len(), n);

    let (trees, final_coeffs) = timed!(
        timing,
        "fold codewords in the commitment phase",
        fri_committed_trees::<F, C>(
            lde_polynomial_coeffs,
            lde_polynomial_values,
            challenger,
            fri_params,
        )
    );

    let pow_seed = challenger.get_hash();
    let pow_witness = timed!(
        timing,
        "find proof-of-work witness",
        fri_proof_of_work::<F, C::Hasher>(&pow_seed, fri_params.config.proof_of_work_bits)
    )?;
    challenger.observe_u64(pow_witness);

    let query_round_proofs =
        fri_prover_query_rounds::<F, C>(initial_merkle_trees, &trees, challenger, n, fri_params);

    Ok(FriProof {
        commit_phase_merkle_caps: trees.iter().map(|t| t.cap.clone()).collect(),
        query_round_proofs,
        final_poly: final_coeffs,
        pow_witness,
    })
}

fn fri_committed_trees<F: RichField, C: GenericConfig<F = F>>(
    mut coeffs: PolynomialCoeffs<F>,
    mut values: PolynomialValues<F>,
    challenger: &mut Challenger<F, C::Hasher>,
    fri_params: &FriParams,
) -> (Vec<MerkleTree<F, C::Hasher>>, PolynomialCoeffs<F>) {
    let mut trees = Vec::new();

    let mut shift = F::coset_shift();
    for (round, &arity_bits) in fri_params.reduction_arity_bits.iter().enumerate() {
        let arity = 1 << arity_bits;

        reverse_index_bits_in_place(&mut values.values);
        let chunked_values = values
            .values
            .par_chunks(arity)
            .map(|chunk: &[F]| chunk.to_vec())
            .collect();
        let cap_height = fri_params.cap_height_for(fri_params.round_tree_bits(round));
        let tree = MerkleTree::<F, C::Hasher>::new(chunked_values, cap_height);

        challenger.observe_cap(&tree.cap);
        trees.push(tree);

        let beta = challenger.get_challenge();
        // P(x) = sum_{i<r} x^i * P_i(x^r) becomes sum_{i<r} beta^i * P_i(x).
        coeffs = PolynomialCoeffs::new(
            coeffs
                .coeffs
                .par_chunks_exact(arity)
                .map(|chunk| reduce_with_powers(chunk, beta))
                .collect::<Vec<_>>(),
        );
        shift = shift.exp_u64(arity as u64);
        values = coeffs.coset_fft(shift);
    }

    // The coefficients being removed here are zero for an honest prover.
    coeffs
        .coeffs
        .truncate(coeffs.len() >> fri_params.config.rate_bits);

    challenger.observe_elements(&coeffs.coeffs);
    (trees, coeffs)
}

/// Searches for a nonce whose hash together with `seed` starts with `bits` zero bits.
pub(crate) fn fri_proof_of_work<F: RichField, H: Hasher<F>>(
    seed: &HashOut<F>,
    bits: u32,
) -> Result<u64> {
    if bits == 0 {
        return Ok(0);
    }
    (0..u64::MAX)
        .into_par_iter()
        .find_any(|&nonce| proof_of_work_zeros::<F, H>(seed, nonce) >= bits)
        .ok_or_else(|| anyhow!(CryptographicError::InsufficientPow { bits }))
}

fn fri_prover_query_rounds<F: RichField, C: GenericConfig<F = F>>(
    initial_merkle_trees: &[&MerkleTree<F, C::Hasher>],
    trees: &[MerkleTree<F, C::Hasher>],
    challenger: &mut Challenger<F, C::Hasher>,
    n: usize,
    fri_params: &FriParams,
) -> Vec<FriQueryRound<F, C::Hasher>> {
    challenger
        .get_n_challenges(fri_params.config.num_query_rounds)
        .into_par_iter()
        .map(|rand| {
            let x_index = (rand.to_canonical_u64() % n as u64) as usize;
            fri_prover_query_round::<F, C>(initial_merkle_trees, trees, x_index, fri_params)
        })
        .collect()
}

fn fri_prover_query_round<F: RichField, C: GenericConfig<F = F>>(
    initial_merkle_trees: &[&MerkleTree<F, C::Hasher>],
    trees: &[MerkleTree<F, C::Hasher>],
    mut x_index: usize,
    fri_params: &FriParams,
) -> FriQueryRound<F, C::Hasher> {
    let leaf_index = x_index >> fri_params.leaf_bits();
    let initial_proof = initial_merkle_trees
        .iter()
        .map(|t| (t.get(leaf_index).to_vec(), t.prove(leaf_index)))
        .collect::<Vec<_>>();

    let mut query_steps = Vec::new();
    for (tree, &arity_bits) in trees.iter().zip(&fri_params.reduction_arity_bits) {
        x_index >>= arity_bits;
        query_steps.push(FriQueryStep {
            evals: tree.get(x_index).to_vec(),
            merkle_proof: tree.prove(x_index),
        });
    }
    FriQueryRound {
        initial_trees_proof: FriInitialTreeProof {
            evals_proofs: initial_proof,
        },
        steps: query_steps,
    }
}
