use serde::{Deserialize, Serialize};

use crate::field::polynomial::PolynomialCoeffs;
use crate::hash::hash_types::{HashOut, RichField};
use crate::hash::merkle_proofs::MerkleProof;
use crate::hash::merkle_tree::MerkleCap;
use crate::plonk::config::Hasher;

/// Evaluations and Merkle proof produced by the prover in a FRI query step.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(bound = "")]
pub struct FriQueryStep<F: RichField, H: Hasher<F>> {
    pub evals: Vec<F>,
    pub merkle_proof: MerkleProof<F, H>,
}

/// Openings of the committed batches at a queried coset.
///
/// Every leaf holds, polynomial after polynomial, the `2^leaf_bits` values of one coset.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(bound = "")]
pub struct FriInitialTreeProof<F: RichField, H: Hasher<F>> {
    pub evals_proofs: Vec<(Vec<F>, MerkleProof<F, H>)>,
}

impl<F: RichField, H: Hasher<F>> FriInitialTreeProof<F, H> {
    pub(crate) fn eval(
        &self,
        oracle_index: usize,
        poly_index: usize,
        coset_size: usize,
        offset: usize,
    ) -> F {
        self.evals_proofs[oracle_index].0[poly_index * coset_size + offset]
    }
}

/// Proof for a FRI query round.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(bound = "")]
pub struct FriQueryRound<F: RichField, H: Hasher<F>> {
    pub initial_trees_proof: FriInitialTreeProof<F, H>,
    pub steps: Vec<FriQueryStep<F, H>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(bound = "")]
pub struct FriProof<F: RichField, H: Hasher<F>> {
    /// A Merkle cap for each folded codeword, starting with the combined one.
    pub commit_phase_merkle_caps: Vec<MerkleCap<F, H>>,
    /// Query rounds proofs
    pub query_round_proofs: Vec<FriQueryRound<F, H>>,
    /// The final polynomial in coefficient form.
    pub final_poly: PolynomialCoeffs<F>,
    /// Witness showing that the prover did PoW.
    pub pow_witness: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FriChallenges<F: RichField> {
    /// Scaling factor to combine polynomials.
    pub fri_alpha: F,

    /// Betas used in the FRI commit phase reductions.
    pub fri_betas: Vec<F>,

    /// Transcript state the proof-of-work nonce is ground against.
    pub fri_pow_seed: HashOut<F>,

    /// Indices at which the oracle is queried in FRI.
    pub fri_query_indices: Vec<usize>,
}
