use crate::field::polynomial::PolynomialCoeffs;
use crate::fri::proof::FriChallenges;
use crate::fri::FriParams;
use crate::hash::hash_types::{HashOut, RichField};
use crate::hash::merkle_tree::MerkleCap;
use crate::iop::challenger::Challenger;
use crate::plonk::config::{GenericHashOut, Hasher};
use crate::util::leading_zeros_be;

impl<F: RichField, H: Hasher<F>> Challenger<F, H> {
    /// Replays the FRI part of the transcript. Must be called right after the openings are
    /// observed.
    pub fn fri_challenges(
        &mut self,
        commit_phase_merkle_caps: &[MerkleCap<F, H>],
        final_poly: &PolynomialCoeffs<F>,
        pow_witness: u64,
        params: &FriParams,
    ) -> FriChallenges<F> {
        let fri_alpha = self.get_challenge();

        let fri_betas = commit_phase_merkle_caps
            .iter()
            .map(|cap| {
                self.observe_cap(cap);
                self.get_challenge()
            })
            .collect();

        self.observe_elements(&final_poly.coeffs);

        let fri_pow_seed = self.get_hash();
        self.observe_u64(pow_witness);

        let lde_size = params.lde_size() as u64;
        let fri_query_indices = (0..params.config.num_query_rounds)
            .map(|_| (self.get_challenge().to_canonical_u64() % lde_size) as usize)
            .collect();

        FriChallenges {
            fri_alpha,
            fri_betas,
            fri_pow_seed,
            fri_query_indices,
        }
    }
}

/// Leading zero bits of `H(seed || nonce)`, reading the digest big-endian.
pub(crate) fn proof_of_work_zeros<F: RichField, H: Hasher<F>>(
    seed: &HashOut<F>,
    nonce: u64,
) -> u32 {
    let mut bytes = seed.to_le_bytes();
    bytes.extend_from_slice(&nonce.to_le_bytes());
    leading_zeros_be(&H::hash_bytes(&bytes).to_bytes())
}
