use anyhow::{ensure, Result};

use crate::circuit::assignment::trim_trailing_zeros;
use crate::error::CryptographicError;
use crate::hash::hash_types::RichField;
use crate::iop::challenger::Challenger;
use crate::plonk::config::{GenericConfig, Hasher};
use crate::plonk::lookup_argument::LookupChallenges;
use crate::plonk::preprocessor::{CommonData, VerifierOnlyData};
use crate::plonk::proof::{OpeningSet, PlaceholderProof, ProofChallenges};
use crate::plonk::vanishing_poly::ArgumentChallenges;
use crate::plonk::vars::{
    LOOKUP_BATCH, NUM_F_PARTS, PERMUTATION_BATCH, QUOTIENT_BATCH, VARIABLE_VALUES_BATCH,
};

impl<F: RichField, H: Hasher<F>> Challenger<F, H> {
    /// Absorbs every public input column as its length followed by its values, trailing zeros
    /// removed.
    pub fn observe_public_inputs(&mut self, public_inputs: &[Vec<F>]) {
        for column in public_inputs {
            let column = trim_trailing_zeros(column);
            self.observe_element(F::from_canonical_usize(column.len()));
            self.observe_elements(column);
        }
    }

    pub fn observe_openings(&mut self, openings: &OpeningSet<F>) {
        self.observe_elements(&openings.flatten());
    }

    pub(crate) fn get_lookup_challenges(&mut self, theta: F) -> LookupChallenges<F> {
        LookupChallenges {
            theta,
            alpha: self.get_challenge(),
            h: self.get_challenge(),
            g: self.get_challenge(),
        }
    }

    pub(crate) fn get_f_alphas(&mut self) -> [F; NUM_F_PARTS] {
        core::array::from_fn(|_| self.get_challenge())
    }

    /// Draws the evaluation point, which must lie outside of the trace domain.
    pub(crate) fn get_evaluation_point(&mut self, degree_bits: usize) -> Result<F> {
        let y = self.get_challenge();
        ensure!(
            y.exp_power_of_2(degree_bits) != F::ONE,
            CryptographicError::InvalidChallenge
        );
        Ok(y)
    }
}

impl<F: RichField, C: GenericConfig<F = F>> PlaceholderProof<F, C> {
    /// Replays the prover's transcript.
    pub(crate) fn get_challenges(
        &self,
        public_inputs: &[Vec<F>],
        verifier_only: &VerifierOnlyData<C>,
        common: &CommonData<F>,
    ) -> Result<ProofChallenges<F>> {
        let mut challenger = Challenger::<F, C::Hasher>::new();

        challenger.observe_hash(verifier_only.constraint_system_hash);
        challenger.observe_cap(&verifier_only.fixed_values_cap);
        challenger.observe_public_inputs(public_inputs);
        challenger.observe_cap(&self.commitments[&VARIABLE_VALUES_BATCH]);

        let (perm_beta, perm_gamma) = if common.has_permutation() {
            (challenger.get_challenge(), challenger.get_challenge())
        } else {
            (F::ZERO, F::ZERO)
        };

        let lookup = if common.has_lookups() {
            let theta = challenger.get_challenge();
            challenger.observe_cap(&self.commitments[&LOOKUP_BATCH]);
            Some(challenger.get_lookup_challenges(theta))
        } else {
            None
        };

        if let Some(cap) = self.commitments.get(&PERMUTATION_BATCH) {
            challenger.observe_cap(cap);
        }
        let perm_part_alphas = if common.permutation_parts.len() > 1 {
            challenger.get_n_challenges(common.permutation_parts.len())
        } else {
            Vec::new()
        };

        let gate_theta = challenger.get_challenge();
        let alphas = challenger.get_f_alphas();

        challenger.observe_cap(&self.commitments[&QUOTIENT_BATCH]);
        let y = challenger.get_evaluation_point(common.degree_bits())?;

        challenger.observe_openings(&self.openings);

        Ok(ProofChallenges {
            arguments: ArgumentChallenges {
                perm_beta,
                perm_gamma,
                lookup,
                perm_part_alphas,
                gate_theta,
                alphas,
            },
            y,
            fri_challenges: challenger.fri_challenges(
                &self.fri_proof.commit_phase_merkle_caps,
                &self.fri_proof.final_poly,
                self.fri_proof.pow_witness,
                &common.fri_params,
            ),
        })
    }
}
