use std::marker::PhantomData;

use crate::hash::hash_types::{HashOut, RichField};
use crate::hash::hashing::{PlonkyPermutation, SPONGE_RATE, SPONGE_WIDTH};
use crate::hash::merkle_tree::MerkleCap;
use crate::plonk::config::{GenericHashOut, Hasher};

/// Observes prover messages, and generates challenges by hashing the transcript, a la Fiat-Shamir.
///
/// The sponge runs in overwrite mode: absorbed chunks replace the rate part of the state instead
/// of being added to it.
#[derive(Clone)]
pub struct Challenger<F: RichField, H: Hasher<F>> {
    sponge_state: [F; SPONGE_WIDTH],
    input_buffer: Vec<F>,
    output_buffer: Vec<F>,
    _phantom: PhantomData<H>,
}

impl<F: RichField, H: Hasher<F>> Challenger<F, H> {
    pub fn new() -> Challenger<F, H> {
        Challenger {
            sponge_state: [F::ZERO; SPONGE_WIDTH],
            input_buffer: Vec::new(),
            output_buffer: Vec::new(),
            _phantom: PhantomData,
        }
    }

    pub fn observe_element(&mut self, element: F) {
        // Buffered outputs no longer reflect the transcript.
        self.output_buffer.clear();
        self.input_buffer.push(element);
    }

    pub fn observe_elements(&mut self, elements: &[F]) {
        for &element in elements {
            self.observe_element(element);
        }
    }

    pub fn observe_hash(&mut self, hash: H::Hash) {
        self.observe_elements(&hash.to_vec())
    }

    pub fn observe_cap(&mut self, cap: &MerkleCap<F, H>) {
        for &hash in &cap.0 {
            self.observe_hash(hash);
        }
    }

    /// A `u64` enters the transcript as its two 32-bit limbs, low limb first.
    pub fn observe_u64(&mut self, value: u64) {
        self.observe_element(F::from_canonical_u32(value as u32));
        self.observe_element(F::from_canonical_u32((value >> 32) as u32));
    }

    pub fn get_challenge(&mut self) -> F {
        self.absorb_buffered_inputs();

        if self.output_buffer.is_empty() {
            self.sponge_state = H::Permutation::permute(self.sponge_state);
            self.output_buffer = self.sponge_state[0..SPONGE_RATE].to_vec();
        }

        match self.output_buffer.pop() {
            Some(challenge) => challenge,
            None => unreachable!("the rate is non-empty"),
        }
    }

    pub fn get_n_challenges(&mut self, n: usize) -> Vec<F> {
        (0..n).map(|_| self.get_challenge()).collect()
    }

    pub fn get_hash(&mut self) -> HashOut<F> {
        HashOut {
            elements: [
                self.get_challenge(),
                self.get_challenge(),
                self.get_challenge(),
                self.get_challenge(),
            ],
        }
    }

    fn absorb_buffered_inputs(&mut self) {
        if self.input_buffer.is_empty() {
            return;
        }

        for input_chunk in self.input_buffer.chunks(SPONGE_RATE) {
            self.sponge_state[..input_chunk.len()].copy_from_slice(input_chunk);
            self.sponge_state = H::Permutation::permute(self.sponge_state);
        }

        self.output_buffer = self.sponge_state[0..SPONGE_RATE].to_vec();
        self.input_buffer.clear();
    }
}

impl<F: RichField, H: Hasher<F>> Default for Challenger<F, H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use placeholder_field::types::{Field, Sample};

    use super::*;
    use crate::plonk::config::{GenericConfig, KeccakGoldilocksConfig};

    type C = KeccakGoldilocksConfig;
    type F = <C as GenericConfig>::F;
    type H = <C as GenericConfig>::Hasher;

    #[test]
    fn identical_transcripts_agree() {
        let inputs = F::rand_vec(11);
        let mut a = Challenger::<F, H>::new();
        let mut b = Challenger::<F, H>::new();
        a.observe_elements(&inputs);
        b.observe_elements(&inputs);
        assert_eq!(a.get_n_challenges(20), b.get_n_challenges(20));
        a.observe_u64(7);
        b.observe_u64(7);
        assert_eq!(a.get_hash(), b.get_hash());
    }

    #[test]
    fn observations_change_challenges() {
        let mut a = Challenger::<F, H>::new();
        let mut b = Challenger::<F, H>::new();
        a.observe_element(F::ONE);
        b.observe_element(F::TWO);
        assert_ne!(a.get_challenge(), b.get_challenge());
    }

    #[test]
    fn interleaving_matters() {
        // Drawing a challenge in between must change later challenges.
        let mut a = Challenger::<F, H>::new();
        let mut b = Challenger::<F, H>::new();
        a.observe_element(F::ONE);
        let _ = a.get_challenge();
        a.observe_element(F::TWO);
        b.observe_elements(&[F::ONE, F::TWO]);
        assert_ne!(a.get_challenge(), b.get_challenge());
    }

    #[test]
    fn successive_challenges_differ() {
        let mut challenger = Challenger::<F, H>::new();
        let challenges = challenger.get_n_challenges(3 * SPONGE_RATE);
        for i in 0..challenges.len() {
            for j in 0..i {
                assert_ne!(challenges[i], challenges[j]);
            }
        }
    }
}
