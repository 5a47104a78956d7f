use std::iter;
use std::mem::size_of;

use keccak_hash::keccak;

use crate::hash::hash_types::{BytesHash, RichField};
use crate::hash::hashing::{PlonkyPermutation, SPONGE_WIDTH};
use crate::plonk::config::Hasher;

/// Keccak-256 pseudo-permutation (not necessarily one-to-one) used in the transcript.
///
/// The state is serialized as little-endian words and replaced by the field elements read from
/// `H(state) || H(H(state)) || ...`, skipping words that are not below the field order.
pub struct KeccakPermutation;

impl<F: RichField> PlonkyPermutation<F> for KeccakPermutation {
    fn permute(input: [F; SPONGE_WIDTH]) -> [F; SPONGE_WIDTH] {
        let mut state = input
            .iter()
            .flat_map(|x| x.to_canonical_u64().to_le_bytes())
            .collect::<Vec<u8>>();

        let hash_onion = iter::repeat_with(|| {
            let output = keccak(&state).to_fixed_bytes();
            state = output.to_vec();
            output
        });
        let mut elements = hash_onion
            .flat_map(|output| {
                output
                    .chunks_exact(size_of::<u64>())
                    .map(|word| {
                        let mut le = [0u8; 8];
                        le.copy_from_slice(word);
                        u64::from_le_bytes(le)
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|&word| word < F::ORDER)
            .map(F::from_canonical_u64);

        let mut output = [F::ZERO; SPONGE_WIDTH];
        for slot in output.iter_mut() {
            // The onion is infinite, so the filter always yields another element.
            if let Some(x) = elements.next() {
                *slot = x;
            }
        }
        output
    }
}

/// Keccak-256, truncated to `N` bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KeccakHash<const N: usize>;

impl<F: RichField, const N: usize> Hasher<F> for KeccakHash<N> {
    const HASH_SIZE: usize = N;
    type Hash = BytesHash<N>;
    type Permutation = KeccakPermutation;

    fn hash_no_pad(input: &[F]) -> Self::Hash {
        let bytes = input
            .iter()
            .flat_map(|x| x.to_canonical_u64().to_le_bytes())
            .collect::<Vec<u8>>();
        <Self as Hasher<F>>::hash_bytes(&bytes)
    }

    fn hash_bytes(bytes: &[u8]) -> Self::Hash {
        let mut arr = [0; N];
        arr.copy_from_slice(&keccak(bytes).0[..N]);
        BytesHash(arr)
    }

    fn two_to_one(left: Self::Hash, right: Self::Hash) -> Self::Hash {
        let mut v = vec![0; N * 2];
        v[0..N].copy_from_slice(&left.0);
        v[N..].copy_from_slice(&right.0);
        <Self as Hasher<F>>::hash_bytes(&v)
    }
}

#[cfg(test)]
mod tests {
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::{Field, PrimeField64, Sample};

    use super::*;

    type F = GoldilocksField;

    #[test]
    fn permutation_is_deterministic_and_canonical() {
        let mut input = [F::ZERO; SPONGE_WIDTH];
        input[3] = F::from_canonical_u64(17);
        let a = KeccakPermutation::permute(input);
        let b = KeccakPermutation::permute(input);
        assert_eq!(a, b);
        assert_ne!(a, KeccakPermutation::permute([F::ZERO; SPONGE_WIDTH]));
        assert!(a.iter().all(|x| x.to_canonical_u64() < F::ORDER));
    }

    #[test]
    fn hash_depends_on_every_element() {
        let xs = F::rand_vec(5);
        let h = <KeccakHash<32> as Hasher<F>>::hash_no_pad(&xs);
        let mut ys = xs.clone();
        ys[4] += F::ONE;
        assert_ne!(h, <KeccakHash<32> as Hasher<F>>::hash_no_pad(&ys));
        assert_eq!(h, <KeccakHash<32> as Hasher<F>>::hash_no_pad(&xs));
    }

    #[test]
    fn two_to_one_is_ordered() {
        let l = <KeccakHash<32> as Hasher<F>>::hash_no_pad(&[F::ONE]);
        let r = <KeccakHash<32> as Hasher<F>>::hash_no_pad(&[F::TWO]);
        assert_ne!(
            <KeccakHash<32> as Hasher<F>>::two_to_one(l, r),
            <KeccakHash<32> as Hasher<F>>::two_to_one(r, l)
        );
    }
}
