use placeholder_maybe_rayon::*;
use serde::{Deserialize, Serialize};

use crate::hash::hash_types::RichField;
use crate::hash::merkle_proofs::MerkleProof;
use crate::plonk::config::{GenericHashOut, Hasher};
use crate::util::log2_strict;

/// The digests at height `cap_height` of a Merkle tree. A cap of height zero is the root.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(bound = "")]
pub struct MerkleCap<F: RichField, H: Hasher<F>>(pub Vec<H::Hash>);

impl<F: RichField, H: Hasher<F>> MerkleCap<F, H> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn height(&self) -> usize {
        log2_strict(self.len())
    }

    pub fn flatten(&self) -> Vec<F> {
        self.0.iter().flat_map(|h| h.to_vec()).collect()
    }
}

#[derive(Clone, Debug)]
pub struct MerkleTree<F: RichField, H: Hasher<F>> {
    /// The data in the leaves of the Merkle tree.
    pub leaves: Vec<Vec<F>>,

    /// The digests of every subtree below the cap, stored recursively: a subtree is laid out as
    /// its left subtree, the left child digest, the right child digest, then its right subtree.
    /// The layout keeps every sibling of a path within one contiguous region.
    pub digests: Vec<H::Hash>,

    pub cap: MerkleCap<F, H>,
}

fn fill_subtree<F: RichField, H: Hasher<F>>(
    digests_buf: &mut [H::Hash],
    leaves: &[Vec<F>],
) -> H::Hash {
    debug_assert_eq!(leaves.len(), digests_buf.len() / 2 + 1);
    if digests_buf.is_empty() {
        return H::hash_no_pad(&leaves[0]);
    }

    let half = digests_buf.len() / 2;
    let (left_half, right_half) = digests_buf.split_at_mut(half);
    let (left_subtree, left_digest_mem) = left_half.split_at_mut(half - 1);
    let (right_digest_mem, right_subtree) = right_half.split_at_mut(1);
    let (left_leaves, right_leaves) = leaves.split_at(leaves.len() / 2);

    let (left_digest, right_digest) = join(
        || fill_subtree::<F, H>(left_subtree, left_leaves),
        || fill_subtree::<F, H>(right_subtree, right_leaves),
    );

    left_digest_mem[0] = left_digest;
    right_digest_mem[0] = right_digest;
    H::two_to_one(left_digest, right_digest)
}

fn fill_digests_buf<F: RichField, H: Hasher<F>>(
    digests_buf: &mut [H::Hash],
    cap_buf: &mut [H::Hash],
    leaves: &[Vec<F>],
    cap_height: usize,
) {
    // The cap sits at the leaf layer: every cap entry is a single leaf hash.
    if digests_buf.is_empty() {
        debug_assert_eq!(cap_buf.len(), leaves.len());
        cap_buf
            .par_iter_mut()
            .zip(leaves)
            .for_each(|(cap_entry, leaf)| {
                *cap_entry = H::hash_no_pad(leaf);
            });
        return;
    }

    let subtree_digests_len = digests_buf.len() >> cap_height;
    let subtree_leaves_len = leaves.len() >> cap_height;
    let digests_chunks = digests_buf.par_chunks_exact_mut(subtree_digests_len);
    let leaves_chunks = leaves.par_chunks_exact(subtree_leaves_len);
    digests_chunks.zip(cap_buf).zip(leaves_chunks).for_each(
        |((subtree_digests, subtree_cap), subtree_leaves)| {
            *subtree_cap = fill_subtree::<F, H>(subtree_digests, subtree_leaves);
        },
    );
}

impl<F: RichField, H: Hasher<F>> MerkleTree<F, H> {
    /// Panics unless the number of leaves is a power of two at least `2^cap_height`.
    pub fn new(leaves: Vec<Vec<F>>, cap_height: usize) -> Self {
        let log2_leaves_len = log2_strict(leaves.len());
        assert!(
            cap_height <= log2_leaves_len,
            "cap_height={cap_height} should be at most log2(leaves.len())={log2_leaves_len}"
        );

        let num_digests = 2 * (leaves.len() - (1 << cap_height));
        let mut digests = vec![H::Hash::default(); num_digests];
        let mut cap = vec![H::Hash::default(); 1 << cap_height];
        fill_digests_buf::<F, H>(&mut digests, &mut cap, &leaves, cap_height);

        Self {
            leaves,
            digests,
            cap: MerkleCap(cap),
        }
    }

    pub fn get(&self, i: usize) -> &[F] {
        &self.leaves[i]
    }

    /// Authentication path of leaf `leaf_index` up to the cap.
    pub fn prove(&self, leaf_index: usize) -> MerkleProof<F, H> {
        let cap_height = log2_strict(self.cap.len());
        let num_layers = log2_strict(self.leaves.len()) - cap_height;
        debug_assert_eq!(leaf_index >> (cap_height + num_layers), 0);

        let digest_tree = {
            let tree_index = leaf_index >> num_layers;
            let tree_len = self.digests.len() >> cap_height;
            &self.digests[tree_len * tree_index..tree_len * (tree_index + 1)]
        };

        let mut pair_index = leaf_index & ((1 << num_layers) - 1);
        let siblings = (0..num_layers)
            .map(|i| {
                let parity = pair_index & 1;
                pair_index >>= 1;

                // Start of the subtree holding both children, then pick the other child.
                let siblings_index = (pair_index << (i + 1)) + (1 << i) - 1;
                let sibling_index = 2 * siblings_index + (1 - parity);
                digest_tree[sibling_index]
            })
            .collect();

        MerkleProof { siblings }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use placeholder_field::types::Sample;

    use super::*;
    use crate::hash::merkle_proofs::verify_merkle_proof_to_cap;
    use crate::plonk::config::{GenericConfig, KeccakGoldilocksConfig};

    type C = KeccakGoldilocksConfig;
    type F = <C as GenericConfig>::F;
    type H = <C as GenericConfig>::Hasher;

    fn random_data(n: usize, k: usize) -> Vec<Vec<F>> {
        (0..n).map(|_| F::rand_vec(k)).collect()
    }

    fn verify_all_leaves(leaves: Vec<Vec<F>>, cap_height: usize) -> Result<()> {
        let tree = MerkleTree::<F, H>::new(leaves.clone(), cap_height);
        for (i, leaf) in leaves.into_iter().enumerate() {
            let proof = tree.prove(i);
            verify_merkle_proof_to_cap(&leaf, i, &tree.cap, &proof)?;
        }
        Ok(())
    }

    #[test]
    #[should_panic]
    fn test_cap_height_too_big() {
        let log_n = 3;
        let leaves = random_data(1 << log_n, 4);
        let _ = MerkleTree::<F, H>::new(leaves, log_n + 1);
    }

    #[test]
    fn test_cap_height_eq_log2_len() -> Result<()> {
        let log_n = 5;
        verify_all_leaves(random_data(1 << log_n, 3), log_n)
    }

    #[test]
    fn test_merkle_trees() -> Result<()> {
        let log_n = 6;
        let leaves = random_data(1 << log_n, 7);
        for cap_height in [0, 1, 3] {
            verify_all_leaves(leaves.clone(), cap_height)?;
        }
        Ok(())
    }

    #[test]
    fn root_matches_naive_layering() {
        let leaves = random_data(8, 2);
        let tree = MerkleTree::<F, H>::new(leaves.clone(), 0);
        let mut layer = leaves
            .iter()
            .map(|l| <H as Hasher<F>>::hash_no_pad(l))
            .collect::<Vec<_>>();
        while layer.len() > 1 {
            layer = layer
                .chunks(2)
                .map(|pair| <H as Hasher<F>>::two_to_one(pair[0], pair[1]))
                .collect();
        }
        assert_eq!(tree.cap.0, layer);
    }
}
