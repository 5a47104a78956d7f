use std::fmt::Debug;

use placeholder_field::goldilocks_field::GoldilocksField;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::fri::reduction_strategies::FriReductionStrategy;
use crate::fri::FriConfig;
use crate::hash::hash_types::RichField;
use crate::hash::hashing::PlonkyPermutation;
use crate::hash::keccak::KeccakHash;

pub trait GenericHashOut<F: RichField>:
    Copy + Clone + Debug + Default + Eq + PartialEq + Send + Sync + Serialize + DeserializeOwned
{
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> Self;

    /// Field elements the transcript absorbs for this digest.
    fn to_vec(&self) -> Vec<F>;
}

/// Trait for hash functions.
pub trait Hasher<F: RichField>: Sized + Clone + Debug + Eq + PartialEq + Send + Sync {
    /// Size of `Hash` in bytes.
    const HASH_SIZE: usize;
    type Hash: GenericHashOut<F>;

    /// Permutation used by the transcript.
    type Permutation: PlonkyPermutation<F>;

    fn hash_no_pad(input: &[F]) -> Self::Hash;
    fn hash_bytes(bytes: &[u8]) -> Self::Hash;
    fn two_to_one(left: Self::Hash, right: Self::Hash) -> Self::Hash;
}

/// Field and hash function a proof is generated over.
pub trait GenericConfig:
    Debug + Clone + Sync + Sized + Send + Eq + PartialEq + Serialize + DeserializeOwned
{
    type F: RichField;
    type Hasher: Hasher<Self::F>;
}

/// Goldilocks with Keccak-256 leaves and transcript.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct KeccakGoldilocksConfig;

impl GenericConfig for KeccakGoldilocksConfig {
    type F = GoldilocksField;
    type Hasher = KeccakHash<32>;
}

/// Protocol-level knobs shared by the preprocessor, prover and verifier.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderConfig {
    pub fri_config: FriConfig,
    /// Upper bound on the number of quotient chunks; long permutation products are split so that
    /// no part exceeds this degree budget.
    pub max_quotient_chunks: usize,
    /// Randomize the witness rows that lie outside of the usable region.
    pub zero_knowledge: bool,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            fri_config: FriConfig {
                rate_bits: 3,
                cap_height: 0,
                proof_of_work_bits: 16,
                reduction_strategy: FriReductionStrategy::ConstantArityBits(3, 2),
                num_query_rounds: 28,
            },
            max_quotient_chunks: 8,
            zero_knowledge: true,
        }
    }
}

impl PlaceholderConfig {
    /// Fast parameters for tests; the soundness they give is far below production levels.
    pub fn standard_test_config() -> Self {
        Self {
            fri_config: FriConfig {
                rate_bits: 2,
                cap_height: 1,
                proof_of_work_bits: 4,
                reduction_strategy: FriReductionStrategy::ConstantArityBits(2, 1),
                num_query_rounds: 10,
            },
            max_quotient_chunks: 8,
            zero_knowledge: true,
        }
    }

    /// Terms per permutation part: a chunk of `c` columns yields a part of degree `c + 2`.
    pub fn permutation_chunk_size(&self) -> usize {
        self.max_quotient_chunks.saturating_sub(1).max(1)
    }
}
