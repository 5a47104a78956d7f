//! FRI low-degree test and the list polynomial commitment built on top of it.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::fri::reduction_strategies::FriReductionStrategy;

mod challenges;
pub mod oracle;
pub mod proof;
pub mod prover;
pub mod reduction_strategies;
pub mod structure;
pub mod verifier;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FriConfig {
    /// `rate = 2^{-rate_bits}`.
    pub rate_bits: usize,

    /// Height of Merkle tree caps. Trees with fewer leaves use their full height instead.
    pub cap_height: usize,

    pub proof_of_work_bits: u32,

    pub reduction_strategy: FriReductionStrategy,

    /// Number of query rounds to perform.
    pub num_query_rounds: usize,
}

impl FriConfig {
    pub fn rate(&self) -> f64 {
        1.0 / ((1 << self.rate_bits) as f64)
    }

    /// Instantiates the configuration for codewords of degree `< 2^degree_bits`.
    pub fn fri_params(&self, degree_bits: usize) -> Result<FriParams> {
        let reduction_arity_bits = self.reduction_strategy.reduction_arity_bits(
            degree_bits,
            self.rate_bits,
            self.num_query_rounds,
        );
        let total: usize = reduction_arity_bits.iter().sum();
        ensure!(
            total <= degree_bits && reduction_arity_bits.iter().all(|&bits| bits > 0),
            ConfigurationError::Unsupported(format!(
                "FRI steps {reduction_arity_bits:?} do not fit a degree of 2^{degree_bits}"
            ))
        );
        ensure!(
            self.proof_of_work_bits <= 64,
            ConfigurationError::Unsupported("proof of work above 64 bits".into())
        );
        Ok(FriParams {
            config: self.clone(),
            hiding: false,
            degree_bits,
            reduction_arity_bits,
        })
    }
}

/// FRI parameters, including generated parameters which are specific to an instance size, in
/// contrast to `FriConfig` which is user-specified and independent of instance size.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FriParams {
    /// User-specified FRI configuration.
    pub config: FriConfig,

    /// Whether leaves are salted. Salting is not supported, so this is always `false`.
    pub hiding: bool,

    /// The degree of the purported codeword, measured in bits.
    pub degree_bits: usize,

    /// The arity of each FRI reduction step, expressed as the log2 of the actual arity.
    /// For example, `[3, 2, 1]` would describe a FRI reduction tree with 8-to-1 reduction, then
    /// a 4-to-1 reduction, then a 2-to-1 reduction. After these reductions, the reduced polynomial
    /// is sent directly.
    pub reduction_arity_bits: Vec<usize>,
}

impl FriParams {
    pub fn total_arities(&self) -> usize {
        self.reduction_arity_bits.iter().sum()
    }

    pub fn lde_bits(&self) -> usize {
        self.degree_bits + self.config.rate_bits
    }

    pub fn lde_size(&self) -> usize {
        1 << self.lde_bits()
    }

    pub fn final_poly_bits(&self) -> usize {
        self.degree_bits - self.total_arities()
    }

    pub fn final_poly_len(&self) -> usize {
        1 << self.final_poly_bits()
    }

    /// Committed trees group `2^leaf_bits` consecutive bit-reversed positions per leaf, so that a
    /// query opens a whole first-round coset at once.
    pub fn leaf_bits(&self) -> usize {
        self.reduction_arity_bits.first().copied().unwrap_or(0)
    }

    /// Leaf count of the committed batches, in bits.
    pub fn initial_tree_bits(&self) -> usize {
        self.lde_bits() - self.leaf_bits()
    }

    /// Leaf count of the tree committed in FRI round `round`, in bits.
    pub fn round_tree_bits(&self, round: usize) -> usize {
        self.lde_bits()
            - self.reduction_arity_bits[..=round]
                .iter()
                .sum::<usize>()
    }

    /// Cap height actually used for a tree with `2^tree_bits` leaves.
    pub fn cap_height_for(&self, tree_bits: usize) -> usize {
        self.config.cap_height.min(tree_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy: FriReductionStrategy) -> FriConfig {
        FriConfig {
            rate_bits: 2,
            cap_height: 4,
            proof_of_work_bits: 0,
            reduction_strategy: strategy,
            num_query_rounds: 8,
        }
    }

    #[test]
    fn params_geometry() -> Result<()> {
        let params = config(FriReductionStrategy::ConstantArityBits(2, 1)).fri_params(7)?;
        assert_eq!(params.reduction_arity_bits, vec![2, 2, 2]);
        assert_eq!(params.lde_size(), 1 << 9);
        assert_eq!(params.final_poly_len(), 2);
        assert_eq!(params.leaf_bits(), 2);
        assert_eq!(params.initial_tree_bits(), 7);
        assert_eq!(params.round_tree_bits(0), 7);
        assert_eq!(params.round_tree_bits(2), 3);
        assert_eq!(params.cap_height_for(3), 3);
        assert_eq!(params.cap_height_for(7), 4);
        Ok(())
    }

    #[test]
    fn oversized_fixed_steps_are_rejected() {
        let err = config(FriReductionStrategy::Fixed(vec![3, 3]))
            .fri_params(5)
            .unwrap_err();
        assert!(err.downcast_ref::<ConfigurationError>().is_some());
    }

    #[test]
    fn empty_step_list() -> Result<()> {
        let params = config(FriReductionStrategy::Fixed(vec![])).fri_params(3)?;
        assert_eq!(params.leaf_bits(), 0);
        assert_eq!(params.final_poly_len(), 8);
        Ok(())
    }
}
