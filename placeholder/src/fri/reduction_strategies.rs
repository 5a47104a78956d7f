use std::time::Instant;

use log::debug;
use serde::{Deserialize, Serialize};

/// How the arity of each FRI folding round is chosen.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum FriReductionStrategy {
    /// The exact sequence of arities, in bits.
    Fixed(Vec<usize>),

    /// `ConstantArityBits(arity_bits, final_poly_bits)` folds by `2^arity_bits` until the degree
    /// is at most `2^final_poly_bits`. The last step shrinks if fewer bits are left.
    ConstantArityBits(usize, usize),

    /// `MinSize(opt_max_arity_bits)` searches for the arity sequence with the smallest estimated
    /// proof, optionally capping every arity.
    MinSize(Option<usize>),
}

impl FriReductionStrategy {
    /// The arity of each FRI reduction step, expressed as the log2 of the actual arity.
    pub fn reduction_arity_bits(
        &self,
        degree_bits: usize,
        rate_bits: usize,
        num_queries: usize,
    ) -> Vec<usize> {
        match self {
            FriReductionStrategy::Fixed(reduction_arity_bits) => reduction_arity_bits.to_vec(),

            &FriReductionStrategy::ConstantArityBits(arity_bits, final_poly_bits) => {
                let mut remaining = degree_bits;
                let mut steps = Vec::new();
                while remaining > final_poly_bits && arity_bits > 0 {
                    let step = arity_bits.min(remaining - final_poly_bits);
                    steps.push(step);
                    remaining -= step;
                }
                steps
            }

            FriReductionStrategy::MinSize(opt_max_arity_bits) => {
                min_size_arity_bits(degree_bits, rate_bits, num_queries, *opt_max_arity_bits)
            }
        }
    }
}

fn min_size_arity_bits(
    degree_bits: usize,
    rate_bits: usize,
    num_queries: usize,
    opt_max_arity_bits: Option<usize>,
) -> Vec<usize> {
    let max_arity_bits = opt_max_arity_bits.unwrap_or(4);

    let start = Instant::now();
    let (arity_bits, size) =
        min_size_arity_bits_helper(degree_bits, rate_bits, num_queries, max_arity_bits, vec![]);
    debug!(
        "FRI steps {:?} chosen in {:.3}s, estimated proof size {} elements",
        arity_bits,
        start.elapsed().as_secs_f32(),
        size
    );
    arity_bits
}

/// Returns `(arity_bits, estimated_size)` of the best sequence extending `prefix`.
fn min_size_arity_bits_helper(
    degree_bits: usize,
    rate_bits: usize,
    num_queries: usize,
    max_arity_bits: usize,
    prefix: Vec<usize>,
) -> (Vec<usize>, usize) {
    let folded: usize = prefix.iter().sum();
    let remaining_bits = degree_bits - folded;

    let mut best = (
        prefix.clone(),
        relative_proof_size(degree_bits, rate_bits, num_queries, &prefix),
    );

    // Optimal sequences never increase, since a large arity saves more when it comes early.
    let next_max = prefix
        .last()
        .copied()
        .unwrap_or(max_arity_bits)
        .min(remaining_bits);
    for next_arity_bits in 1..=next_max {
        let mut extended = prefix.clone();
        extended.push(next_arity_bits);
        let candidate = min_size_arity_bits_helper(
            degree_bits,
            rate_bits,
            num_queries,
            max_arity_bits,
            extended,
        );
        if candidate.1 < best.1 {
            best = candidate;
        }
    }
    best
}

/// Field elements (and digests counted as four elements) a proof with these steps would carry,
/// ignoring the initial openings which do not depend on the steps.
fn relative_proof_size(
    degree_bits: usize,
    rate_bits: usize,
    num_queries: usize,
    arity_bits: &[usize],
) -> usize {
    let mut layer_bits = degree_bits + rate_bits;
    let mut total = 0;
    for &bits in arity_bits {
        // Sibling evaluations of the queried coset.
        total += ((1 << bits) - 1) * num_queries;
        // Merkle path of that coset.
        total += (layer_bits - bits) * 4 * num_queries;
        layer_bits -= bits;
    }
    total + (1 << (layer_bits - rate_bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_arity_shrinks_last_step() {
        let steps = FriReductionStrategy::ConstantArityBits(3, 1).reduction_arity_bits(8, 2, 10);
        assert_eq!(steps, vec![3, 3, 1]);
        let steps = FriReductionStrategy::ConstantArityBits(2, 3).reduction_arity_bits(3, 2, 10);
        assert!(steps.is_empty());
    }

    #[test]
    fn min_size_is_no_worse_than_constant() {
        let (degree_bits, rate_bits, queries) = (12, 3, 28);
        let min = FriReductionStrategy::MinSize(None).reduction_arity_bits(
            degree_bits,
            rate_bits,
            queries,
        );
        assert!(min.iter().sum::<usize>() <= degree_bits);
        let constant = FriReductionStrategy::ConstantArityBits(2, 0).reduction_arity_bits(
            degree_bits,
            rate_bits,
            queries,
        );
        assert!(
            relative_proof_size(degree_bits, rate_bits, queries, &min)
                <= relative_proof_size(degree_bits, rate_bits, queries, &constant)
        );
        assert!(min.windows(2).all(|w| w[0] >= w[1]));
    }
}
