//! The Placeholder proving system: preprocessing, the permutation, lookup and gate arguments, and
//! the prover and verifier tying them together over the FRI commitment.

pub mod config;
pub mod gate_argument;
pub mod get_challenges;
pub mod lookup_argument;
pub mod permutation_argument;
pub mod preprocessor;
pub mod proof;
pub mod prover;
pub mod validate_shape;
pub mod vanishing_poly;
pub mod vars;
pub mod verifier;
