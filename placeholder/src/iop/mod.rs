//! Fiat-Shamir transcript.

pub mod challenger;
