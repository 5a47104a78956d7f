#![allow(clippy::new_without_default)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::return_self_not_must_use)]

pub mod fft;
pub mod goldilocks_field;
pub mod interpolation;
pub mod ops;
pub mod polynomial;
pub mod types;
pub mod zero_poly_coset;

#[cfg(test)]
mod field_testing;
