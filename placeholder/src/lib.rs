#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::type_complexity)]

pub use placeholder_field as field;

pub mod circuit;
pub mod components;
pub mod error;
pub mod fri;
pub mod hash;
pub mod iop;
pub mod plonk;
pub mod util;
