use anyhow::Result;
use placeholder_field::fft::FftRootTable;
use placeholder_field::polynomial::{PolynomialCoeffs, PolynomialValues};
use placeholder_maybe_rayon::*;

use crate::fri::proof::FriProof;
use crate::fri::prover::fri_proof;
use crate::fri::structure::{FriBatchInfo, FriInstanceInfo};
use crate::fri::FriParams;
use crate::hash::hash_types::RichField;
use crate::hash::merkle_tree::{MerkleCap, MerkleTree};
use crate::iop::challenger::Challenger;
use crate::plonk::config::GenericConfig;
use crate::timed;
use crate::util::reducing::ReducingFactor;
use crate::util::timing::TimingTree;
use crate::util::reverse_index_bits_in_place;

/// A batch of polynomials of degree `< 2^degree_log`, committed through the Merkle tree of their
/// low-degree extension.
#[derive(Debug)]
pub struct PolynomialBatch<F: RichField, C: GenericConfig<F = F>> {
    pub polynomials: Vec<PolynomialCoeffs<F>>,
    pub merkle_tree: MerkleTree<F, C::Hasher>,
    pub degree_log: usize,
    pub rate_bits: usize,
    /// Each leaf spans `2^leaf_bits` consecutive bit-reversed LDE positions.
    pub leaf_bits: usize,
}

impl<F: RichField, C: GenericConfig<F = F>> PolynomialBatch<F, C> {
    /// Commits to the polynomials interpolating `values` over the trace domain.
    pub fn from_values(
        values: Vec<PolynomialValues<F>>,
        fri_params: &FriParams,
        timing: &mut TimingTree,
        fft_root_table: Option<&FftRootTable<F>>,
    ) -> Self {
        let coeffs = timed!(
            timing,
            "IFFT",
            values.into_par_iter().map(|v| v.ifft()).collect::<Vec<_>>()
        );
        Self::from_coeffs(coeffs, fri_params, timing, fft_root_table)
    }

    pub fn from_coeffs(
        polynomials: Vec<PolynomialCoeffs<F>>,
        fri_params: &FriParams,
        timing: &mut TimingTree,
        fft_root_table: Option<&FftRootTable<F>>,
    ) -> Self {
        let degree = 1 << fri_params.degree_bits;
        let rate_bits = fri_params.config.rate_bits;
        let leaf_bits = fri_params.leaf_bits();

        let lde_values = timed!(
            timing,
            "FFT",
            Self::lde_values(&polynomials, degree, rate_bits, fft_root_table)
        );

        let leaves = timed!(
            timing,
            "group LDE cosets into leaves",
            Self::leaves(&lde_values, degree << rate_bits, leaf_bits)
        );
        let cap_height = fri_params.cap_height_for(fri_params.initial_tree_bits());
        let merkle_tree = timed!(
            timing,
            "build Merkle tree",
            MerkleTree::new(leaves, cap_height)
        );

        Self {
            polynomials,
            merkle_tree,
            degree_log: fri_params.degree_bits,
            rate_bits,
            leaf_bits,
        }
    }

    /// Bit-reversed evaluations of every polynomial over `g * H'`.
    fn lde_values(
        polynomials: &[PolynomialCoeffs<F>],
        degree: usize,
        rate_bits: usize,
        fft_root_table: Option<&FftRootTable<F>>,
    ) -> Vec<Vec<F>> {
        polynomials
            .par_iter()
            .map(|p| {
                assert!(p.len() <= degree, "polynomial exceeds the committed degree");
                let mut values = p
                    .padded(degree)
                    .lde(rate_bits)
                    .coset_fft_with_options(F::coset_shift(), fft_root_table)
                    .values;
                reverse_index_bits_in_place(&mut values);
                values
            })
            .collect()
    }

    fn leaves(lde_values: &[Vec<F>], lde_size: usize, leaf_bits: usize) -> Vec<Vec<F>> {
        let coset = 1 << leaf_bits;
        (0..lde_size >> leaf_bits)
            .into_par_iter()
            .map(|leaf| {
                lde_values
                    .iter()
                    .flat_map(|values| values[leaf * coset..(leaf + 1) * coset].iter().copied())
                    .collect()
            })
            .collect()
    }

    pub fn cap(&self) -> &MerkleCap<F, C::Hasher> {
        &self.merkle_tree.cap
    }

    pub fn len(&self) -> usize {
        self.polynomials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polynomials.is_empty()
    }

    /// Evaluates polynomial `index` at `x`.
    pub fn eval(&self, index: usize, x: F) -> F {
        self.polynomials[index].eval(x)
    }

    /// Produces the FRI proof that every polynomial of `instance` opens to the values the
    /// transcript already absorbed.
    pub fn prove_openings(
        instance: &FriInstanceInfo<F>,
        oracles: &[&Self],
        challenger: &mut Challenger<F, C::Hasher>,
        fri_params: &FriParams,
        timing: &mut TimingTree,
    ) -> Result<FriProof<F, C::Hasher>> {
        let alpha = challenger.get_challenge();
        let mut alpha = ReducingFactor::new(alpha);
        let degree = 1 << fri_params.degree_bits;

        // For each point `z_i` the batch `F_i = sum_j alpha^j f_ij` is divided by `X - z_i`; the
        // quotients are chained so that every power of alpha appears once overall.
        let mut final_poly = PolynomialCoeffs::empty();
        for FriBatchInfo { point, polynomials } in &instance.batches {
            let polys_coeff = polynomials.iter().map(|fri_poly| {
                &oracles[fri_poly.oracle_index].polynomials[fri_poly.polynomial_index]
            });
            let composition_poly = timed!(
                timing,
                &format!("reduce batch of {} polynomials", polynomials.len()),
                alpha.reduce_polys(polys_coeff)
            );
            let mut quotient = composition_poly.padded(degree).divide_by_linear(*point);
            quotient.coeffs.push(F::ZERO);
            alpha.shift_poly(&mut final_poly);
            final_poly += &quotient;
        }

        let lde_final_poly = final_poly.padded(degree).lde(fri_params.config.rate_bits);
        let lde_final_values = timed!(
            timing,
            &format!("perform final FFT {}", lde_final_poly.len()),
            lde_final_poly.coset_fft(F::coset_shift())
        );

        fri_proof::<F, C>(
            &oracles.iter().map(|c| &c.merkle_tree).collect::<Vec<_>>(),
            lde_final_poly,
            lde_final_values,
            challenger,
            fri_params,
            timing,
        )
    }
}

