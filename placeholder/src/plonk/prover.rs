use std::collections::BTreeMap;

use anyhow::{ensure, Result};
use itertools::Itertools;
use log::{debug, warn};
use placeholder_field::polynomial::{PolynomialCoeffs, PolynomialValues};
use placeholder_field::zero_poly_coset::ZeroPolyOnCoset;
use placeholder_maybe_rayon::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::circuit::assignment::AssignmentTable;
use crate::circuit::variable::ColumnKind;
use crate::error::FormatError;
use crate::fri::oracle::PolynomialBatch;
use crate::hash::hash_types::RichField;
use crate::iop::challenger::Challenger;
use crate::plonk::config::GenericConfig;
use crate::plonk::lookup_argument::{
    compressed_inputs, compressed_options, lookup_polys, multiplicities,
};
use crate::plonk::permutation_argument::permutation_accumulators;
use crate::plonk::preprocessor::{CommonData, ProverOnlyData, VerifierOnlyData};
use crate::plonk::proof::{OpeningSet, PlaceholderProof};
use crate::plonk::vanishing_poly::{eval_combined_constraints, ArgumentChallenges};
use crate::plonk::vars::{
    rotated_point, ExtendedPoint, FIXED_VALUES_BATCH, LOOKUP_BATCH, PERMUTATION_BATCH,
    QUOTIENT_BATCH, VARIABLE_VALUES_BATCH,
};
use crate::timed;
use crate::util::timing::TimingTree;

pub(crate) fn prove<F: RichField, C: GenericConfig<F = F>>(
    prover_only: &ProverOnlyData<C>,
    verifier_only: &VerifierOnlyData<C>,
    common: &CommonData<F>,
    table: &AssignmentTable<F>,
    timing: &mut TimingTree,
) -> Result<PlaceholderProof<F, C>> {
    let n = common.degree();
    let description = &common.description;
    for kind in [ColumnKind::Witness, ColumnKind::PublicInput] {
        ensure!(
            table.column_count(kind) == description.columns(kind),
            FormatError::BatchInfoMismatch(format!(
                "{} {kind:?} columns, the circuit has {}",
                table.column_count(kind),
                description.columns(kind)
            ))
        );
    }
    ensure!(
        table.rows_amount() <= n,
        FormatError::BatchInfoMismatch(format!("{} rows, the circuit has {n}", table.rows_amount()))
    );

    let mut table = table.clone();
    table.apply_presets(&prover_only.presets);
    table.pad_to(n);
    if common.config.zero_knowledge {
        let mut rng = ChaCha20Rng::from_entropy();
        for column in 0..description.witness_columns {
            for row in description.usable_rows_amount..n {
                table.set(ColumnKind::Witness, column, row, F::sample(&mut rng));
            }
        }
    }

    let mut challenger = Challenger::<F, C::Hasher>::new();
    challenger.observe_hash(verifier_only.constraint_system_hash);
    challenger.observe_cap(&verifier_only.fixed_values_cap);
    challenger.observe_public_inputs(table.columns(ColumnKind::PublicInput));

    let fft_root_table = prover_only.fft_root_table.as_ref();
    let variable_values = table
        .columns(ColumnKind::Witness)
        .iter()
        .chain(table.columns(ColumnKind::PublicInput))
        .map(|column| PolynomialValues::new(column.clone()))
        .collect::<Vec<_>>();
    let variable_commitment = timed!(
        timing,
        "commit to variable values",
        PolynomialBatch::<F, C>::from_values(
            variable_values,
            &common.fri_params,
            timing,
            fft_root_table,
        )
    );
    challenger.observe_cap(variable_commitment.cap());

    let mut permutation_polys = Vec::new();
    let (perm_beta, perm_gamma) = if common.has_permutation() {
        let (beta, gamma) = (challenger.get_challenge(), challenger.get_challenge());
        let k = common.permuted_columns.len();
        let columns = common
            .permuted_columns
            .iter()
            .map(|&(kind, index)| table.column(kind, index))
            .collect::<Vec<_>>();
        permutation_polys.extend(timed!(
            timing,
            "compute permutation accumulators",
            permutation_accumulators(
                &columns,
                &prover_only.permutation_values[..k],
                &prover_only.permutation_values[k..],
                &common.permutation_parts,
                beta,
                gamma,
            )
        ));
        (beta, gamma)
    } else {
        (F::ZERO, F::ZERO)
    };

    let mut lookup_commitment = None;
    let lookup = if common.has_lookups() {
        let theta = challenger.get_challenge();
        let inputs = timed!(
            timing,
            "compress lookup inputs",
            compressed_inputs(common, &table, theta)
        );
        let options = timed!(
            timing,
            "compress lookup tables",
            compressed_options(common, &table, theta)
        );
        let counts = multiplicities(&inputs, &options, description.usable_rows_amount);
        let commitment = timed!(
            timing,
            "commit to lookup multiplicities",
            PolynomialBatch::<F, C>::from_values(
                counts.clone(),
                &common.fri_params,
                timing,
                fft_root_table,
            )
        );
        challenger.observe_cap(commitment.cap());
        lookup_commitment = Some(commitment);

        let challenges = challenger.get_lookup_challenges(theta);
        permutation_polys.extend(timed!(
            timing,
            "compute lookup sums",
            lookup_polys(&inputs, &options, &counts, challenges.alpha)?
        ));
        Some(challenges)
    } else {
        None
    };

    let permutation_commitment = if permutation_polys.is_empty() {
        None
    } else {
        let commitment = timed!(
            timing,
            "commit to permutation and lookup sums",
            PolynomialBatch::<F, C>::from_values(
                permutation_polys,
                &common.fri_params,
                timing,
                fft_root_table,
            )
        );
        challenger.observe_cap(commitment.cap());
        Some(commitment)
    };

    let perm_part_alphas = if common.permutation_parts.len() > 1 {
        challenger.get_n_challenges(common.permutation_parts.len())
    } else {
        Vec::new()
    };
    let gate_theta = challenger.get_challenge();
    let alphas = challenger.get_f_alphas();

    let mut oracles = BTreeMap::from([
        (FIXED_VALUES_BATCH, &prover_only.fixed_values),
        (VARIABLE_VALUES_BATCH, &variable_commitment),
    ]);
    if let Some(commitment) = &permutation_commitment {
        oracles.insert(PERMUTATION_BATCH, commitment);
    }
    if let Some(commitment) = &lookup_commitment {
        oracles.insert(LOOKUP_BATCH, commitment);
    }

    let challenges = ArgumentChallenges {
        perm_beta,
        perm_gamma,
        lookup,
        perm_part_alphas,
        gate_theta,
        alphas,
    };
    let quotient_chunks = timed!(
        timing,
        "compute quotient polynomial",
        compute_quotient_chunks(common, &oracles, &challenges)
    );
    let quotient_commitment = timed!(
        timing,
        "commit to quotient chunks",
        PolynomialBatch::<F, C>::from_coeffs(
            quotient_chunks,
            &common.fri_params,
            timing,
            fft_root_table,
        )
    );
    challenger.observe_cap(quotient_commitment.cap());
    oracles.insert(QUOTIENT_BATCH, &quotient_commitment);

    let y = challenger.get_evaluation_point(common.degree_bits())?;
    let openings = timed!(
        timing,
        "evaluate committed polynomials",
        open_batches(common, &oracles, y)
    );
    challenger.observe_openings(&openings);

    let instance = common.layout.fri_instance(y, common.degree_bits());
    let fri_proof = timed!(
        timing,
        "compute FRI opening proof",
        PolynomialBatch::<F, C>::prove_openings(
            &instance,
            &oracles.values().copied().collect_vec(),
            &mut challenger,
            &common.fri_params,
            timing,
        )?
    );

    let commitments = oracles
        .iter()
        .filter(|&(&batch, _)| batch != FIXED_VALUES_BATCH)
        .map(|(&batch, oracle)| (batch, oracle.cap().clone()))
        .collect();

    Ok(PlaceholderProof {
        commitments,
        openings,
        fri_proof,
    })
}

/// Values of every committed polynomial at `y * w^r` for each rotation `r` it is read at.
fn open_batches<F: RichField, C: GenericConfig<F = F>>(
    common: &CommonData<F>,
    oracles: &BTreeMap<usize, &PolynomialBatch<F, C>>,
    y: F,
) -> OpeningSet<F> {
    let values = common
        .layout
        .batches
        .iter()
        .map(|(batch, polys)| {
            let oracle = oracles[batch];
            let values = polys
                .par_iter()
                .enumerate()
                .map(|(poly, rotations)| {
                    rotations
                        .iter()
                        .map(|&r| oracle.eval(poly, rotated_point(y, r, common.degree_bits())))
                        .collect()
                })
                .collect();
            (*batch, values)
        })
        .collect();
    OpeningSet { values }
}

/// Chunks of `T = F / Z_H`, each of degree below `n`.
///
/// `F` is evaluated on the coset `g K` of size `n 2^quotient_degree_bits`, which is large enough
/// for `T` to be interpolated exactly whenever the constraints hold.
fn compute_quotient_chunks<F: RichField, C: GenericConfig<F = F>>(
    common: &CommonData<F>,
    oracles: &BTreeMap<usize, &PolynomialBatch<F, C>>,
    challenges: &ArgumentChallenges<F>,
) -> Vec<PolynomialCoeffs<F>> {
    let n = common.degree();
    let degree_bits = common.degree_bits();
    let quotient_degree_bits = common.quotient_degree_bits;
    let step = 1 << quotient_degree_bits;
    let coset_size = n << quotient_degree_bits;

    let coset_values = oracles
        .iter()
        .map(|(&batch, oracle)| {
            let values = oracle
                .polynomials
                .par_iter()
                .map(|p| {
                    p.padded(n)
                        .lde(quotient_degree_bits)
                        .coset_fft(F::coset_shift())
                        .values
                })
                .collect::<Vec<_>>();
            (batch, values)
        })
        .collect::<BTreeMap<_, _>>();

    let z_h_on_coset = ZeroPolyOnCoset::new(degree_bits, quotient_degree_bits);
    let points = F::two_adic_subgroup(degree_bits + quotient_degree_bits);
    let quotient_values = points
        .par_iter()
        .enumerate()
        .map(|(index, &point)| {
            let x = F::coset_shift() * point;
            let vars = ExtendedPoint {
                values: &coset_values,
                index,
                step,
            };
            let l_0 = z_h_on_coset.eval_l_0(index, x);
            eval_combined_constraints(common, &vars, l_0, challenges)
                * z_h_on_coset.eval_inverse(index)
        })
        .collect::<Vec<_>>();

    let mut quotient = PolynomialValues::new(quotient_values).coset_ifft(F::coset_shift());
    debug_assert_eq!(quotient.len(), coset_size);
    let num_chunks = common.num_quotient_chunks;
    if quotient.coeffs[num_chunks * n..].iter().any(|c| c.is_nonzero()) {
        warn!("the quotient is not a polynomial: the assignment does not satisfy the circuit");
    }
    quotient.coeffs.truncate(num_chunks * n);
    debug!("quotient split into {num_chunks} chunks of {n} coefficients");
    quotient.chunks(n)
}
