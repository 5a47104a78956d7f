//! Everything derived from a constraint system before any witness is known: the polynomial
//! layout, the fixed-values commitment and the constraint-system digest.

use std::collections::BTreeSet;
use std::ops::Range;

use anyhow::{ensure, Result};
use log::{info, warn};
use placeholder_field::fft::{fft_root_table, FftRootTable};
use placeholder_field::polynomial::PolynomialValues;

use crate::circuit::assignment::{AssignmentTable, TableDescription};
use crate::circuit::constraint_system::ConstraintSystem;
use crate::circuit::variable::{ColumnKind, Variable};
use crate::error::ConfigurationError;
use crate::fri::oracle::PolynomialBatch;
use crate::fri::FriParams;
use crate::hash::hash_types::RichField;
use crate::hash::merkle_tree::MerkleCap;
use crate::plonk::config::{GenericConfig, Hasher, PlaceholderConfig};
use crate::plonk::permutation_argument::{identity_polys, k_is, Cell, Forest};
use crate::plonk::proof::PlaceholderProof;
use crate::plonk::vars::{
    OpeningLayout, FIXED_VALUES_BATCH, LOOKUP_BATCH, PERMUTATION_BATCH, QUOTIENT_BATCH,
    VARIABLE_VALUES_BATCH,
};
use crate::plonk::{prover, verifier};
use crate::timed;
use crate::util::log2_ceil;
use crate::util::timing::TimingTree;

/// Circuit data shared by the prover and the verifier.
#[derive(Clone, Debug)]
pub struct CommonData<F: RichField> {
    pub config: PlaceholderConfig,
    pub constraint_system: ConstraintSystem<F>,
    pub description: TableDescription,
    pub fri_params: FriParams,

    /// Columns read by copy constraints, ascending.
    pub permuted_columns: Vec<(ColumnKind, usize)>,
    /// Ranges of `permuted_columns` whose products form one chain link each.
    pub permutation_parts: Vec<Range<usize>>,
    /// The coset shifts of the identity permutation, one per permuted column.
    pub k_is: Vec<F>,

    /// Largest degree of an argument part, in multiples of the trace degree.
    pub quotient_degree: usize,
    pub num_quotient_chunks: usize,
    /// The quotient is evaluated on a coset `2^quotient_degree_bits` times the trace domain.
    pub quotient_degree_bits: usize,

    pub layout: OpeningLayout,
}

impl<F: RichField> CommonData<F> {
    pub fn new(
        constraint_system: ConstraintSystem<F>,
        description: TableDescription,
        config: PlaceholderConfig,
    ) -> Result<Self> {
        let n = description.rows_amount;
        ensure!(
            n.is_power_of_two() && n >= 4,
            ConfigurationError::Unsupported(format!("{n} rows is not a power of two above 2"))
        );
        ensure!(
            description.usable_rows_amount < n,
            ConfigurationError::Unsupported("no row is left for blinding".into())
        );
        for (kind, index) in constraint_system
            .copy_constraints
            .iter()
            .flat_map(|c| [c.left, c.right])
            .map(|v| (v.kind, v.index))
        {
            ensure!(
                kind != ColumnKind::Selector && index < description.columns(kind),
                ConfigurationError::Unsupported(format!(
                    "copy constraint on missing {kind:?} column {index}"
                ))
            );
        }
        let fri_params = config.fri_config.fri_params(description.degree_bits())?;

        let permuted_columns = constraint_system
            .copy_constraints
            .iter()
            .flat_map(|c| [c.left, c.right])
            .map(|v| (v.kind, v.index))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let chunk = config.permutation_chunk_size();
        let permutation_parts = (0..permuted_columns.len())
            .step_by(chunk)
            .map(|start| start..(start + chunk).min(permuted_columns.len()))
            .collect::<Vec<_>>();
        let k_is = k_is(permuted_columns.len());

        let mut quotient_degree = constraint_system.max_gate_degree().max(1);
        if let Some(last) = permutation_parts.last() {
            quotient_degree = quotient_degree.max(3).max(last.len() + 2);
            for part in &permutation_parts[..permutation_parts.len() - 1] {
                quotient_degree = quotient_degree.max(part.len() + 1);
            }
        }
        if constraint_system.has_lookups() {
            quotient_degree = quotient_degree
                .max(3)
                .max(constraint_system.max_lookup_input_degree() + 1);
        }
        let num_quotient_chunks = quotient_degree.saturating_sub(1).max(1);
        if num_quotient_chunks > config.max_quotient_chunks {
            warn!(
                "constraints of degree {quotient_degree} need {num_quotient_chunks} quotient chunks, above the configured {}",
                config.max_quotient_chunks
            );
        }

        let mut common = Self {
            config,
            constraint_system,
            description,
            fri_params,
            permuted_columns,
            permutation_parts,
            k_is,
            quotient_degree,
            num_quotient_chunks,
            quotient_degree_bits: log2_ceil(num_quotient_chunks),
            layout: OpeningLayout::default(),
        };
        common.layout = common.opening_layout();
        Ok(common)
    }

    fn opening_layout(&self) -> OpeningLayout {
        let cs = &self.constraint_system;
        let at_zero = |count: usize| vec![BTreeSet::from([0]); count];
        let read = |kind: ColumnKind| {
            (0..self.description.columns(kind))
                .map(|i| cs.rotations(kind, i))
                .collect::<Vec<_>>()
        };

        let mut layout = OpeningLayout::default();
        layout.insert(
            FIXED_VALUES_BATCH,
            [
                at_zero(2 * self.permuted_columns.len() + 2),
                read(ColumnKind::Constant),
                read(ColumnKind::Selector),
            ]
            .concat(),
        );
        layout.insert(
            VARIABLE_VALUES_BATCH,
            [read(ColumnKind::Witness), read(ColumnKind::PublicInput)].concat(),
        );
        let mut permutation = Vec::new();
        if self.has_permutation() {
            permutation.push(BTreeSet::from([0, 1]));
            permutation.extend(at_zero(self.permutation_parts.len() - 1));
        }
        if self.has_lookups() {
            permutation.push(BTreeSet::from([0, 1]));
            permutation.extend(at_zero(
                cs.num_lookup_inputs() + cs.num_lookup_options(),
            ));
            layout.insert(LOOKUP_BATCH, at_zero(cs.num_lookup_options()));
        }
        if !permutation.is_empty() {
            layout.insert(PERMUTATION_BATCH, permutation);
        }
        layout.insert(QUOTIENT_BATCH, at_zero(self.num_quotient_chunks));
        layout
    }

    pub fn degree_bits(&self) -> usize {
        self.description.degree_bits()
    }

    pub fn degree(&self) -> usize {
        self.description.rows_amount
    }

    pub fn has_permutation(&self) -> bool {
        !self.permuted_columns.is_empty()
    }

    pub fn has_lookups(&self) -> bool {
        self.constraint_system.has_lookups()
    }

    pub fn id_index(&self, i: usize) -> usize {
        i
    }

    pub fn sigma_index(&self, i: usize) -> usize {
        self.permuted_columns.len() + i
    }

    pub fn q_last_index(&self) -> usize {
        2 * self.permuted_columns.len()
    }

    pub fn q_blind_index(&self) -> usize {
        self.q_last_index() + 1
    }

    fn constants_offset(&self) -> usize {
        self.q_blind_index() + 1
    }

    fn selectors_offset(&self) -> usize {
        self.constants_offset() + self.description.constant_columns
    }

    /// Batch and position of a column.
    pub fn column_position(&self, (kind, index): (ColumnKind, usize)) -> (usize, usize) {
        match kind {
            ColumnKind::Witness => (VARIABLE_VALUES_BATCH, index),
            ColumnKind::PublicInput => (
                VARIABLE_VALUES_BATCH,
                self.description.witness_columns + index,
            ),
            ColumnKind::Constant => (FIXED_VALUES_BATCH, self.constants_offset() + index),
            ColumnKind::Selector => (FIXED_VALUES_BATCH, self.selectors_offset() + index),
        }
    }

    pub fn variable_position(&self, var: &Variable) -> (usize, usize) {
        self.column_position((var.kind, var.index))
    }

    fn num_permutation_accumulators(&self) -> usize {
        if self.has_permutation() {
            self.permutation_parts.len()
        } else {
            0
        }
    }

    /// Position of the lookup sum `U` in the permutation batch.
    pub fn lookup_sum_index(&self) -> usize {
        self.num_permutation_accumulators()
    }

    /// Position of the helper `H_j` of the `j`-th lookup input.
    pub fn lookup_input_helper_index(&self, j: usize) -> usize {
        self.lookup_sum_index() + 1 + j
    }

    /// Position of the helper `G_i` of the `i`-th table option.
    pub fn lookup_table_helper_index(&self, i: usize) -> usize {
        self.lookup_input_helper_index(self.constraint_system.num_lookup_inputs()) + i
    }

    /// Every table option as `(table id, columns)`, in table order.
    pub fn lookup_options(&self) -> Vec<(usize, &[Variable])> {
        self.constraint_system
            .lookup_tables
            .iter()
            .enumerate()
            .flat_map(|(id, table)| table.options.iter().map(move |o| (id, o.as_slice())))
            .collect()
    }

    /// Number of public input values of each column the verifier is handed.
    pub fn max_public_inputs(&self) -> usize {
        self.description.usable_rows_amount
    }
}

/// What the verifier needs besides [`CommonData`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifierOnlyData<C: GenericConfig> {
    pub fixed_values_cap: MerkleCap<C::F, C::Hasher>,
    /// Digest of the constraint system and the table description.
    pub constraint_system_hash: <C::Hasher as Hasher<C::F>>::Hash,
}

/// What the prover needs besides [`CommonData`].
#[derive(Debug)]
pub struct ProverOnlyData<C: GenericConfig> {
    pub fixed_values: PolynomialBatch<C::F, C>,
    /// The identity permutation columns followed by the sigma columns, over the trace domain.
    pub permutation_values: Vec<PolynomialValues<C::F>>,
    /// Constant and selector columns, as committed.
    pub presets: AssignmentTable<C::F>,
    pub fft_root_table: Option<FftRootTable<C::F>>,
}

#[derive(Debug)]
pub struct PreprocessedData<F: RichField, C: GenericConfig<F = F>> {
    pub prover_only: ProverOnlyData<C>,
    pub verifier_only: VerifierOnlyData<C>,
    pub common: CommonData<F>,
}

impl<F: RichField, C: GenericConfig<F = F>> PreprocessedData<F, C> {
    pub fn prove(
        &self,
        table: &AssignmentTable<F>,
        timing: &mut TimingTree,
    ) -> Result<PlaceholderProof<F, C>> {
        prover::prove(
            &self.prover_only,
            &self.verifier_only,
            &self.common,
            table,
            timing,
        )
    }

    pub fn verify(&self, public_inputs: &[Vec<F>], proof: &PlaceholderProof<F, C>) -> Result<()> {
        verifier::verify_proof(&self.verifier_only, &self.common, public_inputs, proof)
    }
}

/// Digest binding the transcript to the circuit.
pub fn constraint_system_hash<F: RichField, C: GenericConfig<F = F>>(
    constraint_system: &ConstraintSystem<F>,
    description: &TableDescription,
) -> Result<<C::Hasher as Hasher<F>>::Hash> {
    let bytes = serde_json::to_vec(&(constraint_system, description))?;
    Ok(C::Hasher::hash_bytes(&bytes))
}

/// Commits to the fixed columns of a circuit: the permutation, the special selectors, and the
/// constant and selector columns of `presets`.
pub fn preprocess<F: RichField, C: GenericConfig<F = F>>(
    constraint_system: ConstraintSystem<F>,
    description: TableDescription,
    presets: &AssignmentTable<F>,
    config: &PlaceholderConfig,
    timing: &mut TimingTree,
) -> Result<PreprocessedData<F, C>> {
    let constraint_system_hash = constraint_system_hash::<F, C>(&constraint_system, &description)?;
    let common = CommonData::new(constraint_system, description, config.clone())?;
    let n = common.degree();
    let usable = common.description.usable_rows_amount;
    info!(
        "preprocessing a circuit of 2^{} rows: {} permuted columns in {} parts, {} quotient chunks",
        common.degree_bits(),
        common.permuted_columns.len(),
        common.permutation_parts.len(),
        common.num_quotient_chunks
    );

    let mut presets = presets.clone();
    for kind in [ColumnKind::Constant, ColumnKind::Selector] {
        ensure!(
            presets.column_count(kind) <= common.description.columns(kind),
            ConfigurationError::Unsupported(format!(
                "{} preset {kind:?} columns, the description has {}",
                presets.column_count(kind),
                common.description.columns(kind)
            ))
        );
        presets.resize_columns(kind, common.description.columns(kind));
    }
    presets.pad_to(n);

    let subgroup = F::two_adic_subgroup(common.degree_bits());
    let sigmas = timed!(timing, "compute sigma polynomials", {
        let index = |column: (ColumnKind, usize)| {
            common
                .permuted_columns
                .binary_search(&column)
                .unwrap_or_default()
        };
        let mut forest = Forest::new(common.permuted_columns.len(), n);
        for copy in &common.constraint_system.copy_constraints {
            forest.merge(
                Cell {
                    column: index((copy.left.kind, copy.left.index)),
                    row: copy.left.row(),
                },
                Cell {
                    column: index((copy.right.kind, copy.right.index)),
                    row: copy.right.row(),
                },
            );
        }
        forest.cell_partition().sigma_polys(&common.k_is, &subgroup)
    });

    let mut q_blind = PolynomialValues::zero(n);
    for row in usable..n - 1 {
        q_blind.values[row] = F::ONE;
    }
    let fixed = [
        identity_polys(&common.k_is, &subgroup),
        sigmas,
        vec![PolynomialValues::selector(n, n - 1), q_blind],
        presets
            .columns(ColumnKind::Constant)
            .iter()
            .chain(presets.columns(ColumnKind::Selector))
            .map(|column| PolynomialValues::new(column.clone()))
            .collect(),
    ]
    .concat();
    debug_assert_eq!(fixed.len(), common.layout.num_polys(FIXED_VALUES_BATCH));
    let permutation_values = fixed[..2 * common.permuted_columns.len()].to_vec();

    let fft_root_table = Some(fft_root_table(common.fri_params.lde_size()));
    let fixed_values = timed!(
        timing,
        "commit to fixed values",
        PolynomialBatch::<F, C>::from_values(
            fixed,
            &common.fri_params,
            timing,
            fft_root_table.as_ref(),
        )
    );

    Ok(PreprocessedData {
        verifier_only: VerifierOnlyData {
            fixed_values_cap: fixed_values.cap().clone(),
            constraint_system_hash,
        },
        prover_only: ProverOnlyData {
            fixed_values,
            permutation_values,
            presets,
            fft_root_table,
        },
        common,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use log::Level;
    use placeholder_field::types::Field;

    use super::*;
    use crate::circuit::constraint_system::{CopyConstraint, Gate};
    use crate::circuit::expression::Expression;
    use crate::plonk::config::KeccakGoldilocksConfig;

    type C = KeccakGoldilocksConfig;
    type F = <C as GenericConfig>::F;

    fn description() -> TableDescription {
        TableDescription {
            witness_columns: 3,
            public_input_columns: 1,
            constant_columns: 1,
            selector_columns: 1,
            usable_rows_amount: 7,
            rows_amount: 8,
        }
    }

    fn system(copies: usize) -> ConstraintSystem<F> {
        let w = |i: usize, rot: i32| Expression::from(Variable::witness(i, rot));
        ConstraintSystem {
            gates: vec![Gate {
                selector: 0,
                constraints: vec![w(0, 0) * w(1, 0) * w(2, -1) - w(2, 0)],
            }],
            copy_constraints: (0..copies)
                .map(|i| CopyConstraint {
                    left: Variable::absolute(ColumnKind::Witness, i % 3, 1 + i % 5),
                    right: Variable::absolute(ColumnKind::PublicInput, 0, 1 + i % 5),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn layout_and_degrees() -> Result<()> {
        let config = PlaceholderConfig::standard_test_config();
        let common = CommonData::new(system(4), description(), config)?;
        // w0, w1, w2 and pi0 are permuted; a single part of four columns.
        assert_eq!(common.permuted_columns.len(), 4);
        assert_eq!(common.permutation_parts, vec![0..4]);
        assert_eq!(common.quotient_degree, 6);
        assert_eq!(common.num_quotient_chunks, 5);
        assert_eq!(common.quotient_degree_bits, 3);
        assert_eq!(common.layout.num_polys(FIXED_VALUES_BATCH), 2 * 4 + 2 + 1 + 1);
        assert_eq!(common.layout.rotations(VARIABLE_VALUES_BATCH, 2), &[-1, 0]);
        assert_eq!(common.layout.rotations(PERMUTATION_BATCH, 0), &[0, 1]);
        assert!(!common.layout.contains(LOOKUP_BATCH));
        assert_eq!(
            common.column_position((ColumnKind::PublicInput, 0)),
            (VARIABLE_VALUES_BATCH, 3)
        );
        assert_eq!(
            common.column_position((ColumnKind::Selector, 0)),
            (FIXED_VALUES_BATCH, 11)
        );
        Ok(())
    }

    #[test]
    fn long_permutations_are_split() -> Result<()> {
        let config = PlaceholderConfig {
            max_quotient_chunks: 3,
            ..PlaceholderConfig::standard_test_config()
        };
        let common = CommonData::new(system(4), description(), config)?;
        assert_eq!(common.permutation_parts, vec![0..2, 2..4]);
        assert_eq!(common.layout.num_polys(PERMUTATION_BATCH), 2);
        assert_eq!(common.quotient_degree, 4);
        Ok(())
    }

    #[test]
    fn no_copies_no_permutation_batch() -> Result<()> {
        let common = CommonData::new(
            system(0),
            description(),
            PlaceholderConfig::standard_test_config(),
        )?;
        assert!(!common.has_permutation());
        assert!(!common.layout.contains(PERMUTATION_BATCH));
        assert_eq!(common.quotient_degree, 4);
        Ok(())
    }

    #[test]
    fn hash_depends_on_the_circuit() -> Result<()> {
        let a = constraint_system_hash::<F, C>(&system(1), &description())?;
        let b = constraint_system_hash::<F, C>(&system(2), &description())?;
        assert_ne!(a, b);

        let mut presets = AssignmentTable::new(0, 0, 1, 1);
        presets.set(ColumnKind::Selector, 0, 1, F::ONE);
        let mut timing = TimingTree::new("preprocess", Level::Debug);
        let data = preprocess::<F, C>(
            system(1),
            description(),
            &presets,
            &PlaceholderConfig::standard_test_config(),
            &mut timing,
        )?;
        assert_eq!(data.verifier_only.constraint_system_hash, a);
        assert_eq!(
            data.prover_only.fixed_values.len(),
            data.common.layout.num_polys(FIXED_VALUES_BATCH)
        );
        Ok(())
    }
}
