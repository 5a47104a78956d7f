//! The copy-constraint argument: sigma polynomials from the cycles of the copy partition, the
//! running product `V` with its intermediate accumulators, and the three constraint parts.

use std::ops::Range;

use hashbrown::HashMap;
use placeholder_field::polynomial::PolynomialValues;
use placeholder_field::types::Field;
use placeholder_maybe_rayon::*;

use crate::hash::hash_types::RichField;
use crate::plonk::preprocessor::CommonData;
use crate::plonk::vars::{BatchValues, FIXED_VALUES_BATCH, PERMUTATION_BATCH};

/// A cell of the permuted columns, `column` indexing the list of permuted columns.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Cell {
    pub column: usize,
    pub row: usize,
}

/// Disjoint Set Forest data-structure following https://en.wikipedia.org/wiki/Disjoint-set_data_structure.
pub struct Forest {
    /// A map of parent pointers, stored as indices.
    pub(crate) parents: Vec<usize>,

    num_columns: usize,
    degree: usize,
}

impl Forest {
    /// Every cell starts in a partition of its own.
    pub fn new(num_columns: usize, degree: usize) -> Self {
        Self {
            parents: (0..num_columns * degree).collect(),
            num_columns,
            degree,
        }
    }

    fn cell_index(&self, cell: Cell) -> usize {
        cell.column * self.degree + cell.row
    }

    /// Path compression method, see https://en.wikipedia.org/wiki/Disjoint-set_data_structure#Finding_set_representatives.
    pub fn find(&mut self, mut x_index: usize) -> usize {
        // Chains can be long, so no recursion.
        let mut representative = x_index;
        while self.parents[representative] != representative {
            representative = self.parents[representative];
        }

        while self.parents[x_index] != x_index {
            let old_parent = self.parents[x_index];
            self.parents[x_index] = representative;
            x_index = old_parent;
        }

        representative
    }

    pub fn merge(&mut self, x: Cell, y: Cell) {
        let x_index = self.find(self.cell_index(x));
        let y_index = self.find(self.cell_index(y));

        if x_index == y_index {
            return;
        }

        self.parents[y_index] = x_index;
    }

    /// Compress all paths. After calling this, every `parent` value will point to the node's
    /// representative.
    pub(crate) fn compress_paths(&mut self) {
        for i in 0..self.parents.len() {
            self.find(i);
        }
    }

    pub fn cell_partition(&mut self) -> CellPartition {
        self.compress_paths();
        let mut partition = HashMap::<_, Vec<_>>::new();
        for row in 0..self.degree {
            for column in 0..self.num_columns {
                let cell = Cell { column, row };
                partition
                    .entry(self.parents[self.cell_index(cell)])
                    .or_default()
                    .push(cell);
            }
        }
        CellPartition {
            partition: partition.into_values().collect(),
            num_columns: self.num_columns,
            degree: self.degree,
        }
    }
}

pub struct CellPartition {
    partition: Vec<Vec<Cell>>,
    num_columns: usize,
    degree: usize,
}

impl CellPartition {
    /// `sigma_i(w^j) = k_c * w^r` where `(c, r)` follows cell `(i, j)` in its cycle.
    pub(crate) fn sigma_polys<F: Field>(&self, k_is: &[F], subgroup: &[F]) -> Vec<PolynomialValues<F>> {
        let degree = self.degree;
        let sigma = self.sigma_map();

        sigma
            .chunks(degree)
            .map(|chunk| {
                let values = chunk
                    .par_iter()
                    .map(|&x| k_is[x / degree] * subgroup[x % degree])
                    .collect::<Vec<_>>();
                PolynomialValues::new(values)
            })
            .collect()
    }

    /// Column-major map from every cell to the next cell of its partition, wrapping around. A
    /// cell alone in its partition maps to itself.
    fn sigma_map(&self) -> Vec<usize> {
        let mut neighbors = HashMap::new();
        for subset in &self.partition {
            for n in 0..subset.len() {
                neighbors.insert(subset[n], subset[(n + 1) % subset.len()]);
            }
        }

        let mut sigma = Vec::with_capacity(self.num_columns * self.degree);
        for column in 0..self.num_columns {
            for row in 0..self.degree {
                let neighbor = neighbors[&Cell { column, row }];
                sigma.push(neighbor.column * self.degree + neighbor.row);
            }
        }
        sigma
    }
}

/// Coset shifts `k_i = g^i` separating the identity permutation of different columns.
pub fn k_is<F: Field>(num_columns: usize) -> Vec<F> {
    F::MULTIPLICATIVE_GROUP_GENERATOR
        .powers()
        .take(num_columns)
        .collect()
}

/// `id_i(w^j) = k_i * w^j`.
pub(crate) fn identity_polys<F: Field>(k_is: &[F], subgroup: &[F]) -> Vec<PolynomialValues<F>> {
    k_is.iter()
        .map(|&k| PolynomialValues::new(subgroup.iter().map(|&x| k * x).collect()))
        .collect()
}

/// The running product `V` followed by the intermediate accumulators of every part but the last.
///
/// `V(w^0) = 1` and `V(w^(j+1)) = V(w^j) * prod_i (w_i + beta id_i + gamma) / (w_i + beta sigma_i + gamma)`;
/// the accumulator of part `p` holds the product up to and including part `p - 1`.
pub(crate) fn permutation_accumulators<F: Field>(
    columns: &[&[F]],
    ids: &[PolynomialValues<F>],
    sigmas: &[PolynomialValues<F>],
    parts: &[Range<usize>],
    beta: F,
    gamma: F,
) -> Vec<PolynomialValues<F>> {
    let degree = ids[0].len();
    let part_ratios = (0..degree)
        .into_par_iter()
        .map(|row| {
            let (numerators, denominators): (Vec<F>, Vec<F>) = parts
                .iter()
                .map(|part| {
                    part.clone().fold((F::ONE, F::ONE), |(num, den), i| {
                        let w = columns[i][row];
                        (
                            num * (w + beta * ids[i].values[row] + gamma),
                            den * (w + beta * sigmas[i].values[row] + gamma),
                        )
                    })
                })
                .unzip();
            F::batch_multiplicative_inverse(&denominators)
                .into_iter()
                .zip(numerators)
                .map(|(den_inv, num)| num * den_inv)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut accumulators = vec![Vec::with_capacity(degree); parts.len()];
    let mut v = F::ONE;
    for ratios in part_ratios {
        accumulators[0].push(v);
        let mut acc = v;
        for (p, ratio) in ratios.into_iter().enumerate() {
            acc *= ratio;
            if p + 1 < parts.len() {
                accumulators[p + 1].push(acc);
            }
        }
        v = acc;
    }

    accumulators.into_iter().map(PolynomialValues::new).collect()
}

/// `[L_0 (1 - V), sum_p alpha_p * part_p, q_last (V^2 - V)]` at the point `vars` is read at.
///
/// Part `p < last` is `a_(p+1) den_p - a_p num_p` with `a_0 = V`; the last part closes the chain
/// with `(1 - q_last - q_blind)(V(w X) den_last - a_last num_last)`.
pub fn eval_permutation_constraints<F: RichField, V: BatchValues<F>>(
    common: &CommonData<F>,
    vars: &V,
    l_0: F,
    beta: F,
    gamma: F,
    part_alphas: &[F],
) -> [F; 3] {
    if !common.has_permutation() {
        return [F::ZERO; 3];
    }
    let v = vars.get(PERMUTATION_BATCH, 0, 0);
    let v_next = vars.get(PERMUTATION_BATCH, 0, 1);
    let q_last = vars.get(FIXED_VALUES_BATCH, common.q_last_index(), 0);
    let q_blind = vars.get(FIXED_VALUES_BATCH, common.q_blind_index(), 0);

    let num_parts = common.permutation_parts.len();
    let mut chain = F::ZERO;
    for (p, part) in common.permutation_parts.iter().enumerate() {
        let (num, den) = part.clone().fold((F::ONE, F::ONE), |(num, den), i| {
            let (batch, poly) = common.column_position(common.permuted_columns[i]);
            let w = vars.get(batch, poly, 0);
            let id = vars.get(FIXED_VALUES_BATCH, common.id_index(i), 0);
            let sigma = vars.get(FIXED_VALUES_BATCH, common.sigma_index(i), 0);
            (num * (w + beta * id + gamma), den * (w + beta * sigma + gamma))
        });
        let current = vars.get(PERMUTATION_BATCH, p, 0);
        let term = if p + 1 < num_parts {
            vars.get(PERMUTATION_BATCH, p + 1, 0) * den - current * num
        } else {
            (F::ONE - q_last - q_blind) * (v_next * den - current * num)
        };
        let weight = if num_parts > 1 { part_alphas[p] } else { F::ONE };
        chain += weight * term;
    }

    [l_0 * (F::ONE - v), chain, q_last * (v * v - v)]
}
