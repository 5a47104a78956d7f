use placeholder_field::types::Field;
use serde::{Deserialize, Serialize};

use crate::circuit::variable::{ColumnKind, Variable};
use crate::util::log2_strict;

/// Shape of an assignment table.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    pub witness_columns: usize,
    pub public_input_columns: usize,
    pub constant_columns: usize,
    pub selector_columns: usize,
    /// Rows `[0, usable_rows_amount)` carry constraints; the rest is blinding.
    pub usable_rows_amount: usize,
    /// A power of two.
    pub rows_amount: usize,
}

impl TableDescription {
    pub fn columns(&self, kind: ColumnKind) -> usize {
        match kind {
            ColumnKind::Witness => self.witness_columns,
            ColumnKind::PublicInput => self.public_input_columns,
            ColumnKind::Constant => self.constant_columns,
            ColumnKind::Selector => self.selector_columns,
        }
    }

    pub fn degree_bits(&self) -> usize {
        log2_strict(self.rows_amount)
    }
}

/// Cell values indexed by `(kind, column, row)`. Cells never written read as zero.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AssignmentTable<F: Field> {
    columns: [Vec<Vec<F>>; 4],
}

impl<F: Field> AssignmentTable<F> {
    pub fn new(witnesses: usize, public_inputs: usize, constants: usize, selectors: usize) -> Self {
        let mut table = Self::default();
        for (kind, count) in ColumnKind::ALL
            .into_iter()
            .zip([witnesses, public_inputs, constants, selectors])
        {
            table.resize_columns(kind, count);
        }
        table
    }

    pub fn get(&self, kind: ColumnKind, column: usize, row: usize) -> F {
        self.columns[kind.index()]
            .get(column)
            .and_then(|c| c.get(row))
            .copied()
            .unwrap_or(F::ZERO)
    }

    /// Value of an absolute variable.
    pub fn get_variable(&self, var: &Variable) -> F {
        self.get(var.kind, var.index, var.row())
    }

    /// Writes a cell, growing the table if needed.
    pub fn set(&mut self, kind: ColumnKind, column: usize, row: usize, value: F) {
        let columns = &mut self.columns[kind.index()];
        if column >= columns.len() {
            columns.resize(column + 1, Vec::new());
        }
        let cells = &mut columns[column];
        if row >= cells.len() {
            cells.resize(row + 1, F::ZERO);
        }
        cells[row] = value;
    }

    pub fn column(&self, kind: ColumnKind, column: usize) -> &[F] {
        &self.columns[kind.index()][column]
    }

    pub fn columns(&self, kind: ColumnKind) -> &[Vec<F>] {
        &self.columns[kind.index()]
    }

    pub fn column_count(&self, kind: ColumnKind) -> usize {
        self.columns[kind.index()].len()
    }

    pub fn resize_columns(&mut self, kind: ColumnKind, count: usize) {
        self.columns[kind.index()].resize(count, Vec::new());
    }

    /// Length of the longest column.
    pub fn rows_amount(&self) -> usize {
        self.columns
            .iter()
            .flatten()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    /// Pads every column with zeros to exactly `rows` rows.
    pub fn pad_to(&mut self, rows: usize) {
        for column in self.columns.iter_mut().flatten() {
            debug_assert!(column.len() <= rows);
            column.resize(rows, F::ZERO);
        }
    }

    /// Copies every constant and selector column of `presets` into this table.
    pub fn apply_presets(&mut self, presets: &Self) {
        for kind in [ColumnKind::Constant, ColumnKind::Selector] {
            let count = presets.column_count(kind).max(self.column_count(kind));
            self.resize_columns(kind, count);
            for (dst, src) in self.columns[kind.index()]
                .iter_mut()
                .zip(presets.columns(kind))
            {
                dst.clone_from(src);
            }
        }
    }

    pub fn description(&self, usable_rows_amount: usize) -> TableDescription {
        TableDescription {
            witness_columns: self.column_count(ColumnKind::Witness),
            public_input_columns: self.column_count(ColumnKind::PublicInput),
            constant_columns: self.column_count(ColumnKind::Constant),
            selector_columns: self.column_count(ColumnKind::Selector),
            usable_rows_amount,
            rows_amount: self.rows_amount(),
        }
    }

    /// The public input columns with their trailing zeros removed.
    pub fn public_inputs(&self) -> Vec<Vec<F>> {
        self.columns(ColumnKind::PublicInput)
            .iter()
            .map(|column| trim_trailing_zeros(column).to_vec())
            .collect()
    }
}

pub fn trim_trailing_zeros<F: Field>(column: &[F]) -> &[F] {
    let len = column.iter().rposition(|x| x.is_nonzero()).map_or(0, |i| i + 1);
    &column[..len]
}
