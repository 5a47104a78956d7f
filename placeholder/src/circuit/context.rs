//! The context a component is constructed against.
//!
//! A component body is written once, generically over `C: Context<F>`. Against a
//! [`ConstraintContext`] every value is an [`Expression`] and the calls record gates, lookups and
//! copy constraints; against an [`AssignmentContext`] every value is a field element and the same
//! calls fill the assignment table.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};
use std::rc::Rc;

use anyhow::{bail, ensure, Result};
use hashbrown::{HashMap, HashSet};
use log::{debug, warn};
use placeholder_field::types::Field;

use crate::circuit::assignment::AssignmentTable;
use crate::circuit::constraint_system::CopyConstraint;
use crate::circuit::expression::Expression;
use crate::circuit::variable::{ColumnKind, Variable};
use crate::error::{AllocationError, ConfigurationError, ConstraintError};

/// Which interpretation a component body runs under.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GenerationStage {
    Constraints,
    Assignment,
}

/// Row a context starts at inside the table. Row zero is reserved for the all-zero lookup tuple.
pub const DEFAULT_ROW_SHIFT: usize = 1;

pub trait Context<F: Field>: Sized {
    type Value: Clone
        + Debug
        + From<F>
        + Add<Output = Self::Value>
        + Sub<Output = Self::Value>
        + Mul<Output = Self::Value>
        + Neg<Output = Self::Value>;

    const STAGE: GenerationStage;

    /// Number of witness columns this context may write.
    fn witness_columns(&self) -> usize;

    /// Number of rows this context may write.
    fn max_rows(&self) -> usize;

    /// First unallocated cell of `kind`, scanning rows first from the current line.
    fn next_free_cell(&mut self, kind: ColumnKind) -> Result<(usize, usize)>;

    /// Places `value` into cell `(column, row)` of this context's region.
    ///
    /// When building constraints `value` is replaced by the variable of that cell.
    fn allocate(
        &mut self,
        value: &mut Self::Value,
        column: usize,
        row: usize,
        kind: ColumnKind,
    ) -> Result<()>;

    fn allocate_next(&mut self, value: &mut Self::Value, kind: ColumnKind) -> Result<()> {
        let (column, row) = self.next_free_cell(kind)?;
        self.allocate(value, column, row, kind)
    }

    fn copy_constrain(&mut self, left: &Self::Value, right: &Self::Value) -> Result<()>;

    /// Requires `expression` to vanish.
    fn constrain(&mut self, expression: Self::Value, name: &str) -> Result<()>;

    /// Requires the tuple `inputs` to be a row of table `table`.
    fn lookup(&mut self, inputs: Vec<Self::Value>, table: &str) -> Result<()>;

    /// Declares a dynamic table made of the given witness columns over `num_rows` rows.
    fn lookup_table(
        &mut self,
        name: &str,
        columns: &[usize],
        from_row: usize,
        num_rows: usize,
    ) -> Result<()>;

    /// Moves allocation of `kind` to the next row whose first column is free.
    fn new_line(&mut self, kind: ColumnKind);

    /// A view onto some witness columns and rows of this context, sharing its storage.
    fn subcontext(&self, columns: &[usize], row_shift: usize, max_rows: usize) -> Result<Self>;

    /// Like [`Context::subcontext`], but its constraints are optimized separately.
    fn fresh_subcontext(&self, columns: &[usize], row_shift: usize, max_rows: usize)
        -> Result<Self>;

    /// The concrete value, or zero when building constraints.
    fn value(&self, value: &Self::Value) -> F;

    /// Wraps a concrete value, which is dropped when building constraints.
    fn witness(&self, value: F) -> Self::Value;
}

/// The part of the table a context may write: a list of witness columns and a window of rows.
#[derive(Clone, Debug)]
struct Region {
    witness_columns: Vec<usize>,
    row_shift: usize,
    max_rows: usize,
    cursor: [usize; 4],
}

impl Region {
    fn new(witness_columns: Vec<usize>, row_shift: usize, max_rows: usize) -> Self {
        Self {
            witness_columns,
            row_shift,
            max_rows,
            cursor: [0; 4],
        }
    }

    fn get_row(&self, row: usize) -> Result<usize> {
        ensure!(
            row < self.max_rows,
            AllocationError::RowOutOfRange {
                row,
                max_rows: self.max_rows
            }
        );
        Ok(row + self.row_shift)
    }

    fn column_count(&self, cells: &Cells, kind: ColumnKind) -> usize {
        match kind {
            ColumnKind::Witness => self.witness_columns.len(),
            _ => cells.columns[kind.index()],
        }
    }

    fn get_column(&self, cells: &Cells, kind: ColumnKind, column: usize) -> Result<usize> {
        let columns = self.column_count(cells, kind);
        ensure!(
            column < columns,
            AllocationError::ColumnOutOfRange {
                kind,
                column,
                columns
            }
        );
        Ok(match kind {
            ColumnKind::Witness => self.witness_columns[column],
            _ => column,
        })
    }

    fn next_free_cell(&mut self, cells: &Cells, kind: ColumnKind) -> Result<(usize, usize)> {
        let columns = self.column_count(cells, kind);
        for row in self.cursor[kind.index()]..self.max_rows {
            for column in 0..columns {
                let absolute = (kind, self.get_column(cells, kind, column)?, row + self.row_shift);
                if !cells.allocated.contains(&absolute) {
                    self.cursor[kind.index()] = row;
                    return Ok((column, row));
                }
            }
        }
        bail!(AllocationError::InsufficientSpace {
            kind,
            max_rows: self.max_rows
        })
    }

    fn new_line(&mut self, cells: &Cells, kind: ColumnKind) {
        let columns = (0..self.column_count(cells, kind))
            .filter_map(|c| self.get_column(cells, kind, c).ok())
            .collect::<Vec<_>>();
        let Some(&first) = columns.first() else {
            return;
        };
        let taken = |row: usize, column: usize| {
            cells
                .allocated
                .contains(&(kind, column, row + self.row_shift))
        };
        let mut row = self.cursor[kind.index()];
        if columns.iter().any(|&c| taken(row, c)) {
            row += 1;
        }
        while row < self.max_rows && taken(row, first) {
            row += 1;
        }
        self.cursor[kind.index()] = row;
    }

    fn child(&self, columns: &[usize], row_shift: usize, max_rows: usize) -> Result<Self> {
        ensure!(
            row_shift + max_rows <= self.max_rows,
            AllocationError::RowOutOfRange {
                row: row_shift + max_rows,
                max_rows: self.max_rows
            }
        );
        let witness_columns = columns
            .iter()
            .map(|&c| {
                self.witness_columns.get(c).copied().ok_or_else(|| {
                    AllocationError::ColumnOutOfRange {
                        kind: ColumnKind::Witness,
                        column: c,
                        columns: self.witness_columns.len(),
                    }
                    .into()
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(
            witness_columns,
            self.row_shift + row_shift,
            max_rows,
        ))
    }
}

/// Allocation bookkeeping shared by every context of one build.
#[derive(Debug, Default)]
struct Cells {
    /// Column counts per kind.
    columns: [usize; 4],
    /// Absolute `(kind, column, row)` of every allocated cell.
    allocated: HashSet<(ColumnKind, usize, usize)>,
}

impl Cells {
    fn new(witnesses: usize, public_inputs: usize, constants: usize) -> Self {
        Self {
            columns: [witnesses, public_inputs, constants, 0],
            allocated: HashSet::new(),
        }
    }
}

/// A deduplicated constraint together with every absolute row it was placed at.
#[derive(Clone, Debug)]
pub struct StoredConstraint<F: Field> {
    pub expression: Expression<F>,
    pub name: String,
    pub rows: BTreeSet<usize>,
}

#[derive(Clone, Debug)]
pub struct StoredLookup<F: Field> {
    pub table: String,
    pub inputs: Vec<Expression<F>>,
    pub rows: BTreeSet<usize>,
}

/// What a context and its non-fresh subcontexts recorded. Relative expressions are keyed by
/// structure so that one pattern used on many rows is stored once.
#[derive(Clone, Debug)]
pub struct ConstraintStorage<F: Field> {
    pub constraints: Vec<StoredConstraint<F>>,
    constraint_index: HashMap<Expression<F>, usize>,
    pub lookups: Vec<StoredLookup<F>>,
    lookup_index: HashMap<(String, Vec<Expression<F>>), usize>,
    pub copy_constraints: Vec<CopyConstraint>,
}

impl<F: Field> Default for ConstraintStorage<F> {
    fn default() -> Self {
        Self {
            constraints: Vec::new(),
            constraint_index: HashMap::new(),
            lookups: Vec::new(),
            lookup_index: HashMap::new(),
            copy_constraints: Vec::new(),
        }
    }
}

impl<F: Field> ConstraintStorage<F> {
    fn add_constraint(&mut self, expression: Expression<F>, row: usize, name: &str) {
        let index = *self
            .constraint_index
            .entry(expression.clone())
            .or_insert_with(|| {
                self.constraints.push(StoredConstraint {
                    expression,
                    name: name.to_string(),
                    rows: BTreeSet::new(),
                });
                self.constraints.len() - 1
            });
        self.constraints[index].rows.insert(row);
    }

    fn add_lookup(&mut self, table: &str, inputs: Vec<Expression<F>>, row: usize) {
        let index = *self
            .lookup_index
            .entry((table.to_string(), inputs.clone()))
            .or_insert_with(|| {
                self.lookups.push(StoredLookup {
                    table: table.to_string(),
                    inputs,
                    rows: BTreeSet::new(),
                });
                self.lookups.len() - 1
            });
        self.lookups[index].rows.insert(row);
    }
}

/// A table whose tuples are witness cells.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DynamicTable {
    /// Absolute witness columns.
    pub columns: Vec<usize>,
    /// Absolute rows holding the tuples.
    pub rows: BTreeSet<usize>,
}

/// State of one constraint-building pass.
#[derive(Debug)]
struct Circuit<F: Field> {
    cells: Cells,
    /// Values of the constant cells.
    constants: AssignmentTable<F>,
    storages: Vec<Rc<RefCell<ConstraintStorage<F>>>>,
    dynamic_tables: BTreeMap<String, DynamicTable>,
}

/// Everything a constraint-building pass produced.
#[derive(Clone, Debug)]
pub struct CollectedCircuit<F: Field> {
    /// One storage per fresh context, the root first.
    pub storages: Vec<ConstraintStorage<F>>,
    pub dynamic_tables: BTreeMap<String, DynamicTable>,
    pub constants: AssignmentTable<F>,
}

#[derive(Clone, Debug)]
pub struct ConstraintContext<F: Field> {
    circuit: Rc<RefCell<Circuit<F>>>,
    storage: Rc<RefCell<ConstraintStorage<F>>>,
    region: Region,
}

impl<F: Field> ConstraintContext<F> {
    pub fn new(
        witnesses: usize,
        public_inputs: usize,
        constants: usize,
        max_rows: usize,
    ) -> Self {
        let storage = Rc::new(RefCell::new(ConstraintStorage::default()));
        let circuit = Circuit {
            cells: Cells::new(witnesses, public_inputs, constants),
            constants: AssignmentTable::new(0, 0, constants, 0),
            storages: vec![storage.clone()],
            dynamic_tables: BTreeMap::new(),
        };
        Self {
            circuit: Rc::new(RefCell::new(circuit)),
            storage,
            region: Region::new((0..witnesses).collect(), DEFAULT_ROW_SHIFT, max_rows),
        }
    }

    pub fn collect(&self) -> CollectedCircuit<F> {
        let circuit = self.circuit.borrow();
        CollectedCircuit {
            storages: circuit
                .storages
                .iter()
                .map(|s| s.borrow().clone())
                .collect(),
            dynamic_tables: circuit.dynamic_tables.clone(),
            constants: circuit.constants.clone(),
        }
    }

    fn cell(&self, kind: ColumnKind, column: usize, row: usize) -> Result<(usize, usize)> {
        let circuit = self.circuit.borrow();
        Ok((
            self.region.get_column(&circuit.cells, kind, column)?,
            self.region.get_row(row)?,
        ))
    }

    /// Rows at which a lookup on `expression` may be evaluated.
    fn admissible_rows(range: (i32, i32)) -> BTreeSet<i32> {
        let (min, max) = range;
        let mid = (min + max) / 2;
        let mut rows = BTreeSet::from([mid]);
        if max - min <= 1 {
            rows.insert(mid + 1);
        }
        if max == min {
            rows.insert(mid - 1);
        }
        rows
    }

    fn absolute_range(expression: &Expression<F>) -> Result<Option<(i32, i32)>> {
        match expression.relativity()? {
            Some(true) => bail!(ConfigurationError::Unsupported(format!(
                "constraints are built from absolute cells, got `{expression}`"
            ))),
            _ => Ok(expression.row_range()),
        }
    }
}

impl<F: Field> Context<F> for ConstraintContext<F> {
    type Value = Expression<F>;

    const STAGE: GenerationStage = GenerationStage::Constraints;

    fn witness_columns(&self) -> usize {
        self.region.witness_columns.len()
    }

    fn max_rows(&self) -> usize {
        self.region.max_rows
    }

    fn next_free_cell(&mut self, kind: ColumnKind) -> Result<(usize, usize)> {
        let circuit = self.circuit.borrow();
        self.region.next_free_cell(&circuit.cells, kind)
    }

    fn allocate(
        &mut self,
        value: &mut Expression<F>,
        column: usize,
        row: usize,
        kind: ColumnKind,
    ) -> Result<()> {
        let (column, row) = self.cell(kind, column, row)?;
        let variable = Variable::absolute(kind, column, row);
        {
            let mut circuit = self.circuit.borrow_mut();
            if !circuit.cells.allocated.insert((kind, column, row)) {
                warn!("{}", AllocationError::ReAllocated { kind, column, row });
            }
            match kind {
                ColumnKind::Constant => {
                    let Some(constant) = value.constant_value() else {
                        bail!(ConfigurationError::Unsupported(format!(
                            "constant cell {variable} needs a fixed value, got `{value}`"
                        )));
                    };
                    circuit.constants.set(kind, column, row, constant);
                }
                ColumnKind::Selector => bail!(ConfigurationError::Unsupported(
                    "selector columns are managed by the builder".into()
                )),
                ColumnKind::Witness | ColumnKind::PublicInput => {}
            }
        }
        if kind != ColumnKind::Constant && value.has_variables() {
            let expression = Expression::from(variable) - value.clone();
            self.constrain(expression, "allocation")?;
        }
        *value = variable.into();
        Ok(())
    }

    fn copy_constrain(&mut self, left: &Expression<F>, right: &Expression<F>) -> Result<()> {
        let (Some(l), Some(r)) = (left.as_variable(), right.as_variable()) else {
            let culprit = if left.as_variable().is_none() { left } else { right };
            bail!(ConfigurationError::NonVariableCopy(culprit.to_string()));
        };
        ensure!(
            !l.relative && !r.relative,
            ConfigurationError::NonVariableCopy(format!("{l} = {r}"))
        );
        if l != r {
            self.storage
                .borrow_mut()
                .copy_constraints
                .push(CopyConstraint { left: l, right: r });
        }
        Ok(())
    }

    fn constrain(&mut self, expression: Expression<F>, name: &str) -> Result<()> {
        let Some((min, max)) = Self::absolute_range(&expression)? else {
            debug!("constraint `{name}` has no variables and is dropped");
            return Ok(());
        };
        if max - min > 2 {
            warn!(
                "constraint `{name}` spans {} rows: {expression}",
                max - min + 1
            );
        }
        let mid = (min + max) / 2;
        self.storage
            .borrow_mut()
            .add_constraint(expression.relativize(-mid), mid as usize, name);
        Ok(())
    }

    fn lookup(&mut self, inputs: Vec<Expression<F>>, table: &str) -> Result<()> {
        let mut candidates: Option<BTreeSet<i32>> = None;
        for input in &inputs {
            if let Some(range) = Self::absolute_range(input)? {
                let rows = Self::admissible_rows(range);
                candidates = Some(match candidates {
                    None => rows,
                    Some(c) => c.intersection(&rows).copied().collect(),
                });
            }
        }
        let candidates = candidates
            .unwrap_or_default()
            .into_iter()
            .filter(|&row| row >= 0)
            .collect::<Vec<_>>();
        let base = match candidates.len() {
            0 => bail!(ConfigurationError::NoLookupRow {
                table: table.to_string()
            }),
            3 => candidates[1],
            _ => candidates[0],
        };
        let inputs = inputs.iter().map(|e| e.relativize(-base)).collect();
        self.storage
            .borrow_mut()
            .add_lookup(table, inputs, base as usize);
        Ok(())
    }

    fn lookup_table(
        &mut self,
        name: &str,
        columns: &[usize],
        from_row: usize,
        num_rows: usize,
    ) -> Result<()> {
        let mut circuit = self.circuit.borrow_mut();
        ensure!(
            !circuit.dynamic_tables.contains_key(name),
            ConfigurationError::DuplicateTable(name.to_string())
        );
        let columns = columns
            .iter()
            .map(|&c| self.region.get_column(&circuit.cells, ColumnKind::Witness, c))
            .collect::<Result<Vec<_>>>()?;
        let rows = (from_row..from_row + num_rows)
            .map(|r| self.region.get_row(r))
            .collect::<Result<BTreeSet<_>>>()?;
        circuit
            .dynamic_tables
            .insert(name.to_string(), DynamicTable { columns, rows });
        Ok(())
    }

    fn new_line(&mut self, kind: ColumnKind) {
        let circuit = self.circuit.borrow();
        self.region.new_line(&circuit.cells, kind);
    }

    fn subcontext(&self, columns: &[usize], row_shift: usize, max_rows: usize) -> Result<Self> {
        Ok(Self {
            circuit: self.circuit.clone(),
            storage: self.storage.clone(),
            region: self.region.child(columns, row_shift, max_rows)?,
        })
    }

    fn fresh_subcontext(
        &self,
        columns: &[usize],
        row_shift: usize,
        max_rows: usize,
    ) -> Result<Self> {
        let region = self.region.child(columns, row_shift, max_rows)?;
        let storage = Rc::new(RefCell::new(ConstraintStorage::default()));
        self.circuit.borrow_mut().storages.push(storage.clone());
        Ok(Self {
            circuit: self.circuit.clone(),
            storage,
            region,
        })
    }

    fn value(&self, _value: &Expression<F>) -> F {
        F::ZERO
    }

    fn witness(&self, _value: F) -> Expression<F> {
        Expression::zero()
    }
}

/// Fills an assignment table. Constant and selector columns must already hold their presets.
#[derive(Clone, Debug)]
pub struct AssignmentContext<F: Field> {
    table: Rc<RefCell<AssignmentTable<F>>>,
    cells: Rc<RefCell<Cells>>,
    region: Region,
    /// Fail on violated copy constraints instead of logging them.
    strict: bool,
}

impl<F: Field> AssignmentContext<F> {
    pub fn new(table: AssignmentTable<F>, max_rows: usize) -> Self {
        let witnesses = table.column_count(ColumnKind::Witness);
        let cells = Cells::new(
            witnesses,
            table.column_count(ColumnKind::PublicInput),
            table.column_count(ColumnKind::Constant),
        );
        Self {
            table: Rc::new(RefCell::new(table)),
            cells: Rc::new(RefCell::new(cells)),
            region: Region::new((0..witnesses).collect(), DEFAULT_ROW_SHIFT, max_rows),
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The table filled so far.
    pub fn table(&self) -> AssignmentTable<F> {
        self.table.borrow().clone()
    }

    fn child(&self, region: Region) -> Self {
        Self {
            table: self.table.clone(),
            cells: self.cells.clone(),
            region,
            strict: self.strict,
        }
    }
}

impl<F: Field> Context<F> for AssignmentContext<F> {
    type Value = F;

    const STAGE: GenerationStage = GenerationStage::Assignment;

    fn witness_columns(&self) -> usize {
        self.region.witness_columns.len()
    }

    fn max_rows(&self) -> usize {
        self.region.max_rows
    }

    fn next_free_cell(&mut self, kind: ColumnKind) -> Result<(usize, usize)> {
        let cells = self.cells.borrow();
        self.region.next_free_cell(&cells, kind)
    }

    fn allocate(&mut self, value: &mut F, column: usize, row: usize, kind: ColumnKind) -> Result<()> {
        let mut cells = self.cells.borrow_mut();
        let column = self.region.get_column(&cells, kind, column)?;
        let row = self.region.get_row(row)?;
        ensure!(
            cells.allocated.insert((kind, column, row)),
            AllocationError::ReAllocated { kind, column, row }
        );
        let mut table = self.table.borrow_mut();
        match kind {
            ColumnKind::Constant => ensure!(
                table.get(kind, column, row) == *value,
                AllocationError::ConstantMismatch { column, row }
            ),
            ColumnKind::Selector => bail!(ConfigurationError::Unsupported(
                "selector columns are managed by the builder".into()
            )),
            ColumnKind::Witness | ColumnKind::PublicInput => table.set(kind, column, row, *value),
        }
        Ok(())
    }

    fn copy_constrain(&mut self, left: &F, right: &F) -> Result<()> {
        if left != right {
            let violation = ConstraintError::CopyViolated {
                left: left.to_string(),
                right: right.to_string(),
            };
            ensure!(!self.strict, violation);
            warn!("{violation}");
        }
        Ok(())
    }

    fn constrain(&mut self, expression: F, name: &str) -> Result<()> {
        if expression.is_nonzero() {
            warn!("constraint `{name}` evaluates to {expression}");
        }
        Ok(())
    }

    fn lookup(&mut self, _inputs: Vec<F>, _table: &str) -> Result<()> {
        Ok(())
    }

    fn lookup_table(
        &mut self,
        _name: &str,
        columns: &[usize],
        from_row: usize,
        num_rows: usize,
    ) -> Result<()> {
        let cells = self.cells.borrow();
        for &c in columns {
            self.region.get_column(&cells, ColumnKind::Witness, c)?;
        }
        if num_rows > 0 {
            self.region.get_row(from_row + num_rows - 1)?;
        }
        Ok(())
    }

    fn new_line(&mut self, kind: ColumnKind) {
        let cells = self.cells.borrow();
        self.region.new_line(&cells, kind);
    }

    fn subcontext(&self, columns: &[usize], row_shift: usize, max_rows: usize) -> Result<Self> {
        Ok(self.child(self.region.child(columns, row_shift, max_rows)?))
    }

    fn fresh_subcontext(
        &self,
        columns: &[usize],
        row_shift: usize,
        max_rows: usize,
    ) -> Result<Self> {
        self.subcontext(columns, row_shift, max_rows)
    }

    fn value(&self, value: &F) -> F {
        *value
    }

    fn witness(&self, value: F) -> F {
        value
    }
}

#[cfg(test)]
mod tests {
    use placeholder_field::goldilocks_field::GoldilocksField;

    use super::*;

    type F = GoldilocksField;

    /// `c = a * b` on one row, with `a` and `b` taken from public inputs.
    fn multiply<C: Context<F>>(ctx: &mut C, a: F, b: F) -> Result<C::Value> {
        let mut a_pi = ctx.witness(a);
        let mut b_pi = ctx.witness(b);
        ctx.allocate(&mut a_pi, 0, 0, ColumnKind::PublicInput)?;
        ctx.allocate(&mut b_pi, 0, 1, ColumnKind::PublicInput)?;

        let mut x = ctx.witness(a);
        let mut y = ctx.witness(b);
        let mut z = ctx.witness(a * b);
        ctx.allocate(&mut x, 0, 0, ColumnKind::Witness)?;
        ctx.allocate(&mut y, 1, 0, ColumnKind::Witness)?;
        ctx.allocate(&mut z, 2, 0, ColumnKind::Witness)?;
        ctx.copy_constrain(&x, &a_pi)?;
        ctx.copy_constrain(&y, &b_pi)?;
        ctx.constrain(x * y - z.clone(), "product")?;
        Ok(z)
    }

    #[test]
    fn constraints_are_relativized_and_deduplicated() -> Result<()> {
        let mut ctx = ConstraintContext::<F>::new(3, 1, 0, 4);
        for row in 0..3 {
            let mut sub = ctx.subcontext(&[0, 1, 2], row, 1)?;
            let x = Expression::from(Variable::absolute(ColumnKind::Witness, 0, row + 1));
            let y = Expression::from(Variable::absolute(ColumnKind::Witness, 1, row + 1));
            sub.constrain(x - y, "eq")?;
        }
        multiply(&mut ctx, F::ZERO, F::ZERO)?;

        let collected = ctx.collect();
        let storage = &collected.storages[0];
        assert_eq!(storage.constraints.len(), 2);
        assert_eq!(
            storage.constraints[0].rows.iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(storage.copy_constraints.len(), 2);
        assert!(storage.constraints[1]
            .expression
            .variables()
            .iter()
            .all(|v| v.relative && v.rotation == 0));
        Ok(())
    }

    #[test]
    fn assignment_writes_the_table() -> Result<()> {
        let table = AssignmentTable::<F>::new(3, 1, 0, 0);
        let mut ctx = AssignmentContext::new(table, 4);
        let (a, b) = (F::from_canonical_u64(6), F::from_canonical_u64(7));
        let z = multiply(&mut ctx, a, b)?;
        assert_eq!(z, F::from_canonical_u64(42));
        let table = ctx.table();
        assert_eq!(table.get(ColumnKind::Witness, 2, 1), z);
        assert_eq!(table.get(ColumnKind::PublicInput, 0, 2), b);
        Ok(())
    }

    #[test]
    fn reallocation_fails_when_assigning() {
        let mut ctx = AssignmentContext::new(AssignmentTable::<F>::new(1, 0, 0, 0), 2);
        let mut v = F::ONE;
        ctx.allocate(&mut v, 0, 0, ColumnKind::Witness).unwrap();
        let err = ctx.allocate(&mut v, 0, 0, ColumnKind::Witness).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AllocationError>(),
            Some(AllocationError::ReAllocated { row: 1, .. })
        ));
    }

    #[test]
    fn next_free_cell_and_space() -> Result<()> {
        let mut ctx = ConstraintContext::<F>::new(2, 0, 0, 2);
        let mut v = Expression::zero();
        assert_eq!(ctx.next_free_cell(ColumnKind::Witness)?, (0, 0));
        ctx.allocate_next(&mut v, ColumnKind::Witness)?;
        assert_eq!(ctx.next_free_cell(ColumnKind::Witness)?, (1, 0));
        ctx.new_line(ColumnKind::Witness);
        assert_eq!(ctx.next_free_cell(ColumnKind::Witness)?, (0, 1));
        ctx.allocate_next(&mut v, ColumnKind::Witness)?;
        ctx.allocate_next(&mut v, ColumnKind::Witness)?;
        let err = ctx.next_free_cell(ColumnKind::Witness).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AllocationError>(),
            Some(AllocationError::InsufficientSpace { max_rows: 2, .. })
        ));
        Ok(())
    }

    #[test]
    fn lookup_picks_a_common_row() -> Result<()> {
        let mut ctx = ConstraintContext::<F>::new(2, 0, 0, 8);
        let cell = |c, r| Expression::<F>::from(Variable::absolute(ColumnKind::Witness, c, r));
        // Rows {2, 3, 4} and {3, 4} intersect in {3, 4}; the first is taken.
        ctx.lookup(vec![cell(0, 3), cell(1, 3) + cell(1, 4)], "t")?;
        // A lone row admits {2, 3, 4}; the middle is taken.
        ctx.lookup(vec![cell(0, 3)], "t")?;
        let collected = ctx.collect();
        let lookups = &collected.storages[0].lookups;
        assert_eq!(lookups[0].rows.iter().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(lookups[1].rows.iter().copied().collect::<Vec<_>>(), vec![3]);

        let err = ctx
            .lookup(vec![cell(0, 1), cell(1, 6)], "t")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::NoLookupRow { .. })
        ));
        Ok(())
    }

    #[test]
    fn fresh_subcontexts_get_their_own_storage() -> Result<()> {
        let ctx = ConstraintContext::<F>::new(2, 0, 0, 8);
        let mut fresh = ctx.fresh_subcontext(&[1], 4, 2)?;
        let mut v = Expression::zero();
        fresh.allocate(&mut v, 0, 1, ColumnKind::Witness)?;
        assert_eq!(v.as_variable(), Some(Variable::absolute(ColumnKind::Witness, 1, 6)));
        fresh.constrain(v.clone() * v, "square")?;
        fresh.lookup_table("dyn", &[0], 0, 2)?;
        assert!(fresh.lookup_table("dyn", &[0], 0, 2).is_err());

        let collected = ctx.collect();
        assert_eq!(collected.storages.len(), 2);
        assert!(collected.storages[0].constraints.is_empty());
        assert_eq!(collected.storages[1].constraints.len(), 1);
        assert_eq!(
            collected.dynamic_tables["dyn"].rows.iter().copied().collect::<Vec<_>>(),
            vec![5, 6]
        );
        Ok(())
    }

    #[test]
    fn strict_copy_constraints() {
        let mut ctx = AssignmentContext::new(AssignmentTable::<F>::new(1, 0, 0, 0), 2);
        assert!(ctx.copy_constrain(&F::ONE, &F::TWO).is_ok());
        let mut strict = ctx.strict(true);
        let err = strict.copy_constrain(&F::ONE, &F::TWO).unwrap_err();
        assert!(err.downcast_ref::<ConstraintError>().is_some());
    }

    #[test]
    fn constants_must_match_presets() -> Result<()> {
        let mut table = AssignmentTable::<F>::new(0, 0, 1, 0);
        table.set(ColumnKind::Constant, 0, 1, F::TWO);
        let mut ctx = AssignmentContext::new(table, 2);
        let mut two = F::TWO;
        ctx.allocate(&mut two, 0, 0, ColumnKind::Constant)?;
        let mut three = F::from_canonical_u64(3);
        let err = ctx
            .allocate(&mut three, 0, 1, ColumnKind::Constant)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AllocationError>(),
            Some(AllocationError::ConstantMismatch { column: 0, row: 2 })
        ));
        Ok(())
    }
}
