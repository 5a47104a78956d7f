//! Turns a [`Component`] into a constraint system with its preset constant and selector columns,
//! and assigns witnesses for it.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, ensure, Result};
use log::{debug, info};
use placeholder_field::types::Field;

use crate::circuit::assignment::{AssignmentTable, TableDescription};
use crate::circuit::component::{Component, TableParams};
use crate::circuit::constraint_system::{
    ConstraintSystem, Gate, LookupConstraint, LookupGate, LookupTableInfo,
};
use crate::circuit::context::{AssignmentContext, ConstraintContext, DynamicTable};
use crate::circuit::expression::Expression;
use crate::circuit::lookup_table::LookupTable;
use crate::circuit::optimizer::{optimize, OptimizedGates, SelectorRegistry};
use crate::circuit::row_selector::RowSelector;
use crate::circuit::satisfiability;
use crate::circuit::variable::{ColumnKind, Variable};
use crate::error::ConfigurationError;

/// Smallest table the builder produces.
pub const MIN_ROWS_AMOUNT: usize = 8;

/// `2^ceil(log2(rows + 2))`: one leading row for the zero lookup tuple and one blinded row.
pub fn rows_amount_for(rows: usize) -> usize {
    (rows + 2).next_power_of_two().max(MIN_ROWS_AMOUNT)
}

pub struct CircuitBuilder<F: Field, C: Component<F>> {
    info: C::StaticInfo,
    params: TableParams,
    constraint_system: ConstraintSystem<F>,
    /// Constant and selector columns, padded to the full height.
    presets: AssignmentTable<F>,
    description: TableDescription,
    strict: bool,
}

impl<F: Field, C: Component<F>> CircuitBuilder<F, C> {
    /// Builds the circuit with the given resources, or with the component's minimum when `params`
    /// is `None`.
    pub fn new(info: C::StaticInfo, params: Option<TableParams>) -> Result<Self> {
        let minimal = C::minimal_requirements(&info);
        let auto = params.is_none();
        let params = match params {
            Some(p) => {
                for (what, requested, required) in [
                    ("witness columns", p.witnesses, minimal.witnesses),
                    ("public input columns", p.public_inputs, minimal.public_inputs),
                    ("constant columns", p.constants, minimal.constants),
                    ("rows", p.rows, minimal.rows),
                ] {
                    ensure!(
                        requested >= required,
                        ConfigurationError::BelowMinimum {
                            what,
                            requested,
                            required
                        }
                    );
                }
                p
            }
            None => minimal,
        };

        let mut ctx = ConstraintContext::new(
            params.witnesses,
            params.public_inputs,
            params.constants,
            params.rows,
        );
        let input = C::form_input(&mut ctx, &C::RawInput::default(), &info)?;
        C::construct(&mut ctx, input, &info, true)?;
        let collected = ctx.collect();

        let static_tables = C::lookup_tables(&info)?;
        let mut seen = BTreeSet::new();
        for table in &static_tables {
            ensure!(
                seen.insert(table.name.as_str())
                    && !collected.dynamic_tables.contains_key(&table.name),
                ConfigurationError::DuplicateTable(table.name.clone())
            );
        }

        let referenced = collected
            .storages
            .iter()
            .flat_map(|s| s.lookups.iter().map(|l| l.table.clone()))
            .collect::<BTreeSet<_>>();
        let used_static = static_tables
            .into_iter()
            .filter(|t| {
                referenced.contains(&t.name)
                    || t.subtables.keys().any(|s| referenced.contains(&t.subtable_name(s)))
            })
            .collect::<Vec<_>>();

        let tallest = used_static.iter().map(LookupTable::rows).max().unwrap_or(0);
        let rows_amount = if auto {
            rows_amount_for(params.rows.max(tallest))
        } else {
            rows_amount_for(params.rows)
        };
        let usable_rows_amount = rows_amount - 1;
        info!(
            "building circuit over {rows_amount} rows, {} storages, {} static tables",
            collected.storages.len(),
            used_static.len()
        );

        let OptimizedGates {
            gates,
            lookup_gates,
            grouped_lookups,
            copy_constraints,
            dynamic_tables,
            mut selectors,
        } = optimize(&collected, rows_amount, usable_rows_amount);

        let mut presets = collected.constants.clone();
        presets.resize_columns(ColumnKind::Constant, params.constants);
        let mut lookup_tables = Vec::new();
        pack_static_tables(
            &used_static,
            &referenced,
            params.constants,
            usable_rows_amount,
            &mut presets,
            &mut selectors,
            &mut lookup_tables,
        )?;
        add_dynamic_tables(
            &dynamic_tables,
            &referenced,
            rows_amount,
            &mut selectors,
            &mut lookup_tables,
        );

        let table_id = |name: &str, width: usize| -> Result<usize> {
            let Some(id) = lookup_tables.iter().position(|t| t.name == name) else {
                bail!(ConfigurationError::UnknownTable(name.to_string()));
            };
            let expected = lookup_tables[id].options.first().map_or(0, Vec::len);
            ensure!(
                expected == width,
                ConfigurationError::Unsupported(format!(
                    "lookup of {width} values into `{name}` of width {expected}"
                ))
            );
            Ok(id)
        };

        let mut cs_lookup_gates = Vec::new();
        for (selector, lookups) in lookup_gates {
            let constraints = lookups
                .into_iter()
                .map(|(table, inputs)| {
                    Ok(LookupConstraint {
                        table_id: table_id(&table, inputs.len())?,
                        inputs,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            cs_lookup_gates.push(LookupGate {
                selector,
                constraints,
            });
        }
        for (table, groups) in grouped_lookups {
            for group in groups {
                let width = group[0].1.len();
                let mut union = RowSelector::new(rows_amount);
                let mut inputs = vec![Expression::zero(); width];
                for (selector, member) in group {
                    union.union_with(selectors.get(selector));
                    let guard = Expression::from(Variable::selector(selector, 0));
                    for (sum, e) in inputs.iter_mut().zip(member) {
                        *sum = sum.clone() + guard.clone() * e;
                    }
                }
                cs_lookup_gates.push(LookupGate {
                    selector: selectors.add(union),
                    constraints: vec![LookupConstraint {
                        table_id: table_id(&table, width)?,
                        inputs,
                    }],
                });
            }
        }

        for (id, rows) in selectors.iter().enumerate() {
            for row in rows.iter() {
                presets.set(ColumnKind::Selector, id, row, F::ONE);
            }
        }
        presets.resize_columns(ColumnKind::Selector, selectors.len());
        presets.pad_to(rows_amount);

        let constraint_system = ConstraintSystem {
            gates: gates
                .into_iter()
                .map(|(selector, constraints)| Gate {
                    selector,
                    constraints,
                })
                .collect(),
            copy_constraints,
            lookup_gates: cs_lookup_gates,
            lookup_tables,
        };
        let description = TableDescription {
            witness_columns: params.witnesses,
            public_input_columns: params.public_inputs,
            constant_columns: presets.column_count(ColumnKind::Constant),
            selector_columns: selectors.len(),
            usable_rows_amount,
            rows_amount,
        };
        debug!(
            "{} gates, {} lookup gates, {} tables, {} copy constraints",
            constraint_system.gates.len(),
            constraint_system.lookup_gates.len(),
            constraint_system.lookup_tables.len(),
            constraint_system.copy_constraints.len()
        );

        Ok(Self {
            info,
            params,
            constraint_system,
            presets,
            description,
            strict: false,
        })
    }

    /// Fail on violated copy constraints while assigning instead of logging them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn constraint_system(&self) -> &ConstraintSystem<F> {
        &self.constraint_system
    }

    pub fn description(&self) -> &TableDescription {
        &self.description
    }

    pub fn params(&self) -> TableParams {
        self.params
    }

    /// Constant and selector columns fixed by the circuit.
    pub fn presets(&self) -> &AssignmentTable<F> {
        &self.presets
    }

    /// Runs the component on concrete inputs and returns the padded table with its output.
    pub fn assign(&self, raw: &C::RawInput) -> Result<(AssignmentTable<F>, C::Output<F>)> {
        let mut table =
            AssignmentTable::new(self.params.witnesses, self.params.public_inputs, 0, 0);
        table.apply_presets(&self.presets);
        let mut ctx = AssignmentContext::new(table, self.params.rows).strict(self.strict);
        let input = C::form_input(&mut ctx, raw, &self.info)?;
        let output = C::construct(&mut ctx, input, &self.info, true)?;
        let mut table = ctx.table();
        table.pad_to(self.description.rows_amount);
        Ok((table, output))
    }

    pub fn is_satisfied(&self, table: &AssignmentTable<F>) -> Result<()> {
        satisfiability::is_satisfied(&self.constraint_system, table)
    }
}

/// A group of constant columns filled top-down with tables.
struct Shelf {
    first_column: usize,
    width: usize,
    used_rows: usize,
}

/// Places the static tables into constant columns starting at `first_column`, tallest first.
///
/// Rows `[1, usable_rows_amount)` are available; row zero keeps the all-zero tuple.
fn pack_static_tables<F: Field>(
    tables: &[LookupTable<F>],
    referenced: &BTreeSet<String>,
    first_column: usize,
    usable_rows_amount: usize,
    presets: &mut AssignmentTable<F>,
    selectors: &mut SelectorRegistry,
    lookup_tables: &mut Vec<LookupTableInfo>,
) -> Result<()> {
    let rows_amount = usable_rows_amount + 1;
    let capacity = usable_rows_amount - 1;
    let mut order = tables.iter().collect::<Vec<_>>();
    order.sort_by(|a, b| b.rows().cmp(&a.rows()).then_with(|| a.name.cmp(&b.name)));

    let mut shelves: Vec<Shelf> = Vec::new();
    let mut next_column = first_column;

    for table in order {
        let (rows, width) = (table.rows(), table.width());
        if rows > capacity {
            for subtable in table.subtables.keys() {
                ensure!(
                    !referenced.contains(&table.subtable_name(subtable)),
                    ConfigurationError::SplitSubtable(table.subtable_name(subtable))
                );
            }
            // Every option spans the whole capacity; the last one repeats the first tuple.
            let num_options = rows.div_ceil(capacity);
            let mut options = Vec::new();
            for option in 0..num_options {
                let first = next_column;
                next_column += width;
                for row in 0..capacity {
                    let source = option * capacity + row;
                    let source = if source < rows { source } else { 0 };
                    for (i, column) in table.columns.iter().enumerate() {
                        presets.set(ColumnKind::Constant, first + i, row + 1, column[source]);
                    }
                }
                options.push(option_columns(first, 0..width));
            }
            debug!("table `{}` split into {num_options} options", table.name);
            let mut tag = RowSelector::new(rows_amount);
            tag.set_interval(1, capacity);
            lookup_tables.push(LookupTableInfo {
                name: table.name.clone(),
                tag_selector: selectors.add(tag),
                options,
                dynamic: false,
            });
            continue;
        }

        let index = match shelves
            .iter()
            .position(|s| s.width >= width && s.used_rows + rows <= capacity)
        {
            Some(index) => index,
            None => {
                shelves.push(Shelf {
                    first_column: next_column,
                    width,
                    used_rows: 0,
                });
                next_column += width;
                shelves.len() - 1
            }
        };
        let shelf = &mut shelves[index];
        let start = 1 + shelf.used_rows;
        shelf.used_rows += rows;
        let first = shelf.first_column;
        for (i, column) in table.columns.iter().enumerate() {
            for (row, &value) in column.iter().enumerate() {
                presets.set(ColumnKind::Constant, first + i, start + row, value);
            }
        }

        if referenced.contains(&table.name) {
            let mut tag = RowSelector::new(rows_amount);
            tag.set_interval(start, start + rows - 1);
            lookup_tables.push(LookupTableInfo {
                name: table.name.clone(),
                tag_selector: selectors.add(tag),
                options: vec![option_columns(first, 0..width)],
                dynamic: false,
            });
        }
        for (name, subtable) in &table.subtables {
            let full_name = table.subtable_name(name);
            if !referenced.contains(&full_name) {
                continue;
            }
            let mut tag = RowSelector::new(rows_amount);
            tag.set_interval(start + subtable.begin, start + subtable.end);
            lookup_tables.push(LookupTableInfo {
                name: full_name,
                tag_selector: selectors.add(tag),
                options: vec![option_columns(first, subtable.column_indices.iter().copied())],
                dynamic: false,
            });
        }
    }
    presets.resize_columns(ColumnKind::Constant, next_column.max(first_column));
    Ok(())
}

fn option_columns(first: usize, indices: impl IntoIterator<Item = usize>) -> Vec<Variable> {
    indices
        .into_iter()
        .map(|i| Variable::constant(first + i, 0))
        .collect()
}

fn add_dynamic_tables(
    tables: &BTreeMap<String, DynamicTable>,
    referenced: &BTreeSet<String>,
    rows_amount: usize,
    selectors: &mut SelectorRegistry,
    lookup_tables: &mut Vec<LookupTableInfo>,
) {
    for (name, table) in tables {
        if !referenced.contains(name) {
            debug!("dynamic table `{name}` is never looked up");
            continue;
        }
        let tag = RowSelector::from_rows(rows_amount, table.rows.iter().copied());
        lookup_tables.push(LookupTableInfo {
            name: name.clone(),
            tag_selector: selectors.add(tag),
            options: vec![table
                .columns
                .iter()
                .map(|&c| Variable::witness(c, 0))
                .collect()],
            dynamic: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use placeholder_field::goldilocks_field::GoldilocksField;

    use super::*;
    use crate::circuit::context::Context;
    use crate::error::AllocationError;

    type F = GoldilocksField;

    /// Squares of `0..size` as a table; asserts `x^2 = y` and looks `(x, y)` up on `rows` rows.
    struct Squares;

    #[derive(Clone)]
    struct SquaresInfo {
        rows: usize,
        table_size: usize,
    }

    impl Component<F> for Squares {
        type StaticInfo = SquaresInfo;
        type RawInput = Vec<u64>;
        type Input<V: Clone> = Vec<V>;
        type Output<V: Clone> = Vec<V>;

        fn minimal_requirements(info: &SquaresInfo) -> TableParams {
            TableParams {
                witnesses: 2,
                public_inputs: 1,
                constants: 0,
                rows: info.rows,
            }
        }

        fn lookup_tables(info: &SquaresInfo) -> Result<Vec<LookupTable<F>>> {
            let xs = (0..info.table_size as u64).map(F::from_canonical_u64);
            let table = LookupTable::new(
                "squares",
                vec![xs.clone().collect(), xs.map(|x| x * x).collect()],
            )?
            .with_subtable("roots", vec![0], 0, info.table_size - 1)?;
            Ok(vec![table, LookupTable::new("unused", vec![vec![F::ONE]])?])
        }

        fn form_input<C: Context<F>>(
            ctx: &mut C,
            raw: &Vec<u64>,
            info: &SquaresInfo,
        ) -> Result<Vec<C::Value>> {
            (0..info.rows)
                .map(|i| {
                    let x = raw.get(i).copied().unwrap_or(0);
                    let mut v = ctx.witness(F::from_canonical_u64(x));
                    ctx.allocate(&mut v, 0, i, ColumnKind::PublicInput)?;
                    Ok(v)
                })
                .collect()
        }

        fn construct<C: Context<F>>(
            ctx: &mut C,
            input: Vec<C::Value>,
            _info: &SquaresInfo,
            make_links: bool,
        ) -> Result<Vec<C::Value>> {
            let mut outputs = Vec::new();
            for (row, x_in) in input.into_iter().enumerate() {
                let x_val = ctx.value(&x_in);
                let mut x = ctx.witness(x_val);
                let mut y = ctx.witness(x_val * x_val);
                ctx.allocate(&mut x, 0, row, ColumnKind::Witness)?;
                ctx.allocate(&mut y, 1, row, ColumnKind::Witness)?;
                if make_links {
                    ctx.copy_constrain(&x, &x_in)?;
                }
                ctx.constrain(x.clone() * x.clone() - y.clone(), "square")?;
                ctx.lookup(vec![x.clone(), y.clone()], "squares")?;
                ctx.lookup(vec![x], "squares/roots")?;
                outputs.push(y);
            }
            Ok(outputs)
        }
    }

    #[test]
    fn builds_and_assigns() -> Result<()> {
        let info = SquaresInfo {
            rows: 3,
            table_size: 16,
        };
        let builder = CircuitBuilder::<F, Squares>::new(info, None)?;
        let description = builder.description();
        // 16 table rows need 18 rows, rounded up to 32.
        assert_eq!(description.rows_amount, 32);
        assert_eq!(description.usable_rows_amount, 31);
        let cs = builder.constraint_system();
        assert_eq!(cs.gates.len(), 1);
        assert_eq!(
            cs.lookup_tables.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["squares", "squares/roots"]
        );
        assert_eq!(cs.copy_constraints.len(), 3);

        let (table, outputs) = builder.assign(&vec![2, 3, 15])?;
        assert_eq!(outputs[2], F::from_canonical_u64(225));
        assert_eq!(table.rows_amount(), 32);
        builder.is_satisfied(&table)
    }

    #[test]
    fn values_outside_the_table_are_caught() -> Result<()> {
        let info = SquaresInfo {
            rows: 2,
            table_size: 4,
        };
        let builder = CircuitBuilder::<F, Squares>::new(info, None)?;
        let (table, _) = builder.assign(&vec![1, 7])?;
        let err = builder.is_satisfied(&table).unwrap_err();
        assert!(err.to_string().contains("squares"));
        Ok(())
    }

    #[test]
    fn oversized_tables_are_split() -> Result<()> {
        let info = SquaresInfo {
            rows: 2,
            table_size: 16,
        };
        let params = TableParams {
            witnesses: 2,
            public_inputs: 1,
            constants: 0,
            rows: 2,
        };
        // Eight rows leave six for tables, so a subtable of the split table is rejected.
        let err = CircuitBuilder::<F, Squares>::new(info, Some(params)).err();
        assert!(matches!(
            err.as_ref().and_then(|e| e.downcast_ref::<ConfigurationError>()),
            Some(ConfigurationError::SplitSubtable(_))
        ));
        Ok(())
    }

    #[test]
    fn below_minimum_is_rejected() {
        let info = SquaresInfo {
            rows: 4,
            table_size: 4,
        };
        let params = TableParams {
            witnesses: 1,
            public_inputs: 1,
            constants: 0,
            rows: 4,
        };
        let err = CircuitBuilder::<F, Squares>::new(info, Some(params)).err();
        assert!(matches!(
            err.as_ref().and_then(|e| e.downcast_ref::<ConfigurationError>()),
            Some(ConfigurationError::BelowMinimum { required: 2, .. })
        ));
    }

    #[test]
    fn row_budget_is_enforced() {
        let info = SquaresInfo {
            rows: 4,
            table_size: 4,
        };
        let params = TableParams {
            witnesses: 2,
            public_inputs: 1,
            constants: 0,
            rows: 4,
        };
        let builder = CircuitBuilder::<F, Squares>::new(info, Some(params)).unwrap();
        assert_eq!(builder.description().rows_amount, 8);
        // Writing a fifth row through a fresh context of four rows fails.
        let mut ctx = AssignmentContext::new(AssignmentTable::<F>::new(2, 0, 0, 0), 4);
        let mut v = F::ONE;
        let err = ctx.allocate(&mut v, 0, 4, ColumnKind::Witness).unwrap_err();
        assert!(err.downcast_ref::<AllocationError>().is_some());
    }
}
