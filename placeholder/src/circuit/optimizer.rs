//! Coalesces the per-row constraints a [`ConstraintContext`](crate::circuit::context) recorded
//! into gates guarded by selector columns.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use log::debug;
use placeholder_field::types::Field;

use crate::circuit::constraint_system::CopyConstraint;
use crate::circuit::context::{CollectedCircuit, DynamicTable};
use crate::circuit::expression::Expression;
use crate::circuit::row_selector::RowSelector;

/// Id of the selector that is one on every usable row except row zero.
pub const ALL_USABLE_ROWS_SELECTOR: usize = 0;

/// Distinct row sets, each backing one selector column.
#[derive(Clone, Debug)]
pub struct SelectorRegistry {
    selectors: Vec<RowSelector>,
    index: HashMap<RowSelector, usize>,
}

impl SelectorRegistry {
    /// Registers the all-usable-rows selector `[1, usable_rows_amount)` as id zero.
    pub fn new(rows_amount: usize, usable_rows_amount: usize) -> Self {
        let mut all_usable = RowSelector::new(rows_amount);
        if usable_rows_amount > 1 {
            all_usable.set_interval(1, usable_rows_amount - 1);
        }
        let mut registry = Self {
            selectors: Vec::new(),
            index: HashMap::new(),
        };
        registry.add(all_usable);
        registry
    }

    /// Id of the selector over `rows`, minting one if the row set is new.
    pub fn add(&mut self, rows: RowSelector) -> usize {
        if let Some(&id) = self.index.get(&rows) {
            return id;
        }
        let id = self.selectors.len();
        self.index.insert(rows.clone(), id);
        self.selectors.push(rows);
        id
    }

    pub fn get(&self, id: usize) -> &RowSelector {
        &self.selectors[id]
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowSelector> {
        self.selectors.iter()
    }
}

/// One lookup of a group: its selector and its relative inputs.
pub type GroupMember<F> = (usize, Vec<Expression<F>>);

#[derive(Clone, Debug)]
pub struct OptimizedGates<F: Field> {
    /// `(selector, constraints)`.
    pub gates: Vec<(usize, Vec<Expression<F>>)>,
    /// `(selector, [(table, inputs)])`.
    pub lookup_gates: Vec<(usize, Vec<(String, Vec<Expression<F>>)>)>,
    /// Lookups into one table on pairwise disjoint rows, merged into a single input tuple.
    pub grouped_lookups: BTreeMap<String, Vec<Vec<GroupMember<F>>>>,
    pub copy_constraints: Vec<CopyConstraint>,
    pub dynamic_tables: BTreeMap<String, DynamicTable>,
    pub selectors: SelectorRegistry,
}

/// Gates keyed by selector, in order of first use.
struct GateList<T> {
    gates: Vec<(usize, Vec<T>)>,
    by_selector: HashMap<usize, usize>,
}

impl<T> GateList<T> {
    fn new() -> Self {
        Self {
            gates: Vec::new(),
            by_selector: HashMap::new(),
        }
    }

    fn push(&mut self, selector: usize, item: T) {
        let index = *self.by_selector.entry(selector).or_insert_with(|| {
            self.gates.push((selector, Vec::new()));
            self.gates.len() - 1
        });
        self.gates[index].1.push(item);
    }
}

struct LookupGroup<F: Field> {
    width: usize,
    rows: RowSelector,
    members: Vec<GroupMember<F>>,
}

pub fn optimize<F: Field>(
    circuit: &CollectedCircuit<F>,
    rows_amount: usize,
    usable_rows_amount: usize,
) -> OptimizedGates<F> {
    let mut selectors = SelectorRegistry::new(rows_amount, usable_rows_amount);
    let mut gates = GateList::new();
    let mut lookup_gates = GateList::new();
    let mut grouped_lookups = BTreeMap::new();
    let mut copy_constraints = Vec::new();
    // Lookups into one table on disjoint rows share a group, across storages too; a group with
    // one member stays an ordinary lookup gate.
    let mut groups: BTreeMap<&str, Vec<LookupGroup<F>>> = BTreeMap::new();

    for storage in &circuit.storages {
        for constraint in &storage.constraints {
            let rows = RowSelector::from_rows(rows_amount, constraint.rows.iter().copied());
            gates.push(selectors.add(rows), constraint.expression.clone());
        }

        for lookup in &storage.lookups {
            let rows = RowSelector::from_rows(rows_amount, lookup.rows.iter().copied());
            let table_groups = groups.entry(lookup.table.as_str()).or_default();
            let group = table_groups
                .iter_mut()
                .find(|g| g.width == lookup.inputs.len() && g.rows.is_disjoint(&rows));
            let selector = selectors.add(rows.clone());
            match group {
                Some(group) => {
                    group.rows.union_with(&rows);
                    group.members.push((selector, lookup.inputs.clone()));
                }
                None => table_groups.push(LookupGroup {
                    width: lookup.inputs.len(),
                    rows,
                    members: vec![(selector, lookup.inputs.clone())],
                }),
            }
        }

        copy_constraints.extend_from_slice(&storage.copy_constraints);
    }

    for (table, table_groups) in groups {
        for mut group in table_groups {
            if group.members.len() == 1 {
                let (selector, inputs) = group.members.remove(0);
                lookup_gates.push(selector, (table.to_string(), inputs));
            } else {
                debug!("grouping {} lookups into `{table}`", group.members.len());
                grouped_lookups
                    .entry(table.to_string())
                    .or_insert_with(Vec::new)
                    .push(group.members);
            }
        }
    }

    OptimizedGates {
        gates: gates.gates,
        lookup_gates: lookup_gates.gates,
        grouped_lookups,
        copy_constraints,
        dynamic_tables: circuit.dynamic_tables.clone(),
        selectors,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use placeholder_field::goldilocks_field::GoldilocksField;

    use super::*;
    use crate::circuit::context::{ConstraintContext, Context};
    use crate::circuit::variable::{ColumnKind, Variable};

    type F = GoldilocksField;

    fn cell(column: usize, row: usize) -> Expression<F> {
        Variable::absolute(ColumnKind::Witness, column, row).into()
    }

    #[test]
    fn equal_row_sets_share_a_selector() -> Result<()> {
        let mut ctx = ConstraintContext::<F>::new(3, 0, 0, 6);
        for row in 1..=3 {
            ctx.constrain(cell(0, row) - cell(1, row), "a")?;
            ctx.constrain(cell(2, row) * cell(2, row) - cell(2, row), "b")?;
        }
        ctx.constrain(cell(0, 5) - cell(0, 6), "c")?;
        let optimized = optimize(&ctx.collect(), 8, 7);

        assert_eq!(optimized.gates.len(), 2);
        assert_eq!(optimized.gates[0].1.len(), 2);
        assert_eq!(optimized.selectors.len(), 3);
        let first = optimized.selectors.get(optimized.gates[0].0);
        assert_eq!(first.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(
            optimized.selectors.get(ALL_USABLE_ROWS_SELECTOR).count(),
            6
        );
        Ok(())
    }

    #[test]
    fn disjoint_lookups_are_grouped() -> Result<()> {
        let mut ctx = ConstraintContext::<F>::new(2, 0, 0, 6);
        // Two patterns into "t" on disjoint rows, and one overlapping the first.
        ctx.lookup(vec![cell(0, 1)], "t")?;
        ctx.lookup(vec![cell(1, 2)], "t")?;
        ctx.lookup(vec![cell(0, 1) + cell(1, 1)], "t")?;
        ctx.lookup(vec![cell(0, 3), cell(1, 3)], "u")?;
        let optimized = optimize(&ctx.collect(), 8, 7);

        let groups = &optimized.grouped_lookups["t"];
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(optimized.lookup_gates.len(), 2);
        let tables = optimized
            .lookup_gates
            .iter()
            .flat_map(|(_, lookups)| lookups.iter().map(|(t, _)| t.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(tables, vec!["t", "u"]);
        Ok(())
    }

    #[test]
    fn lookups_group_across_fresh_subcontexts() -> Result<()> {
        let mut ctx = ConstraintContext::<F>::new(2, 0, 0, 6);
        let mut fresh = ctx.fresh_subcontext(&[0, 1], 0, 6)?;
        ctx.lookup(vec![cell(0, 1)], "t")?;
        fresh.lookup(vec![cell(1, 2)], "t")?;
        let collected = ctx.collect();
        assert_eq!(collected.storages.len(), 2);
        let optimized = optimize(&collected, 8, 7);

        assert!(optimized.lookup_gates.is_empty());
        let groups = &optimized.grouped_lookups["t"];
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        Ok(())
    }
}
