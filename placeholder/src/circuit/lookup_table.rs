use std::collections::BTreeMap;

use anyhow::{ensure, Result};
use placeholder_field::types::Field;

use crate::error::ConfigurationError;

/// A contiguous range `[begin, end]` of rows of a parent table, restricted to some of its columns.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subtable {
    pub column_indices: Vec<usize>,
    pub begin: usize,
    pub end: usize,
}

/// A fixed table of tuples. Lookups address it by `name`, or a subtable by `"name/subtable"`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LookupTable<F: Field> {
    pub name: String,
    /// Column-major values.
    pub columns: Vec<Vec<F>>,
    pub subtables: BTreeMap<String, Subtable>,
}

impl<F: Field> LookupTable<F> {
    pub fn new(name: impl Into<String>, columns: Vec<Vec<F>>) -> Result<Self> {
        let name = name.into();
        ensure!(
            !columns.is_empty() && columns.iter().all(|c| c.len() == columns[0].len()),
            ConfigurationError::Unsupported(format!("table `{name}` has ragged or no columns"))
        );
        Ok(Self {
            name,
            columns,
            subtables: BTreeMap::new(),
        })
    }

    pub fn with_subtable(
        mut self,
        name: impl Into<String>,
        column_indices: Vec<usize>,
        begin: usize,
        end: usize,
    ) -> Result<Self> {
        let name = name.into();
        ensure!(
            begin <= end
                && end < self.rows()
                && column_indices.iter().all(|&c| c < self.width()),
            ConfigurationError::Unsupported(format!(
                "subtable `{name}` lies outside of table `{}`",
                self.name
            ))
        );
        self.subtables.insert(
            name,
            Subtable {
                column_indices,
                begin,
                end,
            },
        );
        Ok(self)
    }

    pub fn rows(&self) -> usize {
        self.columns[0].len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn subtable_name(&self, subtable: &str) -> String {
        format!("{}/{}", self.name, subtable)
    }
}

#[cfg(test)]
mod tests {
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::Sample;

    use super::*;

    type F = GoldilocksField;

    #[test]
    fn subtables_must_fit() -> Result<()> {
        let table = LookupTable::new("t", vec![F::rand_vec(4), F::rand_vec(4)])?
            .with_subtable("low", vec![1], 0, 1)?;
        assert_eq!(table.subtable_name("low"), "t/low");
        assert!(table.clone().with_subtable("bad", vec![2], 0, 1).is_err());
        assert!(table.with_subtable("bad", vec![0], 2, 4).is_err());
        assert!(LookupTable::new("r", vec![F::rand_vec(2), F::rand_vec(3)]).is_err());
        Ok(())
    }
}
