use serde::{Deserialize, Serialize};

/// A set of rows of a table with `rows_amount` rows, compared and hashed by content.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RowSelector {
    rows_amount: usize,
    words: Vec<u64>,
}

impl RowSelector {
    pub fn new(rows_amount: usize) -> Self {
        Self {
            rows_amount,
            words: vec![0; rows_amount.div_ceil(64)],
        }
    }

    pub fn from_rows(rows_amount: usize, rows: impl IntoIterator<Item = usize>) -> Self {
        let mut selector = Self::new(rows_amount);
        rows.into_iter().for_each(|row| selector.set_row(row));
        selector
    }

    pub fn rows_amount(&self) -> usize {
        self.rows_amount
    }

    pub fn set_row(&mut self, row: usize) {
        assert!(row < self.rows_amount, "row {row} outside of the selector");
        self.words[row / 64] |= 1 << (row % 64);
    }

    /// Sets every row of `[from, to]`.
    pub fn set_interval(&mut self, from: usize, to: usize) {
        (from..=to).for_each(|row| self.set_row(row));
    }

    pub fn clear_row(&mut self, row: usize) {
        if row < self.rows_amount {
            self.words[row / 64] &= !(1 << (row % 64));
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        row < self.rows_amount && (self.words[row / 64] >> (row % 64)) & 1 == 1
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    pub fn union_with(&mut self, other: &Self) {
        if other.rows_amount > self.rows_amount {
            self.rows_amount = other.rows_amount;
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(a, b)| a & b == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.rows_amount).filter(|&row| self.contains(row))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn content_equality_is_a_map_key() {
        let a = RowSelector::from_rows(100, [3, 70, 99]);
        let mut b = RowSelector::new(100);
        b.set_interval(70, 70);
        b.set_row(99);
        b.set_row(3);
        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn set_operations() {
        let a = RowSelector::from_rows(16, [1, 2, 3]);
        let b = RowSelector::from_rows(16, [4, 5]);
        assert!(a.is_disjoint(&b));
        let u = a.union(&b);
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(u.count(), 5);
        assert!(!u.is_disjoint(&a));

        let mut c = u.clone();
        c.clear_row(3);
        assert!(!c.contains(3));
        assert!(!c.contains(200));
        assert!(RowSelector::new(5).is_empty());
    }
}
