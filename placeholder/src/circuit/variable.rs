use std::fmt;

use serde::{Deserialize, Serialize};

/// The four kinds of columns of an assignment table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ColumnKind {
    Witness,
    PublicInput,
    Constant,
    Selector,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 4] = [
        ColumnKind::Witness,
        ColumnKind::PublicInput,
        ColumnKind::Constant,
        ColumnKind::Selector,
    ];

    pub const fn index(self) -> usize {
        match self {
            ColumnKind::Witness => 0,
            ColumnKind::PublicInput => 1,
            ColumnKind::Constant => 2,
            ColumnKind::Selector => 3,
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            ColumnKind::Witness => "w",
            ColumnKind::PublicInput => "pi",
            ColumnKind::Constant => "c",
            ColumnKind::Selector => "s",
        }
    }
}

/// A cell reference. When `relative` is set, `rotation` is an offset from the row a constraint is
/// evaluated at; otherwise it is the absolute row index.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Variable {
    pub kind: ColumnKind,
    pub index: usize,
    pub rotation: i32,
    pub relative: bool,
}

impl Variable {
    pub const fn absolute(kind: ColumnKind, index: usize, row: usize) -> Self {
        Self {
            kind,
            index,
            rotation: row as i32,
            relative: false,
        }
    }

    pub const fn relative(kind: ColumnKind, index: usize, rotation: i32) -> Self {
        Self {
            kind,
            index,
            rotation,
            relative: true,
        }
    }

    pub const fn witness(index: usize, rotation: i32) -> Self {
        Self::relative(ColumnKind::Witness, index, rotation)
    }

    pub const fn public_input(index: usize, rotation: i32) -> Self {
        Self::relative(ColumnKind::PublicInput, index, rotation)
    }

    pub const fn constant(index: usize, rotation: i32) -> Self {
        Self::relative(ColumnKind::Constant, index, rotation)
    }

    pub const fn selector(index: usize, rotation: i32) -> Self {
        Self::relative(ColumnKind::Selector, index, rotation)
    }

    /// The absolute row of this cell. Only meaningful for absolute variables.
    pub fn row(&self) -> usize {
        debug_assert!(!self.relative);
        self.rotation as usize
    }

    /// Turns an absolute cell into one relative to the row `-shift`.
    pub fn relativize(&self, shift: i32) -> Self {
        if self.relative {
            *self
        } else {
            Self::relative(self.kind, self.index, self.rotation + shift)
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.kind.prefix();
        if self.relative {
            write!(f, "{prefix}{}[{:+}]", self.index, self.rotation)
        } else {
            write!(f, "{prefix}{}@{}", self.index, self.rotation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relativize_shifts_absolute_rows_only() {
        let abs = Variable::absolute(ColumnKind::Witness, 3, 7);
        assert_eq!(abs.relativize(-6), Variable::witness(3, 1));
        let rel = Variable::constant(1, -1);
        assert_eq!(rel.relativize(5), rel);
    }

    #[test]
    fn display() {
        assert_eq!(Variable::witness(2, -1).to_string(), "w2[-1]");
        assert_eq!(
            Variable::absolute(ColumnKind::PublicInput, 0, 4).to_string(),
            "pi0@4"
        );
    }
}
