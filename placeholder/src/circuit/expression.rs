use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use anyhow::{bail, Result};
use placeholder_field::types::Field;
use serde::{Deserialize, Serialize};

use crate::circuit::variable::Variable;
use crate::error::ConfigurationError;

/// A polynomial over table cells.
///
/// Equality is structural, which is what the gate optimizer coalesces on.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum Expression<F: Field> {
    Const(F),
    /// A coefficient times a product of variables.
    Term(F, Vec<Variable>),
    Add(Box<Expression<F>>, Box<Expression<F>>),
    Sub(Box<Expression<F>>, Box<Expression<F>>),
    Mul(Box<Expression<F>>, Box<Expression<F>>),
}

impl<F: Field> Default for Expression<F> {
    fn default() -> Self {
        Self::Const(F::ZERO)
    }
}

impl<F: Field> Expression<F> {
    pub fn zero() -> Self {
        Self::Const(F::ZERO)
    }

    pub fn one() -> Self {
        Self::Const(F::ONE)
    }

    pub fn visit_variables(&self, f: &mut impl FnMut(&Variable)) {
        match self {
            Self::Const(_) => {}
            Self::Term(_, vars) => vars.iter().for_each(f),
            Self::Add(a, b) | Self::Sub(a, b) | Self::Mul(a, b) => {
                a.visit_variables(f);
                b.visit_variables(f);
            }
        }
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        self.visit_variables(&mut |v| {
            vars.insert(*v);
        });
        vars
    }

    pub fn has_variables(&self) -> bool {
        let mut found = false;
        self.visit_variables(&mut |_| found = true);
        found
    }

    /// `Some(true)` if every variable is relative, `Some(false)` if every variable is absolute and
    /// `None` for a constant expression.
    pub fn relativity(&self) -> Result<Option<bool>> {
        let (mut relative, mut absolute) = (false, false);
        self.visit_variables(&mut |v| {
            if v.relative {
                relative = true;
            } else {
                absolute = true;
            }
        });
        match (relative, absolute) {
            (true, true) => bail!(ConfigurationError::MixedRelativity(self.to_string())),
            (true, false) => Ok(Some(true)),
            (false, true) => Ok(Some(false)),
            (false, false) => Ok(None),
        }
    }

    /// Smallest and largest rotation of the variables, if there are any.
    pub fn row_range(&self) -> Option<(i32, i32)> {
        let mut range: Option<(i32, i32)> = None;
        self.visit_variables(&mut |v| {
            range = Some(match range {
                None => (v.rotation, v.rotation),
                Some((lo, hi)) => (lo.min(v.rotation), hi.max(v.rotation)),
            });
        });
        range
    }

    pub fn map_variables(&self, f: &impl Fn(&Variable) -> Variable) -> Self {
        match self {
            Self::Const(c) => Self::Const(*c),
            Self::Term(c, vars) => Self::Term(*c, vars.iter().map(f).collect()),
            Self::Add(a, b) => Self::Add(Box::new(a.map_variables(f)), Box::new(b.map_variables(f))),
            Self::Sub(a, b) => Self::Sub(Box::new(a.map_variables(f)), Box::new(b.map_variables(f))),
            Self::Mul(a, b) => Self::Mul(Box::new(a.map_variables(f)), Box::new(b.map_variables(f))),
        }
    }

    /// Replaces every absolute row `r` with the relative rotation `r + shift`.
    pub fn relativize(&self, shift: i32) -> Self {
        self.map_variables(&|v| v.relativize(shift))
    }

    /// Adds `by` to the rotation of every relative variable.
    pub fn rotate(&self, by: i32) -> Self {
        self.map_variables(&|v| {
            let mut v = *v;
            if v.relative {
                v.rotation += by;
            }
            v
        })
    }

    /// Degree in the variables.
    pub fn max_degree(&self) -> usize {
        match self {
            Self::Const(_) => 0,
            Self::Term(_, vars) => vars.len(),
            Self::Add(a, b) | Self::Sub(a, b) => a.max_degree().max(b.max_degree()),
            Self::Mul(a, b) => a.max_degree() + b.max_degree(),
        }
    }

    pub fn evaluate(&self, var: &impl Fn(&Variable) -> F) -> F {
        match self {
            Self::Const(c) => *c,
            Self::Term(c, vars) => vars.iter().fold(*c, |acc, v| acc * var(v)),
            Self::Add(a, b) => a.evaluate(var) + b.evaluate(var),
            Self::Sub(a, b) => a.evaluate(var) - b.evaluate(var),
            Self::Mul(a, b) => a.evaluate(var) * b.evaluate(var),
        }
    }

    /// The single variable this expression consists of, if it is exactly that.
    pub fn as_variable(&self) -> Option<Variable> {
        match self {
            Self::Term(c, vars) if *c == F::ONE && vars.len() == 1 => Some(vars[0]),
            _ => None,
        }
    }

    /// The value of a variable-free expression.
    pub fn constant_value(&self) -> Option<F> {
        if self.has_variables() {
            None
        } else {
            Some(self.evaluate(&|_| F::ZERO))
        }
    }

    fn is_const(&self, value: F) -> bool {
        matches!(self, Self::Const(c) if *c == value)
    }
}

impl<F: Field> From<Variable> for Expression<F> {
    fn from(v: Variable) -> Self {
        Self::Term(F::ONE, vec![v])
    }
}

impl<F: Field> From<F> for Expression<F> {
    fn from(c: F) -> Self {
        Self::Const(c)
    }
}

impl<F: Field> Add for Expression<F> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Const(a), Self::Const(b)) => Self::Const(a + b),
            (a, b) if b.is_const(F::ZERO) => a,
            (a, b) if a.is_const(F::ZERO) => b,
            (a, b) => Self::Add(Box::new(a), Box::new(b)),
        }
    }
}

impl<F: Field> Sub for Expression<F> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Const(a), Self::Const(b)) => Self::Const(a - b),
            (a, b) if b.is_const(F::ZERO) => a,
            (a, b) => Self::Sub(Box::new(a), Box::new(b)),
        }
    }
}

impl<F: Field> Mul for Expression<F> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Const(a), Self::Const(b)) => Self::Const(a * b),
            (Self::Const(a), Self::Term(c, vars)) | (Self::Term(c, vars), Self::Const(a)) => {
                Self::Term(a * c, vars)
            }
            (Self::Term(c, mut vars), Self::Term(d, other)) => {
                vars.extend(other);
                Self::Term(c * d, vars)
            }
            (a, b) if a.is_const(F::ONE) => b,
            (a, b) if b.is_const(F::ONE) => a,
            (a, b) => Self::Mul(Box::new(a), Box::new(b)),
        }
    }
}

impl<F: Field> Neg for Expression<F> {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            Self::Const(c) => Self::Const(-c),
            Self::Term(c, vars) => Self::Term(-c, vars),
            e => Self::Const(F::NEG_ONE) * e,
        }
    }
}

impl<F: Field> fmt::Display for Expression<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(c) => write!(f, "{c}"),
            Self::Term(c, vars) => {
                if *c != F::ONE || vars.is_empty() {
                    write!(f, "{c}")?;
                    if !vars.is_empty() {
                        write!(f, "*")?;
                    }
                }
                for (i, v) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
            Self::Add(a, b) => write!(f, "({a} + {b})"),
            Self::Sub(a, b) => write!(f, "({a} - {b})"),
            Self::Mul(a, b) => write!(f, "{a} * {b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use placeholder_field::goldilocks_field::GoldilocksField;

    use super::*;
    use crate::circuit::variable::ColumnKind;

    type F = GoldilocksField;
    type E = Expression<F>;

    fn w(index: usize, row: usize) -> E {
        Variable::absolute(ColumnKind::Witness, index, row).into()
    }

    #[test]
    fn degree_and_evaluation() {
        let e = w(0, 1) * w(1, 1) + E::from(F::TWO) * w(2, 2) - F::from_canonical_u64(5).into();
        assert_eq!(e.max_degree(), 2);
        let value = e.evaluate(&|v| F::from_canonical_usize(v.index + 2));
        // 2*3 + 2*4 - 5
        assert_eq!(value, F::from_canonical_u64(9));
        assert_eq!(e.row_range(), Some((1, 2)));
    }

    #[test]
    fn relativity() -> Result<()> {
        let abs = w(0, 3) + w(1, 4);
        assert_eq!(abs.relativity()?, Some(false));
        let rel = abs.relativize(-3);
        assert_eq!(rel.relativity()?, Some(true));
        assert_eq!(rel.row_range(), Some((0, 1)));
        assert_eq!(E::from(F::ONE).relativity()?, None);

        let mixed = w(0, 3) + Variable::witness(0, 0).into();
        let err = mixed.relativity().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::MixedRelativity(_))
        ));
        Ok(())
    }

    #[test]
    fn structural_identity_after_relativize() {
        // The same constraint pattern placed at two rows becomes one relative expression.
        let at = |row: usize| (w(0, row) - w(1, row + 1)).relativize(-(row as i32));
        assert_eq!(at(2), at(9));
        assert_ne!(at(2), (w(1, 2) - w(0, 3)).relativize(-2));
    }

    #[test]
    fn simplification() {
        let x = w(0, 0);
        assert_eq!(x.clone() + E::zero(), x);
        assert_eq!(E::one() * x.clone(), x);
        assert_eq!(x.as_variable(), Some(Variable::absolute(ColumnKind::Witness, 0, 0)));
        assert_eq!((x.clone() * F::TWO.into()).as_variable(), None);
        assert_eq!(
            (E::from(F::TWO) * F::from_canonical_u64(3).into()).constant_value(),
            Some(F::from_canonical_u64(6))
        );
        assert_eq!((-x).to_string(), format!("{}*w0@0", F::NEG_ONE));
    }
}
