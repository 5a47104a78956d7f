//! Error kinds surfaced by circuit construction, proving and verification.
//!
//! Public APIs return [`anyhow::Result`]; the concrete kind can be recovered with
//! [`anyhow::Error::downcast_ref`].

use thiserror::Error;

use crate::circuit::variable::ColumnKind;

/// The circuit or its parameters are malformed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{what}: requested {requested}, but the component requires at least {required}")]
    BelowMinimum {
        what: &'static str,
        requested: usize,
        required: usize,
    },
    #[error("unknown lookup table `{0}`")]
    UnknownTable(String),
    #[error("lookup table `{0}` is declared twice")]
    DuplicateTable(String),
    #[error("expression mixes absolute and relative variables: {0}")]
    MixedRelativity(String),
    #[error("subtable `{0}` refers to a table that does not fit into a single option")]
    SplitSubtable(String),
    #[error("copy constraints need single-variable operands, got `{0}`")]
    NonVariableCopy(String),
    #[error("lookup into `{table}` has no admissible base row")]
    NoLookupRow { table: String },
    #[error("{0}")]
    Unsupported(String),
}

/// A cell could not be assigned.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("{kind:?} cell ({column}, {row}) is allocated twice")]
    ReAllocated {
        kind: ColumnKind,
        column: usize,
        row: usize,
    },
    #[error("no free {kind:?} cell within {max_rows} rows")]
    InsufficientSpace { kind: ColumnKind, max_rows: usize },
    #[error("row {row} lies outside of the {max_rows} rows given to this context")]
    RowOutOfRange { row: usize, max_rows: usize },
    #[error("column {column} lies outside of the {columns} {kind:?} columns")]
    ColumnOutOfRange {
        kind: ColumnKind,
        column: usize,
        columns: usize,
    },
    #[error("constant cell ({column}, {row}) is preset to a different value")]
    ConstantMismatch { column: usize, row: usize },
}

/// The assignment does not satisfy the circuit.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("gate {gate}, constraint {constraint} is not satisfied at row {row}: {expression}")]
    GateViolated {
        gate: usize,
        constraint: usize,
        row: usize,
        expression: String,
    },
    #[error("copy constraint {left} = {right} is violated")]
    CopyViolated { left: String, right: String },
    #[error("lookup gate {gate}, constraint {constraint} at row {row} finds no entry in `{table}`")]
    LookupViolated {
        gate: usize,
        constraint: usize,
        row: usize,
        table: String,
    },
}

/// A proof failed one of the cryptographic checks.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CryptographicError {
    #[error("Merkle proof does not match the committed root")]
    MerkleMismatch,
    #[error("FRI folding is inconsistent in round {round}")]
    FoldingMismatch { round: usize },
    #[error("final polynomial has {len} coefficients, at most {max} are allowed")]
    FinalPolynomialTooLarge { len: usize, max: usize },
    #[error("proof-of-work nonce does not reach {bits} leading zero bits")]
    InsufficientPow { bits: u32 },
    #[error("quotient relation does not hold at the evaluation point")]
    EvaluationMismatch,
    #[error("opened public input column {column} does not match the claimed values")]
    PublicInputMismatch { column: usize },
    #[error("evaluation point lies in the trace domain")]
    InvalidChallenge,
    #[error("a challenge collides with a committed value")]
    ChallengeCollision,
}

/// A proof does not match the expected shape, or its bytes are malformed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("batch layout mismatch: {0}")]
    BatchInfoMismatch(String),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("{0} trailing bytes after the proof")]
    TrailingBytes(usize),
    #[error("non-canonical field element {0:#x}")]
    InvalidFieldElement(u64),
}

#[derive(Debug, Error)]
pub enum PlaceholderError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
    #[error(transparent)]
    Cryptographic(#[from] CryptographicError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl PlaceholderError {
    /// Recovers the concrete kind from an [`anyhow::Error`] produced by this crate.
    pub fn classify(err: &anyhow::Error) -> Option<Self> {
        if let Some(e) = err.downcast_ref::<ConfigurationError>() {
            Some(e.clone().into())
        } else if let Some(e) = err.downcast_ref::<AllocationError>() {
            Some(e.clone().into())
        } else if let Some(e) = err.downcast_ref::<ConstraintError>() {
            Some(e.clone().into())
        } else if let Some(e) = err.downcast_ref::<CryptographicError>() {
            Some(e.clone().into())
        } else {
            err.downcast_ref::<FormatError>().map(|e| e.clone().into())
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn classify_recovers_the_kind() {
        let err: anyhow::Error = AllocationError::InsufficientSpace {
            kind: ColumnKind::Witness,
            max_rows: 4,
        }
        .into();
        assert!(matches!(
            PlaceholderError::classify(&err),
            Some(PlaceholderError::Allocation(
                AllocationError::InsufficientSpace { max_rows: 4, .. }
            ))
        ));

        let err = anyhow::Error::from(CryptographicError::MerkleMismatch).context("query 3");
        assert!(matches!(
            PlaceholderError::classify(&err),
            Some(PlaceholderError::Cryptographic(CryptographicError::MerkleMismatch))
        ));

        assert!(PlaceholderError::classify(&anyhow!("plain")).is_none());
    }
}
