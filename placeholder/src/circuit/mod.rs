//! Circuit construction: expressions over table cells, the two-stage [`context::Context`], the
//! gate optimizer and the builder that assembles a constraint system with its preset columns.

pub mod assignment;
pub mod builder;
pub mod component;
pub mod constraint_system;
pub mod context;
pub mod expression;
pub mod lookup_table;
pub mod optimizer;
pub mod row_selector;
pub mod satisfiability;
pub mod variable;
