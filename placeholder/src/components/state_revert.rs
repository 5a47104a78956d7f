//! Storage writes across nested calls, some of which revert.
//!
//! Four regions share the witness columns:
//!
//! - `calls`: `(call_id, parent_id, reverted)`, the root call `(0, 0, 0)` first;
//! - `state`: `(op, call_id, slot, value)` with `op` one of [`BEGIN`] and [`END`], the value of a
//!   slot when a call starts and when it returns;
//! - `checks`: `(call_id, parent_id, reverted, slot, initial, final, changed)` for every slot a
//!   call or one of its descendants touches; a reverted call must end with `final = initial`;
//! - `writes`: `(call_id, slot, value)`, starting with a zero write of the root to slot zero.
//!
//! Every write must have a check of its call, and every check one of the parent call, so a revert
//! anywhere up the call tree is enforced on the slot. The root call always tracks slot zero.
//!
//! A check whose `final` differs from `initial` sets `changed`, and then `(slot, final)` must be a
//! written pair. This does not order the writes: the circuit accepts any value written to the
//! slot, not only the last one.

use std::collections::BTreeMap;

use anyhow::{bail, ensure, Result};
use log::debug;
use placeholder_field::types::PrimeField64;

use crate::circuit::component::{Component, TableParams};
use crate::circuit::context::Context;
use crate::circuit::variable::ColumnKind;
use crate::error::{AllocationError, ConfigurationError};

pub const CALLS_TABLE: &str = "calls";
pub const STATE_TABLE: &str = "state";
pub const CHECKED_TABLE: &str = "checked";
pub const WRITTEN_TABLE: &str = "written";

pub const BEGIN: u64 = 1;
pub const END: u64 = 2;

const CALL_COLUMNS: [usize; 3] = [0, 1, 2];
pub const STATE_COLUMNS: [usize; 4] = [3, 4, 5, 6];
pub const CHECK_COLUMNS: [usize; 7] = [7, 8, 9, 10, 11, 12, 13];
const WRITE_COLUMNS: [usize; 3] = [14, 15, 16];

/// One step of execution.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StateEvent {
    Enter { id: u64 },
    Write { slot: u64, value: u64 },
    Exit { revert: bool },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StateRevertInfo {
    pub max_calls: usize,
    pub max_state_rows: usize,
    pub max_checks: usize,
    pub max_writes: usize,
}

impl StateRevertInfo {
    fn rows(&self) -> usize {
        self.max_calls
            .max(self.max_state_rows)
            .max(self.max_checks)
            .max(self.max_writes + 1)
    }
}

/// Rows of every region, as produced by [`trace`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StateTrace<V> {
    pub calls: Vec<[V; 3]>,
    pub state: Vec<[V; 4]>,
    pub checks: Vec<[V; 7]>,
    pub writes: Vec<[V; 3]>,
}

struct Frame {
    id: u64,
    parent: u64,
    /// Value of each touched slot when the frame was entered.
    initial: BTreeMap<u64, u64>,
}

/// Runs `events` over zeroed storage. Frames left open at the end return normally.
pub fn trace(events: &[StateEvent]) -> Result<StateTrace<u64>> {
    let mut storage = BTreeMap::<u64, u64>::new();
    let mut trace = StateTrace {
        calls: vec![[0, 0, 0]],
        ..Default::default()
    };
    let mut frames = vec![Frame {
        id: 0,
        parent: 0,
        initial: BTreeMap::from([(0, 0)]),
    }];

    for event in events {
        match *event {
            StateEvent::Enter { id } => {
                ensure!(
                    trace.calls.iter().all(|c| c[0] != id),
                    ConfigurationError::Unsupported(format!("call {id} is entered twice"))
                );
                let parent = frames.last().map_or(0, |f| f.id);
                trace.calls.push([id, parent, 0]);
                frames.push(Frame {
                    id,
                    parent,
                    initial: BTreeMap::new(),
                });
            }
            StateEvent::Write { slot, value } => {
                let current = storage.get(&slot).copied().unwrap_or_default();
                for frame in &mut frames {
                    frame.initial.entry(slot).or_insert(current);
                }
                let call = frames.last().map_or(0, |f| f.id);
                trace.writes.push([call, slot, value]);
                storage.insert(slot, value);
            }
            StateEvent::Exit { revert } => {
                if frames.len() < 2 {
                    bail!(ConfigurationError::Unsupported(
                        "exit without a matching enter".into()
                    ));
                }
                if let Some(frame) = frames.pop() {
                    close_frame(frame, revert, &mut storage, &mut trace);
                }
            }
        }
    }
    while let Some(frame) = frames.pop() {
        close_frame(frame, false, &mut storage, &mut trace);
    }
    debug!(
        "state trace: {} calls, {} state rows, {} checks, {} writes",
        trace.calls.len(),
        trace.state.len(),
        trace.checks.len(),
        trace.writes.len()
    );
    Ok(trace)
}

/// Emits the `BEGIN`/`END` rows and the checks of a returning frame.
fn close_frame(
    frame: Frame,
    revert: bool,
    storage: &mut BTreeMap<u64, u64>,
    trace: &mut StateTrace<u64>,
) {
    if revert {
        storage.extend(&frame.initial);
        if let Some(call) = trace.calls.iter_mut().find(|c| c[0] == frame.id) {
            call[2] = 1;
        }
    }
    for (&slot, &initial) in &frame.initial {
        let last = storage.get(&slot).copied().unwrap_or_default();
        trace.state.push([BEGIN, frame.id, slot, initial]);
        trace.state.push([END, frame.id, slot, last]);
        let changed = (last != initial) as u64;
        trace.checks.push([
            frame.id,
            frame.parent,
            revert as u64,
            slot,
            initial,
            last,
            changed,
        ]);
    }
}

/// The check of slot zero in the root call, which every trace contains. Spare check rows repeat
/// it.
fn root_slot_zero_check(trace: &StateTrace<u64>) -> [u64; 7] {
    trace
        .checks
        .iter()
        .find(|c| c[0] == 0 && c[3] == 0)
        .copied()
        .unwrap_or([0; 7])
}

/// Pads `rows` to `len` with `filler`.
fn pad<const N: usize>(
    mut rows: Vec<[u64; N]>,
    len: usize,
    filler: [u64; N],
    max_rows: usize,
) -> Result<Vec<[u64; N]>> {
    ensure!(
        rows.len() <= len,
        AllocationError::InsufficientSpace {
            kind: ColumnKind::Witness,
            max_rows,
        }
    );
    rows.resize(len, filler);
    Ok(rows)
}

fn to_cells<F: PrimeField64, C: Context<F>, const N: usize>(
    ctx: &C,
    rows: Vec<[u64; N]>,
) -> Vec<[C::Value; N]> {
    rows.into_iter()
        .map(|row| row.map(|v| ctx.witness(F::from_canonical_u64(v))))
        .collect()
}

/// Allocates `rows` into a fresh subcontext over `columns` and returns the cells.
fn place_region<F: PrimeField64, C: Context<F>, const N: usize>(
    ctx: &C,
    columns: &[usize; N],
    rows: &[[C::Value; N]],
) -> Result<(C, Vec<[C::Value; N]>)> {
    let mut region = ctx.subcontext(columns, 0, rows.len())?;
    let mut placed = Vec::with_capacity(rows.len());
    for (row, values) in rows.iter().enumerate() {
        let mut cells = values.clone();
        for (column, cell) in cells.iter_mut().enumerate() {
            region.allocate(cell, column, row, ColumnKind::Witness)?;
        }
        placed.push(cells);
    }
    Ok((region, placed))
}

pub struct StateRevert;

impl<F: PrimeField64> Component<F> for StateRevert {
    type StaticInfo = StateRevertInfo;
    type RawInput = Vec<StateEvent>;
    type Input<V: Clone> = StateTrace<V>;
    type Output<V: Clone> = StateTrace<V>;

    fn minimal_requirements(info: &StateRevertInfo) -> TableParams {
        TableParams {
            witnesses: WRITE_COLUMNS[2] + 1,
            public_inputs: 0,
            constants: 0,
            rows: info.rows(),
        }
    }

    fn form_input<C: Context<F>>(
        ctx: &mut C,
        raw: &Vec<StateEvent>,
        info: &StateRevertInfo,
    ) -> Result<StateTrace<C::Value>> {
        let trace = trace(raw)?;
        let root_check = root_slot_zero_check(&trace);
        let max_rows = info.rows();
        let mut writes = vec![[0; 3]];
        writes.extend(trace.writes);
        Ok(StateTrace {
            calls: to_cells(ctx, pad(trace.calls, info.max_calls, [0; 3], max_rows)?),
            state: to_cells(ctx, pad(trace.state, info.max_state_rows, [0; 4], max_rows)?),
            checks: to_cells(ctx, pad(trace.checks, info.max_checks, root_check, max_rows)?),
            writes: to_cells(ctx, pad(writes, info.max_writes + 1, [0; 3], max_rows)?),
        })
    }

    fn construct<C: Context<F>>(
        ctx: &mut C,
        input: StateTrace<C::Value>,
        _info: &StateRevertInfo,
        _make_links: bool,
    ) -> Result<StateTrace<C::Value>> {
        let one = C::Value::from(F::ONE);

        let (mut calls_ctx, calls) = place_region(ctx, &CALL_COLUMNS, &input.calls)?;
        for [_, _, reverted] in &calls {
            calls_ctx.constrain(
                reverted.clone() * (reverted.clone() - one.clone()),
                "revert flag",
            )?;
        }
        calls_ctx.lookup_table(CALLS_TABLE, &[0, 1, 2], 0, calls.len())?;

        let (mut state_ctx, state) = place_region(ctx, &STATE_COLUMNS, &input.state)?;
        state_ctx.lookup_table(STATE_TABLE, &[0, 1, 2, 3], 0, state.len())?;

        let (mut checks_ctx, checks) = place_region(ctx, &CHECK_COLUMNS, &input.checks)?;
        checks_ctx.lookup_table(CHECKED_TABLE, &[0, 3], 0, checks.len())?;
        let begin = C::Value::from(F::from_canonical_u64(BEGIN));
        let end = C::Value::from(F::from_canonical_u64(END));
        for [call, parent, reverted, slot, initial, last, changed] in &checks {
            checks_ctx.lookup(
                vec![call.clone(), parent.clone(), reverted.clone()],
                CALLS_TABLE,
            )?;
            checks_ctx.lookup(
                vec![begin.clone(), call.clone(), slot.clone(), initial.clone()],
                STATE_TABLE,
            )?;
            checks_ctx.lookup(
                vec![end.clone(), call.clone(), slot.clone(), last.clone()],
                STATE_TABLE,
            )?;
            checks_ctx.lookup(vec![parent.clone(), slot.clone()], CHECKED_TABLE)?;
            checks_ctx.constrain(
                reverted.clone() * (last.clone() - initial.clone()),
                "reverted slot restored",
            )?;
            checks_ctx.constrain(
                changed.clone() * (changed.clone() - one.clone()),
                "changed flag",
            )?;
            checks_ctx.constrain(
                (last.clone() - initial.clone()) * (one.clone() - changed.clone()),
                "unchanged slot",
            )?;
            checks_ctx.lookup(
                vec![changed.clone() * slot.clone(), changed.clone() * last.clone()],
                WRITTEN_TABLE,
            )?;
        }

        let (mut writes_ctx, writes) = place_region(ctx, &WRITE_COLUMNS, &input.writes)?;
        writes_ctx.lookup_table(WRITTEN_TABLE, &[1, 2], 0, writes.len())?;
        for [call, slot, _] in &writes {
            writes_ctx.lookup(vec![call.clone(), slot.clone()], CHECKED_TABLE)?;
        }

        Ok(StateTrace {
            calls,
            state,
            checks,
            writes,
        })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use placeholder_field::goldilocks_field::GoldilocksField;
    use placeholder_field::types::Field;

    use super::StateEvent::{Enter, Exit, Write};
    use super::*;
    use crate::circuit::builder::CircuitBuilder;
    use crate::circuit::satisfiability::check_satisfiability;
    use crate::error::ConstraintError;

    type F = GoldilocksField;

    const INFO: StateRevertInfo = StateRevertInfo {
        max_calls: 4,
        max_state_rows: 16,
        max_checks: 8,
        max_writes: 8,
    };

    /// The root writes slot 1, call 1 overwrites it, and call 2 inside it writes two slots and
    /// reverts.
    fn nested_revert() -> Vec<StateEvent> {
        vec![
            Write { slot: 1, value: 10 },
            Enter { id: 1 },
            Write { slot: 1, value: 20 },
            Enter { id: 2 },
            Write { slot: 1, value: 30 },
            Write { slot: 2, value: 5 },
            Exit { revert: true },
            Exit { revert: false },
        ]
    }

    #[test]
    fn reverted_call_restores_its_slots() -> Result<()> {
        let trace = trace(&nested_revert())?;
        assert_eq!(trace.calls, vec![[0, 0, 0], [1, 0, 0], [2, 1, 1]]);
        // Call 2 closes first: slot 1 back to 20, slot 2 back to 0.
        assert_eq!(trace.checks[0], [2, 1, 1, 1, 20, 20, 0]);
        assert_eq!(trace.checks[1], [2, 1, 1, 2, 0, 0, 0]);
        // Call 1 and the root see the surviving write.
        assert!(trace.checks.contains(&[1, 0, 0, 1, 10, 20, 1]));
        assert!(trace.checks.contains(&[0, 0, 0, 1, 0, 20, 1]));
        assert!(trace.checks.contains(&[0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(trace.checks.len(), 7);
        assert_eq!(trace.state.len(), 14);
        Ok(())
    }

    #[test]
    fn spare_checks_repeat_the_root() -> Result<()> {
        let builder = CircuitBuilder::<F, StateRevert>::new(INFO, None)?;
        let (_, output) = builder.assign(&nested_revert())?;
        let root = [0; 7].map(F::from_canonical_u64);
        assert_eq!(output.checks.len(), INFO.max_checks);
        assert!(output.checks[7..].iter().all(|c| *c == root));
        let inner = output
            .checks
            .iter()
            .filter(|c| c[0] == F::from_canonical_u64(2))
            .count();
        assert_eq!(inner, 2);
        Ok(())
    }

    #[test]
    fn unbalanced_exit_is_rejected() {
        let err = trace(&[Exit { revert: false }]).unwrap_err();
        assert!(err.downcast_ref::<ConfigurationError>().is_some());
    }

    #[test]
    fn restored_values_satisfy_the_circuit() -> Result<()> {
        let builder = CircuitBuilder::<F, StateRevert>::new(INFO, None)?;
        let names = builder
            .constraint_system()
            .lookup_tables
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![CALLS_TABLE, CHECKED_TABLE, STATE_TABLE, WRITTEN_TABLE]
        );

        let (table, output) = builder.assign(&nested_revert())?;
        builder.is_satisfied(&table)?;
        assert_eq!(output.calls[2], [2, 1, 1].map(F::from_canonical_u64));
        Ok(())
    }

    #[test]
    fn leaked_write_breaks_the_revert() -> Result<()> {
        let builder = CircuitBuilder::<F, StateRevert>::new(INFO, None)?;
        let (mut table, _) = builder.assign(&nested_revert())?;
        // Call 2 leaves slot 2 at 5 in both its check and its END row.
        let leaked = F::from_canonical_u64(5);
        table.set(ColumnKind::Witness, CHECK_COLUMNS[5], 2, leaked);
        table.set(ColumnKind::Witness, STATE_COLUMNS[3], 4, leaked);
        let err = builder.is_satisfied(&table).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConstraintError>(),
            Some(ConstraintError::GateViolated { row: 2, .. })
        ));
        Ok(())
    }

    #[test]
    fn end_values_come_from_writes() -> Result<()> {
        let builder = CircuitBuilder::<F, StateRevert>::new(INFO, None)?;
        let (mut table, output) = builder.assign(&nested_revert())?;
        assert_eq!(output.writes[0], [F::ZERO; 3]);

        // Call 1 claims slot 1 ends at 25, consistently in its check and END rows.
        let call_one = [1, 0, 0, 1, 10, 20, 1].map(F::from_canonical_u64);
        let Some(row) = output.checks.iter().position(|c| *c == call_one) else {
            bail!("no check of call 1 on slot 1");
        };
        let end_row = [END, 1, 1, 20].map(F::from_canonical_u64);
        let Some(state_row) = (0..table.rows_amount()).find(|&r| {
            (0..4).all(|i| table.get(ColumnKind::Witness, STATE_COLUMNS[i], r) == end_row[i])
        }) else {
            bail!("no END row of call 1 on slot 1");
        };
        let forged = F::from_canonical_u64(25);
        table.set(ColumnKind::Witness, CHECK_COLUMNS[5], row + 1, forged);
        table.set(ColumnKind::Witness, STATE_COLUMNS[3], state_row, forged);

        let violations = check_satisfiability(builder.constraint_system(), &table);
        assert!(!violations.is_empty());
        assert!(violations.iter().all(|v| matches!(
            v,
            ConstraintError::LookupViolated { table: name, .. } if name == WRITTEN_TABLE
        )));
        Ok(())
    }
}
