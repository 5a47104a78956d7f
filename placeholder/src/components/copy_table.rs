//! A copy event written into a dynamic table and read back through lookups.
//!
//! The writer fills rows `(src_type, src_id, offset, value)` with offsets `0, 1, 2, ...` under a
//! fixed source, so every written tuple is unique. The reader looks each requested offset up and
//! publishes the value it finds.

use anyhow::{ensure, Result};
use placeholder_field::types::PrimeField64;

use crate::circuit::component::{Component, TableParams};
use crate::circuit::context::Context;
use crate::circuit::variable::ColumnKind;
use crate::components::publish;
use crate::error::ConfigurationError;

pub const COPY_TABLE: &str = "copy_events";
const WRITER_COLUMNS: [usize; 4] = [0, 1, 2, 3];
const READER_COLUMNS: [usize; 4] = [4, 5, 6, 7];
/// Witness column of the source id a read is bound to.
pub const READ_SRC_ID_COLUMN: usize = READER_COLUMNS[1];
/// Witness column of the value a read returns.
pub const READ_VALUE_COLUMN: usize = READER_COLUMNS[3];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CopyTableInfo {
    pub max_bytes: usize,
    pub max_reads: usize,
}

/// Bytes copied out of one source, and the offsets read back.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CopyEvent {
    pub src_type: u64,
    pub src_id: u64,
    pub bytes: Vec<u8>,
    pub reads: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct CopyEventInput<V> {
    pub src_type: V,
    pub src_id: V,
    pub bytes: Vec<V>,
    /// Requested offsets, in public input column 0.
    pub offsets: Vec<V>,
}

/// One row of the copy table.
#[derive(Clone, Debug)]
pub struct CopyRow<V> {
    pub src_type: V,
    pub src_id: V,
    pub offset: V,
    pub value: V,
}

impl<V: Clone> CopyRow<V> {
    fn cells(&self) -> Vec<V> {
        vec![
            self.src_type.clone(),
            self.src_id.clone(),
            self.offset.clone(),
            self.value.clone(),
        ]
    }
}

fn allocate_row<F: PrimeField64, C: Context<F>>(
    ctx: &mut C,
    values: [F; 4],
    row: usize,
) -> Result<CopyRow<C::Value>> {
    let mut cells = values.map(|v| ctx.witness(v));
    for (column, cell) in cells.iter_mut().enumerate() {
        ctx.allocate(cell, column, row, ColumnKind::Witness)?;
    }
    let [src_type, src_id, offset, value] = cells;
    Ok(CopyRow {
        src_type,
        src_id,
        offset,
        value,
    })
}

/// Writes the event and declares the rows as table [`COPY_TABLE`].
fn write_event<F: PrimeField64, C: Context<F>>(
    ctx: &mut C,
    input: &CopyEventInput<C::Value>,
) -> Result<Vec<CopyRow<C::Value>>> {
    let (src_type, src_id) = (ctx.value(&input.src_type), ctx.value(&input.src_id));
    let mut rows: Vec<CopyRow<C::Value>> = Vec::with_capacity(input.bytes.len());
    for (offset, byte) in input.bytes.iter().enumerate() {
        let values = [
            src_type,
            src_id,
            F::from_canonical_usize(offset),
            ctx.value(byte),
        ];
        let row = allocate_row(ctx, values, offset)?;
        match rows.last() {
            None => ctx.constrain(row.offset.clone(), "first offset")?,
            Some(previous) => {
                ctx.constrain(
                    row.src_type.clone() - previous.src_type.clone(),
                    "same source type",
                )?;
                ctx.constrain(
                    row.src_id.clone() - previous.src_id.clone(),
                    "same source id",
                )?;
                ctx.constrain(
                    row.offset.clone() - previous.offset.clone() - C::Value::from(F::ONE),
                    "next offset",
                )?;
            }
        }
        rows.push(row);
    }
    ctx.lookup_table(COPY_TABLE, &[0, 1, 2, 3], 0, rows.len())?;
    Ok(rows)
}

/// Reads `offsets` back, bound to the source of the first written row.
fn read_event<F: PrimeField64, C: Context<F>>(
    ctx: &mut C,
    written: &[CopyRow<C::Value>],
    offsets: &[C::Value],
    make_links: bool,
) -> Result<Vec<C::Value>> {
    let Some(first) = written.first() else {
        return Ok(Vec::new());
    };
    let mut values = Vec::with_capacity(offsets.len());
    for (row, offset_in) in offsets.iter().enumerate() {
        let offset = ctx.value(offset_in).to_canonical_u64() as usize;
        let value = written
            .get(offset)
            .map_or(F::ZERO, |w| ctx.value(&w.value));
        let values_row = [
            ctx.value(&first.src_type),
            ctx.value(&first.src_id),
            F::from_canonical_usize(offset),
            value,
        ];
        let read = allocate_row(ctx, values_row, row)?;
        ctx.copy_constrain(&read.src_type, &first.src_type)?;
        ctx.copy_constrain(&read.src_id, &first.src_id)?;
        if make_links {
            ctx.copy_constrain(&read.offset, offset_in)?;
        }
        ctx.lookup(read.cells(), COPY_TABLE)?;
        values.push(read.value);
    }
    Ok(values)
}

/// Writes a copy event and reads some of its bytes back by lookup.
pub struct CopyTable;

impl<F: PrimeField64> Component<F> for CopyTable {
    type StaticInfo = CopyTableInfo;
    type RawInput = CopyEvent;
    type Input<V: Clone> = CopyEventInput<V>;
    /// The values read, also published in public input column 1.
    type Output<V: Clone> = Vec<V>;

    fn minimal_requirements(info: &CopyTableInfo) -> TableParams {
        TableParams {
            witnesses: WRITER_COLUMNS.len() + READER_COLUMNS.len(),
            public_inputs: 2,
            constants: 0,
            rows: info.max_bytes.max(info.max_reads),
        }
    }

    fn form_input<C: Context<F>>(
        ctx: &mut C,
        raw: &CopyEvent,
        info: &CopyTableInfo,
    ) -> Result<CopyEventInput<C::Value>> {
        ensure!(
            raw.bytes.len() <= info.max_bytes && raw.reads.len() <= info.max_reads,
            ConfigurationError::Unsupported(format!(
                "copy of {} bytes with {} reads exceeds {info:?}",
                raw.bytes.len(),
                raw.reads.len()
            ))
        );
        let bytes = (0..info.max_bytes)
            .map(|i| {
                let byte = raw.bytes.get(i).copied().unwrap_or_default();
                ctx.witness(F::from_canonical_u8(byte))
            })
            .collect();
        let offsets = (0..info.max_reads)
            .map(|row| {
                let offset = raw.reads.get(row).copied().unwrap_or_default();
                let mut cell = ctx.witness(F::from_canonical_usize(offset));
                ctx.allocate(&mut cell, 0, row, ColumnKind::PublicInput)?;
                Ok(cell)
            })
            .collect::<Result<_>>()?;
        Ok(CopyEventInput {
            src_type: ctx.witness(F::from_canonical_u64(raw.src_type)),
            src_id: ctx.witness(F::from_canonical_u64(raw.src_id)),
            bytes,
            offsets,
        })
    }

    fn construct<C: Context<F>>(
        ctx: &mut C,
        input: CopyEventInput<C::Value>,
        info: &CopyTableInfo,
        make_links: bool,
    ) -> Result<Vec<C::Value>> {
        let mut writer = ctx.subcontext(&WRITER_COLUMNS, 0, info.max_bytes)?;
        let written = write_event(&mut writer, &input)?;
        let mut reader = ctx.subcontext(&READER_COLUMNS, 0, info.max_reads)?;
        let values = read_event(&mut reader, &written, &input.offsets, make_links)?;
        publish(ctx, &values, 1)?;
        Ok(values)
    }
}
