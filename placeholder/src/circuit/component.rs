use anyhow::Result;
use placeholder_field::types::Field;
use serde::{Deserialize, Serialize};

use crate::circuit::context::Context;
use crate::circuit::lookup_table::LookupTable;

/// Table resources a component asks for.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableParams {
    pub witnesses: usize,
    pub public_inputs: usize,
    pub constants: usize,
    pub rows: usize,
}

/// A circuit fragment whose single body serves both generation stages.
///
/// `Input` and `Output` are generic over the context's value type, so the same structs carry
/// expressions while building constraints and field elements while assigning.
pub trait Component<F: Field> {
    /// Parameters fixed at circuit-build time.
    type StaticInfo: Clone;
    /// Concrete inputs, only meaningful when assigning. The default is used to build constraints.
    type RawInput: Default + Clone;
    type Input<V: Clone>: Clone;
    type Output<V: Clone>;

    fn minimal_requirements(info: &Self::StaticInfo) -> TableParams;

    /// Static tables this component looks up into.
    fn lookup_tables(_info: &Self::StaticInfo) -> Result<Vec<LookupTable<F>>> {
        Ok(Vec::new())
    }

    /// Places the raw input into the table, typically into public-input cells.
    fn form_input<C: Context<F>>(
        ctx: &mut C,
        raw: &Self::RawInput,
        info: &Self::StaticInfo,
    ) -> Result<Self::Input<C::Value>>;

    /// Emits the component. With `make_links` set, inputs are copy-constrained to the cells the
    /// component works on.
    fn construct<C: Context<F>>(
        ctx: &mut C,
        input: Self::Input<C::Value>,
        info: &Self::StaticInfo,
        make_links: bool,
    ) -> Result<Self::Output<C::Value>>;
}
