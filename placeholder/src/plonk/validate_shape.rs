use anyhow::{ensure, Result};

use crate::circuit::assignment::trim_trailing_zeros;
use crate::error::FormatError;
use crate::hash::hash_types::RichField;
use crate::plonk::config::GenericConfig;
use crate::plonk::preprocessor::CommonData;
use crate::plonk::proof::PlaceholderProof;
use crate::plonk::vars::FIXED_VALUES_BATCH;

/// Checks that the commitments and openings of `proof` follow the layout of `common`, and that
/// the public inputs fit their columns.
pub(crate) fn validate_proof_shape<F, C>(
    proof: &PlaceholderProof<F, C>,
    public_inputs: &[Vec<F>],
    common: &CommonData<F>,
) -> Result<()>
where
    F: RichField,
    C: GenericConfig<F = F>,
{
    let PlaceholderProof {
        commitments,
        openings,
        // The FRI verifier checks the shape of the opening proof.
        fri_proof: _,
    } = proof;

    let committed = common
        .layout
        .batches
        .keys()
        .copied()
        .filter(|&batch| batch != FIXED_VALUES_BATCH)
        .collect::<Vec<_>>();
    ensure!(
        commitments.keys().copied().eq(committed.iter().copied()),
        FormatError::BatchInfoMismatch(format!(
            "commitments to batches {:?}, expected {committed:?}",
            commitments.keys().collect::<Vec<_>>()
        ))
    );

    ensure!(
        openings.values.len() == common.layout.batches.len(),
        FormatError::BatchInfoMismatch("number of opened batches".into())
    );
    for (batch, rotations) in &common.layout.batches {
        let values = openings.values.get(batch).ok_or_else(|| {
            FormatError::BatchInfoMismatch(format!("batch {batch} is not opened"))
        })?;
        ensure!(
            values.len() == rotations.len(),
            FormatError::BatchInfoMismatch(format!(
                "batch {batch} opens {} polynomials, expected {}",
                values.len(),
                rotations.len()
            ))
        );
        for (poly, (values, rotations)) in values.iter().zip(rotations).enumerate() {
            ensure!(
                values.len() == rotations.len(),
                FormatError::BatchInfoMismatch(format!(
                    "polynomial {poly} of batch {batch} is opened at {} points, expected {}",
                    values.len(),
                    rotations.len()
                ))
            );
        }
    }

    ensure!(
        public_inputs.len() == common.description.public_input_columns,
        FormatError::BatchInfoMismatch(format!(
            "{} public input columns, expected {}",
            public_inputs.len(),
            common.description.public_input_columns
        ))
    );
    for (column, values) in public_inputs.iter().enumerate() {
        let values = trim_trailing_zeros(values);
        ensure!(
            values.len() <= common.max_public_inputs(),
            FormatError::BatchInfoMismatch(format!(
                "public input column {column} holds {} values, at most {} fit",
                values.len(),
                common.max_public_inputs()
            ))
        );
    }

    Ok(())
}
