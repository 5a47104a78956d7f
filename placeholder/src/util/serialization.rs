//! Binary proof format.
//!
//! Field elements are written as canonical little-endian `u64`s and digests as their raw bytes.
//! Every size the circuit determines is left implicit and recovered from [`CommonData`] when
//! reading; only Merkle proof lengths carry a one-byte prefix.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Result as IoResult, Write};

use anyhow::{ensure, Result};
use placeholder_field::polynomial::PolynomialCoeffs;

use crate::error::FormatError;
use crate::fri::proof::{FriInitialTreeProof, FriProof, FriQueryRound, FriQueryStep};
use crate::hash::hash_types::RichField;
use crate::hash::merkle_proofs::MerkleProof;
use crate::hash::merkle_tree::MerkleCap;
use crate::plonk::config::{GenericConfig, GenericHashOut, Hasher};
use crate::plonk::preprocessor::CommonData;
use crate::plonk::proof::{OpeningSet, PlaceholderProof};
use crate::plonk::vars::FIXED_VALUES_BATCH;

#[derive(Debug)]
pub struct Buffer(Cursor<Vec<u8>>);

impl Buffer {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self(Cursor::new(buffer))
    }

    pub fn len(&self) -> usize {
        self.0.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(self) -> Vec<u8> {
        self.0.into_inner()
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.0.position() as usize)
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut buf = [0; N];
        self.0
            .read_exact(&mut buf)
            .map_err(|_| FormatError::UnexpectedEof)?;
        Ok(buf)
    }

    fn write_u8(&mut self, x: u8) -> IoResult<()> {
        self.0.write_all(&[x])
    }
    fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.read_bytes::<1>()?[0])
    }

    pub fn write_u64(&mut self, x: u64) -> IoResult<()> {
        self.0.write_all(&x.to_le_bytes())
    }
    pub fn read_u64(&mut self) -> Result<u64, FormatError> {
        Ok(u64::from_le_bytes(self.read_bytes::<8>()?))
    }

    fn write_field<F: RichField>(&mut self, x: F) -> IoResult<()> {
        self.write_u64(x.to_canonical_u64())
    }
    fn read_field<F: RichField>(&mut self) -> Result<F, FormatError> {
        let x = self.read_u64()?;
        if x >= F::ORDER {
            return Err(FormatError::InvalidFieldElement(x));
        }
        Ok(F::from_canonical_u64(x))
    }

    pub fn write_field_vec<F: RichField>(&mut self, v: &[F]) -> IoResult<()> {
        for &a in v {
            self.write_field(a)?;
        }
        Ok(())
    }
    pub fn read_field_vec<F: RichField>(&mut self, length: usize) -> Result<Vec<F>, FormatError> {
        (0..length).map(|_| self.read_field()).collect()
    }

    fn write_hash<F: RichField, H: Hasher<F>>(&mut self, h: H::Hash) -> IoResult<()> {
        self.0.write_all(&h.to_bytes())
    }
    fn read_hash<F: RichField, H: Hasher<F>>(&mut self) -> Result<H::Hash, FormatError> {
        let mut buf = vec![0; H::HASH_SIZE];
        self.0
            .read_exact(&mut buf)
            .map_err(|_| FormatError::UnexpectedEof)?;
        Ok(H::Hash::from_bytes(&buf))
    }

    fn write_merkle_cap<F: RichField, H: Hasher<F>>(&mut self, cap: &MerkleCap<F, H>) -> IoResult<()> {
        for &a in &cap.0 {
            self.write_hash::<F, H>(a)?;
        }
        Ok(())
    }
    fn read_merkle_cap<F: RichField, H: Hasher<F>>(
        &mut self,
        cap_height: usize,
    ) -> Result<MerkleCap<F, H>, FormatError> {
        let cap_length = 1 << cap_height;
        Ok(MerkleCap(
            (0..cap_length)
                .map(|_| self.read_hash::<F, H>())
                .collect::<Result<Vec<_>, _>>()?,
        ))
    }

    fn write_merkle_proof<F: RichField, H: Hasher<F>>(&mut self, p: &MerkleProof<F, H>) -> Result<()> {
        let length = u8::try_from(p.siblings.len())
            .map_err(|_| FormatError::BatchInfoMismatch("Merkle proof longer than 255".into()))?;
        self.write_u8(length)?;
        for &h in &p.siblings {
            self.write_hash::<F, H>(h)?;
        }
        Ok(())
    }
    fn read_merkle_proof<F: RichField, H: Hasher<F>>(
        &mut self,
    ) -> Result<MerkleProof<F, H>, FormatError> {
        let length = self.read_u8()?;
        Ok(MerkleProof {
            siblings: (0..length)
                .map(|_| self.read_hash::<F, H>())
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn write_opening_set<F: RichField>(&mut self, openings: &OpeningSet<F>) -> IoResult<()> {
        self.write_field_vec(&openings.flatten())
    }
    fn read_opening_set<F: RichField>(
        &mut self,
        common: &CommonData<F>,
    ) -> Result<OpeningSet<F>, FormatError> {
        let values = common
            .layout
            .batches
            .iter()
            .map(|(&batch, polys)| {
                let polys = polys
                    .iter()
                    .map(|rotations| self.read_field_vec(rotations.len()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((batch, polys))
            })
            .collect::<Result<BTreeMap<_, _>, FormatError>>()?;
        Ok(OpeningSet { values })
    }

    /// Writes the FRI section grouped by kind: round caps, the arity bits of each round, every
    /// initial evaluation, every round evaluation, the initial Merkle proofs, the round Merkle
    /// proofs, the final polynomial and the proof-of-work witness.
    fn write_fri_proof<F: RichField, H: Hasher<F>>(&mut self, proof: &FriProof<F, H>) -> Result<()> {
        for cap in &proof.commit_phase_merkle_caps {
            self.write_merkle_cap(cap)?;
        }
        for arity_bits in step_list(proof)? {
            self.write_u8(arity_bits)?;
        }
        for round in &proof.query_round_proofs {
            for (evals, _) in &round.initial_trees_proof.evals_proofs {
                self.write_field_vec(evals)?;
            }
        }
        for round in &proof.query_round_proofs {
            for step in &round.steps {
                self.write_field_vec(&step.evals)?;
            }
        }
        for round in &proof.query_round_proofs {
            for (_, merkle_proof) in &round.initial_trees_proof.evals_proofs {
                self.write_merkle_proof(merkle_proof)?;
            }
        }
        for round in &proof.query_round_proofs {
            for step in &round.steps {
                self.write_merkle_proof(&step.merkle_proof)?;
            }
        }
        self.write_field_vec(&proof.final_poly.coeffs)?;
        self.write_u64(proof.pow_witness)?;
        Ok(())
    }
    fn read_fri_proof<F: RichField, H: Hasher<F>>(
        &mut self,
        common: &CommonData<F>,
    ) -> Result<FriProof<F, H>, FormatError> {
        let params = &common.fri_params;
        let num_queries = params.config.num_query_rounds;
        let commit_phase_merkle_caps = (0..params.reduction_arity_bits.len())
            .map(|round| self.read_merkle_cap(params.cap_height_for(params.round_tree_bits(round))))
            .collect::<Result<Vec<_>, _>>()?;

        for (round, &expected) in params.reduction_arity_bits.iter().enumerate() {
            let arity_bits = self.read_u8()? as usize;
            if arity_bits != expected {
                return Err(FormatError::BatchInfoMismatch(format!(
                    "FRI round {round} folds {arity_bits} bits instead of {expected}"
                )));
            }
        }

        let coset_size = 1 << params.leaf_bits();
        let initial_values = (0..num_queries)
            .map(|_| {
                common
                    .layout
                    .batches
                    .values()
                    .map(|polys| self.read_field_vec(polys.len() * coset_size))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let round_values = (0..num_queries)
            .map(|_| {
                params
                    .reduction_arity_bits
                    .iter()
                    .map(|&arity_bits| self.read_field_vec(1 << arity_bits))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let num_batches = common.layout.batches.len();
        let num_rounds = params.reduction_arity_bits.len();
        let initial_proofs = (0..num_queries)
            .map(|_| {
                (0..num_batches)
                    .map(|_| self.read_merkle_proof())
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let round_proofs = (0..num_queries)
            .map(|_| {
                (0..num_rounds)
                    .map(|_| self.read_merkle_proof())
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let query_round_proofs = initial_values
            .into_iter()
            .zip(initial_proofs)
            .zip(round_values.into_iter().zip(round_proofs))
            .map(|((values, proofs), (step_values, step_proofs))| FriQueryRound {
                initial_trees_proof: FriInitialTreeProof {
                    evals_proofs: values.into_iter().zip(proofs).collect(),
                },
                steps: step_values
                    .into_iter()
                    .zip(step_proofs)
                    .map(|(evals, merkle_proof)| FriQueryStep {
                        evals,
                        merkle_proof,
                    })
                    .collect(),
            })
            .collect();

        let final_poly = PolynomialCoeffs::new(self.read_field_vec(params.final_poly_len())?);
        let pow_witness = self.read_u64()?;
        Ok(FriProof {
            commit_phase_merkle_caps,
            query_round_proofs,
            final_poly,
            pow_witness,
        })
    }

    pub fn write_proof<F: RichField, C: GenericConfig<F = F>>(
        &mut self,
        proof: &PlaceholderProof<F, C>,
    ) -> Result<()> {
        for cap in proof.commitments.values() {
            self.write_merkle_cap(cap)?;
        }
        self.write_opening_set(&proof.openings)?;
        self.write_fri_proof(&proof.fri_proof)
    }
    pub fn read_proof<F: RichField, C: GenericConfig<F = F>>(
        &mut self,
        common: &CommonData<F>,
    ) -> Result<PlaceholderProof<F, C>> {
        let params = &common.fri_params;
        let cap_height = params.cap_height_for(params.initial_tree_bits());
        let mut commitments = BTreeMap::new();
        for &batch in common.layout.batches.keys() {
            if batch != FIXED_VALUES_BATCH {
                commitments.insert(batch, self.read_merkle_cap(cap_height)?);
            }
        }
        let openings = self.read_opening_set(common)?;
        let fri_proof = self.read_fri_proof(common)?;
        Ok(PlaceholderProof {
            commitments,
            openings,
            fri_proof,
        })
    }
}

/// Arity bits of each folding round, read off the first query.
fn step_list<F: RichField, H: Hasher<F>>(proof: &FriProof<F, H>) -> Result<Vec<u8>> {
    let Some(first) = proof.query_round_proofs.first() else {
        ensure!(
            proof.commit_phase_merkle_caps.is_empty(),
            FormatError::BatchInfoMismatch("FRI rounds without queries".into())
        );
        return Ok(Vec::new());
    };
    first
        .steps
        .iter()
        .map(|step| {
            let arity = step.evals.len();
            ensure!(
                arity.is_power_of_two(),
                FormatError::BatchInfoMismatch(format!("FRI step over {arity} values"))
            );
            Ok(arity.trailing_zeros() as u8)
        })
        .collect()
}

impl<F: RichField, C: GenericConfig<F = F>> PlaceholderProof<F, C> {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Buffer::new(Vec::new());
        buffer.write_proof(self)?;
        Ok(buffer.bytes())
    }

    /// Reads a proof of the circuit described by `common`, rejecting trailing bytes.
    pub fn from_bytes(bytes: Vec<u8>, common: &CommonData<F>) -> Result<Self> {
        let mut buffer = Buffer::new(bytes);
        let proof = buffer.read_proof(common)?;
        ensure!(
            buffer.remaining() == 0,
            FormatError::TrailingBytes(buffer.remaining())
        );
        Ok(proof)
    }
}
