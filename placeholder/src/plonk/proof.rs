//! Placeholder proof definition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fri::proof::{FriChallenges, FriProof};
use crate::fri::structure::FriOpenings;
use crate::hash::hash_types::RichField;
use crate::hash::merkle_tree::MerkleCap;
use crate::plonk::config::GenericConfig;
use crate::plonk::vanishing_poly::ArgumentChallenges;
use crate::plonk::vars::{BatchValues, OpeningLayout};

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(bound = "")]
pub struct PlaceholderProof<F: RichField, C: GenericConfig<F = F>> {
    /// Merkle caps of every committed batch except the fixed one, keyed by batch id.
    pub commitments: BTreeMap<usize, MerkleCap<F, C::Hasher>>,
    /// Purported values of each polynomial at the challenge point and its rotations.
    pub openings: OpeningSet<F>,
    /// A batch FRI argument for all openings.
    pub fri_proof: FriProof<F, C::Hasher>,
}

/// Opened values keyed by batch id, then polynomial, then rotation in ascending order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, Eq, PartialEq)]
#[serde(bound = "")]
pub struct OpeningSet<F: RichField> {
    pub values: BTreeMap<usize, Vec<Vec<F>>>,
}

impl<F: RichField> OpeningSet<F> {
    /// Every value in transcript order.
    pub fn flatten(&self) -> Vec<F> {
        self.values.values().flatten().flatten().copied().collect()
    }

    pub fn to_fri_openings(&self, layout: &OpeningLayout) -> FriOpenings<F> {
        layout.fri_openings(&self.values)
    }

    /// Reads the values through `layout`, which knows the rotations each position stands for.
    pub fn at<'a>(&'a self, layout: &'a OpeningLayout) -> OpenedValues<'a, F> {
        OpenedValues {
            openings: self,
            layout,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct OpenedValues<'a, F: RichField> {
    openings: &'a OpeningSet<F>,
    layout: &'a OpeningLayout,
}

impl<F: RichField> BatchValues<F> for OpenedValues<'_, F> {
    fn get(&self, batch: usize, poly: usize, rotation: i32) -> F {
        let rotations = self.layout.rotations(batch, poly);
        let position = rotations
            .iter()
            .position(|&r| r == rotation)
            .unwrap_or_else(|| panic!("batch {batch} poly {poly} is not opened at {rotation}"));
        self.openings.values[&batch][poly][position]
    }
}

/// Every challenge of the transcript, in the order it is drawn.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProofChallenges<F: RichField> {
    pub arguments: ArgumentChallenges<F>,
    /// The evaluation point.
    pub y: F,
    pub fri_challenges: FriChallenges<F>,
}
