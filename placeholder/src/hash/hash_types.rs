use std::fmt;

use placeholder_field::goldilocks_field::GoldilocksField;
use placeholder_field::types::{PrimeField64, Sample};
use rand::RngCore;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::plonk::config::GenericHashOut;

/// A prime field the prover and verifier can run over.
pub trait RichField: PrimeField64 {}

impl RichField for GoldilocksField {}

pub const NUM_HASH_OUT_ELTS: usize = 4;

/// Four field elements squeezed out of the transcript.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct HashOut<F: RichField> {
    pub elements: [F; NUM_HASH_OUT_ELTS],
}

impl<F: RichField> HashOut<F> {
    pub fn from_partial(elements_in: &[F]) -> Self {
        let mut elements = [F::ZERO; NUM_HASH_OUT_ELTS];
        elements[..elements_in.len()].copy_from_slice(elements_in);
        Self { elements }
    }

    /// Little-endian bytes of the canonical representatives.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.elements
            .iter()
            .flat_map(|x| x.to_canonical_u64().to_le_bytes())
            .collect()
    }
}

/// A digest made of `N` raw bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BytesHash<const N: usize>(pub [u8; N]);

impl<const N: usize> Default for BytesHash<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> Sample for BytesHash<N> {
    #[inline]
    fn sample<R>(rng: &mut R) -> Self
    where
        R: RngCore + ?Sized,
    {
        let mut buf = [0; N];
        rng.fill_bytes(&mut buf);
        Self(buf)
    }
}

impl<F: RichField, const N: usize> GenericHashOut<F> for BytesHash<N> {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let mut arr = [0; N];
        arr.copy_from_slice(&bytes[..N]);
        Self(arr)
    }

    fn to_vec(&self) -> Vec<F> {
        self.0
            // Seven bytes per element always fit below the Goldilocks modulus.
            .chunks(7)
            .map(|bytes| {
                let mut arr = [0; 8];
                arr[..bytes.len()].copy_from_slice(bytes);
                F::from_canonical_u64(u64::from_le_bytes(arr))
            })
            .collect()
    }
}

impl<const N: usize> Serialize for BytesHash<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

struct BytesHashVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for BytesHashVisitor<N> {
    type Value = BytesHash<N>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an array containing exactly {N} bytes")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut bytes = [0u8; N];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Ok(BytesHash(bytes))
    }

    fn visit_bytes<E>(self, s: &[u8]) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let bytes = s
            .try_into()
            .map_err(|_| de::Error::invalid_length(s.len(), &self))?;
        Ok(BytesHash(bytes))
    }
}

impl<'de, const N: usize> Deserialize<'de> for BytesHash<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(BytesHashVisitor::<N>)
    }
}

#[cfg(test)]
mod tests {
    use placeholder_field::types::Field;

    use super::*;

    type F = GoldilocksField;

    #[test]
    fn bytes_hash_to_vec_packs_seven_bytes() {
        let hash = BytesHash::<32>([0xff; 32]);
        let elements = GenericHashOut::<F>::to_vec(&hash);
        assert_eq!(elements.len(), 5);
        assert_eq!(elements[0], F::from_canonical_u64((1 << 56) - 1));
        assert_eq!(elements[4], F::from_canonical_u64((1 << 32) - 1));
    }

    #[test]
    fn bytes_hash_serde_round_trip() -> anyhow::Result<()> {
        let hash = BytesHash::<32>::rand();
        let json = serde_json::to_string(&hash)?;
        assert_eq!(serde_json::from_str::<BytesHash<32>>(&json)?, hash);
        assert!(serde_json::from_str::<BytesHash<32>>("[1, 2]").is_err());
        Ok(())
    }

    #[test]
    fn hash_out_le_bytes() {
        let h = HashOut::<F>::from_partial(&[F::ONE, F::TWO]);
        let bytes = h.to_le_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[8], 2);
        assert!(bytes[16..].iter().all(|&b| b == 0));
    }
}
