#![allow(clippy::needless_range_loop)]

//! Bit-twiddling helpers shared by the field and prover crates.

pub fn bits_u64(n: u64) -> usize {
    (64 - n.leading_zeros()) as usize
}

/// Computes `ceil(log_2(n))`.
#[must_use]
pub fn log2_ceil(n: usize) -> usize {
    (usize::BITS - n.saturating_sub(1).leading_zeros()) as usize
}

/// Computes `log_2(n)`, panicking if `n` is not a power of two.
pub fn log2_strict(n: usize) -> usize {
    let res = n.trailing_zeros();
    assert!(n.wrapping_shr(res) == 1, "Not a power of two: {n}");
    res as usize
}

/// Reverses the low `num_bits` bits of `n`.
#[inline]
pub fn reverse_bits(n: usize, num_bits: usize) -> usize {
    if num_bits == 0 {
        return 0;
    }
    n.reverse_bits() >> (usize::BITS as usize - num_bits)
}

/// Permutes `arr` such that each index is mapped to its reverse in binary.
pub fn reverse_index_bits<T: Copy>(arr: &[T]) -> Vec<T> {
    let n = arr.len();
    let n_power = log2_strict(n);
    (0..n).map(|i| arr[reverse_bits(i, n_power)]).collect()
}

/// In-place variant of [`reverse_index_bits`].
pub fn reverse_index_bits_in_place<T>(arr: &mut [T]) {
    let n = arr.len();
    let n_power = log2_strict(n);
    for src in 0..n {
        let dst = reverse_bits(src, n_power);
        if src < dst {
            arr.swap(src, dst);
        }
    }
}

/// Index of the most significant set bit counted from the top of a 64-bit word, i.e. the number
/// of leading zero bits of the big-endian interpretation of `bytes[..8]`.
pub fn leading_zeros_be(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 8];
    let len = bytes.len().min(8);
    word[..len].copy_from_slice(&bytes[..len]);
    u64::from_be_bytes(word).leading_zeros()
}
