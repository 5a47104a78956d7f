pub mod reducing;
pub mod serialization;
pub mod timing;

pub(crate) use placeholder_util::{
    leading_zeros_be, log2_ceil, log2_strict, reverse_bits, reverse_index_bits_in_place,
};

/// Transposes a row-major matrix.
pub(crate) fn transpose<T: Copy + Send + Sync>(rows: &[Vec<T>]) -> Vec<Vec<T>> {
    let width = rows.first().map_or(0, Vec::len);
    (0..width)
        .map(|col| rows.iter().map(|row| row[col]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::transpose;

    #[test]
    fn transpose_swaps_axes() {
        let rows = vec![vec![1, 2, 3], vec![4, 5, 6]];
        assert_eq!(transpose(&rows), vec![vec![1, 4], vec![2, 5], vec![3, 6]]);
        assert!(transpose::<u8>(&[]).is_empty());
    }
}
