use placeholder_util::{log2_strict, reverse_index_bits_in_place};

use crate::polynomial::{PolynomialCoeffs, PolynomialValues};
use crate::types::Field;

/// The first `n / 2` powers of the primitive `n`-th root of unity.
pub type FftRootTable<F> = Vec<F>;

pub fn fft_root_table<F: Field>(n: usize) -> FftRootTable<F> {
    let lg_n = log2_strict(n);
    if lg_n == 0 {
        return vec![F::ONE];
    }
    let base = F::primitive_root_of_unity(lg_n);
    base.powers().take(n / 2).collect()
}

#[inline]
pub fn fft<F: Field>(poly: PolynomialCoeffs<F>) -> PolynomialValues<F> {
    fft_with_options(poly, None)
}

pub fn fft_with_options<F: Field>(
    poly: PolynomialCoeffs<F>,
    root_table: Option<&FftRootTable<F>>,
) -> PolynomialValues<F> {
    let PolynomialCoeffs { coeffs: mut buffer } = poly;
    fft_dispatch(&mut buffer, root_table);
    PolynomialValues::new(buffer)
}

#[inline]
pub fn ifft<F: Field>(poly: PolynomialValues<F>) -> PolynomialCoeffs<F> {
    ifft_with_options(poly, None)
}

pub fn ifft_with_options<F: Field>(
    poly: PolynomialValues<F>,
    root_table: Option<&FftRootTable<F>>,
) -> PolynomialCoeffs<F> {
    let n = poly.len();
    let lg_n = log2_strict(n);
    let n_inv = F::inverse_2exp(lg_n);

    let PolynomialValues { values: mut buffer } = poly;
    fft_dispatch(&mut buffer, root_table);

    // Evaluating at the inverse roots is the forward transform with indices 1..n reversed.
    buffer[0] *= n_inv;
    if n > 1 {
        buffer[n / 2] *= n_inv;
    }
    for i in 1..(n / 2) {
        let j = n - i;
        let coeffs_i = buffer[j] * n_inv;
        let coeffs_j = buffer[i] * n_inv;
        buffer[i] = coeffs_i;
        buffer[j] = coeffs_j;
    }
    PolynomialCoeffs { coeffs: buffer }
}

fn fft_dispatch<F: Field>(input: &mut [F], root_table: Option<&FftRootTable<F>>) {
    if input.len() <= 1 {
        return;
    }
    match root_table {
        Some(table) => fft_classic(input, table),
        None => fft_classic(input, &fft_root_table(input.len())),
    }
}

/// Iterative radix-2 Cooley-Tukey: bit-reverse the input, then run `log n` butterfly layers.
/// The layer of width `m` uses the twiddles `w_n^(j * n / m)`.
fn fft_classic<F: Field>(values: &mut [F], root_table: &FftRootTable<F>) {
    reverse_index_bits_in_place(values);

    let n = values.len();
    let lg_n = log2_strict(n);
    debug_assert_eq!(root_table.len(), n / 2);

    for lg_m in 1..=lg_n {
        let m = 1 << lg_m;
        let half_m = m / 2;
        let stride = n / m;
        for k in (0..n).step_by(m) {
            for j in 0..half_m {
                let t = root_table[j * stride] * values[k + j + half_m];
                let u = values[k + j];
                values[k + j] = u + t;
                values[k + j + half_m] = u - t;
            }
        }
    }
}
