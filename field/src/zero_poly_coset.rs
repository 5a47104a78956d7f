use crate::types::Field;

/// Evaluations of `Z_H(X) = X^n - 1` on the coset `g * K` for subgroups `H <= K`.
///
/// `Z_H` takes only `|K| / |H|` distinct values on `g * K`, so those are tabulated together with
/// their inverses.
pub struct ZeroPolyOnCoset<F: Field> {
    n: F,
    rate: usize,
    /// `g^n * v^i - 1` for `i in 0..rate`, `v` a primitive `rate`-th root of unity.
    evals: Vec<F>,
    inverses: Vec<F>,
}

impl<F: Field> ZeroPolyOnCoset<F> {
    pub fn new(n_log: usize, rate_bits: usize) -> Self {
        let g_pow_n = F::coset_shift().exp_power_of_2(n_log);
        let evals = F::two_adic_subgroup(rate_bits)
            .into_iter()
            .map(|x| g_pow_n * x - F::ONE)
            .collect::<Vec<_>>();
        let inverses = F::batch_multiplicative_inverse(&evals);
        Self {
            n: F::from_canonical_usize(1 << n_log),
            rate: 1 << rate_bits,
            evals,
            inverses,
        }
    }

    /// `Z_H(g * w^i)`.
    pub fn eval(&self, i: usize) -> F {
        self.evals[i % self.rate]
    }

    /// `1 / Z_H(g * w^i)`.
    pub fn eval_inverse(&self, i: usize) -> F {
        self.inverses[i % self.rate]
    }

    /// `L_0(x) = Z_H(x) / (n * (x - 1))` with `x = g * w^i`.
    pub fn eval_l_0(&self, i: usize, x: F) -> F {
        self.eval(i) * (self.n * (x - F::ONE)).inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::ZeroPolyOnCoset;
    use crate::goldilocks_field::GoldilocksField;
    use crate::types::Field;

    #[test]
    fn zero_poly_matches_direct_evaluation() {
        type F = GoldilocksField;
        let (n_log, rate_bits) = (3, 2);
        let z = ZeroPolyOnCoset::<F>::new(n_log, rate_bits);
        let points = F::cyclic_subgroup_coset_known_order(
            F::primitive_root_of_unity(n_log + rate_bits),
            F::coset_shift(),
            1 << (n_log + rate_bits),
        );
        for (i, x) in points.into_iter().enumerate() {
            let direct = x.exp_u64(1 << n_log) - F::ONE;
            assert_eq!(z.eval(i), direct);
            assert_eq!(z.eval_inverse(i) * direct, F::ONE);
            let l0 = direct / (F::from_canonical_u64(8) * (x - F::ONE));
            assert_eq!(z.eval_l_0(i, x), l0);
        }
    }
}
