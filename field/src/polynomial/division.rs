use crate::polynomial::PolynomialCoeffs;
use crate::types::Field;

impl<F: Field> PolynomialCoeffs<F> {
    /// Let `self=p(X)`, this returns `(p(X)-p(z))/(X-z)`.
    /// See <https://en.wikipedia.org/wiki/Horner%27s_method>
    pub fn divide_by_linear(&self, z: F) -> PolynomialCoeffs<F> {
        let mut bs = self
            .coeffs
            .iter()
            .rev()
            .scan(F::ZERO, |acc, &c| {
                *acc = *acc * z + c;
                Some(*acc)
            })
            .collect::<Vec<_>>();
        // The last accumulator is p(z), the remainder.
        bs.pop();
        bs.reverse();
        Self { coeffs: bs }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;
    use rand::Rng;

    use crate::goldilocks_field::GoldilocksField;
    use crate::polynomial::PolynomialCoeffs;
    use crate::types::{Field, Sample};

    #[test]
    fn test_division_by_linear() {
        type F = GoldilocksField;
        let n = OsRng.gen_range(1..200);
        let poly = PolynomialCoeffs::new(F::rand_vec(n));
        let z = F::rand();
        let ev = poly.eval(z);

        let quotient = poly.divide_by_linear(z);
        assert_eq!(quotient.len() + 1, n);
        for _ in 0..10 {
            let x = F::rand();
            assert_eq!(quotient.eval(x) * (x - z) + ev, poly.eval(x));
        }
    }
}
