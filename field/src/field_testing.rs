#[macro_export]
macro_rules! test_field_arithmetic {
    ($field:ty) => {
        mod field_arithmetic {
            use rand::rngs::OsRng;
            use rand::RngCore;
            use $crate::types::{Field, PrimeField64, Sample};

            #[test]
            fn modular_reduction() {
                let mut rng = OsRng;
                for _ in 0..10 {
                    let x_lo = rng.next_u64();
                    let x_hi = rng.next_u32() as u64;
                    let x = (x_lo as u128) + ((x_hi as u128) << 64);
                    let a = <$field>::from_noncanonical_u128(x);
                    let two_64 = <$field>::from_noncanonical_u64(1 << 63) * <$field>::TWO;
                    let b = <$field>::from_noncanonical_u64(x_lo)
                        + <$field>::from_noncanonical_u64(x_hi) * two_64;
                    assert_eq!(a, b);
                }
            }

            #[test]
            fn batch_inversion() {
                for n in 0..20 {
                    let xs = (1..=n as u64)
                        .map(|i| <$field>::from_canonical_u64(i))
                        .collect::<Vec<_>>();
                    let invs = <$field>::batch_multiplicative_inverse(&xs);
                    assert_eq!(invs.len(), n);
                    for (x, inv) in xs.into_iter().zip(invs) {
                        assert_eq!(x * inv, <$field>::ONE);
                    }
                }
            }

            #[test]
            fn primitive_root_order() {
                let max_power = 8.min(<$field>::TWO_ADICITY);
                for n_power in 0..max_power {
                    let root = <$field>::primitive_root_of_unity(n_power);
                    assert!(root.exp_u64(1 << n_power).is_one());
                    if n_power > 0 {
                        assert!(!root.exp_u64(1 << (n_power - 1)).is_one());
                    }
                }
            }

            #[test]
            fn negation() {
                type F = $field;

                for x in [F::ZERO, F::ONE, F::TWO, F::NEG_ONE] {
                    assert_eq!(x + -x, F::ZERO);
                }
            }

            #[test]
            fn exponentiation() {
                type F = $field;

                assert_eq!(F::ZERO.exp_u64(0), <F>::ONE);
                assert_eq!(F::ONE.exp_u64(0), <F>::ONE);
                assert_eq!(F::TWO.exp_u64(0), <F>::ONE);
                assert_eq!(F::TWO.exp_u64(10), F::from_canonical_u64(1024));

                // Fermat.
                let x = F::rand();
                if x.is_nonzero() {
                    assert_eq!(x.exp_u64(F::ORDER - 1), F::ONE);
                }
            }

            #[test]
            #[allow(clippy::eq_op)]
            fn ring_axioms() {
                type F = $field;
                let x = F::rand();
                let y = F::rand();
                let z = F::rand();
                assert_eq!(x + (-x), F::ZERO);
                assert_eq!(-x, F::ZERO - x);
                assert_eq!(x + x, x * F::TWO);
                assert_eq!(x * y, y * x);
                assert_eq!(x * (y * z), (x * y) * z);
                assert_eq!(x - (y + z), (x - y) - z);
                assert_eq!(x * (y + z), x * y + x * z);
            }

            #[test]
            fn inverses() {
                type F = $field;

                let x = F::rand();
                let x1 = x.inverse();
                let x2 = x1.inverse();
                let x3 = x2.inverse();

                assert_eq!(x, x2);
                assert_eq!(x1, x3);
                assert_eq!(F::ZERO.try_inverse(), None);
                assert_eq!(F::inverse_2exp(5) * F::from_canonical_u64(32), F::ONE);
            }
        }
    };
}
