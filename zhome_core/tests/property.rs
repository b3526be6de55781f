mod common;

use common::{cfg, replay};
use proptest::prelude::*;
use zhome_core::{DriftModel, Outcome};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Replaying the same recording twice stops at the same attempt with the
    // same spread.
    #[test]
    fn convergence_is_deterministic(
        noise in proptest::collection::vec(-0.01f64..0.01, 3..24),
        input in -0.5f64..0.5,
        window in 3usize..6,
    ) {
        let drift = DriftModel::default();
        let mut pos = 0.0;
        let rows: Vec<(f64, f64)> = noise
            .iter()
            .map(|n| {
                pos += drift.expected_offset(input);
                (pos + n, input)
            })
            .collect();
        let max = u32::try_from(rows.len()).unwrap();
        let c = cfg(max, 0.005, window);

        let (mut a, _) = replay(&rows, c.clone(), drift);
        let (mut b, _) = replay(&rows, c, drift);
        prop_assert_eq!(a.run().unwrap(), b.run().unwrap());
    }

    // A window that never closes the gap uses the whole budget, never more.
    #[test]
    fn exhaustion_uses_exact_budget(retries in 0u32..12, window in 3usize..6) {
        // Steps of 1.0 against a 54 mm expected spread never converge.
        let rows: Vec<(f64, f64)> = (0..retries).map(|i| (f64::from(i), 0.0)).collect();
        let (mut home, rec) = replay(&rows, cfg(retries, 0.0025, window), DriftModel::default());
        prop_assert_eq!(
            home.run().unwrap(),
            Outcome::ExhaustedRetries { retries_used: retries }
        );
        prop_assert_eq!(home.machine().consumed(), retries as usize);
        prop_assert_eq!(rec.reports().len(), retries as usize);
    }
}
