use proptest::prelude::*;
use pva_risk::exceedance_probabilities;

proptest! {
    #[test]
    fn probabilities_are_ordered_in_threshold(
        draws in prop::collection::vec(5.0f64..20.0, 1..300),
        raw in prop::collection::btree_set(1u64..500_000_000, 1..8),
    ) {
        let thresholds: Vec<f64> = raw.into_iter().map(|t| t as f64).collect();
        let entries = exceedance_probabilities(&draws, &thresholds).unwrap();
        prop_assert_eq!(entries.len(), thresholds.len());
        for pair in entries.windows(2) {
            prop_assert!(pair[0].probability <= pair[1].probability);
        }
        for entry in &entries {
            prop_assert!((0.0..=1.0).contains(&entry.probability));
        }
    }
}
