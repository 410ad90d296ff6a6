use proptest::prelude::*;
use pva_compare::{pseudo_bma_weights, stacking_weights, PseudoBmaMethod};
use pva_core::RngHandle;

fn elpd_matrix() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1usize..5, 1usize..30).prop_flat_map(|(models, points)| {
        prop::collection::vec(prop::collection::vec(-20.0f64..5.0, points), models)
    })
}

proptest! {
    #[test]
    fn stacking_weights_form_a_simplex(elpd in elpd_matrix()) {
        let weights = stacking_weights(&elpd, 500, 1e-10);
        prop_assert_eq!(weights.len(), elpd.len());
        prop_assert!(weights.iter().all(|w| *w >= 0.0));
        prop_assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pseudo_bma_weights_form_a_simplex(elpd in elpd_matrix(), seed in any::<u64>()) {
        let mut rng = RngHandle::from_seed(seed);
        for method in [PseudoBmaMethod::BayesianBootstrap, PseudoBmaMethod::Plain] {
            let weights = pseudo_bma_weights(&elpd, method, 50, &mut rng);
            prop_assert_eq!(weights.len(), elpd.len());
            prop_assert!(weights.iter().all(|w| *w >= 0.0));
            prop_assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }
}
