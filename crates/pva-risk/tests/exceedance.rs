use std::sync::Arc;

use pva_core::{PvaError, SeriesShape, TimeSeries};
use pva_mcmc::{Chain, ChainStats, Draw, FitDiagnostics, SamplerRun};
use pva_model::{ModelVariant, ParameterSet};
use pva_post::PosteriorStore;
use pva_risk::{at_index, evaluate, exceedance_probabilities, RiskConfig, DEFAULT_THRESHOLDS};

/// Final-step draws spread evenly over `ln(1e5)..ln(2e7)`.
fn store() -> PosteriorStore {
    let observed: Vec<f64> = (0..29).map(|i| 15.0 - 0.02 * i as f64).collect();
    let series =
        Arc::new(TimeSeries::from_observed(1990, &observed, SeriesShape::default()).unwrap());
    let low = 1e5f64.ln();
    let high = 2e7f64.ln();
    let draws: Vec<Draw> = (0..100)
        .map(|s| {
            let last = low + (high - low) * s as f64 / 99.0;
            let mut states = vec![14.5; 49];
            states[48] = last;
            states[40] = 13.0;
            Draw {
                params: ParameterSet::for_variant(ModelVariant::Gompertz, 0.3, 0.1, 1.0, -0.07),
                states,
            }
        })
        .collect();
    let chains = vec![Chain {
        variant: ModelVariant::Gompertz,
        index: 0,
        seed: 0,
        draws,
        stats: ChainStats {
            acceptance_rate: 0.44,
            step_size: 0.1,
            proc_acceptance_rate: 0.3,
            proc_step_size: 0.2,
            retries: 0,
            iterations: 100,
        },
    }];
    let run = SamplerRun {
        variant: ModelVariant::Gompertz,
        diagnostics: FitDiagnostics::from_chains(&chains),
        chains,
        failures: Vec::new(),
        warnings: Vec::new(),
    };
    PosteriorStore::from_run(&run, series).unwrap()
}

#[test]
fn default_thresholds_are_evaluated_at_the_final_step() {
    let report = evaluate(&store(), &RiskConfig::default()).unwrap();
    assert_eq!(report.index, 48);
    assert_eq!(report.year, 2038);
    assert_eq!(report.draws.len(), 100);
    let thresholds: Vec<f64> = report.pairs().iter().map(|(t, _)| *t).collect();
    assert_eq!(thresholds, DEFAULT_THRESHOLDS.to_vec());
    let probabilities: Vec<f64> = report.entries.iter().map(|e| e.probability).collect();
    assert!(probabilities.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(probabilities[0] > 0.0 && probabilities[4] < 1.0);
}

#[test]
fn probabilities_count_draws_strictly_below() {
    let draws = [10f64.ln(), 100f64.ln(), 1000f64.ln(), 10_000f64.ln()];
    let entries = exceedance_probabilities(&draws, &[50.0, 1000.0, 1e6]).unwrap();
    assert_eq!(entries[0].probability, 0.25);
    assert!(entries[1].probability <= 0.75 && entries[1].probability >= 0.5);
    assert_eq!(entries[2].probability, 1.0);
}

#[test]
fn any_step_can_be_evaluated() {
    let store = store();
    let report = at_index(&store, 40, &[100_000.0, 1_000_000.0]).unwrap();
    assert_eq!(report.year, 2030);
    // e^13 ≈ 442 413, so every draw at this step sits between the thresholds.
    assert_eq!(report.pairs(), vec![(100_000.0, 0.0), (1_000_000.0, 1.0)]);

    let config = RiskConfig {
        index: Some(40),
        ..RiskConfig::default()
    };
    assert_eq!(evaluate(&store, &config).unwrap().index, 40);
    assert!(at_index(&store, 49, &DEFAULT_THRESHOLDS).is_err());
}

#[test]
fn invalid_thresholds_are_configuration_errors() {
    let draws = [1.0, 2.0];
    for thresholds in [vec![], vec![0.0], vec![-5.0], vec![f64::NAN], vec![10.0, 5.0]] {
        let err = exceedance_probabilities(&draws, &thresholds).unwrap_err();
        assert!(matches!(err, PvaError::Configuration(_)), "{thresholds:?}");
    }
    let err = exceedance_probabilities(&[], &[10.0]).unwrap_err();
    assert_eq!(err.info().code, "risk-draws-empty");
}

#[test]
fn yaml_config_overrides_thresholds() {
    let config = RiskConfig::from_yaml_str("thresholds: [1000, 2000]\nindex: 30\n").unwrap();
    assert_eq!(config.thresholds, vec![1000.0, 2000.0]);
    assert_eq!(config.index, Some(30));
    config.validate().unwrap();
    assert_eq!(RiskConfig::from_yaml_str("{}").unwrap(), RiskConfig::default());
}

#[test]
fn report_serializes_with_raw_draws() {
    let report = evaluate(&store(), &RiskConfig::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["variant"], "gompertz");
    assert_eq!(json["entries"].as_array().unwrap().len(), 5);
    assert_eq!(json["draws"].as_array().unwrap().len(), 100);
}
