use std::sync::Arc;

use pva_core::{PvaError, PvaWarning, SeriesShape, TimeSeries};
use pva_mcmc::{sample, SamplerConfig};
use pva_model::{ModelVariant, Priors, StateSpaceModel};

fn model(variant: ModelVariant, observed: &[f64]) -> StateSpaceModel {
    let series = TimeSeries::from_observed(1990, observed, SeriesShape::default()).unwrap();
    StateSpaceModel::new(variant, Arc::new(series), Priors::default()).unwrap()
}

fn short_config(seed: u64) -> SamplerConfig {
    let mut config = SamplerConfig::default();
    config.chains = 3;
    config.iterations = 60;
    config.burn_in = 20;
    config.tuning = 0;
    config.seed_policy.master_seed = seed;
    config
}

#[test]
fn fit_fails_numerically_when_every_chain_diverges() {
    // Jumps of 2e160 overflow every squared innovation.
    let observed: Vec<f64> = (0..29)
        .map(|i| if i % 2 == 0 { 1e160 } else { -1e160 })
        .collect();
    let mut config = short_config(3);
    config.max_retries = 1;
    let err = sample(&model(ModelVariant::Level, &observed), &config).unwrap_err();
    assert!(matches!(err, PvaError::Numerical(_)), "{err}");
    let context = &err.info().context;
    assert_eq!(context["model"], "level");
    assert_eq!(context["chain"], "0");
}

#[test]
fn zero_noise_series_does_not_exhaust_retries() {
    let observed = [13.0; 29];
    let mut config = short_config(4);
    config.iterations = 400;
    config.burn_in = 100;
    config.max_retries = 1;
    for variant in [ModelVariant::Level, ModelVariant::Drift] {
        let run = sample(&model(variant, &observed), &config).unwrap();
        assert!(run.failures.is_empty(), "{variant}: {:?}", run.failures);
        assert_eq!(run.chains.len(), 3);
    }
}

#[test]
fn unreachable_ess_threshold_raises_non_convergence_warnings() {
    let observed: Vec<f64> = (0..29)
        .map(|i| 14.0 - 0.03 * i as f64 + 0.2 * ((i as f64) * 1.3).sin())
        .collect();
    let mut config = short_config(5);
    config.diagnostics.min_ess = 1e9;
    config.diagnostics.max_rhat = f64::INFINITY;
    let run = sample(&model(ModelVariant::Drift, &observed), &config).unwrap();
    assert!(!run.converged());
    assert!(run
        .warnings
        .iter()
        .all(|warning| matches!(warning, PvaWarning::NonConvergence(_))));
    let codes: Vec<&str> = run.warnings.iter().map(|w| w.info().code.as_str()).collect();
    assert!(codes.contains(&"ess"), "{codes:?}");
    assert!(codes.contains(&"latent-convergence"), "{codes:?}");
    let flagged: Vec<&str> = run
        .warnings
        .iter()
        .filter_map(|w| w.info().context.get("parameter").map(String::as_str))
        .collect();
    assert_eq!(flagged, ["sigma_obs", "sigma_proc", "b0"]);
}

#[test]
fn lax_thresholds_raise_no_warning() {
    let observed: Vec<f64> = (0..29)
        .map(|i| 14.0 - 0.03 * i as f64 + 0.2 * ((i as f64) * 1.3).sin())
        .collect();
    let mut config = short_config(6);
    config.diagnostics.min_ess = 0.0;
    config.diagnostics.max_rhat = f64::INFINITY;
    let run = sample(&model(ModelVariant::Drift, &observed), &config).unwrap();
    assert!(run.converged(), "{:?}", run.warnings);
}
