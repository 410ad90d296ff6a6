use std::sync::Arc;

use pva_core::{PvaError, SeriesShape, TimeSeries};
use pva_fit::{fit_all, run_analysis, AnalysisConfig, AnalysisReport};
use pva_model::ModelVariant;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fixed 29-year log-abundance index: slow decline with year-to-year noise.
fn series() -> Arc<TimeSeries> {
    let observed: Vec<f64> = (0..29)
        .map(|i| {
            let t = i as f64;
            15.2 - 0.025 * t + 0.45 * (2.3 * t).sin() + 0.2 * (1.1 * t + 0.4).cos()
        })
        .collect();
    Arc::new(TimeSeries::from_observed(1990, &observed, SeriesShape::default()).unwrap())
}

fn short_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.sampler.chains = 2;
    config.sampler.iterations = 400;
    config.sampler.burn_in = 100;
    config.sampler.tuning = 100;
    config.sampler.seed_policy.master_seed = 2024;
    config.comparison.bootstrap_samples = 200;
    config
}

#[test]
fn full_analysis_ranks_all_models() {
    init_tracing();
    let analysis = run_analysis(series(), &short_config()).unwrap();
    let report = &analysis.report;

    assert!(report.failures.is_empty());
    assert_eq!(report.fits.len(), 3);
    assert_eq!(report.comparison.entries.len(), 3);
    for pair in report.comparison.entries.windows(2) {
        assert!(pair[0].looic <= pair[1].looic);
    }
    let gompertz = report.comparison.entry(ModelVariant::Gompertz).unwrap();
    assert!(gompertz.looic.is_finite() && gompertz.looic > 0.0, "looic = {}", gompertz.looic);

    let stacking: f64 = report.comparison.entries.iter().map(|e| e.stacking_weight).sum();
    let pseudo: f64 = report.comparison.entries.iter().map(|e| e.pseudo_bma_weight).sum();
    assert!((stacking - 1.0).abs() < 1e-9);
    assert!((pseudo - 1.0).abs() < 1e-9);

    assert_eq!(report.risk.variant, report.comparison.best().unwrap().variant);
    assert_eq!(report.risk.index, 48);
    assert_eq!(report.risk.entries.len(), 5);
    assert_eq!(report.risk.draws.len(), 2 * 300);
    for pair in report.risk.entries.windows(2) {
        assert!(pair[0].probability <= pair[1].probability);
    }
}

#[test]
fn every_fit_exposes_tables_and_loglik() {
    let results = fit_all(series(), &short_config());
    assert_eq!(results.len(), 3);
    for (variant, result) in results {
        let fit = result.unwrap();
        assert_eq!(fit.variant, variant);
        let table = fit.store.quantile_table();
        assert_eq!(table.len(), 49);
        assert!(table.rows.iter().all(|row| row.windows(2).all(|p| p[0] <= p[1])));
        let loglik = fit.pointwise_log_likelihood();
        assert_eq!(loglik.points(), 28);
        assert_eq!(loglik.draws(), 600);
    }
}

#[test]
fn analysis_is_reproducible() {
    let config = short_config();
    let first = run_analysis(series(), &config).unwrap();
    let second = run_analysis(series(), &config).unwrap();
    assert_eq!(first.report.comparison, second.report.comparison);
    assert_eq!(first.report.risk, second.report.risk);
}

#[test]
fn report_is_written_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = short_config();
    config.models = vec![ModelVariant::Level, ModelVariant::Drift];
    config.report_file = Some(dir.path().join("out").join("report.json"));
    let analysis = run_analysis(series(), &config).unwrap();

    let loaded = AnalysisReport::load(&dir.path().join("out").join("report.json")).unwrap();
    assert_eq!(loaded.fits.len(), 2);
    assert_eq!(loaded.comparison.ranking(), analysis.report.comparison.ranking());
    assert_eq!(loaded.master_seed, 2024);
    assert!(loaded.fit(ModelVariant::Gompertz).is_none());
    assert_eq!(loaded.fit(ModelVariant::Drift).unwrap().summary.states.len(), 49);
}

#[test]
fn invalid_configuration_fails_before_sampling() {
    let mut config = short_config();
    config.sampler.chains = 1;
    let err = run_analysis(series(), &config).unwrap_err();
    assert!(matches!(err, PvaError::Configuration(_)));

    let mut config = short_config();
    config.risk.thresholds = vec![1000.0, -1.0];
    let err = run_analysis(series(), &config).unwrap_err();
    assert!(matches!(err, PvaError::Configuration(_)));

    let mut config = short_config();
    config.models.clear();
    assert_eq!(run_analysis(series(), &config).unwrap_err().info().code, "analysis-models");
}
