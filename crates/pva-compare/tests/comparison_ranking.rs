use pva_compare::{compare, psis_loo, relative_efficiency, ComparisonConfig, PseudoBmaMethod};
use pva_core::{PvaError, PvaWarning, RngHandle};
use pva_model::ModelVariant;
use pva_post::PointwiseLogLik;
use rand_distr::{Distribution, StandardNormal};

const POINTS: usize = 28;
const CHAINS: usize = 2;
const PER_CHAIN: usize = 300;

fn normal_ln_pdf(x: f64, mean: f64, sd: f64) -> f64 {
    let z = (x - mean) / sd;
    -0.5 * z * z - sd.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
}

/// Each draw predicts observation `i` with a mean jittered around
/// `observations[i] + bias` and a fixed observation sd.
fn loglik(seed: u64, bias: f64, sd: f64) -> PointwiseLogLik {
    let mut rng = RngHandle::from_seed(seed);
    let observations: Vec<f64> = (0..POINTS).map(|i| 12.0 + 0.05 * i as f64).collect();
    let mut values = Vec::new();
    let mut chain_ids = Vec::new();
    for chain in 0..CHAINS {
        for _ in 0..PER_CHAIN {
            let row = observations
                .iter()
                .map(|&y| {
                    let jitter: f64 = StandardNormal.sample(rng.inner_mut());
                    normal_ln_pdf(y, y + bias + 0.05 * jitter, sd)
                })
                .collect();
            values.push(row);
            chain_ids.push(chain);
        }
    }
    PointwiseLogLik {
        indices: (1..=POINTS).collect(),
        chain_ids,
        values,
    }
}

#[test]
fn better_predictions_rank_first() {
    let good = loglik(1, 0.0, 0.3);
    let biased = loglik(2, 0.5, 0.3);
    let vague = loglik(3, 0.0, 1.5);
    let comparison = compare(
        &[
            (ModelVariant::Level, &vague),
            (ModelVariant::Drift, &biased),
            (ModelVariant::Gompertz, &good),
        ],
        &ComparisonConfig::default(),
    )
    .unwrap();

    assert_eq!(comparison.best().unwrap().variant, ModelVariant::Gompertz);
    let ranks: Vec<usize> = comparison.entries.iter().map(|entry| entry.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    for pair in comparison.entries.windows(2) {
        assert!(pair[0].looic <= pair[1].looic);
    }
    assert_eq!(comparison.entries[0].delta_looic, 0.0);

    let stacking: f64 = comparison.entries.iter().map(|e| e.stacking_weight).sum();
    let pseudo: f64 = comparison.entries.iter().map(|e| e.pseudo_bma_weight).sum();
    assert!((stacking - 1.0).abs() < 1e-9);
    assert!((pseudo - 1.0).abs() < 1e-9);
    assert!(comparison.entry(ModelVariant::Gompertz).unwrap().pseudo_bma_weight > 0.5);
    assert!(comparison.warnings.is_empty(), "{:?}", comparison.warnings);
}

#[test]
fn looic_is_minus_twice_elpd() {
    let summary = psis_loo(ModelVariant::Drift, &loglik(4, 0.1, 0.4)).unwrap();
    assert_eq!(summary.pointwise.len(), POINTS);
    assert_eq!(summary.pointwise[0].index, 1);
    assert!((summary.looic + 2.0 * summary.elpd_loo).abs() < 1e-9);
    assert!(summary.looic_se >= 0.0);
    assert!(summary.p_loo >= 0.0 && summary.p_loo < 1.0, "p_loo = {}", summary.p_loo);
    assert!(summary.max_pareto_k() < 0.7);
}

#[test]
fn relative_efficiency_of_independent_draws_is_near_one() {
    let matrix = loglik(5, 0.0, 0.3);
    let column = matrix.column(0);
    let r_eff = relative_efficiency(&column, &matrix.rows_by_chain());
    assert!(r_eff > 0.7 && r_eff < 1.4, "r_eff = {r_eff}");
}

#[test]
fn plain_pseudo_bma_is_available() {
    let good = loglik(6, 0.0, 0.3);
    let biased = loglik(7, 0.3, 0.3);
    let config = ComparisonConfig {
        pseudo_bma: PseudoBmaMethod::Plain,
        ..ComparisonConfig::default()
    };
    let comparison =
        compare(&[(ModelVariant::Level, &good), (ModelVariant::Drift, &biased)], &config).unwrap();
    assert!(comparison.entry(ModelVariant::Level).unwrap().pseudo_bma_weight > 0.9);
}

#[test]
fn invalid_inputs_are_configuration_errors() {
    let err = compare(&[], &ComparisonConfig::default()).unwrap_err();
    assert!(matches!(err, PvaError::Configuration(_)));
    assert_eq!(err.info().code, "compare-empty");

    let full = loglik(8, 0.0, 0.3);
    let mut short = loglik(9, 0.0, 0.3);
    short.indices.pop();
    for row in &mut short.values {
        row.pop();
    }
    let err = compare(
        &[(ModelVariant::Level, &full), (ModelVariant::Drift, &short)],
        &ComparisonConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.info().code, "compare-points");

    let err = compare(
        &[(ModelVariant::Level, &full), (ModelVariant::Level, &full)],
        &ComparisonConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.info().code, "compare-duplicate");
}

#[test]
fn non_finite_loglik_is_numerical() {
    let mut matrix = loglik(10, 0.0, 0.3);
    matrix.values[3][2] = f64::NAN;
    let err = psis_loo(ModelVariant::Level, &matrix).unwrap_err();
    assert!(matches!(err, PvaError::Numerical(_)));
}

#[test]
fn influential_point_raises_reliability_warning() {
    let mut matrix = loglik(11, 0.0, 0.3);
    // Importance ratios 1 / (1 - u) at one point: a Pareto tail with shape 1.
    let draws = matrix.draws();
    for (row, values) in matrix.values.iter_mut().enumerate() {
        let u = ((row * 7919) % draws) as f64 / draws as f64 + 0.5 / draws as f64;
        values[5] = (1.0 - u).ln();
    }
    let comparison =
        compare(&[(ModelVariant::Gompertz, &matrix)], &ComparisonConfig::default()).unwrap();
    assert_eq!(comparison.warnings.len(), 1);
    let PvaWarning::ComparisonReliability(info) = &comparison.warnings[0] else {
        panic!("expected a reliability warning");
    };
    assert_eq!(info.context["model"], "gompertz");
    assert!(info.context["indices"].split(',').any(|index| index == "6"));
    assert_eq!(comparison.entries[0].stacking_weight, 1.0);
}

#[test]
fn comparison_serializes() {
    let a = loglik(12, 0.0, 0.3);
    let b = loglik(13, 0.2, 0.3);
    let comparison = compare(
        &[(ModelVariant::Level, &a), (ModelVariant::Drift, &b)],
        &ComparisonConfig::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&comparison).unwrap();
    assert_eq!(json["entries"].as_array().unwrap().len(), 2);
    assert_eq!(json["entries"][0]["rank"], 1);
}

#[test]
fn yaml_config_overrides_defaults() {
    let config = ComparisonConfig::from_yaml_str("k_threshold: 0.5\npseudo_bma: plain\n").unwrap();
    assert_eq!(config.k_threshold, 0.5);
    assert_eq!(config.pseudo_bma, PseudoBmaMethod::Plain);
    assert_eq!(config.bootstrap_samples, 1_000);
    let invalid = ComparisonConfig {
        k_threshold: -1.0,
        ..ComparisonConfig::default()
    };
    assert!(invalid.validate().is_err());
}
