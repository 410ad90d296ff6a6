use std::sync::Arc;

use pva_core::{PvaError, SeriesShape, TimeSeries};
use pva_mcmc::{Chain, ChainStats, Draw, FitDiagnostics, SamplerRun};
use pva_model::{ModelVariant, ParameterSet};
use pva_post::{PosteriorStore, QUANTILE_LEVELS};

fn series() -> Arc<TimeSeries> {
    let observed: Vec<f64> = (0..29).map(|i| 12.0 + 0.05 * i as f64).collect();
    Arc::new(TimeSeries::from_observed(1990, &observed, SeriesShape::default()).unwrap())
}

fn chain(index: usize, draws: Vec<Draw>) -> Chain {
    Chain {
        variant: ModelVariant::Drift,
        index,
        seed: index as u64,
        draws,
        stats: ChainStats {
            acceptance_rate: 0.4,
            step_size: 0.1,
            proc_acceptance_rate: 0.3,
            proc_step_size: 0.2,
            retries: 0,
            iterations: 10,
        },
    }
}

fn run_with(chains: Vec<Chain>) -> SamplerRun {
    SamplerRun {
        variant: ModelVariant::Drift,
        diagnostics: FitDiagnostics::from_chains(&chains),
        chains,
        failures: Vec::new(),
        warnings: Vec::new(),
    }
}

/// Draw `s` of chain `c` shifts the observed path by a small offset.
fn synthetic_run() -> SamplerRun {
    let base = series();
    let chains = (0..2)
        .map(|c| {
            let draws = (0..10)
                .map(|s| {
                    let offset = 0.01 * (s as f64 - 4.5) + 0.001 * c as f64;
                    let states = (0..49)
                        .map(|t| base.value(t.min(28)).unwrap_or(0.0) + offset)
                        .collect();
                    Draw {
                        params: ParameterSet::for_variant(
                            ModelVariant::Drift,
                            0.3 + 0.01 * s as f64,
                            0.1,
                            0.05,
                            0.0,
                        ),
                        states,
                    }
                })
                .collect();
            chain(c, draws)
        })
        .collect();
    run_with(chains)
}

#[test]
fn pointwise_matrix_skips_first_year_and_forecasts() {
    let store = PosteriorStore::from_run(&synthetic_run(), series()).unwrap();
    let loglik = store.pointwise_log_likelihood();
    assert_eq!(loglik.points(), 28);
    assert_eq!(loglik.draws(), 20);
    assert_eq!(loglik.indices.first(), Some(&1));
    assert_eq!(loglik.indices.last(), Some(&28));
    assert_eq!(loglik.rows_by_chain(), vec![(0..10).collect::<Vec<_>>(), (10..20).collect()]);

    let draw = &store.draws()[3];
    let y = store.series().value(5).unwrap();
    let sd = draw.params.obs_sd;
    let z = (y - draw.states[5]) / sd;
    let expected = -0.5 * z * z - sd.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln();
    assert!((loglik.values[3][4] - expected).abs() < 1e-10);
}

#[test]
fn quantile_table_covers_every_step() {
    let store = PosteriorStore::from_run(&synthetic_run(), series()).unwrap();
    let table = store.quantile_table();
    assert_eq!(table.len(), 49);
    assert_eq!(table.levels, QUANTILE_LEVELS.to_vec());
    assert_eq!(table.years.first(), Some(&1990));
    assert_eq!(table.years.last(), Some(&2038));
    for row in &table.rows {
        assert_eq!(row.len(), 7);
        assert!(row.windows(2).all(|pair| pair[0] <= pair[1]));
    }
    let median = table.median().unwrap();
    assert!((median[0] - 12.0).abs() < 0.01);
}

#[test]
fn hyperparameters_follow_the_variant() {
    let store = PosteriorStore::from_run(&synthetic_run(), series()).unwrap();
    let summaries = store.hyperparameter_summaries();
    let names: Vec<&str> = summaries.keys().map(String::as_str).collect();
    assert_eq!(names, ["sigma_obs", "sigma_proc", "b0"]);
    let obs = &summaries["sigma_obs"];
    assert!((obs.mean - 0.345).abs() < 1e-12);
    assert!(summaries["sigma_proc"].sd < 1e-12);
    assert_eq!(store.hyperparameter_draws()["b0"].len(), 20);
}

#[test]
fn state_access_is_bounds_checked() {
    let store = PosteriorStore::from_run(&synthetic_run(), series()).unwrap();
    assert_eq!(store.state_draws(48).unwrap(), store.final_state_draws());
    let err = store.state_draws(49).unwrap_err();
    assert!(matches!(err, PvaError::Configuration(_)));
    assert_eq!(err.info().code, "state-index");
}

#[test]
fn empty_runs_and_short_paths_are_rejected() {
    let empty = run_with(vec![chain(0, Vec::new())]);
    let err = PosteriorStore::from_run(&empty, series()).unwrap_err();
    assert_eq!(err.info().code, "store-empty");

    let short = run_with(vec![chain(
        0,
        vec![Draw {
            params: ParameterSet::for_variant(ModelVariant::Drift, 0.3, 0.1, 0.0, 0.0),
            states: vec![12.0; 29],
        }],
    )]);
    let err = PosteriorStore::from_run(&short, series()).unwrap_err();
    assert_eq!(err.info().code, "store-path-length");
}

#[test]
fn summary_serializes_to_json() {
    let store = PosteriorStore::from_run(&synthetic_run(), series()).unwrap();
    let json = serde_json::to_value(store.summary()).unwrap();
    assert_eq!(json["variant"], "drift");
    assert_eq!(json["draws"], 20);
    assert_eq!(json["states"]["rows"].as_array().unwrap().len(), 49);
}
