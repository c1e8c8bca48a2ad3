use rand::{rngs::StdRng, Rng, SeedableRng};
use workflow::{
    assemble, evaluate,
    raster::{Band, Grid, Region},
    run, sample,
    source::SyntheticSource,
    Config, EvalTarget, ForestParams, LstModel, WorkflowError,
};

fn small_config() -> Config {
    let mut config = Config {
        region: vec![(121.0, 28.0), (121.4, 28.0), (121.4, 28.4), (121.0, 28.4)],
        scale: 1000.0,
        num_pixels: 400,
        seed: 11,
        ..Config::default()
    };
    config.forest.n_trees = 20;
    config
}

fn source(config: &Config) -> SyntheticSource {
    SyntheticSource::new(
        config.layers.clone(),
        config.region().unwrap(),
        config.scale,
    )
    .seed(config.seed)
}

#[test]
fn test_end_to_end() {
    let config = small_config();
    let report = run(&config, &source(&config)).unwrap();
    let summary = &report.summary;

    assert!(summary.sample_size > 0 && summary.sample_size <= 400);
    assert_eq!(summary.train_size + summary.test_size, summary.sample_size);
    assert!(summary.train_size > summary.test_size);

    let names: Vec<&str> = report.layers.iter().map(|b| b.name()).collect();
    assert_eq!(names, ["rain", "LST", "pop", "elevation"]);
    assert_eq!(report.combined.band_names(), ["rain", "LST", "pop", "elevation"]);
    assert_eq!(report.prediction.name(), "LST_Prediction");
    let valid = report.combined.valid_indices();
    assert!(valid.iter().all(|&i| report.prediction.is_defined(i)));
    assert!(report.prediction.defined_count() >= valid.len());
    assert_eq!(report.true_color.len(), 2);

    for key in ["pop_mean", "pop_min", "pop_max", "pop_stdDev", "pop_count"] {
        assert!(summary.population_stats.contains_key(key), "{key}");
    }
    assert!(summary.combined_stats.contains_key("LST_mean"));
    assert!(summary.combined_stats["pop_min"] > 0.0);
    assert_eq!(summary.histograms[0].counts.len(), 100);
    assert_eq!(summary.histograms[1].name, "elevation");

    let evaluation = &summary.evaluation;
    assert_eq!(evaluation.target, EvalTarget::Train);
    let metrics = evaluation.selected().unwrap();
    assert_eq!(metrics.set, EvalTarget::Train);
    assert_eq!(metrics.rows, summary.train_size);
    assert!(metrics.rmse >= metrics.mae && metrics.mae >= 0.0);
    assert_eq!(evaluation.scatter.len(), summary.test_size);
    assert_eq!(summary.explanation.n_trees, 20);
    assert_eq!(
        summary.explanation.variables,
        ["rain", "elevation", "pop"]
    );
}

#[test]
fn test_same_seed_same_summary() {
    let config = small_config();
    let a = run(&config, &source(&config)).unwrap();
    let b = run(&config, &source(&config)).unwrap();
    assert_eq!(a.summary, b.summary);

    let reseeded = Config {
        seed: 12,
        ..small_config()
    };
    let c = run(&reseeded, &source(&config)).unwrap();
    assert_ne!(a.summary.evaluation, c.summary.evaluation);
}

#[test]
fn test_eval_on_test_set() {
    let config = Config {
        eval_target: EvalTarget::Test,
        ..small_config()
    };
    let report = run(&config, &source(&config)).unwrap();
    let evaluation = &report.summary.evaluation;
    let metrics = evaluation.selected().unwrap();
    assert_eq!(metrics.set, EvalTarget::Test);
    assert_eq!(metrics.rows, report.summary.test_size);
    assert!(evaluation.test.is_some());
}

#[test]
fn test_empty_layer_stops_before_training() {
    let mut config = small_config();
    let start = chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
    let end = chrono::NaiveDate::from_ymd_opt(1991, 1, 1).unwrap();
    config.layers.rain = config.layers.rain.clone().dates(start, end);
    assert!(matches!(
        run(&config, &source(&config)),
        Err(WorkflowError::EmptyCollection { layer, .. }) if layer == "rain"
    ));
}

/// MAE of a 50-tree forest on a 10x10 raster whose target blends
/// `x1 + x2` with independent noise, weighted by `correlation`.
fn blended_mae(correlation: f64) -> f64 {
    let grid = Grid::new(0.0, 10.0, 1.0, 1.0, 10, 10).unwrap();
    let region = Region::new(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    let noise: Vec<f64> = (0..grid.len()).map(|_| rng.gen_range(0.0..20.0)).collect();

    let x1 = Band::from_fn("x1", grid, |c| Some(c.x));
    let x2 = Band::from_fn("x2", grid, |c| Some(c.y));
    let target = Band::new(
        "target",
        grid,
        (0..grid.len())
            .map(|i| {
                let signal = x1.values()[i] + x2.values()[i];
                correlation * signal + (1.0 - correlation) * noise[i]
            })
            .collect(),
    )
    .unwrap();
    let mask = Band::filled("mask", grid, 1.0);

    let stack = assemble(vec![x1, x2, target, mask], "mask").unwrap();
    let table = sample(&stack, &region, 100, 0).unwrap().random_column(1);
    assert_eq!(table.len(), 100);
    let (train, test) = table.split(0.8).unwrap();

    let predictors = vec!["x1".to_string(), "x2".to_string()];
    let model = LstModel::train(
        &train,
        "target",
        &predictors,
        &ForestParams::new(50).seed(2),
    )
    .unwrap();
    let evaluation = evaluate(&model, &train, &test, EvalTarget::Train).unwrap();
    evaluation.train.mae
}

#[test]
fn test_mae_falls_as_correlation_rises() {
    let maes: Vec<f64> = [0.2, 0.6, 1.0].into_iter().map(blended_mae).collect();
    for pair in maes.windows(2) {
        assert!(pair[1] <= pair[0], "{maes:?}");
    }
}
