use crate::{
    acquire::{acquire, acquire_true_color, TrueColor},
    assemble, evaluate, sample,
    source::LayerSource,
    Config, Evaluation, LstModel, WorkflowError,
};
use forest::Explanation;
use log::{info, warn};
use raster::{Band, Grid, Histogram, Reducer, Region, RegionStats, Stack};
use serde::Serialize;
use std::time::Instant;

/// Everything a run produces, for presentation.
#[derive(Debug, Clone)]
pub struct Report {
    pub region: Region,
    pub grid: Grid,
    /// Acquired rain, LST, pop and elevation, before masking.
    pub layers: Vec<Band>,
    /// Layers stacked and masked by population.
    pub combined: Stack,
    pub prediction: Band,
    pub true_color: Vec<TrueColor>,
    pub summary: Summary,
}

/// The numeric part of a [`Report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub seed: u64,
    pub sample_size: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub population_stats: RegionStats,
    pub combined_stats: RegionStats,
    pub histograms: Vec<Histogram>,
    pub explanation: Explanation,
    pub evaluation: Evaluation,
}

/// Runs the whole workflow: acquire, assemble, sample, split, train,
/// predict and evaluate.
pub fn run(config: &Config, source: &dyn LayerSource) -> Result<Report, WorkflowError> {
    let started = Instant::now();
    let region = config.region()?;
    let grid = config.grid(&region)?;
    info!(
        "analysis grid {} x {} at {} m",
        grid.cols(),
        grid.rows(),
        config.scale
    );

    let layers = &config.layers;
    let rain = acquire(source, &layers.rain, &region, &grid)?;
    let lst = acquire(source, &layers.lst, &region, &grid)?;
    let pop = acquire(source, &layers.pop, &region, &grid)?;
    let elevation = acquire(source, &layers.elevation, &region, &grid)?;

    let mut true_color = Vec::new();
    for spec in &layers.true_color {
        match acquire_true_color(source, spec, &region, &grid) {
            Ok(composite) => true_color.push(composite),
            Err(
                e @ (WorkflowError::UnknownCollection(_)
                | WorkflowError::EmptyCollection { .. }
                | WorkflowError::MissingBand(_)),
            ) => warn!("skipping {}: {e}", spec.name),
            Err(e) => return Err(e),
        }
    }

    let limits = config.region_limits;
    let histograms = vec![
        Histogram::compute(&rain, &region, config.rain_buckets)?,
        Histogram::compute(&elevation, &region, config.elevation_buckets)?,
    ];
    let population_stats = raster::reduce_region(
        &pop,
        &region,
        &[
            Reducer::Mean,
            Reducer::Min,
            Reducer::Max,
            Reducer::StdDev,
            Reducer::Count,
        ],
        limits,
    )?;

    let acquired = vec![rain, lst, pop, elevation];
    let combined = assemble(acquired.clone(), &config.mask)?;
    let combined_stats = combined.reduce_region(
        &region,
        &[Reducer::Mean, Reducer::Min, Reducer::Max, Reducer::StdDev],
        limits,
    )?;

    let sampled =
        sample(&combined, &region, config.num_pixels, config.seed)?.random_column(config.split_seed());
    let (train, test) = sampled.split(config.split_threshold)?;
    info!("train size: {}, test size: {}", train.len(), test.len());
    if train.is_empty() {
        return Err(WorkflowError::EmptyTrainingSet);
    }

    let model = LstModel::train(
        &train,
        &config.target,
        &config.predictors,
        &config.forest_params(),
    )?;
    let prediction = model.classify_stack(&combined, &config.prediction)?;
    let evaluation = evaluate(&model, &train, &test, config.eval_target)?;

    let duration = started.elapsed();
    info!("workflow finished in {duration:?}");

    Ok(Report {
        region,
        grid,
        layers: acquired,
        combined,
        prediction,
        true_color,
        summary: Summary {
            seed: config.seed,
            sample_size: sampled.len(),
            train_size: train.len(),
            test_size: test.len(),
            population_stats,
            combined_stats,
            histograms,
            explanation: model.explain(),
            evaluation,
        },
    })
}
