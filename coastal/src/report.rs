//! Terminal presentation of a workflow run.

use anyhow::Error as AnyError;
use std::io::Write;
use textplots::{Chart, Plot, Shape};
use workflow::{
    raster::{Histogram, RegionStats},
    EvalTarget, Explanation, LinearFit, Report, Summary,
};

const CHART_WIDTH: u32 = 180;
const CHART_HEIGHT: u32 = 60;

/// Prints statistics, model details and metrics, followed by
/// histograms and the actual vs. predicted scatter.
pub fn print(report: &Report) -> Result<(), AnyError> {
    let summary = &report.summary;
    {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "Population Statistics:")?;
        print_stats(&mut stdout, &summary.population_stats)?;
        writeln!(stdout)?;
        writeln!(stdout, "Train size: {}", summary.train_size)?;
        writeln!(stdout, "Test size: {}", summary.test_size)?;
        writeln!(stdout)?;
        writeln!(stdout, "Regression RF")?;
        print_explanation(&mut stdout, &summary.explanation)?;
        writeln!(stdout)?;
        if let Some(metrics) = summary.evaluation.selected() {
            let label = set_label(metrics.set);
            writeln!(stdout, "{label} RMSE: {}", metrics.rmse)?;
            writeln!(stdout, "{label} MAE: {}", metrics.mae)?;
            writeln!(stdout, "({} rows, seed {})", metrics.rows, summary.seed)?;
        }
        writeln!(stdout)?;
        writeln!(stdout, "Descriptive Statistics (Rain, LST, Pop, Elevation)")?;
        print_stats(&mut stdout, &summary.combined_stats)?;
    }

    for histogram in &summary.histograms {
        plot_histogram(histogram);
    }
    plot_scatter(summary);
    Ok(())
}

/// Prints `summary` as pretty JSON.
pub fn print_json(summary: &Summary) -> Result<(), AnyError> {
    let json = serde_json::to_string_pretty(summary)?;
    println!("{json}");
    Ok(())
}

fn print_stats<W: Write>(out: &mut W, stats: &RegionStats) -> Result<(), AnyError> {
    for (name, value) in stats {
        writeln!(out, "  {name}: {value}")?;
    }
    Ok(())
}

fn print_explanation<W: Write>(out: &mut W, explanation: &Explanation) -> Result<(), AnyError> {
    writeln!(out, "  trees: {}", explanation.n_trees)?;
    writeln!(out, "  variables: {}", explanation.variables.join(", "))?;
    for (variable, importance) in &explanation.importance {
        writeln!(out, "  importance {variable}: {importance:.4}")?;
    }
    if let Some(rmse) = explanation.out_of_bag_rmse {
        writeln!(out, "  out-of-bag RMSE: {rmse}")?;
    }
    Ok(())
}

fn set_label(set: EvalTarget) -> &'static str {
    match set {
        EvalTarget::Train => "Training",
        EvalTarget::Test => "Test",
    }
}

fn histogram_titles(band: &str) -> (String, String) {
    match band {
        "rain" => (
            "Rainfall Distribution in Coastal China".to_string(),
            "Rainfall (sum)".to_string(),
        ),
        "elevation" => (
            "Elevation Distribution in Coastal China".to_string(),
            "Elevation (meters)".to_string(),
        ),
        other => (format!("{other} Distribution"), other.to_string()),
    }
}

/// Bucket centers and counts.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn histogram_points(histogram: &Histogram) -> Vec<(f32, f32)> {
    let half = histogram.bucket_width / 2.0;
    histogram
        .buckets()
        .map(|(lower, count)| ((lower + half) as f32, count as f32))
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn plot_histogram(histogram: &Histogram) {
    let (title, x_label) = histogram_titles(&histogram.name);
    let points = histogram_points(histogram);
    let xmin = histogram.min as f32;
    let xmax = (histogram.min + histogram.bucket_width * histogram.counts.len() as f64) as f32;
    println!("\n{title}");
    println!("x: {x_label}, y: pixel count");
    Chart::new(CHART_WIDTH, CHART_HEIGHT, xmin, xmax)
        .lineplot(&Shape::Bars(&points))
        .display();
}

/// Endpoints of `fit` across `[xmin, xmax]`.
#[allow(clippy::cast_possible_truncation)]
fn trend_points(fit: &LinearFit, xmin: f64, xmax: f64) -> [(f32, f32); 2] {
    [
        (xmin as f32, fit.at(xmin) as f32),
        (xmax as f32, fit.at(xmax) as f32),
    ]
}

#[allow(clippy::cast_possible_truncation)]
fn plot_scatter(summary: &Summary) {
    let evaluation = &summary.evaluation;
    let Some((xmin, xmax)) = evaluation
        .scatter
        .iter()
        .fold(None, |acc: Option<(f64, f64)>, &(actual, _)| match acc {
            None => Some((actual, actual)),
            Some((lo, hi)) => Some((lo.min(actual), hi.max(actual))),
        })
    else {
        return;
    };
    if xmin == xmax {
        return;
    }

    let points: Vec<(f32, f32)> = evaluation
        .scatter
        .iter()
        .map(|&(actual, predicted)| (actual as f32, predicted as f32))
        .collect();

    println!("\nLST Actual vs Prediction (Coastal China)");
    println!("x: actual LST (°C), y: predicted LST (°C)");
    match &evaluation.trendline {
        Some(fit) => {
            println!(
                "trendline: y = {:.3}x + {:.3}, R² = {:.4}",
                fit.slope, fit.intercept, fit.r_squared
            );
            let trend = trend_points(fit, xmin, xmax);
            Chart::new(CHART_WIDTH, CHART_HEIGHT, xmin as f32, xmax as f32)
                .lineplot(&Shape::Points(&points))
                .lineplot(&Shape::Lines(&trend))
                .display();
        }
        None => {
            Chart::new(CHART_WIDTH, CHART_HEIGHT, xmin as f32, xmax as f32)
                .lineplot(&Shape::Points(&points))
                .display();
        }
    }
}
