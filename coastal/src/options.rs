use clap::{Parser, Subcommand};
use std::path::PathBuf;
use workflow::EvalTarget;

/// Predict coastal land surface temperature from rain, elevation and
/// population.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file. Missing fields take their defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seed for sampling, splitting and training.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Partition the headline metrics are computed on ("train" or
    /// "test").
    #[arg(long)]
    pub eval_target: Option<EvalTarget>,

    /// Directory for rendered map layers.
    #[arg(short, long, default_value = "out")]
    pub out_dir: PathBuf,

    /// Also render layers hidden by default.
    #[arg(long, default_value_t = false)]
    pub all_layers: bool,

    /// Don't render map layers.
    #[arg(long, default_value_t = false)]
    pub no_maps: bool,

    /// Print the summary as JSON instead of the text report.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run on a local catalog of image collections.
    Run {
        /// Directory containing `catalog.json`.
        #[arg(long)]
        catalog: PathBuf,

        /// Directory of NASADEM hgt tiles for the elevation layer.
        #[arg(long)]
        nasadem: Option<PathBuf>,

        /// Memory map tiles instead of reading them into memory.
        #[arg(long, default_value_t = false)]
        memmap: bool,
    },

    /// Run on generated data.
    Synthetic {
        /// How strongly temperature follows the other layers, in
        /// [0, 1].
        #[arg(long, default_value_t = 0.7)]
        correlation: f64,

        /// Analysis pixel size in meters.
        #[arg(long)]
        scale: Option<f64>,
    },
}
