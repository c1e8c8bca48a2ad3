mod map;
mod options;
mod report;

use anyhow::Error as AnyError;
use clap::Parser;
use log::info;
use options::{Cli, Command as CliCmd};
use workflow::{
    source::{CatalogSource, LayerSource, NasademSource, SourceChain, SyntheticSource, TileMode},
    Config,
};

fn main() -> Result<(), AnyError> {
    let Cli {
        config,
        seed,
        eval_target,
        out_dir,
        all_layers,
        no_maps,
        json,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let mut config = match config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(eval_target) = eval_target {
        config.eval_target = eval_target;
    }

    let source: Box<dyn LayerSource> = match cmd {
        CliCmd::Run {
            catalog,
            nasadem,
            memmap,
        } => {
            let mut chain = SourceChain::new().with(CatalogSource::open(catalog)?);
            if let Some(tile_dir) = nasadem {
                let region = config.region()?;
                let tile_mode = if memmap {
                    TileMode::MemMap
                } else {
                    TileMode::InMem
                };
                chain = chain.with(NasademSource::new(
                    config.layers.elevation.collection.clone(),
                    tile_dir,
                    tile_mode,
                    config.grid(&region)?,
                )?);
            }
            Box::new(chain)
        }
        CliCmd::Synthetic { correlation, scale } => {
            if let Some(scale) = scale {
                config.scale = scale;
            }
            Box::new(
                SyntheticSource::new(config.layers.clone(), config.region()?, config.scale)
                    .seed(config.seed)
                    .correlation(correlation),
            )
        }
    };

    let report = workflow::run(&config, source.as_ref())?;

    if json {
        report::print_json(&report.summary)?;
    } else {
        report::print(&report)?;
    }

    if !no_maps {
        std::fs::create_dir_all(&out_dir)?;
        let written = map::render(&report, &out_dir, all_layers)?;
        info!("wrote {} layers to {}", written.len(), out_dir.display());
    }

    Ok(())
}
