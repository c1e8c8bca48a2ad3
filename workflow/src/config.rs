use crate::{acquire::Layers, EvalTarget, WorkflowError};
use forest::ForestParams;
use raster::{Grid, Region, RegionLimits, COASTAL_ZHEJIANG};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

/// Everything a workflow run needs besides its data source.
///
/// Missing fields in a config file take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Region vertices as (lon, lat).
    pub region: Vec<(f64, f64)>,

    /// Analysis pixel size in meters.
    pub scale: f64,

    /// Pixels to sample for training and testing.
    pub num_pixels: usize,

    /// Rows with a split key at or below this go to training.
    pub split_threshold: f64,

    /// Seeds pixel sampling; the split key uses `seed + 1` and the
    /// forest `seed + 2`.
    pub seed: u64,

    pub forest: ForestParams,

    pub layers: Layers,

    /// Column to predict.
    pub target: String,

    pub predictors: Vec<String>,

    /// Band whose undefined or zero pixels are excluded.
    pub mask: String,

    /// Name of the predicted band.
    pub prediction: String,

    pub eval_target: EvalTarget,

    pub region_limits: RegionLimits,

    pub rain_buckets: usize,

    pub elevation_buckets: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: COASTAL_ZHEJIANG.to_vec(),
            scale: 100.0,
            num_pixels: 10_000,
            split_threshold: 0.8,
            seed: 0,
            forest: ForestParams::default(),
            layers: Layers::default(),
            target: "LST".to_string(),
            predictors: vec![
                "rain".to_string(),
                "elevation".to_string(),
                "pop".to_string(),
            ],
            mask: "pop".to_string(),
            prediction: "LST_Prediction".to_string(),
            eval_target: EvalTarget::Train,
            region_limits: RegionLimits::default(),
            rain_buckets: 100,
            elevation_buckets: 50,
        }
    }
}

impl Config {
    /// Reads a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WorkflowError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn region(&self) -> Result<Region, WorkflowError> {
        Ok(Region::new(&self.region)?)
    }

    /// Analysis grid over `region` at [`Config::scale`].
    pub fn grid(&self, region: &Region) -> Result<Grid, WorkflowError> {
        Ok(Grid::for_region(region, self.scale)?)
    }

    /// Forest parameters seeded from [`Config::seed`].
    pub fn forest_params(&self) -> ForestParams {
        self.forest.seed(self.seed.wrapping_add(2))
    }

    pub fn split_seed(&self) -> u64 {
        self.seed.wrapping_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::EvalTarget;
    use raster::Region;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.region().unwrap(), Region::coastal_zhejiang());
        assert_eq!(config.forest.n_trees, 50);
        assert_eq!(config.forest_params().seed, 2);
        assert_eq!(config.split_seed(), 1);
        assert_eq!(config.layers.lst.scale, 0.02);
        assert_eq!(config.layers.lst.offset, -273.15);
    }

    #[test]
    fn test_load_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "seed": 9, "eval_target": "test", "forest": {{ "n_trees": 5 }},
                 "region": [[121.0, 28.0], [121.5, 28.0], [121.5, 28.5]] }}"#
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.eval_target, EvalTarget::Test);
        assert_eq!(config.forest.n_trees, 5);
        assert_eq!(config.forest.bag_fraction, 0.5);
        assert_eq!(config.num_pixels, 10_000);
        assert_eq!(config.region().unwrap().ring().len(), 4);
        assert_eq!(config.forest_params().seed, 11);
    }
}
