//! Image collections stored on local disk.
//!
//! A catalog directory holds `catalog.json` and one raw
//! little-endian `f32` file per image band:
//!
//! ```json
//! {
//!   "collections": [{
//!     "id": "UCSB-CHG/CHIRPS/DAILY",
//!     "nodata": -9999.0,
//!     "images": [{
//!       "id": "20220101",
//!       "date": "2022-01-01",
//!       "grid": { "west": 120.0, "north": 31.0, "dx": 0.05, "dy": 0.05, "cols": 60, "rows": 80 },
//!       "properties": { "CLOUDY_PIXEL_PERCENTAGE": 3.5 },
//!       "bands": { "precipitation": "chirps/20220101.f32" }
//!     }]
//!   }]
//! }
//! ```

use crate::{source::LayerSource, Image, ImageCollection, WorkflowError};
use byteorder::{LittleEndian as LE, ReadBytesExt};
use chrono::NaiveDate;
use log::debug;
use raster::{Band, Grid};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::BufReader,
    mem::size_of,
    path::{Path, PathBuf},
    time::Instant,
};

pub const CATALOG_FILE: &str = "catalog.json";

#[derive(Debug, Deserialize)]
struct CatalogFile {
    collections: Vec<CollectionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct CollectionEntry {
    id: String,
    /// Sample value meaning "no data".
    #[serde(default)]
    nodata: Option<f32>,
    images: Vec<ImageEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImageEntry {
    id: String,
    #[serde(default)]
    date: Option<NaiveDate>,
    grid: GridEntry,
    #[serde(default)]
    properties: BTreeMap<String, f64>,
    /// Band name to file path, relative to the catalog directory.
    bands: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct GridEntry {
    west: f64,
    north: f64,
    dx: f64,
    dy: f64,
    cols: usize,
    rows: usize,
}

/// Serves collections described by a directory's `catalog.json`.
///
/// Band files are read when their collection is requested.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    dir: PathBuf,
    collections: HashMap<String, CollectionEntry>,
}

impl CatalogSource {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, WorkflowError> {
        let dir = dir.as_ref().to_owned();
        let file = File::open(dir.join(CATALOG_FILE))?;
        let catalog: CatalogFile = serde_json::from_reader(BufReader::new(file))?;
        let collections = catalog
            .collections
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        Ok(Self { dir, collections })
    }

    /// Ids of every collection in the catalog, sorted.
    pub fn collection_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.collections.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn load_image(&self, entry: &ImageEntry, nodata: Option<f32>) -> Result<Image, WorkflowError> {
        let GridEntry {
            west,
            north,
            dx,
            dy,
            cols,
            rows,
        } = entry.grid;
        let grid = Grid::new(west, north, dx, dy, cols, rows)?;
        let bands = entry
            .bands
            .iter()
            .map(|(name, path)| -> Result<Band, WorkflowError> {
                let values = read_band(&self.dir.join(path), grid.len(), nodata)?;
                Ok(Band::new(name.as_str(), grid, values)?)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let image = Image::new(entry.id.as_str(), entry.date, bands)?;
        Ok(entry
            .properties
            .iter()
            .fold(image, |image, (name, value)| {
                image.with_property(name.as_str(), *value)
            }))
    }
}

impl LayerSource for CatalogSource {
    fn collection(&self, id: &str) -> Result<ImageCollection, WorkflowError> {
        let entry = self
            .collections
            .get(id)
            .ok_or_else(|| WorkflowError::UnknownCollection(id.to_string()))?;
        let now = Instant::now();
        let images = entry
            .images
            .iter()
            .map(|image| self.load_image(image, entry.nodata))
            .collect::<Result<Vec<_>, _>>()?;
        let duration = now.elapsed();
        debug!("{id}: loaded {} images, {duration:?}", images.len());
        Ok(ImageCollection::new(id, images))
    }
}

/// Reads `len` little-endian `f32` samples, mapping `nodata` to
/// undefined.
fn read_band(path: &Path, len: usize, nodata: Option<f32>) -> Result<Vec<f64>, WorkflowError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    if file_len != (len * size_of::<f32>()) as u64 {
        return Err(WorkflowError::Catalog(format!(
            "{} has {file_len} bytes, expected {}",
            path.display(),
            len * size_of::<f32>()
        )));
    }
    let mut samples = vec![0_f32; len];
    BufReader::new(file).read_f32_into::<LE>(&mut samples)?;
    Ok(samples
        .into_iter()
        .map(|sample| {
            if nodata == Some(sample) || sample.is_nan() {
                f64::NAN
            } else {
                f64::from(sample)
            }
        })
        .collect())
}
