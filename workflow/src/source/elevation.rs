//! Elevation served from NASADEM `.hgt` tiles.

use crate::{source::LayerSource, Image, ImageCollection, WorkflowError};
use dashmap::DashMap;
use geo::geometry::Coord;
use log::{debug, warn};
use nasadem::{NasademError, Tile};
use raster::{Band, Grid};
use rayon::prelude::*;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

/// Band name of the single elevation image.
pub const ELEVATION_BAND: &str = "elevation";

/// How to load tiles.
///
/// The trade off between loading tile data into memory versus memory
/// mapping is not obvious, and you should measure both before
/// deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    /// Parse tile and load into memory.
    InMem,

    /// Memory map file contents.
    MemMap,
}

/// Serves a static, single-image elevation collection sampled from
/// NASADEM tiles onto an analysis grid.
pub struct NasademSource {
    /// Collection id this source answers to.
    id: String,

    /// Directory containing NASADEM HGT tile files.
    tile_dir: PathBuf,

    tile_mode: TileMode,

    grid: Grid,

    /// Tiles which have been loaded on demand.
    ///
    /// `None` marks tiles known to be absent from disk, which yield
    /// undefined pixels.
    tiles: DashMap<Coord<i32>, Option<Arc<Tile>>>,
}

impl NasademSource {
    pub fn new<S: Into<String>>(
        id: S,
        tile_dir: PathBuf,
        tile_mode: TileMode,
        grid: Grid,
    ) -> Result<Self, WorkflowError> {
        // Fail early if tile_dir has no `hgt` files at all.
        let mut has_height_files = false;
        for entry in std::fs::read_dir(&tile_dir)? {
            let path = entry?.path();
            if Some("hgt") == path.extension().and_then(|ext| ext.to_str()) {
                has_height_files = true;
                break;
            }
        }
        if !has_height_files {
            return Err(WorkflowError::NoTiles(tile_dir));
        }
        Ok(Self {
            id: id.into(),
            tile_dir,
            tile_mode,
            grid,
            tiles: DashMap::new(),
        })
    }

    /// Returns the tile containing `coord`, or `None` if there is no
    /// such tile on disk.
    pub fn tile(&self, coord: Coord<f64>) -> Result<Option<Arc<Tile>>, WorkflowError> {
        let sw_corner = nasadem::sw_corner(coord);
        self.tiles
            .entry(sw_corner)
            .or_try_insert_with(|| match self.load_tile(sw_corner) {
                Ok(tile) => Ok(Some(Arc::new(tile))),
                Err(NasademError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                    warn!("missing tile {}", nasadem::tile_name(sw_corner));
                    Ok(None)
                }
                Err(e) => Err(WorkflowError::from(e)),
            })
            .map(|r| r.clone())
    }

    /// Elevation in meters at `coord`, `None` over voids and missing
    /// tiles.
    pub fn elevation(&self, coord: Coord<f64>) -> Result<Option<f64>, WorkflowError> {
        Ok(self.tile(coord)?.and_then(|tile| tile.elevation(coord)))
    }

    fn load_tile(&self, sw_corner: Coord<i32>) -> Result<Tile, NasademError> {
        let tile_path: PathBuf = [&self.tile_dir, Path::new(&nasadem::tile_name(sw_corner))]
            .iter()
            .collect();
        match self.tile_mode {
            TileMode::InMem => Tile::load(tile_path),
            TileMode::MemMap => Tile::memmap(tile_path),
        }
    }
}

impl LayerSource for NasademSource {
    fn collection(&self, id: &str) -> Result<ImageCollection, WorkflowError> {
        if id != self.id {
            return Err(WorkflowError::UnknownCollection(id.to_string()));
        }
        let now = Instant::now();
        let values = (0..self.grid.len())
            .into_par_iter()
            .map(|index| {
                self.elevation(self.grid.center_of(index))
                    .map(|elevation| elevation.unwrap_or(f64::NAN))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let duration = now.elapsed();
        debug!(
            "{id}: sampled {} pixels from {} tiles, {duration:?}",
            values.len(),
            self.tiles.len()
        );
        let band = Band::new(ELEVATION_BAND, self.grid, values)?;
        Ok(ImageCollection::new(id, vec![Image::new(id, None, vec![band])?]))
    }
}

#[cfg(test)]
mod tests {
    use super::{NasademSource, TileMode, ELEVATION_BAND};
    use crate::{source::LayerSource, WorkflowError};
    use byteorder::{BigEndian as BE, WriteBytesExt};
    use geo::geometry::Coord;
    use raster::Grid;
    use std::{fs::File, io::BufWriter, path::Path};

    /// Writes a 3-arcsecond tile where every sample is 100 m.
    fn write_tile(dir: &Path, name: &str) {
        let mut out = BufWriter::new(File::create(dir.join(name)).unwrap());
        for _ in 0..1201 * 1201 {
            out.write_i16::<BE>(100).unwrap();
        }
    }

    fn grid() -> Grid {
        // Straddles N27E120 and N27E121.
        Grid::new(120.5, 28.0, 0.25, 0.25, 4, 2).unwrap()
    }

    #[test]
    fn test_missing_tile_is_undefined() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "N27E120.hgt");
        for mode in [TileMode::InMem, TileMode::MemMap] {
            let source =
                NasademSource::new("NASA/NASADEM_HGT/001", dir.path().to_owned(), mode, grid())
                    .unwrap();
            assert_eq!(
                source.elevation(Coord { x: 120.6, y: 27.5 }).unwrap(),
                Some(100.0)
            );
            assert_eq!(source.elevation(Coord { x: 121.6, y: 27.5 }).unwrap(), None);

            let collection = source.collection("NASA/NASADEM_HGT/001").unwrap();
            let band = collection.first().unwrap().band(ELEVATION_BAND).unwrap();
            assert_eq!(band.defined_count(), 4);
            assert!(matches!(
                source.collection("other"),
                Err(WorkflowError::UnknownCollection(_))
            ));
        }
    }

    #[test]
    fn test_requires_tiles() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NasademSource::new("dem", dir.path().to_owned(), TileMode::InMem, grid()),
            Err(WorkflowError::NoTiles(_))
        ));
    }
}
