//! NASADEM elevation (`.hgt`) tiles.
//!
//! A tile covers one square degree. Samples are stored as big-endian
//! `i16` meters, row-major starting at the north-west corner. The
//! south-west sample is centered on the integer coordinate encoded in
//! the file name (e.g. `N27E120.hgt`).
//!
//! # References
//!
//! 1. [HGT file layout](http://fileformats.archiveteam.org/index.php?title=HGT&oldid=17250)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)

mod error;

pub use crate::error::NasademError;
use byteorder::{BigEndian as BE, ByteOrder, ReadBytesExt};
use geo::geometry::Coord;
use memmap2::Mmap;
use std::{fs::File, io::BufReader, mem::size_of, path::Path, sync::OnceLock};

/// Base floating point type used for all coordinates and calculations.
pub type C = f64;

/// Marker NASADEM uses for samples without a measurement.
pub const VOID: i16 = i16::MIN;

const ARCSEC_PER_DEG: C = 3600.0;

pub struct Tile {
    /// Center of the south-west most sample.
    sw_corner: Coord<i32>,

    /// Arcseconds per sample.
    resolution: u8,

    /// Number of (columns, rows) in this tile.
    dimensions: (usize, usize),

    /// Lowest and highest non-void sample, computed on first use.
    extremes: OnceLock<Option<(i16, i16)>>,

    samples: SampleStore,
}

enum SampleStore {
    InMem(Box<[i16]>),
    MemMap(Mmap),
}

impl SampleStore {
    fn get(&self, index: usize) -> i16 {
        match self {
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw) => {
                let start = index * size_of::<i16>();
                BE::read_i16(&raw[start..start + size_of::<i16>()])
            }
        }
    }

    fn iter(&self) -> Box<dyn Iterator<Item = i16> + '_> {
        match self {
            Self::InMem(samples) => Box::new(samples.iter().copied()),
            Self::MemMap(raw) => Box::new(raw.chunks_exact(2).map(BE::read_i16)),
        }
    }
}

impl Tile {
    /// Returns a Tile read into memory from the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NasademError> {
        let (resolution, dimensions @ (cols, rows)) = extract_resolution(&path)?;
        let sw_corner = parse_sw_corner(&path)?;
        let mut file = BufReader::new(File::open(path)?);
        let mut samples = vec![0_i16; cols * rows];
        file.read_i16_into::<BE>(&mut samples)?;
        Ok(Self {
            sw_corner,
            resolution,
            dimensions,
            extremes: OnceLock::new(),
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    /// Returns a Tile using the memory-mapped file as storage.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, NasademError> {
        let (resolution, dimensions) = extract_resolution(&path)?;
        let sw_corner = parse_sw_corner(&path)?;
        let file = File::open(path)?;
        // The file length was validated above and tiles are treated as
        // read-only for the lifetime of the map.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            sw_corner,
            resolution,
            dimensions,
            extremes: OnceLock::new(),
            samples: SampleStore::MemMap(mmap),
        })
    }

    /// Returns the integer coordinate of the south-west sample.
    pub fn sw_corner(&self) -> Coord<i32> {
        self.sw_corner
    }

    /// Returns this tile's resolution in arcseconds per sample.
    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    /// Returns (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }

    /// Returns the number of samples in this tile.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.dimensions.0 * self.dimensions.1
    }

    /// Returns the raw sample nearest to `coord`, or `None` if
    /// `coord` is outside this tile.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn get(&self, coord: Coord<C>) -> Option<i16> {
        let (x, y) = self.coord_to_xy(coord);
        if 0 <= x && x < self.dimensions.0 as isize && 0 <= y && y < self.dimensions.1 as isize {
            Some(self.get_xy((x as usize, y as usize)))
        } else {
            None
        }
    }

    /// Returns the elevation in meters nearest to `coord`.
    ///
    /// Void samples are reported as `None`, same as coordinates
    /// outside the tile.
    pub fn elevation(&self, coord: Coord<C>) -> Option<C> {
        self.get(coord)
            .filter(|sample| *sample != VOID)
            .map(C::from)
    }

    /// Returns the lowest non-void sample in this tile.
    pub fn min_elevation(&self) -> Option<i16> {
        self.extremes().map(|(min, _)| min)
    }

    /// Returns the highest non-void sample in this tile.
    pub fn max_elevation(&self) -> Option<i16> {
        self.extremes().map(|(_, max)| max)
    }
}

/// Private API
impl Tile {
    fn extremes(&self) -> Option<(i16, i16)> {
        *self.extremes.get_or_init(|| {
            self.samples
                .iter()
                .filter(|sample| *sample != VOID)
                .fold(None, |acc, sample| match acc {
                    None => Some((sample, sample)),
                    Some((min, max)) => Some((min.min(sample), max.max(sample))),
                })
        })
    }

    /// Index by (x, y) where (0, 0) is the south-west sample.
    fn get_xy(&self, xy: (usize, usize)) -> i16 {
        self.samples.get(self.xy_to_linear_index(xy))
    }

    fn coord_to_xy(&self, coord: Coord<C>) -> (isize, isize) {
        let samples_per_deg = ARCSEC_PER_DEG / C::from(self.resolution);
        #[allow(clippy::cast_possible_truncation)]
        let x = ((coord.x - C::from(self.sw_corner.x)) * samples_per_deg).round() as isize;
        #[allow(clippy::cast_possible_truncation)]
        let y = ((coord.y - C::from(self.sw_corner.y)) * samples_per_deg).round() as isize;
        (x, y)
    }

    fn xy_to_linear_index(&self, (x, y): (usize, usize)) -> usize {
        self.dimensions.0 * (self.dimensions.1 - y - 1) + x
    }
}

/// Returns the south-west corner as integers for coord.
#[allow(clippy::cast_possible_truncation)]
pub fn sw_corner(Coord { x, y }: Coord<C>) -> Coord<i32> {
    Coord {
        x: x.floor() as i32,
        y: y.floor() as i32,
    }
}

/// Returns the expected file name for a tile's south-west corner.
pub fn tile_name(Coord { x, y }: Coord<i32>) -> String {
    let n_s = if y.is_negative() { 'S' } else { 'N' };
    let e_w = if x.is_negative() { 'W' } else { 'E' };
    format!("{n_s}{:02}{e_w}{:03}.hgt", y.abs(), x.abs())
}

fn extract_resolution<P: AsRef<Path>>(path: P) -> Result<(u8, (usize, usize)), NasademError> {
    const RES_1_ARCSECOND_LEN: u64 = 3601 * 3601 * size_of::<i16>() as u64;
    const RES_3_ARCSECOND_LEN: u64 = 1201 * 1201 * size_of::<i16>() as u64;
    match path.as_ref().metadata().map(|m| m.len())? {
        RES_1_ARCSECOND_LEN => Ok((1, (3601, 3601))),
        RES_3_ARCSECOND_LEN => Ok((3, (1201, 1201))),
        invalid_len => Err(NasademError::HgtLen(invalid_len, path.as_ref().to_owned())),
    }
}

fn parse_sw_corner<P: AsRef<Path>>(path: P) -> Result<Coord<i32>, NasademError> {
    let mk_err = || NasademError::HgtName(path.as_ref().to_owned());
    let name = path
        .as_ref()
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .ok_or_else(mk_err)?;
    if name.len() != 7 || !name.is_ascii() {
        return Err(mk_err());
    }
    let lat_sign = match &name[0..1] {
        "N" | "n" => 1,
        "S" | "s" => -1,
        _ => return Err(mk_err()),
    };
    let lat = lat_sign * name[1..3].parse::<i32>().map_err(|_| mk_err())?;
    let lon_sign = match &name[3..4] {
        "E" | "e" => 1,
        "W" | "w" => -1,
        _ => return Err(mk_err()),
    };
    let lon = lon_sign * name[4..7].parse::<i32>().map_err(|_| mk_err())?;
    Ok(Coord { x: lon, y: lat })
}
