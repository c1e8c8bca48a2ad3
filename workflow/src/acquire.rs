use crate::{source::LayerSource, ImageCollection, WorkflowError};
use chrono::NaiveDate;
use log::info;
use raster::{Band, Grid, Reducer, Region};
use serde::{Deserialize, Serialize};

pub const CHIRPS_DAILY: &str = "UCSB-CHG/CHIRPS/DAILY";
pub const MODIS_LST_8DAY: &str = "MODIS/061/MOD11A2";
pub const WORLDPOP: &str = "WorldPop/GP/100m/pop";
pub const NASADEM: &str = "NASA/NASADEM_HGT/001";
pub const SENTINEL2_SR: &str = "COPERNICUS/S2_SR";
pub const MODIS_SR_DAILY: &str = "MODIS/061/MOD09GA";

/// How a filtered collection collapses into one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composite {
    /// Per-pixel reduction across every image.
    Reduce(Reducer),
    /// The most recent image.
    Latest,
}

/// Half-open `[start, end)` date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Keeps images whose `property` is below `less_than`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub property: String,
    pub less_than: f64,
}

/// Where one layer comes from and how it is composited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Output band name.
    pub name: String,
    pub collection: String,
    /// Band read from each image.
    pub band: String,
    pub composite: Composite,
    #[serde(default)]
    pub dates: Option<DateRange>,
    #[serde(default)]
    pub property_below: Option<PropertyFilter>,
    #[serde(default = "one")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

fn one() -> f64 {
    1.0
}

impl LayerSpec {
    pub fn new<S: Into<String>>(name: S, collection: S, band: S, composite: Composite) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            band: band.into(),
            composite,
            dates: None,
            property_below: None,
            scale: 1.0,
            offset: 0.0,
        }
    }

    #[must_use]
    pub fn dates(self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            dates: Some(DateRange { start, end }),
            ..self
        }
    }

    #[must_use]
    pub fn scale_offset(self, scale: f64, offset: f64) -> Self {
        Self {
            scale,
            offset,
            ..self
        }
    }
}

/// A median RGB composite used only for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueColorSpec {
    pub name: String,
    pub collection: String,
    /// Red, green and blue band names.
    pub bands: [String; 3],
    #[serde(default)]
    pub dates: Option<DateRange>,
    #[serde(default)]
    pub property_below: Option<PropertyFilter>,
    /// Display stretch.
    pub min: f64,
    pub max: f64,
}

/// Every layer the workflow acquires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layers {
    pub rain: LayerSpec,
    pub lst: LayerSpec,
    pub pop: LayerSpec,
    pub elevation: LayerSpec,
    pub true_color: Vec<TrueColorSpec>,
}

impl Default for Layers {
    fn default() -> Self {
        // Dates are constants known to be valid.
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        let year_2022 = (ymd(2022, 1, 1), ymd(2023, 1, 1));
        Self {
            rain: LayerSpec::new("rain", CHIRPS_DAILY, "precipitation", Composite::Reduce(Reducer::Sum))
                .dates(year_2022.0, year_2022.1),
            lst: LayerSpec::new("LST", MODIS_LST_8DAY, "LST_Day_1km", Composite::Reduce(Reducer::Mean))
                .dates(year_2022.0, year_2022.1)
                .scale_offset(0.02, -273.15),
            pop: LayerSpec::new("pop", WORLDPOP, "population", Composite::Latest),
            elevation: LayerSpec::new("elevation", NASADEM, "elevation", Composite::Latest),
            true_color: vec![
                TrueColorSpec {
                    name: "Sentinel-2 True Color".to_string(),
                    collection: SENTINEL2_SR.to_string(),
                    bands: ["B4".to_string(), "B3".to_string(), "B2".to_string()],
                    dates: Some(DateRange {
                        start: ymd(2022, 6, 1),
                        end: ymd(2022, 8, 31),
                    }),
                    property_below: Some(PropertyFilter {
                        property: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
                        less_than: 10.0,
                    }),
                    min: 0.0,
                    max: 3000.0,
                },
                TrueColorSpec {
                    name: "MODIS RGB (MOD09GA)".to_string(),
                    collection: MODIS_SR_DAILY.to_string(),
                    bands: [
                        "sur_refl_b01".to_string(),
                        "sur_refl_b04".to_string(),
                        "sur_refl_b03".to_string(),
                    ],
                    dates: Some(DateRange {
                        start: ymd(2022, 6, 1),
                        end: ymd(2022, 6, 30),
                    }),
                    property_below: None,
                    min: 0.0,
                    max: 5000.0,
                },
            ],
        }
    }
}

/// A three-band display composite.
#[derive(Debug, Clone)]
pub struct TrueColor {
    pub name: String,
    pub red: Band,
    pub green: Band,
    pub blue: Band,
    pub min: f64,
    pub max: f64,
}

/// Acquires one layer over `region` on `grid`.
///
/// The collection is filtered by bounds, then by date and property
/// when given, composited, scaled and clipped to `region`.
pub fn acquire(
    source: &dyn LayerSource,
    spec: &LayerSpec,
    region: &Region,
    grid: &Grid,
) -> Result<Band, WorkflowError> {
    let collection = source.collection(&spec.collection)?.filter_bounds(region);
    let collection = filter(collection, spec.dates, spec.property_below.as_ref());
    if collection.is_empty() {
        return Err(WorkflowError::EmptyCollection {
            layer: spec.name.clone(),
            collection: spec.collection.clone(),
        });
    }
    let images = collection.len();

    let band = match spec.composite {
        Composite::Reduce(reducer) => collection.reduce(reducer, &spec.band, grid)?,
        Composite::Latest => collection
            .sort_by_time(false)
            .first()
            .ok_or_else(|| WorkflowError::EmptyCollection {
                layer: spec.name.clone(),
                collection: spec.collection.clone(),
            })?
            .band(&spec.band)?
            .resample(grid),
    };
    let band = band
        .scale_offset(spec.scale, spec.offset)
        .rename(spec.name.as_str())
        .clip(region);

    let defined = band.defined_count();
    if defined == 0 {
        return Err(WorkflowError::EmptyLayer {
            layer: spec.name.clone(),
        });
    }
    info!(
        "acquired {} from {images} images of {}, {defined} defined pixels",
        spec.name, spec.collection
    );
    Ok(band)
}

/// Acquires a median RGB composite over `region` on `grid`.
pub fn acquire_true_color(
    source: &dyn LayerSource,
    spec: &TrueColorSpec,
    region: &Region,
    grid: &Grid,
) -> Result<TrueColor, WorkflowError> {
    let collection = source.collection(&spec.collection)?.filter_bounds(region);
    let collection = filter(collection, spec.dates, spec.property_below.as_ref());
    if collection.is_empty() {
        return Err(WorkflowError::EmptyCollection {
            layer: spec.name.clone(),
            collection: spec.collection.clone(),
        });
    }
    let composite = |band: &str| -> Result<Band, WorkflowError> {
        Ok(collection
            .reduce(Reducer::Median, band, grid)?
            .rename(band)
            .clip(region))
    };
    let [red, green, blue] = &spec.bands;
    let true_color = TrueColor {
        name: spec.name.clone(),
        red: composite(red.as_str())?,
        green: composite(green.as_str())?,
        blue: composite(blue.as_str())?,
        min: spec.min,
        max: spec.max,
    };
    info!(
        "acquired {} from {} images of {}",
        spec.name,
        collection.len(),
        spec.collection
    );
    Ok(true_color)
}

fn filter(
    mut collection: ImageCollection,
    dates: Option<DateRange>,
    property_below: Option<&PropertyFilter>,
) -> ImageCollection {
    if let Some(DateRange { start, end }) = dates {
        collection = collection.filter_date(start, end);
    }
    if let Some(PropertyFilter {
        property,
        less_than,
    }) = property_below
    {
        collection = collection.filter_lt(property, *less_than);
    }
    collection
}

#[cfg(test)]
mod tests {
    use super::{acquire, acquire_true_color, Composite, LayerSpec, Layers};
    use crate::{source::LayerSource, Image, ImageCollection, WorkflowError};
    use chrono::NaiveDate;
    use raster::{Band, Grid, Reducer, Region};

    struct Fixture;

    fn date(month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, month, 1).unwrap()
    }

    fn native() -> Grid {
        Grid::new(0.0, 4.0, 1.0, 1.0, 4, 4).unwrap()
    }

    impl LayerSource for Fixture {
        fn collection(&self, id: &str) -> Result<ImageCollection, WorkflowError> {
            let image = |month: u32, value: f64| {
                let bands = ["v", "r", "g", "b"]
                    .iter()
                    .map(|name| Band::filled(*name, native(), value))
                    .collect();
                Image::new(format!("{id}/{month}"), Some(date(month)), bands).unwrap()
            };
            match id {
                "monthly" => Ok(ImageCollection::new(
                    id,
                    (1..=12).map(|m| image(m, f64::from(m))).collect(),
                )),
                "empty" => Ok(ImageCollection::new(id, vec![])),
                _ => Err(WorkflowError::UnknownCollection(id.to_string())),
            }
        }
    }

    fn triangle() -> Region {
        Region::new(&[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]).unwrap()
    }

    #[test]
    fn test_extent_within_region() {
        let region = triangle();
        let grid = Grid::for_region(&region, 20_000.0).unwrap();
        let spec = LayerSpec::new("rain", "monthly", "v", Composite::Reduce(Reducer::Sum));
        let band = acquire(&Fixture, &spec, &region, &grid).unwrap();
        assert_eq!(band.name(), "rain");
        assert!(band.defined_count() > 0);
        for index in 0..grid.len() {
            if band.is_defined(index) {
                assert!(region.contains(grid.center_of(index)));
                assert_eq!(band.get(index), Some(78.0));
            }
        }
    }

    #[test]
    fn test_dates_scale_and_latest() {
        let region = triangle();
        let grid = native();
        let spec = LayerSpec::new("LST", "monthly", "v", Composite::Reduce(Reducer::Mean))
            .dates(date(1), date(4))
            .scale_offset(0.5, -1.0);
        let band = acquire(&Fixture, &spec, &region, &grid).unwrap();
        // mean(1, 2, 3) * 0.5 - 1
        assert_eq!(band.get(grid.index((0, 3))), Some(0.0));

        let spec = LayerSpec::new("pop", "monthly", "v", Composite::Latest);
        let band = acquire(&Fixture, &spec, &region, &grid).unwrap();
        assert_eq!(band.get(grid.index((0, 3))), Some(12.0));
    }

    #[test]
    fn test_empty_is_reported() {
        let region = triangle();
        let grid = native();
        let spec = LayerSpec::new("rain", "monthly", "v", Composite::Reduce(Reducer::Sum))
            .dates(date(12), date(12));
        assert!(matches!(
            acquire(&Fixture, &spec, &region, &grid),
            Err(WorkflowError::EmptyCollection { layer, .. }) if layer == "rain"
        ));
        let spec = LayerSpec::new("pop", "empty", "v", Composite::Latest);
        assert!(matches!(
            acquire(&Fixture, &spec, &region, &grid),
            Err(WorkflowError::EmptyCollection { .. })
        ));

        let elsewhere = Region::new(&[(3.9, 3.9), (3.95, 3.9), (3.9, 3.95)]).unwrap();
        let spec = LayerSpec::new("pop", "monthly", "v", Composite::Latest);
        assert!(matches!(
            acquire(&Fixture, &spec, &elsewhere, &grid),
            Err(WorkflowError::EmptyLayer { layer }) if layer == "pop"
        ));
    }

    #[test]
    fn test_true_color() {
        let region = triangle();
        let mut spec = Layers::default().true_color.remove(1);
        spec.collection = "monthly".to_string();
        spec.bands = ["r".to_string(), "g".to_string(), "b".to_string()];
        let rgb = acquire_true_color(&Fixture, &spec, &region, &native()).unwrap();
        // June only.
        assert_eq!(rgb.red.get(native().index((0, 3))), Some(6.0));
        assert_eq!(rgb.blue.name(), "b");
    }
}
