//! PNG rendering of map layers.

use anyhow::Error as AnyError;
use log::debug;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use workflow::{
    raster::{Band, Grid, Region},
    Report, TrueColor,
};

/// Longest side of a rendered image, in pixels.
const MAX_SIDE: usize = 2048;

const PURPLE: RGBColor = RGBColor(128, 0, 128);
const CSS_GREEN: RGBColor = RGBColor(0, 128, 0);

const RAINBOW: &[RGBColor] = &[PURPLE, BLUE, CYAN, CSS_GREEN, YELLOW, RED];
const POPULATION: &[RGBColor] = &[BLACK, RED, WHITE];
const TERRAIN: &[RGBColor] = &[CSS_GREEN, YELLOW, RED, WHITE];
const GREYS: &[RGBColor] = &[BLACK, WHITE];

/// How a single-band layer is colored.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStyle {
    pub name: String,
    /// Value mapped to the first palette color. May exceed `max`,
    /// which inverts the ramp.
    pub min: f64,
    pub max: f64,
    pub palette: &'static [RGBColor],
    /// Rendered without `--all-layers`.
    pub visible: bool,
}

impl LayerStyle {
    /// Returns the style for a layer by band name.
    pub fn for_band(band: &Band) -> Self {
        let (min, max, palette, visible) = match band.name() {
            "rain" => (4000.0, 0.0, RAINBOW, false),
            "LST" => (0.0, 50.0, RAINBOW, true),
            "pop" => (0.0, 100.0, POPULATION, false),
            "elevation" => (0.0, 3000.0, TERRAIN, false),
            "LST_Prediction" => (0.0, 50.0, RAINBOW, true),
            _ => {
                let (min, max) = band.min_max().unwrap_or((0.0, 1.0));
                (min, max, GREYS, false)
            }
        };
        Self {
            name: band.name().to_string(),
            min,
            max,
            palette,
            visible,
        }
    }

    /// Interpolates the palette at `value`, clamped to the style's
    /// range. `None` for undefined values.
    pub fn color(&self, value: f64) -> Option<RGBColor> {
        if !value.is_finite() {
            return None;
        }
        let t = if self.max == self.min {
            0.0
        } else {
            ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        };
        Some(ramp(self.palette, t))
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn ramp(palette: &[RGBColor], t: f64) -> RGBColor {
    match palette {
        [] => BLACK,
        [only] => *only,
        _ => {
            let segments = (palette.len() - 1) as f64;
            let position = t * segments;
            let lower = (position.floor() as usize).min(palette.len() - 2);
            let frac = position - lower as f64;
            let (a, b) = (palette[lower], palette[lower + 1]);
            let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * frac).round() as u8;
            RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
        }
    }
}

/// Maps image pixels onto a grid, striding over it when the grid
/// exceeds [`MAX_SIDE`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct Canvas {
    grid: Grid,
    stride: usize,
    width: usize,
    height: usize,
}

impl Canvas {
    fn new(grid: Grid) -> Self {
        let stride = grid.cols().max(grid.rows()).div_ceil(MAX_SIDE).max(1);
        Self {
            grid,
            stride,
            width: grid.cols().div_ceil(stride),
            height: grid.rows().div_ceil(stride),
        }
    }

    /// Grid index shown at image pixel `(x, y)`.
    fn index(&self, x: usize, y: usize) -> usize {
        self.grid.index((x * self.stride, y * self.stride))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn project(&self, (lon, lat): (f64, f64)) -> (i32, i32) {
        let north = self.grid.bounds().max().y;
        let west = self.grid.bounds().min().x;
        let scale = self.stride as f64;
        (
            ((lon - west) / self.grid.dx() / scale).round() as i32,
            ((north - lat) / self.grid.dy() / scale).round() as i32,
        )
    }

    #[allow(clippy::cast_possible_truncation)]
    fn size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| (x, y)))
    }
}

/// Renders the report's layers into `out_dir`, returning the written
/// files. Hidden layers are skipped unless `all_layers` is set.
pub fn render(report: &Report, out_dir: &Path, all_layers: bool) -> Result<Vec<PathBuf>, AnyError> {
    let mut written = Vec::new();

    for true_color in &report.true_color {
        let path = out_dir.join(file_name(&true_color.name));
        render_true_color(true_color, &report.region, &path)?;
        written.push(path);
    }

    for band in report.layers.iter().chain(std::iter::once(&report.prediction)) {
        let style = LayerStyle::for_band(band);
        if !(style.visible || all_layers) {
            debug!("skipping hidden layer {}", style.name);
            continue;
        }
        let path = out_dir.join(file_name(&style.name));
        render_band(band, &style, &report.region, &path)?;
        written.push(path);
    }

    Ok(written)
}

fn file_name(layer: &str) -> String {
    let stem: String = layer
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.png")
}

fn render_band(band: &Band, style: &LayerStyle, region: &Region, path: &Path) -> Result<(), AnyError> {
    let canvas = Canvas::new(*band.grid());
    let root = BitMapBackend::new(path, canvas.size()).into_drawing_area();
    root.fill(&WHITE)?;
    for (x, y) in canvas.pixels() {
        if let Some(color) = style.color(band.values()[canvas.index(x, y)]) {
            root.draw_pixel(to_point(x, y), &color)?;
        }
    }
    draw_outline(&root, &canvas, region)?;
    root.present()?;
    debug!("rendered {} to {}", style.name, path.display());
    Ok(())
}

fn render_true_color(layer: &TrueColor, region: &Region, path: &Path) -> Result<(), AnyError> {
    let canvas = Canvas::new(*layer.red.grid());
    let root = BitMapBackend::new(path, canvas.size()).into_drawing_area();
    root.fill(&WHITE)?;
    let channel = |band: &Band, index: usize| -> Option<u8> {
        let value = band.values()[index];
        if !value.is_finite() {
            return None;
        }
        let t = ((value - layer.min) / (layer.max - layer.min)).clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let byte = (t * 255.0).round() as u8;
        Some(byte)
    };
    for (x, y) in canvas.pixels() {
        let index = canvas.index(x, y);
        if let (Some(r), Some(g), Some(b)) = (
            channel(&layer.red, index),
            channel(&layer.green, index),
            channel(&layer.blue, index),
        ) {
            root.draw_pixel(to_point(x, y), &RGBColor(r, g, b))?;
        }
    }
    draw_outline(&root, &canvas, region)?;
    root.present()?;
    debug!("rendered {} to {}", layer.name, path.display());
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn to_point(x: usize, y: usize) -> (i32, i32) {
    (x as i32, y as i32)
}

fn draw_outline(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    canvas: &Canvas,
    region: &Region,
) -> Result<(), AnyError> {
    let outline: Vec<(i32, i32)> = region
        .ring()
        .into_iter()
        .map(|vertex| canvas.project(vertex))
        .collect();
    root.draw(&PathElement::new(outline, RED.stroke_width(2)))?;
    Ok(())
}
