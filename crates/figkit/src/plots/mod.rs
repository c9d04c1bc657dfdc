//! Scatter and stacked-histogram figures, exported as PNG, SVG and PDF.
//!
//! Model
//! - A `Figure` is plain data (labels + numbers); `Figure::draw` renders it
//!   onto any `plotters` drawing area, so every export format shares one
//!   drawing routine.
//! - `export` draws the figure once per requested format next to `stem`.
//!
//! Invariants
//! - Drawing is a pure function of the figure and `PlotCfg`: the same inputs
//!   give byte-identical PDF and SVG files.

mod figures;
mod hist;
mod pdf;

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Serialize;

pub use figures::{citations_over_time, citations_scatter, studies_over_time, studies_scatter};
pub use hist::{bin_edges, edges_for, histogram};
pub use pdf::PdfBackend;

#[derive(Debug)]
pub enum PlotError {
    Draw(String),
    Io(std::io::Error),
}

impl fmt::Display for PlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw(msg) => write!(f, "plot drawing failed: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for PlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlotError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        Self::Draw(e.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotFormat {
    Png,
    Svg,
    Pdf,
}

impl PlotFormat {
    pub const ALL: [PlotFormat; 3] = [PlotFormat::Png, PlotFormat::Pdf, PlotFormat::Svg];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }
}

/// Page size and typography. Defaults give an 8x8 inch figure at 100 dpi.
#[derive(Clone, Debug, Serialize)]
pub struct PlotCfg {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub label_area: u32,
    pub axis_font: f64,
    pub tick_font: f64,
    /// Histogram bin count.
    pub bins: usize,
}

impl Default for PlotCfg {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            margin: 20,
            label_area: 70,
            axis_font: 20.0,
            tick_font: 15.0,
            bins: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScatterPlot {
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
}

/// One stacked layer; an empty label keeps it out of the legend.
#[derive(Clone, Debug, PartialEq)]
pub struct HistLayer {
    pub label: String,
    pub values: Vec<f64>,
    pub weights: Option<Vec<f64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StackedHistogram {
    pub x_label: String,
    pub y_label: String,
    pub layers: Vec<HistLayer>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Figure {
    Scatter(ScatterPlot),
    Histogram(StackedHistogram),
}

const FONT: &str = "sans-serif";

/// Matplotlib's default qualitative cycle.
const TAB10: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

impl Figure {
    pub fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        cfg: &PlotCfg,
    ) -> Result<(), PlotError> {
        root.fill(&WHITE)?;
        match self {
            Self::Scatter(s) => draw_scatter(s, root, cfg),
            Self::Histogram(h) => draw_histogram(h, root, cfg),
        }
    }
}

fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    if hi - lo < 1e-12 {
        return (lo - 0.5)..(hi + 0.5);
    }
    let pad = 0.05 * (hi - lo);
    (lo - pad)..(hi + pad)
}

fn draw_scatter<DB: DrawingBackend>(
    plot: &ScatterPlot,
    root: &DrawingArea<DB, Shift>,
    cfg: &PlotCfg,
) -> Result<(), PlotError> {
    let xr = padded_range(plot.points.iter().map(|p| p.0));
    let yr = padded_range(plot.points.iter().map(|p| p.1));
    let mut chart = ChartBuilder::on(root)
        .margin(cfg.margin)
        .x_label_area_size(cfg.label_area)
        .y_label_area_size(cfg.label_area)
        .build_cartesian_2d(xr, yr)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(plot.x_label.as_str())
        .y_desc(plot.y_label.as_str())
        .axis_desc_style((FONT, cfg.axis_font))
        .label_style((FONT, cfg.tick_font))
        .draw()?;
    chart.draw_series(
        plot.points
            .iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|&(x, y)| Cross::new((x, y), 5, BLACK.stroke_width(1))),
    )?;
    Ok(())
}

fn draw_histogram<DB: DrawingBackend>(
    plot: &StackedHistogram,
    root: &DrawingArea<DB, Shift>,
    cfg: &PlotCfg,
) -> Result<(), PlotError> {
    // No finite value: draw empty axes over [0, 1].
    let edges = edges_for(plot.layers.iter().flat_map(|l| l.values.iter()), cfg.bins)
        .unwrap_or_else(|| bin_edges(0.0, 1.0, cfg.bins));
    let bins = edges.len() - 1;
    let counts: Vec<Vec<f64>> = plot
        .layers
        .iter()
        .map(|l| histogram(&l.values, l.weights.as_deref(), &edges))
        .collect();
    let top = (0..bins)
        .map(|b| counts.iter().map(|c| c[b]).sum::<f64>())
        .fold(0.0f64, f64::max)
        .max(1.0);

    let mut chart = ChartBuilder::on(root)
        .margin(cfg.margin)
        .x_label_area_size(cfg.label_area)
        .y_label_area_size(cfg.label_area)
        .build_cartesian_2d(edges[0]..edges[bins], 0.0..top * 1.05)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(plot.x_label.as_str())
        .y_desc(plot.y_label.as_str())
        .axis_desc_style((FONT, cfg.axis_font))
        .label_style((FONT, cfg.tick_font))
        .draw()?;

    let mut base = vec![0.0; bins];
    let mut legend = false;
    for (i, (layer, c)) in plot.layers.iter().zip(&counts).enumerate() {
        let color = TAB10[i % TAB10.len()];
        let bars: Vec<_> = (0..bins)
            .filter(|&b| c[b] > 0.0)
            .map(|b| {
                Rectangle::new(
                    [(edges[b], base[b]), (edges[b + 1], base[b] + c[b])],
                    color.filled(),
                )
            })
            .collect();
        for (acc, v) in base.iter_mut().zip(c) {
            *acc += v;
        }
        let anno = chart.draw_series(bars)?;
        if !layer.label.is_empty() {
            legend = true;
            anno.label(layer.label.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.filled()));
        }
    }
    if legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font((FONT, cfg.tick_font))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

/// `stem` with `.ext` appended; dots already in the file name are kept.
fn output_path(stem: &Path, format: PlotFormat) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

/// Write `stem.<ext>` for each format and return the written paths.
pub fn export(
    figure: &Figure,
    stem: &Path,
    cfg: &PlotCfg,
    formats: &[PlotFormat],
) -> Result<Vec<PathBuf>, PlotError> {
    if let Some(parent) = stem.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let size = (cfg.width, cfg.height);
    let mut written = Vec::with_capacity(formats.len());
    for &format in formats {
        let path = output_path(stem, format);
        match format {
            PlotFormat::Png => {
                let root = BitMapBackend::new(&path, size).into_drawing_area();
                figure.draw(&root, cfg)?;
                root.present()?;
            }
            PlotFormat::Svg => {
                let root = SVGBackend::new(&path, size).into_drawing_area();
                figure.draw(&root, cfg)?;
                root.present()?;
            }
            PlotFormat::Pdf => {
                let root = PdfBackend::new(&path, size).into_drawing_area();
                figure.draw(&root, cfg)?;
                root.present()?;
            }
        }
        tracing::info!(path = %path.display(), "wrote figure");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests;
