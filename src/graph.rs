//! Chart dispatch and rendering.
//!
//! A [`ChartRequest`] names a chart kind and the columns it needs. Every kind
//! goes through the same three steps:
//!
//! 1. **validate**: check the kind's preconditions against the table
//! 2. **compute**: derive a [`Chart`] payload (aggregations, bins, counts,
//!    correlations) from the table
//! 3. **render**: draw the payload as an SVG document with `plotters`
//!
//! The preconditions and the computation of each kind live in that kind's
//! submodule.

mod bar;
mod heatmap;
mod histogram;
mod pie;
mod xy;

use crate::error::ChartError;
use crate::table::{Column, Table};
use chrono::DateTime;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

pub use heatmap::CorrelationMatrix;
pub use histogram::HISTOGRAM_BINS;
pub use pie::{PIE_TOP_CATEGORIES, PieSlice};

/// Available chart types supported by the application
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// X against Y joined by a line, in row order
    Line,

    /// X against Y as individual points
    Scatter,

    /// Mean of a numeric Y for each distinct X
    Bar,

    /// Distribution of a numeric Y over fixed-width bins
    Histogram,

    /// Share of the most frequent X values
    Pie,

    /// Pairwise correlation of all numeric columns
    Heatmap,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Bar => "bar",
            ChartKind::Histogram => "histogram",
            ChartKind::Pie => "pie",
            ChartKind::Heatmap => "heatmap",
        };
        f.write_str(name)
    }
}

/// A single chart request, tagged by kind.
///
/// Deserializes from `{"kind": "bar", "x": "city", "y": "sales"}`; fields a
/// kind does not use are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartRequest {
    Line { x: String, y: String },
    Scatter { x: String, y: String },
    Bar { x: String, y: String },
    Histogram { y: String },
    Pie { x: String },
    Heatmap,
}

impl ChartRequest {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartRequest::Line { .. } => ChartKind::Line,
            ChartRequest::Scatter { .. } => ChartKind::Scatter,
            ChartRequest::Bar { .. } => ChartKind::Bar,
            ChartRequest::Histogram { .. } => ChartKind::Histogram,
            ChartRequest::Pie { .. } => ChartKind::Pie,
            ChartRequest::Heatmap => ChartKind::Heatmap,
        }
    }

    /// Checks the kind's preconditions without computing anything.
    pub fn validate(&self, table: &Table) -> Result<(), ChartError> {
        match self {
            ChartRequest::Line { x, y } | ChartRequest::Scatter { x, y } => {
                xy::validate(table, x, y)
            }
            ChartRequest::Bar { x, y } => bar::validate(table, x, y),
            ChartRequest::Histogram { y } => histogram::validate(table, y),
            ChartRequest::Pie { x } => pie::validate(table, x),
            ChartRequest::Heatmap => heatmap::validate(table),
        }
    }

    /// Validates the request and derives the chart payload from the table.
    pub fn compute(&self, table: &Table) -> Result<Chart, ChartError> {
        self.validate(table)?;
        match self {
            ChartRequest::Line { x, y } => xy::compute(table, x, y, ChartKind::Line),
            ChartRequest::Scatter { x, y } => xy::compute(table, x, y, ChartKind::Scatter),
            ChartRequest::Bar { x, y } => bar::compute(table, x, y),
            ChartRequest::Histogram { y } => histogram::compute(table, y),
            ChartRequest::Pie { x } => pie::compute(table, x),
            ChartRequest::Heatmap => heatmap::compute(table),
        }
    }

    /// Validates, computes and renders the chart as an SVG document.
    ///
    /// # Arguments
    /// * `table` - Table to draw from, usually the current projection
    /// * `options` - Canvas size in pixels
    ///
    /// # Returns
    /// * `Result<String, ChartError>` - SVG markup, or the reason nothing was drawn
    ///
    /// # Examples
    /// ```
    /// use analyzer::graph::{ChartOptions, ChartRequest};
    /// use analyzer::loader::load_table;
    ///
    /// let table = load_table("t.csv", b"a,b\n1,2\n3,5\n").unwrap();
    /// let request: ChartRequest =
    ///     serde_json::from_str(r#"{"kind":"scatter","x":"a","y":"b"}"#).unwrap();
    /// let svg = request.render(&table, &ChartOptions::default()).unwrap();
    /// assert!(svg.contains("</svg>"));
    /// ```
    pub fn render(&self, table: &Table, options: &ChartOptions) -> Result<String, ChartError> {
        self.compute(table)?.to_svg(options)
    }
}

/// Configuration options for graph rendering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartOptions {
    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// How values along one axis of a line or scatter chart are placed.
#[derive(Clone, Debug, PartialEq)]
pub enum AxisScale {
    /// Plain numbers
    Numeric,

    /// Seconds since the Unix epoch
    Temporal,

    /// Text values at integer positions, in order of first appearance
    Categorical(Vec<String>),
}

impl AxisScale {
    fn format(&self, v: f64) -> String {
        match self {
            AxisScale::Numeric => format_number(v),
            AxisScale::Temporal => DateTime::from_timestamp(v as i64, 0)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            AxisScale::Categorical(labels) => {
                let r = v.round();
                if (v - r).abs() > 1e-6 || r < 0.0 {
                    return String::new();
                }
                labels
                    .get(r as usize)
                    .map(|s| short_label(s))
                    .unwrap_or_default()
            }
        }
    }

    fn range(&self, values: impl Iterator<Item = f64>) -> Range<f64> {
        match self {
            AxisScale::Categorical(labels) => -0.5..(labels.len().max(1) as f64 - 0.5),
            _ => padded_range(values),
        }
    }
}

/// Points of a line or scatter chart.
#[derive(Clone, Debug, PartialEq)]
pub struct XySeries {
    pub points: Vec<(f64, f64)>,
    pub x_scale: AxisScale,
    pub y_scale: AxisScale,
}

/// The computed contents of a chart, one variant per drawing style.
#[derive(Clone, Debug, PartialEq)]
pub enum ChartData {
    Line(XySeries),
    Scatter(XySeries),
    Bars { labels: Vec<String>, values: Vec<f64> },
    Histogram { edges: Vec<f64>, counts: Vec<usize> },
    Pie(Vec<PieSlice>),
    Heatmap(CorrelationMatrix),
}

/// A chart ready to be rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

impl Chart {
    /// Draws the chart and returns the SVG document.
    pub fn to_svg(&self, options: &ChartOptions) -> Result<String, ChartError> {
        let mut svg = String::new();
        {
            let root =
                SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
            root.fill(&WHITE)?;

            match &self.data {
                ChartData::Line(series) => self.draw_xy(&root, series, true)?,
                ChartData::Scatter(series) => self.draw_xy(&root, series, false)?,
                ChartData::Bars { labels, values } => self.draw_bars(&root, labels, values)?,
                ChartData::Histogram { edges, counts } => {
                    self.draw_histogram(&root, edges, counts)?
                }
                ChartData::Pie(slices) => self.draw_pie(&root, slices)?,
                ChartData::Heatmap(matrix) => self.draw_heatmap(&root, matrix)?,
            }

            root.present()?;
        }
        Ok(svg)
    }

    fn draw_xy<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        series: &XySeries,
        connect: bool,
    ) -> Result<(), ChartError> {
        let x_range = plot_range(series.x_scale.range(series.points.iter().map(|p| p.0)))?;
        let y_range = plot_range(series.y_scale.range(series.points.iter().map(|p| p.1)))?;

        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_desc(&self.x_label)
            .y_desc(&self.y_label)
            .x_label_formatter(&|v| series.x_scale.format(*v))
            .y_label_formatter(&|v| series.y_scale.format(*v))
            .draw()?;

        if connect {
            chart
                .draw_series(LineSeries::new(series.points.iter().copied(), &BLUE))?;
        } else {
            chart
                .draw_series(
                    series
                        .points
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), 5, GREEN.filled())),
                )?;
        }
        Ok(())
    }

    fn draw_bars<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        labels: &[String],
        values: &[f64],
    ) -> Result<(), ChartError> {
        let lo = values.iter().copied().fold(0.0_f64, f64::min);
        let mut hi = values.iter().copied().fold(0.0_f64, f64::max);
        if hi <= lo {
            hi = lo + 1.0;
        }
        let pad = hi * 0.1 - lo * 0.1;
        let y_range = plot_range(if lo < 0.0 { lo - pad..hi + pad } else { 0.0..hi + pad })?;
        let floor = y_range.start;

        let n = labels.len().max(1);
        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..n as f64, y_range)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .x_desc(&self.x_label)
            .y_desc(&self.y_label)
            .y_label_formatter(&|v| format_number(*v))
            .draw()?;

        chart
            .draw_series(values.iter().enumerate().map(|(i, &v)| {
                let mut bar = Rectangle::new([(i as f64, 0.0), (i as f64 + 1.0, v)], BLUE.filled());
                bar.set_margin(0, 0, 6, 6);
                bar
            }))?;

        let style = TextStyle::from(("sans-serif", 13).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
        for (i, label) in labels.iter().enumerate() {
            let (x, y) = chart.backend_coord(&(i as f64 + 0.5, floor));
            root.draw(&Text::new(short_label(label), (x, y + 6), style.clone()))?;
        }
        Ok(())
    }

    fn draw_histogram<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        edges: &[f64],
        counts: &[usize],
    ) -> Result<(), ChartError> {
        let lo = edges.first().copied().unwrap_or(0.0);
        let hi = edges.last().copied().unwrap_or(1.0);
        let top = counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.1;

        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(plot_range(lo..hi)?, 0.0..top)?;

        chart
            .configure_mesh()
            .x_desc(&self.x_label)
            .y_desc(&self.y_label)
            .x_label_formatter(&|v| format_number(*v))
            .y_label_formatter(&|v| format_number(*v))
            .draw()?;

        chart
            .draw_series(counts.iter().enumerate().map(|(i, &c)| {
                Rectangle::new([(edges[i], 0.0), (edges[i + 1], c as f64)], BLUE.mix(0.7).filled())
            }))?;
        Ok(())
    }

    fn draw_pie<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        slices: &[PieSlice],
    ) -> Result<(), ChartError> {
        let area = root
            .titled(&self.title, ("sans-serif", 30))?;
        let (w, h) = area.dim_in_pixel();
        let center = (w as f64 / 2.0, h as f64 / 2.0);
        let radius = w.min(h) as f64 * 0.35;

        let label_style =
            TextStyle::from(("sans-serif", 14).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
        let point = |angle: f64, r: f64| {
            (
                (center.0 + r * angle.cos()).round() as i32,
                (center.1 - r * angle.sin()).round() as i32,
            )
        };

        // slices run counter-clockwise from three o'clock
        let mut start = 0.0_f64;
        for (i, slice) in slices.iter().enumerate() {
            let sweep = slice.percent / 100.0 * std::f64::consts::TAU;
            let steps = ((sweep.to_degrees()).ceil() as usize).max(1);
            let mut outline = vec![point(0.0, 0.0)];
            outline.extend((0..=steps).map(|s| point(start + sweep * s as f64 / steps as f64, radius)));
            area.draw(&Polygon::new(outline, Palette99::pick(i).filled()))?;

            let middle = start + sweep / 2.0;
            area.draw(&Text::new(
                short_label(&slice.label),
                point(middle, radius * 1.15),
                label_style.clone(),
            ))?;
            area.draw(&Text::new(
                format!("{:.1}%", slice.percent),
                point(middle, radius * 0.6),
                label_style.clone(),
            ))?;

            start += sweep;
        }
        Ok(())
    }

    fn draw_heatmap<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        matrix: &CorrelationMatrix,
    ) -> Result<(), ChartError> {
        let (width, _) = root.dim_in_pixel();
        let (plot_area, bar_area) = root.split_horizontally((width as i32 - 90).max(0));
        let n = matrix.columns.len() as f64;

        let mut chart = ChartBuilder::on(&plot_area)
            .caption(&self.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(110)
            .build_cartesian_2d(0.0..n, n..0.0)?;

        chart
            .draw_series(matrix.cells().map(|(row, col, value)| {
                Rectangle::new(
                    [(col as f64, row as f64), (col as f64 + 1.0, row as f64 + 1.0)],
                    heat_color(value).filled(),
                )
            }))?;

        let x_style = TextStyle::from(("sans-serif", 13).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
        let y_style = TextStyle::from(("sans-serif", 13).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
        for (i, name) in matrix.columns.iter().enumerate() {
            let (x, y) = chart.backend_coord(&(i as f64 + 0.5, n));
            root.draw(&Text::new(short_label(name), (x, y + 6), x_style.clone()))?;
            let (x, y) = chart.backend_coord(&(0.0, i as f64 + 0.5));
            root.draw(&Text::new(short_label(name), (x - 6, y), y_style.clone()))?;
        }

        draw_color_bar(&bar_area)
    }
}

fn draw_color_bar<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
) -> Result<(), ChartError> {
    let (_, h) = area.dim_in_pixel();
    let top = 60;
    let bottom = h as i32 - 70;
    let steps = 50;
    let step_height = (bottom - top) as f64 / steps as f64;

    for s in 0..steps {
        let value = 1.0 - 2.0 * (s as f64 + 0.5) / steps as f64;
        let y0 = top + (s as f64 * step_height).round() as i32;
        let y1 = top + ((s + 1) as f64 * step_height).round() as i32;
        area.draw(&Rectangle::new([(10, y0), (30, y1)], heat_color(Some(value)).filled()))?;
    }

    let style = TextStyle::from(("sans-serif", 12).into_font()).pos(Pos::new(HPos::Left, VPos::Center));
    for (label, y) in [("1.0", top), ("0.0", (top + bottom) / 2), ("-1.0", bottom)] {
        area.draw(&Text::new(label, (36, y), style.clone()))?;
    }
    Ok(())
}

/// Diverging blue-white-red scale over [-1, 1]; undefined values are grey.
fn heat_color(value: Option<f64>) -> RGBColor {
    let Some(v) = value else {
        return RGBColor(200, 200, 200);
    };
    let v = v.clamp(-1.0, 1.0);
    let (end, t) = if v < 0.0 { ((59, 76, 192), -v) } else { ((180, 4, 38), v) };
    let mix = |c: u8| (255.0 + (c as f64 - 255.0) * t).round() as u8;
    RGBColor(mix(end.0), mix(end.1), mix(end.2))
}

/// Plotters cannot subdivide an axis whose ends or width are not finite, so
/// such ranges are refused before any drawing starts.
fn plot_range(range: Range<f64>) -> Result<Range<f64>, ChartError> {
    if range.start.is_finite() && range.end.is_finite() && (range.end - range.start).is_finite() {
        return Ok(range);
    }
    Err(ChartError::Render(format!(
        "values span {:e} to {:e}, too wide to plot",
        range.start, range.end
    )))
}

fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        return 0.0..1.0;
    }
    if lo == hi {
        let half = 1.0_f64.max(lo.abs() * f64::EPSILON);
        return lo - half..hi + half;
    }
    let pad = hi * 0.05 - lo * 0.05;
    lo - pad..hi + pad
}

fn format_number(v: f64) -> String {
    if v.abs() >= 1e6 {
        return format!("{:.2e}", v);
    }
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn short_label(label: &str) -> String {
    if label.chars().count() <= 14 {
        return label.to_string();
    }
    let mut out: String = label.chars().take(13).collect();
    out.push('…');
    out
}

/// Looks up a column that must be numeric for the given chart kind.
pub(crate) fn numeric_column<'a>(
    table: &'a Table,
    name: &str,
    kind: ChartKind,
) -> Result<&'a Column, ChartError> {
    let column = table.column(name)?;
    if !column.column_type.is_numeric() {
        return Err(ChartError::NotNumeric {
            column: name.to_string(),
            kind,
        });
    }
    Ok(column)
}
