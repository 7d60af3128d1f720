//! Module for visualizing backtest results.
//!
//! The chart has two panels sharing the date axis: the close with both moving averages
//! (and, optionally, the trade entries and exits) on top, the equity curve below.

use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::metrics::BacktestResult;

use chrono::{Duration, NaiveDate};
use plotters::backend::{BitMapBackend, DrawingBackend, SVGBackend};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::WHITE;

/// Aspect ratio for the generated charts.
const ASPECT_RATIO: f64 = 0.5625;
/// Size of the X-axis labels.
const X_LABEL_SIZE: i32 = 20;
/// Size of the Y-axis labels.
const Y_LABEL_SIZE: i32 = 20;
/// Share of the height given to the equity panel.
const EQUITY_SHARE: f64 = 0.35;

const FAST_COLOR: RGBColor = RGBColor(255, 140, 0);
const SLOW_COLOR: RGBColor = RGBColor(128, 0, 128);

/// Output formats for the generated charts with output filename.
#[derive(Debug, Default)]
pub enum DrawOutput {
    /// Save to the output SVG file.
    Svg(PathBuf),
    /// Save to the output PNG file.
    Png(PathBuf),
    /// Save to the output HTML file (not implemented).
    Html(PathBuf),
    /// Print to the current console (not implemented).
    #[default]
    Inner,
}

impl DrawOutput {
    /// Picks a renderable format from the file extension: `.png` renders a bitmap, anything
    /// else SVG.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => Self::Png(path),
            _ => Self::Svg(path),
        }
    }
}

/// Configuration options for chart generation.
#[derive(Debug, Default)]
pub struct DrawOptions {
    /// Chart title.
    title: Option<String>,
    /// Output format and path.
    output: DrawOutput,
    /// Whether to mark trade entries and exits.
    show_trades: bool,
}

impl DrawOptions {
    /// Sets the chart title.
    pub fn title(mut self, title: impl ToString) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Sets the output format and path.
    pub fn draw_output(mut self, output: DrawOutput) -> Self {
        self.output = output;
        self
    }

    /// Enables or disables the entry/exit markers.
    pub fn show_trades(mut self, show: bool) -> Self {
        self.show_trades = show;
        self
    }
}

/// Chart drawing utility for backtest results.
#[derive(Debug, Default)]
pub struct Draw<'d> {
    result: Option<&'d BacktestResult>,
    options: DrawOptions,
}

impl<'d> Draw<'d> {
    /// Creates a new `Draw` instance for the given result.
    pub fn with_result(result: &'d BacktestResult) -> Self {
        Self {
            result: Some(result),
            options: DrawOptions::default(),
        }
    }

    /// Sets the drawing options.
    pub fn with_options(mut self, options: DrawOptions) -> Self {
        self.options = options;
        self
    }

    /// Generates and saves the chart based on the configured options.
    pub fn plot(&self) -> Result<()> {
        let result = self.result.ok_or(Error::Plotters("No backtest result provided".to_string()))?;
        if result.equity_curve().is_empty() {
            return Err(Error::EmptySeries);
        }

        let default_title = format!("{} SMA crossover", result.symbol());
        let title = self.options.title.as_deref().unwrap_or(&default_title);

        let point_count = result.equity_curve().len() as u32;
        let width = 1280.max(6 * point_count);
        let height = ((width as f64 * ASPECT_RATIO * 1.3) as u32).min(900);

        match &self.options.output {
            DrawOutput::Svg(path) => self.plot_svg(path, result, (width, height), title),
            DrawOutput::Png(path) => self.plot_png(path, result, (width, height), title),
            DrawOutput::Html(_) => Err(Error::Plotters("HTML output is not implemented".to_string())),
            DrawOutput::Inner => Err(Error::Plotters("Inner display is not implemented".to_string())),
        }
    }

    /// Saves the chart as an SVG file.
    fn plot_svg(&self, path: &Path, result: &BacktestResult, size: (u32, u32), title: &str) -> Result<()> {
        let root = SVGBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| Error::Plotters(e.to_string()))?;
        self.draw_chart(&root, result, title)
    }

    /// Saves the chart as a PNG file.
    fn plot_png(&self, path: &Path, result: &BacktestResult, size: (u32, u32), title: &str) -> Result<()> {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| Error::Plotters(e.to_string()))?;
        self.draw_chart(&root, result, title)
    }

    fn draw_chart<DB: DrawingBackend>(
        &self,
        drawing_area: &DrawingArea<DB, Shift>,
        result: &BacktestResult,
        title: &str,
    ) -> Result<()> {
        let total_height = drawing_area.dim_in_pixel().1 as f64;
        let price_height = total_height * (1.0 - EQUITY_SHARE);
        let (price_area, equity_area) = drawing_area.split_vertically(price_height as u32);

        self.draw_price_chart(&price_area, result, title)?;
        self.draw_equity_chart(&equity_area, result)?;

        drawing_area.present().map_err(|e| Error::Plotters(e.to_string()))
    }

    /// Draws the close with both moving averages.
    fn draw_price_chart<DB: DrawingBackend>(
        &self,
        drawing_area: &DrawingArea<DB, Shift>,
        result: &BacktestResult,
        title: &str,
    ) -> Result<()> {
        let curve = result.equity_curve();
        let (first_date, last_date) = date_span(result);
        let (min_price, max_price) = bounds(curve.iter().map(|p| p.close()));
        let price_padding = (max_price - min_price).max(min_price.abs() * 0.01) * 0.1;

        let drawing_area = drawing_area.margin(10, 0, 70, 70);
        let mut chart = ChartBuilder::on(&drawing_area)
            .caption(title, ("sans-serif", 30).into_font())
            .y_label_area_size(Y_LABEL_SIZE * 3)
            .build_cartesian_2d(first_date..last_date, min_price - price_padding..max_price + price_padding)
            .map_err(|e| Error::Plotters(e.to_string()))?;

        chart
            .configure_mesh()
            .disable_x_axis()
            .y_desc("Price")
            .y_label_style(("sans-serif", Y_LABEL_SIZE))
            .y_labels(5)
            .draw()
            .map_err(|e| Error::Plotters(e.to_string()))?;

        chart
            .draw_series(LineSeries::new(curve.iter().map(|p| (p.date(), p.close())), BLACK))
            .map_err(|e| Error::Plotters(e.to_string()))?
            .label("Close")
            .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], BLACK));
        chart
            .draw_series(LineSeries::new(
                curve.iter().filter_map(|p| p.fast_ma().map(|ma| (p.date(), ma))),
                FAST_COLOR,
            ))
            .map_err(|e| Error::Plotters(e.to_string()))?
            .label("Fast MA")
            .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], FAST_COLOR));
        chart
            .draw_series(LineSeries::new(
                curve.iter().filter_map(|p| p.slow_ma().map(|ma| (p.date(), ma))),
                SLOW_COLOR,
            ))
            .map_err(|e| Error::Plotters(e.to_string()))?
            .label("Slow MA")
            .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], SLOW_COLOR));

        if self.options.show_trades {
            let entries = result
                .trades()
                .iter()
                .map(|t| TriangleMarker::new((t.entry_date(), t.entry_price()), 6, GREEN.filled()));
            let exits = result
                .trades()
                .iter()
                .map(|t| Circle::new((t.exit_date(), t.exit_price()), 4, RED.filled()));

            chart
                .draw_series(entries)
                .map_err(|e| Error::Plotters(e.to_string()))?;
            chart.draw_series(exits).map_err(|e| Error::Plotters(e.to_string()))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| Error::Plotters(e.to_string()))
    }

    /// Draws the equity curve, with the initial capital as a baseline.
    fn draw_equity_chart<DB: DrawingBackend>(
        &self,
        drawing_area: &DrawingArea<DB, Shift>,
        result: &BacktestResult,
    ) -> Result<()> {
        let curve = result.equity_curve();
        let (first_date, last_date) = date_span(result);
        let initial = result.initial_capital();
        let (min_equity, max_equity) = bounds(curve.iter().map(|p| p.equity()).chain([initial]));
        let equity_padding = (max_equity - min_equity).max(initial.abs() * 0.01) * 0.1;

        let drawing_area = drawing_area.margin(0, 10, 70, 70);
        let mut chart = ChartBuilder::on(&drawing_area)
            .x_label_area_size(X_LABEL_SIZE * 2)
            .y_label_area_size(Y_LABEL_SIZE * 3)
            .build_cartesian_2d(first_date..last_date, min_equity - equity_padding..max_equity + equity_padding)
            .map_err(|e| Error::Plotters(e.to_string()))?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Equity")
            .x_label_style(("sans-serif", X_LABEL_SIZE))
            .y_label_style(("sans-serif", Y_LABEL_SIZE))
            .x_labels(8)
            .y_labels(4)
            .draw()
            .map_err(|e| Error::Plotters(e.to_string()))?;

        chart
            .draw_series(LineSeries::new([(first_date, initial), (last_date, initial)], BLACK.mix(0.3)))
            .map_err(|e| Error::Plotters(e.to_string()))?;
        let area = AreaSeries::new(
            curve.iter().map(|p| (p.date(), p.equity())),
            min_equity - equity_padding,
            BLUE.mix(0.15),
        )
        .border_style(BLUE);
        chart
            .draw_series(area)
            .map(|_| ())
            .map_err(|e| Error::Plotters(e.to_string()))
    }
}

/// Date axis bounds; a single day is widened so the axis is never empty.
fn date_span(result: &BacktestResult) -> (NaiveDate, NaiveDate) {
    let (first, last) = (result.start_date(), result.end_date());
    if first < last { (first, last) } else { (first, first + Duration::days(1)) }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| (min.min(v), max.max(v)))
}
