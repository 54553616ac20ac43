//! Plot configuration.
//!
//! A configuration is a JSON document; every field is optional and falls back
//! to the defaults below, which produce the overall and work time / speedup /
//! efficiency plots.

use crate::error::{PlotError, Result};
use crate::ideal::{IdealKind, IdealReference};
use crate::table::{DEFAULT_N_COLUMN, DEFAULT_P_COLUMN};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Raster image (needs the `png` feature)
    Png,
    /// Vector image
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl Default for ImageFormat {
    #[cfg(feature = "png")]
    fn default() -> Self {
        ImageFormat::Png
    }

    #[cfg(not(feature = "png"))]
    fn default() -> Self {
        ImageFormat::Svg
    }
}

/// Scale of the thread-count axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XScale {
    #[default]
    Linear,
    Log2,
}

/// Y-axis range of a metric plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YLimit {
    /// From zero to `factor` times the largest plotted value
    Auto { factor: f64 },
    Explicit { min: f64, max: f64 },
}

impl Default for YLimit {
    fn default() -> Self {
        YLimit::Auto { factor: 1.1 }
    }
}

impl YLimit {
    /// Resolve to a concrete range given the largest plotted value.
    pub fn range(&self, observed_max: f64) -> (f64, f64) {
        match *self {
            YLimit::Explicit { min, max } => (min, max),
            YLimit::Auto { factor } => {
                let max = if observed_max > 0.0 { observed_max * factor } else { 1.0 };
                (0.0, max)
            }
        }
    }
}

/// Presentation settings shared by every plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotStyle {
    /// Figure size in inches (width, height)
    pub figure_size: (f64, f64),
    pub dpi: u32,
    /// Font sizes in points
    pub title_font_size: f64,
    pub label_font_size: f64,
    pub tick_font_size: f64,
    /// Marker radius in points
    pub marker_size: f64,
    /// Line width in points
    pub line_width: f64,
    pub grid: bool,
    pub legend: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            figure_size: (8.0, 6.0),
            dpi: 100,
            title_font_size: 14.0,
            label_font_size: 12.0,
            tick_font_size: 10.0,
            marker_size: 3.0,
            line_width: 1.5,
            grid: true,
            legend: true,
        }
    }
}

impl PlotStyle {
    /// Canvas size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let (w, h) = self.figure_size;
        let dpi = self.dpi as f64;
        ((w * dpi).round() as u32, (h * dpi).round() as u32)
    }

    /// Convert a size in points to pixels at the configured DPI.
    pub fn points_to_px(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }
}

/// One output plot: which column to draw and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricPlot {
    /// Identifier used in messages and the default file name
    pub key: String,
    /// Table column holding the metric
    pub column: String,
    #[serde(default)]
    pub ylabel: String,
    #[serde(default = "default_xlabel")]
    pub xlabel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Output file name, defaults to `<key>.<ext>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub ideal: IdealKind,
    #[serde(default)]
    pub ideal_reference: IdealReference,
    #[serde(default)]
    pub x_scale: XScale,
    #[serde(default)]
    pub ylim: YLimit,
    /// Restrict the plot to these problem sizes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_values: Option<Vec<u64>>,
    /// Skip (with a warning) instead of failing when the column is absent
    #[serde(default)]
    pub optional: bool,
}

fn default_xlabel() -> String {
    "Threads (P)".to_string()
}

impl MetricPlot {
    pub fn new(key: &str, column: &str, ylabel: &str, ideal: IdealKind) -> Self {
        Self {
            key: key.to_string(),
            column: column.to_string(),
            ylabel: ylabel.to_string(),
            xlabel: default_xlabel(),
            title: None,
            filename: None,
            ideal,
            ideal_reference: IdealReference::default(),
            x_scale: XScale::default(),
            ylim: YLimit::default(),
            n_values: None,
            optional: false,
        }
    }

    pub fn output_filename(&self, format: ImageFormat) -> String {
        match &self.filename {
            Some(name) => name.clone(),
            None => format!("{}.{}", self.key, format.extension()),
        }
    }
}

/// Speedup and efficiency columns to compute from a time column when the CSV
/// does not carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivedColumns {
    pub time: String,
    pub speedup: String,
    pub efficiency: String,
}

/// Complete configuration of a plotting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    pub n_column: String,
    pub p_column: String,
    pub format: ImageFormat,
    /// TTF font used for raster output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    pub style: PlotStyle,
    pub derive: Vec<DerivedColumns>,
    pub metrics: Vec<MetricPlot>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            n_column: DEFAULT_N_COLUMN.to_string(),
            p_column: DEFAULT_P_COLUMN.to_string(),
            format: ImageFormat::default(),
            font_path: None,
            style: PlotStyle::default(),
            derive: vec![
                DerivedColumns {
                    time: "Tp".to_string(),
                    speedup: "Speedup".to_string(),
                    efficiency: "Efficiency".to_string(),
                },
                DerivedColumns {
                    time: "Work_Tp".to_string(),
                    speedup: "Work_Speedup".to_string(),
                    efficiency: "Work_Efficiency".to_string(),
                },
            ],
            metrics: default_metrics(),
        }
    }
}

fn default_metrics() -> Vec<MetricPlot> {
    let family = |prefix: &str, label: &str, columns: [&str; 3], optional: bool| {
        let [time, speedup, efficiency] = columns;
        let mut plots = vec![
            MetricPlot::new(
                &format!("{}_time", prefix),
                time,
                &format!("{} Time (seconds)", label),
                IdealKind::Time,
            ),
            MetricPlot::new(
                &format!("{}_speedup", prefix),
                speedup,
                &format!("{} Speedup", label),
                IdealKind::Speedup,
            ),
            MetricPlot::new(
                &format!("{}_efficiency", prefix),
                efficiency,
                &format!("{} Efficiency", label),
                IdealKind::Efficiency,
            ),
        ];
        for plot in &mut plots {
            plot.title = Some(format!("{} vs. Threads", plot.ylabel));
            plot.optional = optional;
        }
        plots
    };

    let mut metrics = family("overall", "Overall", ["Tp", "Speedup", "Efficiency"], false);
    metrics.extend(family(
        "work",
        "Work",
        ["Work_Tp", "Work_Speedup", "Work_Efficiency"],
        true,
    ));
    metrics
}

impl PlotConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PlotError::io(path, e))?;
        let config: PlotConfig = serde_json::from_str(&text).map_err(|e| {
            PlotError::Config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PlotError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(PlotError::Config("no metrics configured".to_string()));
        }

        let (w, h) = self.style.figure_size;
        if !(w > 0.0 && h > 0.0) || self.style.dpi == 0 {
            return Err(PlotError::Config(format!(
                "figure size {}x{} in at {} dpi is empty",
                w, h, self.style.dpi
            )));
        }

        let mut keys = HashSet::new();
        let mut files = HashSet::new();
        for metric in &self.metrics {
            if metric.key.is_empty() || metric.column.is_empty() {
                return Err(PlotError::Config(
                    "metric key and column must not be empty".to_string(),
                ));
            }
            if !keys.insert(metric.key.as_str()) {
                return Err(PlotError::Config(format!("duplicate metric key '{}'", metric.key)));
            }

            let filename = metric.output_filename(self.format);
            if filename.contains('/') || filename.contains('\\') || filename.starts_with('.') {
                return Err(PlotError::Config(format!(
                    "metric '{}': file name '{}' must be a plain file name",
                    metric.key, filename
                )));
            }
            if !filename.ends_with(&format!(".{}", self.format.extension())) {
                return Err(PlotError::Config(format!(
                    "metric '{}': file name '{}' does not end in .{}",
                    metric.key,
                    filename,
                    self.format.extension()
                )));
            }
            if !files.insert(filename.clone()) {
                return Err(PlotError::Config(format!(
                    "metric '{}': output file '{}' is used twice",
                    metric.key, filename
                )));
            }

            match metric.ylim {
                YLimit::Auto { factor } if !(factor > 0.0) => {
                    return Err(PlotError::Config(format!(
                        "metric '{}': ylim factor must be positive",
                        metric.key
                    )));
                }
                YLimit::Explicit { min, max } if !(min < max) => {
                    return Err(PlotError::Config(format!(
                        "metric '{}': ylim min {} must be below max {}",
                        metric.key, min, max
                    )));
                }
                _ => {}
            }

            if matches!(&metric.n_values, Some(ns) if ns.is_empty()) {
                return Err(PlotError::Config(format!(
                    "metric '{}': n_values must not be empty",
                    metric.key
                )));
            }
        }
        Ok(())
    }
}
