//! Scaling plots for parallel benchmarks.
//!
//! Reads a CSV of (N, P, metric...) measurements and renders one line chart
//! per metric: a curve per problem size N against the thread count P, with an
//! optional perfect-scaling reference curve.

pub mod config;
pub mod error;
#[cfg(feature = "png")]
mod font;
pub mod ideal;
pub mod logging;
pub mod plot;
pub mod table;

pub use config::{DerivedColumns, ImageFormat, MetricPlot, PlotConfig, PlotStyle, XScale, YLimit};
pub use error::PlotError;
pub use ideal::{ideal_efficiency, ideal_speedup, ideal_time, IdealKind, IdealReference};
pub use plot::{generate_all_plots, generate_plots, render_metric_plot, PlotOutcome};
pub use table::{group_by_n, load_table, Measurement, Series, Table};
