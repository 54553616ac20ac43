//! Plot generation from benchmark result tables.

use crate::config::{DerivedColumns, ImageFormat, MetricPlot, PlotConfig, PlotStyle, XScale};
use crate::error::{PlotError, Result};
use crate::ideal::{ideal_efficiency, ideal_speedup, ideal_time_for, IdealKind, IdealReference};
use crate::table::{group_by_n, Series, Table};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Line colors for the per-N curves, cycled in ascending N order.
const PALETTE: [RGBColor; 8] = [
    BLUE,
    RED,
    GREEN,
    MAGENTA,
    CYAN,
    RGBColor(255, 140, 0),
    RGBColor(128, 0, 128),
    RGBColor(139, 69, 19),
];

/// What happened to one configured metric.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotOutcome {
    Written { key: String, path: PathBuf },
    /// Optional metric whose column is not in the table
    Skipped { key: String, column: String },
}

/// A line ready to draw: thread counts against metric values.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub label: String,
    pub points: Vec<(u64, f64)>,
    pub ideal: bool,
    /// Palette slot, `None` draws in black
    pub color: Option<usize>,
}

/// The derivation that can produce `column`: the table lacks the column but
/// has the time column it is computed from.
pub fn derivation_for<'c>(
    derive: &'c [DerivedColumns],
    table: &Table,
    column: &str,
) -> Option<&'c DerivedColumns> {
    if table.column_index(column).is_some() {
        return None;
    }
    derive.iter().find(|d| {
        (d.speedup == column || d.efficiency == column) && table.column_index(&d.time).is_some()
    })
}

/// Load a results CSV and generate every configured plot into `output_dir`.
pub fn generate_all_plots<P: AsRef<Path>, Q: AsRef<Path>>(
    csv_path: P,
    config: &PlotConfig,
    output_dir: Q,
) -> Result<Vec<PlotOutcome>> {
    let table = Table::load(csv_path, &config.n_column, &config.p_column)?;
    generate_plots(&table, config, output_dir)
}

/// Generate all plots from a table, one metric at a time.
///
/// Speedup and efficiency columns missing from the table are derived when a
/// metric first needs them. Stops at the first failing metric. Plots written
/// before the failure are complete files.
pub fn generate_plots<P: AsRef<Path>>(
    table: &Table,
    config: &PlotConfig,
    output_dir: P,
) -> Result<Vec<PlotOutcome>> {
    config.validate()?;
    ensure_format_supported(config.format)?;
    #[cfg(feature = "png")]
    crate::font::ensure_font(config.font_path.as_deref())?;

    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir).map_err(|e| PlotError::io(output_dir, e))?;

    let mut table = Cow::Borrowed(table);
    let mut outcomes = Vec::with_capacity(config.metrics.len());
    for metric in &config.metrics {
        if let Some(columns) = derivation_for(&config.derive, &table, &metric.column) {
            let extended = table.with_scaling_columns(
                &metric.key,
                &columns.time,
                &columns.speedup,
                &columns.efficiency,
            )?;
            table = Cow::Owned(extended);
        }

        if metric.optional && table.column_index(&metric.column).is_none() {
            warn!(
                metric = %metric.key,
                column = %metric.column,
                "column not in table, skipping optional plot"
            );
            outcomes.push(PlotOutcome::Skipped {
                key: metric.key.clone(),
                column: metric.column.clone(),
            });
            continue;
        }

        let path = render_metric_plot(&table, metric, &config.style, output_dir, config.format)?;
        outcomes.push(PlotOutcome::Written {
            key: metric.key.clone(),
            path,
        });
    }

    Ok(outcomes)
}

fn ensure_format_supported(format: ImageFormat) -> Result<()> {
    match format {
        ImageFormat::Svg => Ok(()),
        ImageFormat::Png if cfg!(feature = "png") => Ok(()),
        ImageFormat::Png => Err(PlotError::Config(
            "PNG output requires building with the `png` feature; use --format svg".to_string(),
        )),
    }
}

/// Build the measured curves (one per N) and the ideal overlay for a metric.
pub fn build_curves(table: &Table, metric: &MetricPlot) -> Result<Vec<Curve>> {
    let column = table.require_column(&metric.key, &metric.column)?;
    let groups = group_by_n(table);

    let mut selected: Vec<&Series<'_>> = match &metric.n_values {
        Some(ns) => ns
            .iter()
            .map(|n| {
                groups.get(n).filter(|s| !s.is_empty()).ok_or_else(|| PlotError::EmptySeries {
                    metric: metric.key.clone(),
                    n: *n,
                })
            })
            .collect::<Result<_>>()?,
        None => groups.values().collect(),
    };
    selected.sort_by_key(|s| s.n());
    selected.dedup_by_key(|s| s.n());

    if selected.is_empty() {
        return Err(PlotError::data_format(
            table.source(),
            format!("metric '{}': table has no rows", metric.key),
        ));
    }

    let mut axis: Vec<u64> = selected.iter().flat_map(|s| s.p_values()).collect();
    axis.sort_unstable();
    axis.dedup();

    let mut curves: Vec<Curve> = selected
        .iter()
        .enumerate()
        .map(|(idx, series)| Curve {
            label: format!("N={}", series.n()),
            points: series.samples(column),
            ideal: false,
            color: Some(idx),
        })
        .collect();

    let along_axis = |values: Vec<f64>| axis.iter().copied().zip(values).collect::<Vec<_>>();

    match metric.ideal {
        IdealKind::None => {}
        IdealKind::Time => match metric.ideal_reference {
            IdealReference::PerGroup => {
                for (idx, series) in selected.iter().enumerate() {
                    let values = ideal_time_for(&metric.key, series, column, &axis)?;
                    curves.push(Curve {
                        label: format!("Ideal N={}", series.n()),
                        points: along_axis(values),
                        ideal: true,
                        color: Some(idx),
                    });
                }
            }
            IdealReference::SmallestN => {
                let values = ideal_time_for(&metric.key, selected[0], column, &axis)?;
                curves.push(Curve {
                    label: format!("Ideal (T1 of N={})", selected[0].n()),
                    points: along_axis(values),
                    ideal: true,
                    color: None,
                });
            }
        },
        IdealKind::Speedup => curves.push(Curve {
            label: "Ideal".to_string(),
            points: along_axis(ideal_speedup(&axis)),
            ideal: true,
            color: None,
        }),
        IdealKind::Efficiency => curves.push(Curve {
            label: "Ideal".to_string(),
            points: along_axis(ideal_efficiency(&axis)),
            ideal: true,
            color: None,
        }),
    }

    Ok(curves)
}

/// Render one metric plot to `<output_dir>/<filename>` and return its path.
///
/// The image is drawn into a `.partial` sibling and moved into place only
/// once complete, so a failure never leaves a truncated file under the final
/// name.
pub fn render_metric_plot(
    table: &Table,
    metric: &MetricPlot,
    style: &PlotStyle,
    output_dir: &Path,
    format: ImageFormat,
) -> Result<PathBuf> {
    let curves = build_curves(table, metric)?;
    let path = output_dir.join(metric.output_filename(format));

    let partial = PartialFile::new(&path, format);
    draw(partial.path(), format, &curves, metric, style).map_err(|e| PlotError::Render {
        metric: metric.key.clone(),
        message: format!("{:#}", e),
    })?;
    partial.commit()?;

    info!(
        metric = %metric.key,
        curves = curves.len(),
        path = %path.display(),
        "plot written"
    );
    Ok(path)
}

fn draw(
    path: &Path,
    format: ImageFormat,
    curves: &[Curve],
    metric: &MetricPlot,
    style: &PlotStyle,
) -> anyhow::Result<()> {
    let size = style.pixel_size();
    match format {
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_chart(&root, curves, metric, style)?;
            root.present()?;
        }
        #[cfg(feature = "png")]
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_chart(&root, curves, metric, style)?;
            root.present()?;
        }
        #[cfg(not(feature = "png"))]
        ImageFormat::Png => anyhow::bail!("PNG support not compiled in"),
    }
    Ok(())
}

fn x_coord(p: u64, scale: XScale) -> f64 {
    match scale {
        XScale::Linear => p as f64,
        XScale::Log2 => (p as f64).log2(),
    }
}

fn x_range(curves: &[Curve], scale: XScale) -> (f64, f64) {
    let (min, max) = curves
        .iter()
        .flat_map(|c| c.points.iter().map(|&(p, _)| x_coord(p, scale)))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));

    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        match scale {
            XScale::Linear => 1.0,
            XScale::Log2 => 0.5,
        }
    };
    (min - pad, max + pad)
}

fn curve_color(curve: &Curve) -> RGBColor {
    match curve.color {
        Some(idx) => PALETTE[idx % PALETTE.len()],
        None => BLACK,
    }
}

fn draw_chart<DB>(
    root: &DrawingArea<DB, Shift>,
    curves: &[Curve],
    metric: &MetricPlot,
    style: &PlotStyle,
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let (x_min, x_max) = x_range(curves, metric.x_scale);
    let observed_max = curves
        .iter()
        .flat_map(|c| c.points.iter().map(|&(_, y)| y))
        .fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = metric.ylim.range(observed_max);

    let px = |points: f64| style.points_to_px(points).round().max(1.0) as u32;
    let font = |points: f64| ("sans-serif", style.points_to_px(points));

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(px(10.0))
        .x_label_area_size(px(3.0 * style.label_font_size))
        .y_label_area_size(px(4.5 * style.label_font_size));
    if let Some(title) = &metric.title {
        builder.caption(title, font(style.title_font_size));
    }
    let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    // Thread counts are integers; on the log2 axis only whole exponents get a label.
    let linear_labels = |x: &f64| {
        if (x - x.round()).abs() < 1e-9 {
            format!("{:.0}", x)
        } else {
            format!("{:.1}", x)
        }
    };
    let log2_labels = |x: &f64| {
        if (x - x.round()).abs() < 1e-9 {
            format!("{:.0}", 2f64.powf(x.round()))
        } else {
            String::new()
        }
    };

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(metric.xlabel.as_str())
        .y_desc(metric.ylabel.as_str())
        .axis_desc_style(font(style.label_font_size))
        .label_style(font(style.tick_font_size));
    match metric.x_scale {
        XScale::Linear => {
            mesh.x_label_formatter(&linear_labels);
        }
        XScale::Log2 => {
            mesh.x_labels(((x_max - x_min).ceil() as usize + 1) * 2)
                .x_label_formatter(&log2_labels);
        }
    }
    if !style.grid {
        mesh.disable_mesh();
    }
    mesh.draw()?;

    let line_px = px(style.line_width);
    let marker_px = px(style.marker_size);

    for curve in curves {
        let shape = curve_color(curve).stroke_width(line_px);
        let points: Vec<(f64, f64)> = curve
            .points
            .iter()
            .map(|&(p, y)| (x_coord(p, metric.x_scale), y))
            .collect();

        let anno = if curve.ideal {
            chart.draw_series(DashedLineSeries::new(points, 4 * line_px, 3 * line_px, shape))?
        } else {
            chart.draw_series(LineSeries::new(points, shape).point_size(marker_px))?
        };
        anno.label(curve.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], shape));
    }

    if style.legend {
        chart
            .configure_series_labels()
            .label_font(font(style.tick_font_size))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }

    Ok(())
}

/// Output file under construction. Removed on drop unless committed.
struct PartialFile {
    partial: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(target: &Path, format: ImageFormat) -> Self {
        // The bitmap encoder picks the codec from the extension, so keep it last.
        let partial = target.with_extension(format!("partial.{}", format.extension()));
        Self {
            partial,
            target: target.to_path_buf(),
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.partial
    }

    fn commit(mut self) -> Result<()> {
        std::fs::rename(&self.partial, &self.target).map_err(|e| PlotError::io(&self.target, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.partial);
        }
    }
}
