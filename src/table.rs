//! Measurement table loaded from a benchmark results CSV.

use crate::error::{PlotError, Result};
use crate::ideal::baseline_time;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default name of the problem-size column
pub const DEFAULT_N_COLUMN: &str = "N";
/// Default name of the thread-count column
pub const DEFAULT_P_COLUMN: &str = "P";

/// One benchmark run: problem size, thread count and its metric values.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub n: u64,
    pub p: u64,
    values: Vec<f64>,
}

impl Measurement {
    pub fn new(n: u64, p: u64, values: Vec<f64>) -> Self {
        Self { n, p, values }
    }

    /// Value of the metric column at `column` (an index from [`Table::column_index`]).
    pub fn value(&self, column: usize) -> f64 {
        self.values[column]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// All measurements of one results file, sorted by (N, P).
#[derive(Debug, Clone)]
pub struct Table {
    source: PathBuf,
    columns: Vec<String>,
    rows: Vec<Measurement>,
    /// First unparsable cell of each column, reported once a metric reads it
    invalid: Vec<Option<String>>,
}

impl Table {
    /// Build a table from already parsed rows. Rows are sorted by (N, P).
    ///
    /// Every row must carry one value per metric column.
    pub fn from_rows(columns: Vec<String>, mut rows: Vec<Measurement>) -> Result<Self> {
        let source = PathBuf::from("<memory>");
        if let Some(bad) = rows.iter().find(|r| r.values.len() != columns.len()) {
            return Err(PlotError::data_format(
                &source,
                format!(
                    "row N={} P={} has {} values, expected {}",
                    bad.n,
                    bad.p,
                    bad.values.len(),
                    columns.len()
                ),
            ));
        }
        rows.sort_by_key(|r| (r.n, r.p));
        let invalid = vec![None; columns.len()];
        let table = Self {
            source,
            columns,
            rows,
            invalid,
        };
        table.check_unique_runs()?;
        Ok(table)
    }

    /// Load a results CSV, looking up N and P under the given header names.
    ///
    /// Every other column is kept as a candidate metric column. Cells that
    /// are not numbers only become an error when a metric reads that column,
    /// so text columns such as a host name do not block loading.
    pub fn load<P: AsRef<Path>>(path: P, n_column: &str, p_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PlotError::io(path, e))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(BufReader::new(file));

        let headers = reader
            .headers()
            .map_err(|e| PlotError::data_format(path, format!("unreadable header row: {}", e)))?
            .clone();

        let find = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                PlotError::data_format(
                    path,
                    format!(
                        "missing required column '{}' (found: {})",
                        name,
                        headers.iter().collect::<Vec<_>>().join(", ")
                    ),
                )
            })
        };
        let n_idx = find(n_column)?;
        let p_idx = find(p_column)?;

        let metric_idx: Vec<usize> = (0..headers.len())
            .filter(|i| *i != n_idx && *i != p_idx)
            .collect();
        let columns: Vec<String> = metric_idx.iter().map(|&i| headers[i].to_string()).collect();

        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(PlotError::data_format(
                    path,
                    format!("duplicate column '{}'", name),
                ));
            }
        }

        let mut invalid: Vec<Option<String>> = vec![None; columns.len()];
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| PlotError::data_format(path, format!("malformed record: {}", e)))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let n = parse_count(path, &record, n_idx, n_column, line)?;
            let p = parse_count(path, &record, p_idx, p_column, line)?;
            let mut values = Vec::with_capacity(metric_idx.len());
            for (slot, &i) in metric_idx.iter().enumerate() {
                match parse_value(record.get(i), &headers[i], line) {
                    Ok(v) => values.push(v),
                    Err(problem) => {
                        if invalid[slot].is_none() {
                            invalid[slot] = Some(problem);
                        }
                        values.push(f64::NAN);
                    }
                }
            }

            rows.push(Measurement { n, p, values });
        }

        if rows.is_empty() {
            return Err(PlotError::data_format(path, "no data rows"));
        }

        rows.sort_by_key(|r| (r.n, r.p));
        let table = Self {
            source: path.to_path_buf(),
            columns,
            rows,
            invalid,
        };
        table.check_unique_runs()?;

        debug!(
            path = %path.display(),
            rows = table.rows.len(),
            columns = ?table.columns,
            "loaded measurement table"
        );
        Ok(table)
    }

    fn check_unique_runs(&self) -> Result<()> {
        for pair in self.rows.windows(2) {
            if pair[0].n == pair[1].n && pair[0].p == pair[1].p {
                return Err(PlotError::data_format(
                    &self.source,
                    format!("duplicate run for N={} P={}", pair[0].n, pair[0].p),
                ));
            }
        }
        Ok(())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Metric column names, in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Measurement] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`Table::column_index`], but a missing column or one holding a
    /// non-numeric cell is a `DataFormat` error naming the metric that needed it.
    pub fn require_column(&self, metric: &str, name: &str) -> Result<usize> {
        let idx = self.column_index(name).ok_or_else(|| {
            PlotError::data_format(
                &self.source,
                format!(
                    "metric '{}': column '{}' not found (available: {})",
                    metric,
                    name,
                    self.columns.join(", ")
                ),
            )
        })?;
        if let Some(problem) = &self.invalid[idx] {
            return Err(PlotError::data_format(
                &self.source,
                format!("metric '{}': {}", metric, problem),
            ));
        }
        Ok(idx)
    }

    /// Distinct thread counts, ascending.
    pub fn p_values(&self) -> Vec<u64> {
        let mut ps: Vec<u64> = self.rows.iter().map(|r| r.p).collect();
        ps.sort_unstable();
        ps.dedup();
        ps
    }

    /// Distinct problem sizes, ascending.
    pub fn n_values(&self) -> Vec<u64> {
        let mut ns: Vec<u64> = self.rows.iter().map(|r| r.n).collect();
        ns.dedup();
        ns
    }

    /// Return a table extended with speedup and efficiency columns derived
    /// from `time`.
    ///
    /// Speedup is `T1 / Tp` where T1 is the P=1 time of the same N, and
    /// efficiency is `speedup / P`. Columns that already exist are kept as read,
    /// and an existing speedup column feeds the efficiency calculation.
    /// Errors name `metric`, the plot that asked for the derivation.
    pub fn with_scaling_columns(
        &self,
        metric: &str,
        time: &str,
        speedup: &str,
        efficiency: &str,
    ) -> Result<Table> {
        let time_idx = self.require_column(metric, time)?;
        let speedup_idx = match self.column_index(speedup) {
            Some(_) => Some(self.require_column(metric, speedup)?),
            None => None,
        };
        let add_speedup = speedup_idx.is_none();
        let add_efficiency = self.column_index(efficiency).is_none() && efficiency != speedup;
        if !add_speedup && !add_efficiency {
            return Ok(self.clone());
        }

        let mut baselines = BTreeMap::new();
        if add_speedup {
            for (n, series) in group_by_n(self) {
                let t1 = baseline_time(&series, time_idx).ok_or_else(|| {
                    PlotError::BaselineMissing {
                        metric: metric.to_string(),
                        n,
                    }
                })?;
                baselines.insert(n, t1);
            }
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let speedup_value = match speedup_idx {
                Some(idx) => row.value(idx),
                None => {
                    let tp = row.value(time_idx);
                    if !(tp > 0.0) {
                        return Err(PlotError::data_format(
                            &self.source,
                            format!(
                                "metric '{}': column '{}' has non-positive time {} at N={} P={}",
                                metric, time, tp, row.n, row.p
                            ),
                        ));
                    }
                    baselines[&row.n] / tp
                }
            };
            let mut values = row.values.clone();
            if add_speedup {
                values.push(speedup_value);
            }
            if add_efficiency {
                values.push(speedup_value / row.p as f64);
            }
            rows.push(Measurement { n: row.n, p: row.p, values });
        }

        let mut columns = self.columns.clone();
        let mut invalid = self.invalid.clone();
        if add_speedup {
            columns.push(speedup.to_string());
            invalid.push(None);
        }
        if add_efficiency {
            columns.push(efficiency.to_string());
            invalid.push(None);
        }
        debug!(metric, time, speedup, efficiency, "derived scaling columns");

        Ok(Table {
            source: self.source.clone(),
            columns,
            rows,
            invalid,
        })
    }
}

/// Load a results CSV with the conventional `N` and `P` column names.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    Table::load(path, DEFAULT_N_COLUMN, DEFAULT_P_COLUMN)
}

/// The runs of one problem size, ordered by thread count.
#[derive(Debug, Clone)]
pub struct Series<'a> {
    n: u64,
    rows: Vec<&'a Measurement>,
}

impl<'a> Series<'a> {
    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn rows(&self) -> &[&'a Measurement] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn p_values(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.p).collect()
    }

    /// (P, value) samples of one metric column.
    pub fn samples(&self, column: usize) -> Vec<(u64, f64)> {
        self.rows.iter().map(|r| (r.p, r.value(column))).collect()
    }

    pub fn value_at(&self, p: u64, column: usize) -> Option<f64> {
        self.rows.iter().find(|r| r.p == p).map(|r| r.value(column))
    }
}

/// Partition the table by N. Iteration order is ascending N; each series is
/// sorted by P ascending.
pub fn group_by_n(table: &Table) -> BTreeMap<u64, Series<'_>> {
    let mut groups: BTreeMap<u64, Series<'_>> = BTreeMap::new();
    for row in table.rows() {
        groups
            .entry(row.n)
            .or_insert_with(|| Series { n: row.n, rows: Vec::new() })
            .rows
            .push(row);
    }
    for series in groups.values_mut() {
        series.rows.sort_by_key(|r| r.p);
    }
    groups
}

fn cell<'r>(
    path: &Path,
    record: &'r StringRecord,
    idx: usize,
    column: &str,
    line: u64,
) -> Result<&'r str> {
    match record.get(idx) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(PlotError::data_format(
            path,
            format!("line {}: empty value in column '{}'", line, column),
        )),
    }
}

fn parse_count(
    path: &Path,
    record: &StringRecord,
    idx: usize,
    column: &str,
    line: u64,
) -> Result<u64> {
    let raw = cell(path, record, idx, column, line)?;
    match raw.parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(PlotError::data_format(
            path,
            format!(
                "line {}: column '{}' must be a positive integer, got '{}'",
                line, column, raw
            ),
        )),
    }
}

/// Parse a metric cell, describing the problem on failure.
fn parse_value(raw: Option<&str>, column: &str, line: u64) -> std::result::Result<f64, String> {
    match raw {
        None | Some("") => Err(format!("line {}: empty value in column '{}'", line, column)),
        Some(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(format!(
                "line {}: column '{}' is not a number: '{}'",
                line, column, raw
            )),
        },
    }
}
