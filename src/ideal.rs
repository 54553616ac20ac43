//! Perfect-scaling reference curves.

use crate::error::{PlotError, Result};
use crate::table::Series;
use serde::{Deserialize, Serialize};

/// Which reference curve, if any, is drawn over a metric plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdealKind {
    #[default]
    None,
    /// T1 / P
    Time,
    /// P (linear speedup)
    Speedup,
    /// Constant 1.0
    Efficiency,
}

/// Where the single-thread baseline of an ideal time curve comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdealReference {
    /// One ideal curve per N, each from that N's own P=1 time
    #[default]
    PerGroup,
    /// A single ideal curve from the smallest N's P=1 time
    SmallestN,
}

/// Metric value of the P=1 run, if the series has one.
pub fn baseline_time(series: &Series<'_>, column: usize) -> Option<f64> {
    series.value_at(1, column)
}

/// T1 / P for each thread count.
pub fn ideal_time(t1: f64, p_values: &[u64]) -> Vec<f64> {
    p_values.iter().map(|&p| t1 / p as f64).collect()
}

/// Ideal time curve for one series, failing when it has no P=1 run.
pub fn ideal_time_for(
    metric: &str,
    series: &Series<'_>,
    column: usize,
    p_values: &[u64],
) -> Result<Vec<f64>> {
    let t1 = baseline_time(series, column).ok_or_else(|| PlotError::BaselineMissing {
        metric: metric.to_string(),
        n: series.n(),
    })?;
    Ok(ideal_time(t1, p_values))
}

pub fn ideal_speedup(p_values: &[u64]) -> Vec<f64> {
    p_values.iter().map(|&p| p as f64).collect()
}

pub fn ideal_efficiency(p_values: &[u64]) -> Vec<f64> {
    vec![1.0; p_values.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{group_by_n, Measurement, Table};

    #[test]
    fn ideal_time_halves_with_threads() {
        assert_eq!(ideal_time(100.0, &[1, 2, 4, 8]), vec![100.0, 50.0, 25.0, 12.5]);
    }

    #[test]
    fn ideal_speedup_is_identity() {
        let ps = [1, 2, 3, 16, 64];
        assert_eq!(ideal_speedup(&ps), vec![1.0, 2.0, 3.0, 16.0, 64.0]);
    }

    #[test]
    fn ideal_efficiency_is_one_per_point() {
        assert_eq!(ideal_efficiency(&[1, 2, 4]), vec![1.0, 1.0, 1.0]);
        assert!(ideal_efficiency(&[]).is_empty());
    }

    #[test]
    fn ideal_time_for_uses_series_baseline() {
        let table = Table::from_rows(
            vec!["Tp".to_string()],
            vec![
                Measurement::new(4, 1, vec![8.0]),
                Measurement::new(4, 2, vec![4.5]),
            ],
        )
        .unwrap();
        let groups = group_by_n(&table);
        let curve = ideal_time_for("overall_time", &groups[&4], 0, &[1, 2, 4]).unwrap();
        assert_eq!(curve, vec![8.0, 4.0, 2.0]);
    }

    #[test]
    fn ideal_time_for_without_p1_fails() {
        let table = Table::from_rows(
            vec!["Tp".to_string()],
            vec![Measurement::new(4, 2, vec![4.5])],
        )
        .unwrap();
        let groups = group_by_n(&table);
        match ideal_time_for("overall_time", &groups[&4], 0, &[2]) {
            Err(PlotError::BaselineMissing { metric, n }) => {
                assert_eq!(metric, "overall_time");
                assert_eq!(n, 4);
            }
            other => panic!("expected BaselineMissing, got {:?}", other),
        }
    }

    #[test]
    fn ideal_kind_parses_snake_case() {
        let kind: IdealKind = serde_json::from_str("\"efficiency\"").unwrap();
        assert_eq!(kind, IdealKind::Efficiency);
        let reference: IdealReference = serde_json::from_str("\"smallest_n\"").unwrap();
        assert_eq!(reference, IdealReference::SmallestN);
    }
}
