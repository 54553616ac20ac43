use scaleplot::config::{ImageFormat, MetricPlot, PlotConfig, YLimit};
use scaleplot::ideal::IdealKind;
use scaleplot::plot::{generate_all_plots, generate_plots, PlotOutcome};
use scaleplot::{PlotError, Table};
use std::path::{Path, PathBuf};

const TWO_SIZES: &str = "N,P,Tp\n1,1,10\n1,2,5\n1,4,2.5\n2,1,20\n2,2,10\n2,4,5\n";

fn svg_config() -> PlotConfig {
    PlotConfig {
        format: ImageFormat::Svg,
        ..PlotConfig::default()
    }
}

fn write_csv(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("results.csv");
    std::fs::write(&path, contents).unwrap();
    path
}

fn written(outcomes: &[PlotOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            PlotOutcome::Written { key, .. } => Some(key.clone()),
            PlotOutcome::Skipped { .. } => None,
        })
        .collect()
}

/// SVG text elements may hold their content inline or on its own line.
fn has_text(svg: &str, text: &str) -> bool {
    svg.contains(&format!(">{}<", text)) || svg.lines().any(|l| l.trim() == text)
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn overall_time_plot_has_curve_and_ideal_per_n() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(temp_dir.path(), TWO_SIZES);
    let out = temp_dir.path().join("plots");

    let mut config = svg_config();
    config.metrics = vec![MetricPlot::new(
        "overall_time",
        "Tp",
        "Overall Time (seconds)",
        IdealKind::Time,
    )];

    let outcomes = generate_all_plots(&csv, &config, &out).expect("plot generation");
    assert_eq!(written(&outcomes), vec!["overall_time"]);

    let svg = std::fs::read_to_string(out.join("overall_time.svg")).unwrap();
    for label in ["N=1", "N=2", "Ideal N=1", "Ideal N=2"] {
        assert!(has_text(&svg, label), "missing legend entry {}", label);
    }
    assert!(svg.contains("Overall Time (seconds)"));
}

#[test]
fn default_config_derives_speedup_and_skips_missing_work_metrics() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(temp_dir.path(), TWO_SIZES);
    let out = temp_dir.path().join("plots");

    let outcomes = generate_all_plots(&csv, &svg_config(), &out).expect("plot generation");

    assert_eq!(
        written(&outcomes),
        vec!["overall_time", "overall_speedup", "overall_efficiency"]
    );
    let skipped: Vec<&str> = outcomes
        .iter()
        .filter_map(|o| match o {
            PlotOutcome::Skipped { key, .. } => Some(key.as_str()),
            PlotOutcome::Written { .. } => None,
        })
        .collect();
    assert_eq!(skipped, vec!["work_time", "work_speedup", "work_efficiency"]);

    assert_eq!(
        dir_entries(&out),
        vec![
            "overall_efficiency.svg",
            "overall_speedup.svg",
            "overall_time.svg",
        ]
    );
}

#[test]
fn work_metrics_are_plotted_when_present() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(
        temp_dir.path(),
        "N,P,Tp,Work_Tp\n64,1,2.0,1.6\n64,2,1.1,0.8\n64,4,0.7,0.41\n",
    );
    let out = temp_dir.path().join("plots");

    let outcomes = generate_all_plots(&csv, &svg_config(), &out).expect("plot generation");
    assert_eq!(written(&outcomes).len(), 6);
    assert!(out.join("work_efficiency.svg").exists());
}

#[test]
fn missing_baseline_aborts_with_metric_and_n() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(temp_dir.path(), "N,P,Tp\n1,1,10\n1,2,5\n2,2,10\n2,4,5\n");
    let out = temp_dir.path().join("plots");

    let table = Table::load(&csv, "N", "P").unwrap();
    let mut config = svg_config();
    config.metrics = vec![MetricPlot::new("overall_time", "Tp", "Time", IdealKind::Time)];

    match generate_plots(&table, &config, &out) {
        Err(PlotError::BaselineMissing { metric, n }) => {
            assert_eq!(metric, "overall_time");
            assert_eq!(n, 2);
        }
        other => panic!("expected BaselineMissing, got {:?}", other),
    }
    assert!(dir_entries(&out).is_empty(), "no output expected after failure");
}

#[test]
fn required_metric_without_column_fails() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(temp_dir.path(), "N,P,Work_Tp\n1,1,1.0\n");
    let out = temp_dir.path().join("plots");

    let err = generate_all_plots(&csv, &svg_config(), &out).unwrap_err();
    assert!(matches!(err, PlotError::DataFormat { .. }));
    assert!(err.to_string().contains("overall_time"), "{}", err);
}

#[test]
fn rendering_is_repeatable() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(temp_dir.path(), TWO_SIZES);
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");

    let mut config = svg_config();
    config.metrics[0].ylim = YLimit::Explicit { min: 0.0, max: 25.0 };
    config.metrics[1].x_scale = scaleplot::XScale::Log2;

    generate_all_plots(&csv, &config, &first).unwrap();
    generate_all_plots(&csv, &config, &second).unwrap();
    // Re-running into the same directory overwrites in place.
    generate_all_plots(&csv, &config, &second).unwrap();

    for name in dir_entries(&first) {
        let a = std::fs::read(first.join(&name)).unwrap();
        let b = std::fs::read(second.join(&name)).unwrap();
        assert_eq!(a, b, "{} differs between runs", name);
    }
    assert_eq!(dir_entries(&first), dir_entries(&second));
}

#[test]
fn malformed_csv_reports_data_format() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(temp_dir.path(), "N,P,Tp\n1,one,10\n");

    let err = generate_all_plots(&csv, &svg_config(), temp_dir.path().join("plots")).unwrap_err();
    assert!(matches!(err, PlotError::DataFormat { .. }));
    assert!(err.to_string().contains("'P'"));
}

#[test]
fn config_file_drives_selection_and_names() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(temp_dir.path(), TWO_SIZES);
    let config_path = temp_dir.path().join("plots.json");
    std::fs::write(
        &config_path,
        r#"{
            "format": "svg",
            "derive": [],
            "metrics": [
                { "key": "large_only", "column": "Tp", "ylabel": "Time (s)",
                  "filename": "large.svg", "ideal": "time", "n_values": [2] }
            ]
        }"#,
    )
    .unwrap();

    let config = PlotConfig::load(&config_path).unwrap();
    let out = temp_dir.path().join("plots");
    generate_all_plots(&csv, &config, &out).unwrap();

    assert_eq!(dir_entries(&out), vec!["large.svg"]);
    let svg = std::fs::read_to_string(out.join("large.svg")).unwrap();
    assert!(has_text(&svg, "N=2"));
    assert!(!has_text(&svg, "N=1"));
}

#[test]
fn text_columns_beside_metrics_are_ignored() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(
        temp_dir.path(),
        "N,P,Host,Tp\n1,1,node01,10\n1,2,node01,5\n1,4,node02,2.5\n",
    );
    let out = temp_dir.path().join("plots");

    let outcomes = generate_all_plots(&csv, &svg_config(), &out).expect("plot generation");
    assert_eq!(
        written(&outcomes),
        vec!["overall_time", "overall_speedup", "overall_efficiency"]
    );
}

#[test]
fn metric_on_text_column_names_the_metric() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(temp_dir.path(), "N,P,Host,Tp\n1,1,node01,10\n1,2,node01,5\n");

    let mut config = svg_config();
    config.metrics = vec![MetricPlot::new("by_host", "Host", "Host", IdealKind::None)];

    let err = generate_all_plots(&csv, &config, temp_dir.path().join("plots")).unwrap_err();
    assert!(matches!(err, PlotError::DataFormat { .. }));
    let msg = err.to_string();
    assert!(msg.contains("by_host"), "{}", msg);
    assert!(msg.contains("'node01'"), "{}", msg);
}

#[test]
fn time_only_plot_ignores_missing_baseline() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv = write_csv(temp_dir.path(), "N,P,Tp\n1,1,10\n1,2,5\n2,2,10\n2,4,5\n");
    let out = temp_dir.path().join("plots");

    let mut config = svg_config();
    config.metrics = vec![MetricPlot::new("overall_time", "Tp", "Time", IdealKind::None)];

    let outcomes = generate_all_plots(&csv, &config, &out).expect("plot generation");
    assert_eq!(written(&outcomes), vec!["overall_time"]);
    assert_eq!(dir_entries(&out), vec!["overall_time.svg"]);
}
