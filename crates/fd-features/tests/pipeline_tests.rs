//! End-to-end tests of the feature pipeline on synthetic fundamentals files.

use fd_features::{
    FeaturePipeline, LoaderConfig, Panel, PipelineConfig, PipelineError,
    export::{write_features, write_labels},
    loader::load_reader,
    universe::{read_universe, write_universe},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::fmt::Write as _;
use tempfile::tempdir;

const HEADER: &str = "gvkey,tic,datadate,actq,atq,cheq,cshoq,dlcq,dlttq,ltq,mibq,oiadpq,prccq,prchq,prclq,pstkq,costat,uaptq";

/// Quarter-end report dates with uneven day-of-month.
fn raw_dates(periods: usize) -> Vec<String> {
    let days = ["0331", "0630", "0929", "1231"];
    (0..periods)
        .map(|q| format!("{}{}", 2010 + q / 4, days[q % 4]))
        .collect()
}

/// Random but reproducible fundamentals for `tickers`, with a few blanks.
fn synthetic_csv(seed: u64, tickers: &[&str], periods: usize) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut csv = format!("{HEADER}\n");
    for (id, ticker) in tickers.iter().enumerate() {
        let mut price: f64 = rng.gen_range(10.0..100.0);
        for date in raw_dates(periods) {
            price *= rng.gen_range(0.8..1.25);
            let assets: f64 = rng.gen_range(500.0..1500.0);
            let mib = if rng.gen_range(0..4) == 0 {
                String::new()
            } else {
                format!("{:.2}", rng.gen_range(0.0..20.0))
            };
            let current = if rng.gen_range(0..6) == 0 {
                String::new()
            } else {
                format!("{:.2}", rng.gen_range(50.0..300.0))
            };
            writeln!(
                csv,
                "{id},{ticker},{date},{current},{assets:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{mib},{:.2},{price:.4},{:.4},{:.4},{:.2},A,",
                rng.gen_range(10.0..200.0),
                rng.gen_range(5.0..50.0),
                rng.gen_range(0.0..40.0),
                rng.gen_range(0.0..400.0),
                assets * rng.gen_range(0.3..0.9),
                rng.gen_range(-20.0..80.0),
                price * 1.1,
                price * 0.9,
                rng.gen_range(0.0..5.0),
            )
            .unwrap();
        }
    }
    csv
}

fn load(csv: &str) -> Panel {
    load_reader(csv.as_bytes(), &LoaderConfig::default(), None).unwrap()
}

fn pipeline() -> FeaturePipeline {
    FeaturePipeline::new(PipelineConfig::default()).unwrap()
}

#[test]
fn test_end_to_end_from_csv_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("fundamentals.csv");
    std::fs::write(&input, synthetic_csv(7, &["ABBV", "A", "MMM"], 10)).unwrap();

    let set = pipeline().run_csv(&input, None).unwrap();
    assert_eq!(set.keys().len(), 30);
    assert_eq!(set.features().nrows(), 30);
    assert_eq!(set.labels().len(), 30);
    assert!(set.features().iter().all(|v| v.is_finite()));

    // keys are entity-major, period-minor on the snapped grid
    assert_eq!(set.keys()[0].symbol, "A");
    assert_eq!(set.keys()[0].date, "2010-03-28");
    assert_eq!(set.keys()[2].date, "2010-09-28");
    assert_eq!(set.keys()[10].symbol, "ABBV");

    // the last four rows of every entity have no future outcome
    for entity in 0..3 {
        let tail = set.labels().slice(ndarray::s![entity * 10 + 6..entity * 10 + 10]);
        assert!(tail.iter().all(|&y| y == 0));
    }

    // dropped columns never reach the matrix
    assert!(!set.columns().iter().any(|c| c.contains("prchq") || c.contains("uaptq")));

    let features_path = dir.path().join("features.csv");
    let labels_path = dir.path().join("labels.csv");
    write_features(&features_path, &set).unwrap();
    write_labels(&labels_path, &set).unwrap();

    let features_text = std::fs::read_to_string(&features_path).unwrap();
    let mut lines = features_text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(header[..2], ["symbol", "date"]);
    assert_eq!(header.len(), set.columns().len() + 2);
    assert_eq!(lines.count(), 30);

    let labels_text = std::fs::read_to_string(&labels_path).unwrap();
    assert!(labels_text.starts_with("symbol,date,label\nA,2010-03-28,"));
}

#[test]
fn test_rerun_is_bit_identical() {
    let csv = synthetic_csv(11, &["AAPL", "MSFT", "XOM", "JNJ", "KO"], 12);
    let first = pipeline().run(&load(&csv)).unwrap();
    let second = pipeline().run(&load(&csv)).unwrap();

    assert_eq!(first.columns(), second.columns());
    assert_eq!(first.labels(), second.labels());
    let same_bits = first
        .features()
        .iter()
        .zip(second.features().iter())
        .all(|(a, b)| a.to_bits() == b.to_bits());
    assert!(same_bits);
    assert_eq!(first.norm().to_bits(), second.norm().to_bits());
}

#[test]
fn test_per_entity_features_isolated_from_other_entities() {
    let base_csv = synthetic_csv(3, &["AAA", "BBB"], 9);
    // replace BBB's rows with a different random history
    let other = synthetic_csv(99, &["AAA", "BBB"], 9);
    let altered_csv: String = base_csv
        .lines()
        .filter(|l| !l.contains(",BBB,"))
        .chain(other.lines().filter(|l| l.contains(",BBB,")))
        .map(|l| format!("{l}\n"))
        .collect();

    let base = pipeline().run(&load(&base_csv)).unwrap();
    let altered = pipeline().run(&load(&altered_csv)).unwrap();

    let yoy_columns: Vec<usize> = base
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.starts_with("yoy_"))
        .map(|(j, _)| j)
        .collect();
    assert!(!yoy_columns.is_empty());

    // AAA occupies rows 0..9 in both runs
    for row in 0..9 {
        for &j in &yoy_columns {
            assert_eq!(
                base.features()[[row, j]].to_bits(),
                altered.features()[[row, j]].to_bits(),
                "yoy column {} changed at row {row}",
                base.columns()[j]
            );
        }
    }
}

#[test]
fn test_first_four_rows_have_undefined_yoy() {
    let csv = synthetic_csv(5, &["AAA", "BBB", "CCC"], 8);
    let set = pipeline().run(&load(&csv)).unwrap();

    let missing_yoy: Vec<usize> = set
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.starts_with("missing_yoy_"))
        .map(|(j, _)| j)
        .collect();
    for entity in 0..3 {
        for offset in 0..4 {
            let row = entity * 8 + offset;
            assert!(missing_yoy.iter().all(|&j| set.features()[[row, j]] == 1.0));
        }
    }
}

#[test]
fn test_indicator_matches_blank_cells() {
    let csv = synthetic_csv(21, &["AAA", "BBB"], 8);
    let panel = load(&csv);
    let set = pipeline().run(&panel).unwrap();

    let raw = panel.frame().column("mibq").unwrap().f64().unwrap();
    let flags = set
        .fundamental_missing()
        .frame()
        .column("missing_mibq")
        .unwrap()
        .f64()
        .unwrap();
    for (value, flag) in raw.into_iter().zip(flags.into_iter()) {
        assert_eq!(flag.unwrap() == 1.0, value.is_none());
    }
}

#[test]
fn test_universe_restricts_entities() {
    let dir = tempdir().unwrap();
    let universe_path = dir.path().join("tickers.txt");
    write_universe(&universe_path, &["MSFT", "AAPL"]).unwrap();
    let universe = read_universe(&universe_path).unwrap();

    let csv = synthetic_csv(1, &["AAPL", "MSFT", "XOM"], 6);
    let panel = load_reader(csv.as_bytes(), &LoaderConfig::default(), Some(&universe)).unwrap();
    assert_eq!(panel.entities().unwrap(), vec!["AAPL", "MSFT"]);

    let set = pipeline().run(&panel).unwrap();
    assert_eq!(set.keys().len(), 12);
}

#[test]
fn test_duplicate_canonical_period_aborts() {
    let mut csv = synthetic_csv(2, &["AAA"], 5);
    // a second filing in the first quarter of 2010
    let duplicate = csv.lines().nth(1).unwrap().replace("20100331", "20100215");
    csv.push_str(&duplicate);
    csv.push('\n');

    let err = load_reader(csv.as_bytes(), &LoaderConfig::default(), None).unwrap_err();
    assert!(err.is_data_integrity());
    assert!(matches!(err, PipelineError::AliasedPeriod { ref symbol, .. } if symbol == "AAA"));
}

#[test]
fn test_fill_limit_is_configurable() {
    let csv = synthetic_csv(8, &["AAA", "BBB"], 8);
    let panel = load(&csv);
    let one = pipeline().run(&panel).unwrap();
    let two = FeaturePipeline::new(PipelineConfig {
        fill_limit: 2,
        ..PipelineConfig::default()
    })
    .unwrap()
    .run(&panel)
    .unwrap();

    assert_eq!(one.columns(), two.columns());
    assert_eq!(one.labels(), two.labels());
}

#[test]
fn test_label_uses_outcome_one_year_ahead() {
    use fd_features::label::{LABEL, outperformance_labels};
    use polars::prelude::*;

    let dates: Vec<String> = (0..5).map(|q| format!("{}-03-28", 2015 + q)).collect();
    let momentum = Panel::new(
        df![
            "symbol" => ["A", "A", "A", "A", "A", "B", "B", "B", "B", "B", "C", "C", "C", "C", "C"],
            "date" => [&dates[..], &dates[..], &dates[..]].concat(),
            "pct_change_4" => [
                None, None, None, None, Some(0.30),
                None, None, None, None, Some(0.25),
                None, None, None, None, Some(0.10),
            ],
        ]
        .unwrap(),
    )
    .unwrap();

    let labels = outperformance_labels(&momentum, 4).unwrap();
    let y: Vec<i32> = labels
        .frame()
        .column(LABEL)
        .unwrap()
        .i32()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(y, vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
}
