use log::{debug, info, warn};

use poll_stats::dataset::Dataset;
use poll_stats::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_npy;
pub mod plot;

use crate::polls::config_reader::*;
use crate::polls::io_common::*;
use crate::polls::plot::{Layer, Panel, CURVE_COLOR, FAIL_COLOR, MEAN_COLOR, PASS_COLOR};

#[derive(Debug, Snafu)]
pub enum PollsError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of the CSV file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Line {lineno} is too short: column {column} is missing"))]
    CsvLineTooShort { lineno: usize, column: usize },
    #[snafu(display("Line {lineno}, column {column}: {value:?} is not a number"))]
    CsvNumber {
        source: std::num::ParseFloatError,
        lineno: usize,
        column: usize,
        value: String,
    },
    #[snafu(display("Line {lineno}: cannot read the timestamp {value:?}"))]
    Timestamp {
        source: chrono::ParseError,
        lineno: usize,
        value: String,
    },
    #[snafu(display("{path} is not a readable .npy file: {reason}"))]
    NpyHeader { path: String, reason: String },
    #[snafu(display("{path}: expected {expected} bytes of data, found {found}"))]
    NpyTruncated {
        path: String,
        expected: usize,
        found: usize,
    },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Invalid poll data"))]
    InvalidData { source: StatsError },
    #[snafu(display("Invalid analysis rules"))]
    InvalidRules { source: StatsError },
    #[snafu(display("Invalid settings: {message}"))]
    InvalidSettings { message: String },
    #[snafu(display("Error drawing chart {path}: {message}"))]
    DrawingChart { path: String, message: String },
    #[snafu(display("The summary differs from the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PollsResult<T> = Result<T, PollsError>;

/// The charts that can be drawn from a poll history.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AnalysisKind {
    LovedRate,
    Participation,
    Cycle,
}

impl AnalysisKind {
    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::LovedRate => "loved-rate",
            AnalysisKind::Participation => "participation",
            AnalysisKind::Cycle => "cycle",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            AnalysisKind::LovedRate => "loved_rate.svg",
            AnalysisKind::Participation => "participation.svg",
            AnalysisKind::Cycle => "cycle.svg",
        }
    }
}

/// Everything an analysis run needs, once flags and settings have been merged.
#[derive(PartialEq, Debug, Clone)]
pub struct AnalysisOptions {
    pub data_path: String,
    pub output_directory: String,
    pub chart_size: (u32, u32),
    pub rules: AnalysisRules,
    /// 'stdout' or a file path.
    pub summary: Option<String>,
    pub reference: Option<String>,
}

impl AnalysisOptions {
    /// Where the summary goes. An empty value means nowhere.
    pub fn summary_target(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.is_empty())
    }

    pub fn reference_path(&self) -> Option<&str> {
        self.reference.as_deref().filter(|s| !s.is_empty())
    }

    /// The cutoff table is only printed when stdout does not carry the JSON summary.
    pub fn prints_table(&self) -> bool {
        self.summary_target() != Some("stdout")
    }
}

pub fn run_convert(input: &str, output: &str) -> PollsResult<()> {
    info!("run_convert: converting {} to {}", input, output);
    let data = io_csv::read_csv_history(input)?;
    io_npy::write_npy(output, &data)?;
    Ok(())
}

/// Loads the history, runs one analysis over the four game modes, draws the
/// chart and returns the summary.
pub fn run_analysis(kind: AnalysisKind, opts: &AnalysisOptions) -> PollsResult<JSValue> {
    info!("run_analysis: {} with rules {:?}", kind.name(), opts.rules);
    let data = io_npy::read_npy(&opts.data_path)?;
    let (summary, panels) = analyze(kind, &data, &opts.rules, opts.prints_table())?;

    fs::create_dir_all(&opts.output_directory).with_whatever_context(|_| {
        format!(
            "Cannot create the output directory {}",
            opts.output_directory
        )
    })?;
    let chart_path = output_path(&opts.output_directory, kind.file_name());
    plot::render_svg(&chart_path, opts.chart_size, &panels)?;

    let summary = json!({
        "analysis": kind.name(),
        "source": opts.data_path,
        "records": data.len(),
        "modes": summary,
    });
    let pretty_js_stats = serde_json::to_string_pretty(&summary).context(WritingJsonSnafu {})?;
    match opts.summary_target() {
        Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, pretty_js_stats.as_bytes()).context(WritingFileSnafu { path })?;
            info!("run_analysis: wrote summary to {}", path);
        }
        None => {}
    }

    // The reference summary, if provided for comparison
    if let Some(reference_p) = opts.reference_path() {
        check_reference(reference_p, &pretty_js_stats)?;
    }
    Ok(summary)
}

/// Computes the per-mode summaries and chart panels of an analysis.
///
/// With `print_table`, the loved-rate analysis also prints its cutoff table.
pub fn analyze(
    kind: AnalysisKind,
    data: &Dataset,
    rules: &AnalysisRules,
    print_table: bool,
) -> PollsResult<(Vec<JSValue>, Vec<Panel>)> {
    let segments = segment(data).context(InvalidDataSnafu {})?;
    let res = match kind {
        AnalysisKind::LovedRate => {
            let results = analyze_segments(&segments, |s| loved_rate_curve(s, rules));
            if print_table {
                print!("{}", cutoff_table(&results));
            }
            (
                mode_summaries(&results, cutoffs_to_json),
                results.iter().map(loved_rate_panel).collect(),
            )
        }
        AnalysisKind::Participation => {
            let results = analyze_segments(&segments, |s| participation_profile(s, rules));
            let panels = segments
                .iter()
                .zip(results.iter())
                .map(|(s, r)| participation_panel(s, r))
                .collect();
            (mode_summaries(&results, binned_to_json), panels)
        }
        AnalysisKind::Cycle => {
            let results = analyze_segments(&segments, |s| {
                let points = cycle_points(s, rules);
                (!points.is_empty()).then_some(points)
            });
            (
                mode_summaries(&results, |points| cycle_to_json(points, rules)),
                results.iter().map(cycle_panel).collect(),
            )
        }
    };
    Ok(res)
}

fn check_reference(reference_p: &str, pretty_js_stats: &str) -> PollsResult<()> {
    let summary_ref = read_summary(reference_p)?;
    debug!("check_reference: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu {})?;
    // Both sides go through the same parser so that floats print identically.
    let stats: JSValue = serde_json::from_str(pretty_js_stats).context(WritingJsonSnafu {})?;
    let pretty_js_stats = serde_json::to_string_pretty(&stats).context(WritingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_stats.as_str(),
            "\n",
        );
        return ReferenceMismatchSnafu { path: reference_p }.fail();
    }
    info!("check_reference: summary matches {}", reference_p);
    Ok(())
}

// ******** Summaries *********

fn mode_summaries<T, F>(results: &[ModeAnalysis<T>], to_json: F) -> Vec<JSValue>
where
    F: Fn(&T) -> JSValue,
{
    results
        .iter()
        .map(|r| {
            json!({
                "mode": r.mode.name(),
                "records": r.records,
                "skipped": r.skipped,
                "result": r.result.as_ref().map(&to_json),
            })
        })
        .collect()
}

fn cutoffs_to_json(curve: &ThresholdCurve) -> JSValue {
    let cutoffs: Vec<JSValue> = curve
        .cutoffs(&LOVED_TARGETS)
        .iter()
        .map(|(target, threshold)| json!({"target": target, "threshold": threshold}))
        .collect();
    json!({ "cutoffs": cutoffs })
}

fn binned_to_json(bm: &BinnedMeans) -> JSValue {
    json!({
        "edges": bm.edges,
        "counts": bm.counts,
        "means": bm.means,
    })
}

fn cycle_to_json(points: &[CyclePoint], rules: &AnalysisRules) -> JSValue {
    let mut rounds: Vec<u32> = points.iter().map(|p| p.round).collect();
    rounds.sort_unstable();
    rounds.dedup();
    let passed = points.iter().filter(|p| p.passed).count();
    json!({
        "rounds": rounds.len(),
        "passed": passed,
        "failed": points.len() - passed,
        "pass_threshold": rules.pass_threshold,
    })
}

fn cutoff_table(results: &[ModeAnalysis<ThresholdCurve>]) -> String {
    let mut out = String::new();
    for r in results.iter() {
        out.push_str(&format!("{}:\n", r.mode.title()));
        match &r.result {
            Some(curve) => {
                for (target, threshold) in curve.cutoffs(&LOVED_TARGETS) {
                    let label = format!("{:.0}%", target * 100.0);
                    match threshold {
                        Some(t) => out.push_str(&format!("{:>6}: {:.3}\n", label, t)),
                        None => out.push_str(&format!("{:>6}: n/a\n", label)),
                    }
                }
            }
            None => out.push_str("  no data\n"),
        }
        out.push('\n');
    }
    out
}

// ******** Panels *********

fn loved_rate_panel(r: &ModeAnalysis<ThresholdCurve>) -> Panel {
    let panel = Panel::new(
        "% of Maps Loved vs % Yes Threshold",
        "% Yes Threshold",
        "% of Maps Loved",
    );
    match &r.result {
        Some(curve) => panel.with_layer(Layer::Line {
            points: curve.below_one(),
            color: CURVE_COLOR,
        }),
        None => panel,
    }
}

fn participation_panel(seg: &Segment, r: &ModeAnalysis<BinnedMeans>) -> Panel {
    let title = format!("{} participation vs % Yes votes", seg.mode.title());
    let panel = Panel::new(&title, "# Total Votes", "% Yes").with_layer(Layer::scatter(
        participation_points(&seg.records),
        PASS_COLOR,
    ));
    match &r.result {
        Some(bm) => panel.with_layer(Layer::Line {
            points: bm.points(),
            color: MEAN_COLOR,
        }),
        None => panel,
    }
}

fn cycle_panel(r: &ModeAnalysis<Vec<CyclePoint>>) -> Panel {
    let title = format!("{} cycle vs # total votes", r.mode.title());
    let panel = Panel::new(&title, "Cycle", "# Total Votes");
    match &r.result {
        Some(points) => {
            let xy = points
                .iter()
                .map(|p| (p.round as f64, p.total_votes as f64))
                .collect();
            let colors = points
                .iter()
                .map(|p| if p.passed { PASS_COLOR } else { FAIL_COLOR })
                .collect();
            panel.with_layer(Layer::Scatter { points: xy, colors })
        }
        None => panel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(gamemode: GameMode, round: u32, yes: u64, no: u64) -> PollRecord {
        PollRecord {
            round,
            end_time: 1600000000.0,
            gamemode,
            beatmapset_id: 10,
            topic_id: 20,
            num_yes: yes,
            num_no: no,
        }
    }

    fn history() -> Dataset {
        Dataset::from_records(&[
            poll(GameMode::Standard, 1, 80, 20),
            poll(GameMode::Standard, 1, 95, 5),
            poll(GameMode::Standard, 2, 100, 0),
            poll(GameMode::Taiko, 2, 40, 60),
            poll(GameMode::Taiko, 3, 0, 0),
            poll(GameMode::Mania, 3, 300, 20),
        ])
    }

    fn options(dir: &str) -> AnalysisOptions {
        AnalysisOptions {
            data_path: output_path(dir, "history.npy"),
            output_directory: dir.to_string(),
            chart_size: (600, 400),
            rules: AnalysisRules::DEFAULT_RULES,
            summary: Some(output_path(dir, "summary.json")),
            reference: None,
        }
    }

    #[test]
    fn loved_rate_summary() {
        let (summary, panels) = analyze(
            AnalysisKind::LovedRate,
            &history(),
            &AnalysisRules::DEFAULT_RULES,
            false,
        )
        .unwrap();
        assert_eq!(summary.len(), 4);
        assert_eq!(panels.len(), 4);

        assert_eq!(summary[0]["mode"], "std");
        assert_eq!(summary[0]["records"], 3);
        let cutoffs = summary[0]["result"]["cutoffs"].as_array().unwrap();
        assert_eq!(cutoffs.len(), LOVED_TARGETS.len());
        assert_eq!(cutoffs[0]["target"], 1.0);
        // Every standard poll has at least 80% of yes votes.
        let full = cutoffs[0]["threshold"].as_f64().unwrap();
        assert!(full > 0.8 && full < 0.81);
        // Only the unanimous poll passes above 95%.
        assert_eq!(cutoffs[6]["target"], 0.5);
        assert!(cutoffs[6]["threshold"].as_f64().unwrap() > 0.95);

        assert_eq!(summary[1]["skipped"], 1);
        assert_eq!(summary[2]["result"], JSValue::Null);
        assert!(!panels[2].has_data());
    }

    #[test]
    fn participation_summary() {
        let (summary, panels) = analyze(
            AnalysisKind::Participation,
            &history(),
            &AnalysisRules::DEFAULT_RULES,
            false,
        )
        .unwrap();
        let std = &summary[0]["result"];
        assert_eq!(std["edges"].as_array().unwrap().len(), 21);
        assert_eq!(std["counts"].as_array().unwrap().len(), 20);
        assert_eq!(std["means"].as_array().unwrap().len(), 20);
        // All standard polls have 100 votes.
        assert_eq!(std["edges"][0], 99.5);
        let taiko_counts: u64 = summary[1]["result"]["counts"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c.as_u64())
            .sum();
        assert_eq!(taiko_counts, 1);
        assert_eq!(panels[0].title, "Std participation vs % Yes votes");
        assert_eq!(panels[0].layers.len(), 2);
        assert_eq!(panels[2].layers.len(), 1);
        assert!(!panels[2].has_data());
    }

    #[test]
    fn cycle_summary() {
        let (summary, panels) = analyze(
            AnalysisKind::Cycle,
            &history(),
            &AnalysisRules::DEFAULT_RULES,
            false,
        )
        .unwrap();
        assert_eq!(summary[0]["result"]["rounds"], 2);
        assert_eq!(summary[0]["result"]["passed"], 2);
        assert_eq!(summary[0]["result"]["failed"], 1);
        assert_eq!(summary[1]["result"]["passed"], 0);
        assert_eq!(summary[2]["result"], JSValue::Null);
        assert_eq!(panels[3].title, "Mania cycle vs # total votes");
        match &panels[0].layers[0] {
            Layer::Scatter { colors, .. } => {
                assert_eq!(colors[0], FAIL_COLOR);
                assert_eq!(colors[1], PASS_COLOR);
            }
            l => panic!("unexpected layer {:?}", l),
        }
    }

    #[test]
    fn unknown_modes_fail_the_analysis() {
        let data = Dataset::new(vec![[1.0, 0.0, 9.0, 1.0, 1.0, 1.0, 1.0]]);
        let res = analyze(
            AnalysisKind::Cycle,
            &data,
            &AnalysisRules::DEFAULT_RULES,
            false,
        );
        assert!(matches!(res, Err(PollsError::InvalidData { .. })));
    }

    #[test]
    fn convert_then_analyze() {
        let dir = tempfile::tempdir().unwrap();
        let dir_s = dir.path().to_str().unwrap();
        let csv_path = output_path(dir_s, "poll_history.csv");
        fs::write(
            &csv_path,
            "round,end_time,game_mode,beatmapset_id,topic_id,yes_count,no_count\n\
             1,2020-01-01T00:00:00+00:00,0,5,9,3,1\n",
        )
        .unwrap();
        let opts = options(dir_s);
        run_convert(&csv_path, &opts.data_path).unwrap();

        let data = io_npy::read_npy(&opts.data_path).unwrap();
        assert_eq!(data.rows(), &[[1.0, 1577836800.0, 0.0, 5.0, 9.0, 3.0, 1.0]]);

        let summary = run_analysis(AnalysisKind::LovedRate, &opts).unwrap();
        assert_eq!(summary["records"], 1);
        assert!(fs::metadata(output_path(dir_s, "loved_rate.svg")).is_ok());

        // The written summary is a valid reference for the next run.
        let reference = AnalysisOptions {
            summary: None,
            reference: opts.summary.clone(),
            ..opts.clone()
        };
        run_analysis(AnalysisKind::LovedRate, &reference).unwrap();

        let mismatch = AnalysisOptions {
            summary: None,
            reference: opts.summary.clone(),
            ..opts
        };
        let res = run_analysis(AnalysisKind::Cycle, &mismatch);
        assert!(matches!(res, Err(PollsError::ReferenceMismatch { .. })));
    }

    #[test]
    fn cutoff_table_lists_every_mode() {
        let segments = segment(&history()).unwrap();
        let results = analyze_segments(&segments, |s| {
            loved_rate_curve(s, &AnalysisRules::DEFAULT_RULES)
        });
        let table = cutoff_table(&results);
        assert!(table.starts_with("Std:\n  100%: 0.801\n"));
        assert!(table.contains("Catch:\n  no data\n"));
        assert_eq!(table.matches("  50%:").count(), 3);
    }

    #[test]
    fn stdout_summary_is_not_mixed_with_the_table() {
        let mut opts = options("charts");
        assert!(opts.prints_table());
        opts.summary = Some("stdout".to_string());
        assert_eq!(opts.summary_target(), Some("stdout"));
        assert!(!opts.prints_table());
    }

    #[test]
    fn empty_summary_and_reference_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let dir_s = dir.path().to_str().unwrap();
        let opts = AnalysisOptions {
            summary: Some(String::new()),
            reference: Some(String::new()),
            ..options(dir_s)
        };
        assert_eq!(opts.summary_target(), None);
        assert_eq!(opts.reference_path(), None);
        assert!(opts.prints_table());

        io_npy::write_npy(&opts.data_path, &history()).unwrap();
        let summary = run_analysis(AnalysisKind::Participation, &opts).unwrap();
        assert_eq!(summary["records"], 6);
        assert!(fs::metadata(output_path(dir_s, "participation.svg")).is_ok());
    }

    #[test]
    fn missing_history_is_reported() {
        let opts = options("/nonexistent/dir");
        assert!(matches!(
            run_analysis(AnalysisKind::Cycle, &opts),
            Err(PollsError::OpeningFile { .. })
        ));
    }
}
