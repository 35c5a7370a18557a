mod config;
pub mod dataset;
pub mod manual;

use log::{debug, info};

use crate::dataset::Dataset;

pub use crate::config::*;

/// The polls of a single game mode.
#[derive(PartialEq, Debug, Clone)]
pub struct Segment {
    pub mode: GameMode,
    pub records: Vec<PollRecord>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The number of polls that received no vote at all.
    pub fn degenerate_count(&self) -> usize {
        self.records.iter().filter(|r| r.total_votes() == 0).count()
    }
}

/// The outcome of running one aggregation over one segment.
#[derive(PartialEq, Debug, Clone)]
pub struct ModeAnalysis<T> {
    pub mode: GameMode,
    pub records: usize,
    /// Polls left out of the computation because they had no vote.
    pub skipped: usize,
    /// None when the segment had nothing to aggregate.
    pub result: Option<T>,
}

/// Splits the dataset into the four game modes, in display order.
///
/// Every row ends up in exactly one segment. Fails if a row carries a
/// game-mode code outside of the four known ones, or a count that is not a
/// non-negative integer.
pub fn segment(data: &Dataset) -> Result<Vec<Segment>, StatsError> {
    // Validates the whole dataset before any mask is applied.
    data.records()?;
    let mut segments: Vec<Segment> = Vec::new();
    for mode in GameMode::ALL {
        let mask = data.gamemode_mask(mode);
        let records = data.select(&mask).records()?;
        debug!("segment: mode {} has {} polls", mode, records.len());
        segments.push(Segment { mode, records });
    }
    Ok(segments)
}

/// Applies the same aggregation to every segment.
pub fn analyze_segments<T, F>(segments: &[Segment], aggregate: F) -> Vec<ModeAnalysis<T>>
where
    F: Fn(&Segment) -> Option<T>,
{
    segments
        .iter()
        .map(|seg| {
            let result = aggregate(seg);
            if result.is_none() {
                info!("analyze_segments: no data for mode {}", seg.mode);
            }
            ModeAnalysis {
                mode: seg.mode,
                records: seg.len(),
                skipped: seg.degenerate_count(),
                result,
            }
        })
        .collect()
}

/// The share of yes votes. None when the poll has no vote.
///
/// ```
/// assert_eq!(poll_stats::percent_yes(3, 1), Some(0.75));
/// assert_eq!(poll_stats::percent_yes(0, 0), None);
/// ```
pub fn percent_yes(num_yes: u64, num_no: u64) -> Option<f64> {
    if num_yes == 0 && num_no == 0 {
        None
    } else {
        // Summed as floats so that huge counts cannot overflow.
        Some(num_yes as f64 / (num_yes as f64 + num_no as f64))
    }
}

/// The yes shares of the polls that received at least one vote.
pub fn yes_percentages(records: &[PollRecord]) -> Vec<f64> {
    let res: Vec<f64> = records.iter().filter_map(|r| r.percent_yes()).collect();
    if res.len() < records.len() {
        debug!(
            "yes_percentages: skipped {} polls without votes",
            records.len() - res.len()
        );
    }
    res
}

/// `num` evenly spaced values from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (num - 1) as f64;
            let mut res: Vec<f64> = (0..num).map(|i| start + step * i as f64).collect();
            // Avoids accumulated rounding on the last point.
            res[num - 1] = end;
            res
        }
    }
}

/// The grid of yes-share thresholds, from 0 to 1.
pub fn threshold_grid(points: usize) -> Vec<f64> {
    linspace(0.0, 1.0, points)
}

/// For each threshold, the fraction of values greater or equal to it.
///
/// The values are sorted once and every threshold is located with a binary
/// search. Returns None when there is no value.
///
/// ```
/// let rates = poll_stats::threshold_passing_rates(&[0.9, 0.95, 1.0], &[0.0, 0.5, 1.0]).unwrap();
/// assert_eq!(rates, vec![1.0, 1.0, 1.0 / 3.0]);
/// ```
pub fn threshold_passing_rates(values: &[f64], thresholds: &[f64]) -> Option<Vec<f64>> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    Some(
        thresholds
            .iter()
            .map(|t| {
                let below = sorted.partition_point(|v| v < t);
                (n - below) as f64 / n as f64
            })
            .collect(),
    )
}

/// The passing-rate curve of a segment over the threshold grid of the rules.
pub fn loved_rate_curve(seg: &Segment, rules: &AnalysisRules) -> Option<ThresholdCurve> {
    let values = yes_percentages(&seg.records);
    let thresholds = threshold_grid(rules.threshold_points);
    let passing = threshold_passing_rates(&values, &thresholds)?;
    Some(ThresholdCurve {
        thresholds,
        passing,
    })
}

/// The edges of `num_bins` equal-width bins covering [min, max].
///
/// A single-valued range is widened by 0.5 on both sides so that the edges
/// stay strictly increasing.
pub fn bin_edges(min: f64, max: f64, num_bins: usize) -> Vec<f64> {
    let (lo, hi) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    linspace(lo, hi, num_bins + 1)
}

/// Mean of `y` over equal-width bins of `x`, for `(x, y)` points.
///
/// A value falls in bin `i` when `edges[i] <= x < edges[i + 1]`; the last bin
/// also contains its right edge. Returns None when there is no value.
pub fn binned_means(points: &[(f64, f64)], num_bins: usize) -> Option<BinnedMeans> {
    if points.is_empty() || num_bins == 0 {
        return None;
    }
    let min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let edges = bin_edges(min, max, num_bins);

    let mut sums = vec![0.0; num_bins];
    let mut counts = vec![0usize; num_bins];
    for (x, y) in points.iter() {
        let idx = edges
            .partition_point(|e| e <= x)
            .saturating_sub(1)
            .min(num_bins - 1);
        sums[idx] += y;
        counts[idx] += 1;
    }
    let means = sums
        .iter()
        .zip(counts.iter())
        .map(|(s, c)| if *c == 0 { None } else { Some(s / *c as f64) })
        .collect();
    Some(BinnedMeans {
        edges,
        counts,
        means,
    })
}

/// (total votes, yes share) of the polls with votes, sorted by total votes.
pub fn participation_points(records: &[PollRecord]) -> Vec<(f64, f64)> {
    let mut points: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|r| r.percent_yes().map(|p| (r.total_votes() as f64, p)))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
}

/// The binned mean of the yes share against the number of votes of a segment.
pub fn participation_profile(seg: &Segment, rules: &AnalysisRules) -> Option<BinnedMeans> {
    binned_means(&participation_points(&seg.records), rules.num_bins)
}

/// One point per poll for the cycle chart.
///
/// Polls without votes are kept, and never count as passing.
pub fn cycle_points(seg: &Segment, rules: &AnalysisRules) -> Vec<CyclePoint> {
    seg.records
        .iter()
        .map(|r| {
            let percent_yes = r.percent_yes();
            CyclePoint {
                round: r.round,
                total_votes: r.total_votes(),
                percent_yes,
                passed: percent_yes.map_or(false, |p| p > rules.pass_threshold),
            }
        })
        .collect()
}
