// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

// Column layout of a serialized poll history. The converter and every
// analysis agree on this order; there is no embedded schema.
pub const ROUND: usize = 0;
pub const END_TIME: usize = 1;
pub const GAMEMODE: usize = 2;
pub const BEATMAPSET_ID: usize = 3;
pub const TOPIC_ID: usize = 4;
pub const NUM_YES: usize = 5;
pub const NUM_NO: usize = 6;

pub const NUM_COLUMNS: usize = 7;

/// One row of the serialized array.
pub type Row = [f64; NUM_COLUMNS];

/// The four game modes a poll can be scoped to.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum GameMode {
    Standard,
    Taiko,
    Catch,
    Mania,
}

impl GameMode {
    /// All the modes, in the order they are segmented and displayed.
    pub const ALL: [GameMode; 4] = [
        GameMode::Standard,
        GameMode::Taiko,
        GameMode::Catch,
        GameMode::Mania,
    ];

    pub fn code(self) -> u8 {
        match self {
            GameMode::Standard => 0,
            GameMode::Taiko => 1,
            GameMode::Catch => 2,
            GameMode::Mania => 3,
        }
    }

    /// Returns the mode for a numeric code as stored in the array.
    /// Only exact integral codes 0..=3 are accepted.
    pub fn from_code(code: f64) -> Option<GameMode> {
        GameMode::ALL
            .iter()
            .find(|mode| mode.code() as f64 == code)
            .copied()
    }

    /// Short identifier, used as a key in summaries.
    pub fn name(self) -> &'static str {
        match self {
            GameMode::Standard => "std",
            GameMode::Taiko => "taiko",
            GameMode::Catch => "catch",
            GameMode::Mania => "mania",
        }
    }

    /// Capitalized name, used in chart titles.
    pub fn title(self) -> &'static str {
        match self {
            GameMode::Standard => "Std",
            GameMode::Taiko => "Taiko",
            GameMode::Catch => "Catch",
            GameMode::Mania => "Mania",
        }
    }
}

impl Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single community poll.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct PollRecord {
    pub round: u32,
    /// Seconds since the Unix epoch.
    pub end_time: f64,
    pub gamemode: GameMode,
    pub beatmapset_id: u64,
    pub topic_id: u64,
    pub num_yes: u64,
    pub num_no: u64,
}

impl PollRecord {
    /// Reads a record out of a row of the serialized array.
    ///
    /// `row_index` is only used to build the error.
    pub fn from_row(row: &Row, row_index: usize) -> Result<PollRecord, StatsError> {
        let gamemode = GameMode::from_code(row[GAMEMODE]).ok_or(StatsError::UnknownGameMode {
            row: row_index,
            code: row[GAMEMODE],
        })?;
        let round = read_count(row, ROUND, row_index)?;
        let round = u32::try_from(round).map_err(|_| malformed(row, ROUND, row_index))?;
        let num_yes = read_count(row, NUM_YES, row_index)?;
        let num_no = read_count(row, NUM_NO, row_index)?;
        // The total must stay representable.
        num_yes
            .checked_add(num_no)
            .ok_or_else(|| malformed(row, NUM_NO, row_index))?;
        Ok(PollRecord {
            round,
            end_time: row[END_TIME],
            gamemode,
            beatmapset_id: read_count(row, BEATMAPSET_ID, row_index)?,
            topic_id: read_count(row, TOPIC_ID, row_index)?,
            num_yes,
            num_no,
        })
    }

    pub fn to_row(&self) -> Row {
        let mut row = [0.0; NUM_COLUMNS];
        row[ROUND] = self.round as f64;
        row[END_TIME] = self.end_time;
        row[GAMEMODE] = self.gamemode.code() as f64;
        row[BEATMAPSET_ID] = self.beatmapset_id as f64;
        row[TOPIC_ID] = self.topic_id as f64;
        row[NUM_YES] = self.num_yes as f64;
        row[NUM_NO] = self.num_no as f64;
        row
    }

    pub fn total_votes(&self) -> u64 {
        self.num_yes.saturating_add(self.num_no)
    }

    /// The fraction of yes votes, or None if nobody voted.
    pub fn percent_yes(&self) -> Option<f64> {
        crate::percent_yes(self.num_yes, self.num_no)
    }
}

fn read_count(row: &Row, column: usize, row_index: usize) -> Result<u64, StatsError> {
    let x = row[column];
    // u64::MAX rounds up to 2^64 as a float, the first value out of range.
    if x.is_finite() && x >= 0.0 && x.fract() == 0.0 && x < u64::MAX as f64 {
        Ok(x as u64)
    } else {
        Err(malformed(row, column, row_index))
    }
}

fn malformed(row: &Row, column: usize, row_index: usize) -> StatsError {
    StatsError::MalformedRow {
        row: row_index,
        column,
        value: row[column],
    }
}

// ******** Output data structures *********

/// The empirical complementary CDF of the yes percentages of one segment.
#[derive(PartialEq, Debug, Clone)]
pub struct ThresholdCurve {
    pub thresholds: Vec<f64>,
    /// For each threshold, the fraction of polls with at least that share of yes votes.
    pub passing: Vec<f64>,
}

impl ThresholdCurve {
    /// The points of the curve where not every poll passes.
    pub fn below_one(&self) -> Vec<(f64, f64)> {
        self.thresholds
            .iter()
            .zip(self.passing.iter())
            .filter(|(_, p)| **p < 1.0)
            .map(|(t, p)| (*t, *p))
            .collect()
    }

    /// The first threshold at which the passing rate drops strictly below `target`.
    pub fn cutoff(&self, target: f64) -> Option<f64> {
        self.thresholds
            .iter()
            .zip(self.passing.iter())
            .find(|(_, p)| **p < target)
            .map(|(t, _)| *t)
    }

    /// Cutoffs for the given targets, in the same order.
    pub fn cutoffs(&self, targets: &[f64]) -> Vec<(f64, Option<f64>)> {
        targets.iter().map(|t| (*t, self.cutoff(*t))).collect()
    }
}

/// Mean of a value over equal-width bins of another value.
#[derive(PartialEq, Debug, Clone)]
pub struct BinnedMeans {
    /// num_bins + 1 strictly increasing edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    /// None for the bins that received no value.
    pub means: Vec<Option<f64>>,
}

impl BinnedMeans {
    pub fn num_bins(&self) -> usize {
        self.means.len()
    }

    /// (left edge, mean) for every populated bin.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.edges
            .iter()
            .zip(self.means.iter())
            .filter_map(|(e, m)| m.map(|m| (*e, m)))
            .collect()
    }
}

/// One poll on the cycle chart.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct CyclePoint {
    pub round: u32,
    pub total_votes: u64,
    pub percent_yes: Option<f64>,
    /// Whether the yes share is strictly above the pass threshold.
    pub passed: bool,
}

/// Errors that prevent the data from being interpreted.
#[derive(PartialEq, Debug, Clone)]
pub enum StatsError {
    /// A cell that should hold a non-negative integer does not.
    MalformedRow {
        row: usize,
        column: usize,
        value: f64,
    },
    UnknownGameMode {
        row: usize,
        code: f64,
    },
    InvalidRules(String),
}

impl Error for StatsError {}

impl Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::MalformedRow { row, column, value } => write!(
                f,
                "row {}: column {} holds {} instead of a count",
                row, column, value
            ),
            StatsError::UnknownGameMode { row, code } => {
                write!(f, "row {}: unknown game mode code {}", row, code)
            }
            StatsError::InvalidRules(msg) => write!(f, "invalid analysis rules: {}", msg),
        }
    }
}

// ********* Configuration **********

/// The loved rates for which a yes-vote cutoff is reported.
pub const LOVED_TARGETS: [f64; 7] = [1.00, 0.95, 0.90, 0.85, 0.80, 0.75, 0.50];

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct AnalysisRules {
    /// Number of equally spaced thresholds in [0, 1].
    pub threshold_points: usize,
    /// Number of bins for the participation chart.
    pub num_bins: usize,
    /// A poll passes if its yes share is strictly above this value.
    pub pass_threshold: f64,
}

impl AnalysisRules {
    pub const DEFAULT_RULES: AnalysisRules = AnalysisRules {
        threshold_points: 1000,
        num_bins: 20,
        pass_threshold: 0.85,
    };

    pub fn validate(&self) -> Result<(), StatsError> {
        if self.threshold_points < 2 {
            return Err(StatsError::InvalidRules(format!(
                "thresholdPoints must be at least 2, got {}",
                self.threshold_points
            )));
        }
        if self.num_bins == 0 {
            return Err(StatsError::InvalidRules(
                "numBins must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pass_threshold) {
            return Err(StatsError::InvalidRules(format!(
                "passThreshold must be within [0, 1], got {}",
                self.pass_threshold
            )));
        }
        Ok(())
    }
}

impl Default for AnalysisRules {
    fn default() -> Self {
        AnalysisRules::DEFAULT_RULES
    }
}
