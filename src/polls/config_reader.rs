use crate::polls::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

pub const DEFAULT_CHART_WIDTH: u32 = 1000;
pub const DEFAULT_CHART_HEIGHT: u32 = 800;

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSettings {
    #[serde(rename = "thresholdPoints")]
    pub threshold_points: Option<usize>,
    #[serde(rename = "numBins")]
    pub num_bins: Option<usize>,
    #[serde(rename = "passThreshold")]
    pub pass_threshold: Option<f64>,
}

/// The optional settings file. Every field falls back to a built-in default.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "dataPath")]
    pub data_path: Option<String>,
    #[serde(rename = "csvPath")]
    pub csv_path: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "chartWidth")]
    pub chart_width: Option<u32>,
    #[serde(rename = "chartHeight")]
    pub chart_height: Option<u32>,
    pub rules: Option<RulesSettings>,
}

impl Settings {
    pub fn data_path(&self, flag: &Option<String>) -> String {
        pick(flag, &self.data_path, DEFAULT_DATA_PATH)
    }

    pub fn csv_path(&self, flag: &Option<String>) -> String {
        pick(flag, &self.csv_path, DEFAULT_CSV_PATH)
    }

    pub fn output_directory(&self, flag: &Option<String>) -> String {
        pick(flag, &self.output_directory, DEFAULT_OUTPUT_DIRECTORY)
    }

    pub fn chart_size(&self) -> PollsResult<(u32, u32)> {
        let width = self.chart_width.unwrap_or(DEFAULT_CHART_WIDTH);
        let height = self.chart_height.unwrap_or(DEFAULT_CHART_HEIGHT);
        ensure!(
            width > 0 && height > 0,
            InvalidSettingsSnafu {
                message: format!("chart size must not be empty, got {}x{}", width, height)
            }
        );
        Ok((width, height))
    }

    /// The analysis rules, with the defaults filled in. Fails on out-of-range values.
    pub fn rules(&self) -> PollsResult<AnalysisRules> {
        let defaults = AnalysisRules::DEFAULT_RULES;
        let rs = self.rules.clone().unwrap_or_default();
        let rules = AnalysisRules {
            threshold_points: rs.threshold_points.unwrap_or(defaults.threshold_points),
            num_bins: rs.num_bins.unwrap_or(defaults.num_bins),
            pass_threshold: rs.pass_threshold.unwrap_or(defaults.pass_threshold),
        };
        rules.validate().context(InvalidRulesSnafu {})?;
        Ok(rules)
    }
}

fn pick(flag: &Option<String>, setting: &Option<String>, default: &str) -> String {
    flag.clone()
        .or_else(|| setting.clone())
        .unwrap_or_else(|| default.to_string())
}

pub fn read_settings(path: &str) -> PollsResult<Settings> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let settings: Settings =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_settings: {:?}", settings);
    Ok(settings)
}

pub fn read_summary(path: &str) -> PollsResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}
