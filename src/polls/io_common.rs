use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

// The locations used when neither the command line nor the settings name a file.
pub const DEFAULT_CSV_PATH: &str = "data/poll_history.csv";
pub const DEFAULT_DATA_PATH: &str = "data/player_skills.npy";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "data";

const END_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn output_path(directory: &str, file_name: &str) -> String {
    let p: PathBuf = [directory, file_name].iter().collect();
    p.display().to_string()
}

/// Seconds since the Unix epoch of a poll closing time.
///
/// The offset segment (everything from the first `+`) is dropped and the rest
/// is read as UTC.
pub fn parse_end_time(txt: &str) -> Result<f64, chrono::ParseError> {
    let local = txt.trim().split('+').next().unwrap_or("");
    let local = local.strip_suffix('Z').unwrap_or(local);
    let dt = NaiveDateTime::parse_from_str(local, END_TIME_FORMAT)?;
    Ok(dt.and_utc().timestamp() as f64)
}
