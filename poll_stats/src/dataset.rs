pub use crate::config::*;

/// The loaded poll history, one row per poll, in the fixed column layout.
///
/// The dataset is read-only once built. Selections produce new datasets.
///
/// ```
/// use poll_stats::dataset::Dataset;
/// use poll_stats::GameMode;
///
/// let data = Dataset::new(vec![
///     [1.0, 1577836800.0, 0.0, 5.0, 9.0, 3.0, 1.0],
///     [1.0, 1577836800.0, 3.0, 6.0, 10.0, 8.0, 0.0],
/// ]);
///
/// let mask = data.gamemode_mask(GameMode::Mania);
/// assert_eq!(mask, vec![false, true]);
/// assert_eq!(data.select(&mask).len(), 1);
/// ```
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Dataset {
        Dataset { rows }
    }

    pub fn from_records(records: &[PollRecord]) -> Dataset {
        Dataset {
            rows: records.iter().map(|r| r.to_row()).collect(),
        }
    }

    /// Builds a dataset out of a flat, row-major buffer.
    ///
    /// Returns None if the buffer does not hold a whole number of rows.
    pub fn from_flat(values: &[f64]) -> Option<Dataset> {
        if values.len() % NUM_COLUMNS != 0 {
            return None;
        }
        let rows = values
            .chunks_exact(NUM_COLUMNS)
            .map(|chunk| {
                let mut row = [0.0; NUM_COLUMNS];
                row.copy_from_slice(chunk);
                row
            })
            .collect();
        Some(Dataset { rows })
    }

    /// The row-major buffer, as written to disk.
    pub fn to_flat(&self) -> Vec<f64> {
        self.rows.iter().flat_map(|r| r.iter().copied()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column(&self, column: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[column]).collect()
    }

    /// The rows that belong to the given game mode.
    pub fn gamemode_mask(&self, mode: GameMode) -> Vec<bool> {
        let code = mode.code() as f64;
        self.rows.iter().map(|r| r[GAMEMODE] == code).collect()
    }

    /// Keeps the rows whose mask entry is set. Rows past the end of the mask are dropped.
    pub fn select(&self, mask: &[bool]) -> Dataset {
        Dataset {
            rows: self
                .rows
                .iter()
                .zip(mask.iter())
                .filter(|(_, keep)| **keep)
                .map(|(r, _)| *r)
                .collect(),
        }
    }

    /// Typed view of all the rows.
    pub fn records(&self) -> Result<Vec<PollRecord>, StatsError> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| PollRecord::from_row(row, idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(gamemode: f64, yes: f64, no: f64) -> Row {
        [3.0, 1600000000.0, gamemode, 100.0, 200.0, yes, no]
    }

    #[test]
    fn flat_buffer_keeps_row_order() {
        let data = Dataset::new(vec![row(0.0, 1.0, 2.0), row(2.0, 3.0, 4.0)]);
        let flat = data.to_flat();
        assert_eq!(flat.len(), 14);
        assert_eq!(flat[GAMEMODE], 0.0);
        assert_eq!(flat[NUM_COLUMNS + GAMEMODE], 2.0);
        assert_eq!(Dataset::from_flat(&flat), Some(data));
    }

    #[test]
    fn flat_buffer_with_partial_row_is_rejected() {
        assert_eq!(Dataset::from_flat(&[0.0; 10]), None);
        assert_eq!(Dataset::from_flat(&[]), Some(Dataset::default()));
    }

    #[test]
    fn masks_of_all_modes_are_disjoint() {
        let data = Dataset::new(vec![
            row(0.0, 1.0, 0.0),
            row(1.0, 1.0, 0.0),
            row(3.0, 1.0, 0.0),
            row(0.0, 1.0, 0.0),
        ]);
        let masks: Vec<Vec<bool>> = GameMode::ALL
            .iter()
            .map(|m| data.gamemode_mask(*m))
            .collect();
        for idx in 0..data.len() {
            assert_eq!(masks.iter().filter(|m| m[idx]).count(), 1);
        }
        assert_eq!(data.select(&masks[0]).len(), 2);
        assert!(data.select(&masks[2]).is_empty());
    }

    #[test]
    fn column_extracts_values() {
        let data = Dataset::new(vec![row(0.0, 7.0, 1.0), row(1.0, 2.0, 5.0)]);
        assert_eq!(data.column(NUM_YES), vec![7.0, 2.0]);
        assert_eq!(data.column(NUM_NO), vec![1.0, 5.0]);
    }

    #[test]
    fn records_reject_unknown_modes_and_bad_counts() {
        let data = Dataset::new(vec![row(0.0, 1.0, 0.0), row(4.0, 1.0, 0.0)]);
        assert_eq!(
            data.records(),
            Err(StatsError::UnknownGameMode { row: 1, code: 4.0 })
        );

        let data = Dataset::new(vec![row(1.0, 1.5, 0.0)]);
        assert_eq!(
            data.records(),
            Err(StatsError::MalformedRow {
                row: 0,
                column: NUM_YES,
                value: 1.5
            })
        );
    }

    #[test]
    fn records_reject_counts_out_of_range() {
        let data = Dataset::new(vec![[1e10, 0.0, 0.0, 1.0, 1.0, 2.0, 1.0]]);
        assert_eq!(
            data.records(),
            Err(StatsError::MalformedRow {
                row: 0,
                column: ROUND,
                value: 1e10
            })
        );

        let data = Dataset::new(vec![row(0.0, 2e19, 1.0)]);
        assert_eq!(
            data.records(),
            Err(StatsError::MalformedRow {
                row: 0,
                column: NUM_YES,
                value: 2e19
            })
        );

        // Each count fits, their sum does not.
        let data = Dataset::new(vec![row(0.0, 1.8e19, 1.8e19)]);
        assert_eq!(
            data.records(),
            Err(StatsError::MalformedRow {
                row: 0,
                column: NUM_NO,
                value: 1.8e19
            })
        );

        let data = Dataset::new(vec![[u32::MAX as f64, 0.0, 0.0, 1.0, 1.0, 2.0, 1.0]]);
        assert_eq!(data.records().unwrap()[0].round, u32::MAX);
    }

    #[test]
    fn records_round_trip_through_rows() {
        let data = Dataset::new(vec![[1.0, 1577836800.0, 0.0, 5.0, 9.0, 3.0, 1.0]]);
        let records = data.records().unwrap();
        assert_eq!(
            records[0],
            PollRecord {
                round: 1,
                end_time: 1577836800.0,
                gamemode: GameMode::Standard,
                beatmapset_id: 5,
                topic_id: 9,
                num_yes: 3,
                num_no: 1,
            }
        );
        assert_eq!(Dataset::from_records(&records), data);
    }
}
