// Primitives for reading the CSV export of the poll history.

use std::io::Read;

use csv::Reader;

use crate::polls::{io_common::parse_end_time, *};

/// Reads the whole export. The first line is a header and is skipped.
pub fn read_csv_history(path: &str) -> PollsResult<Dataset> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let data = read_records(rdr)?;
    info!(
        "read_csv_history: read {} polls from {}",
        data.len(),
        simplify_file_name(path)
    );
    Ok(data)
}

pub fn read_records<R: Read>(rdr: Reader<R>) -> PollsResult<Dataset> {
    let mut rows: Vec<Row> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let row = parse_row(&line, lineno)?;
        debug!("read_records: lineno: {:?} row: {:?}", lineno, row);
        rows.push(row);
    }
    Ok(Dataset::new(rows))
}

fn parse_row(line: &csv::StringRecord, lineno: usize) -> PollsResult<Row> {
    let mut row: Row = [0.0; NUM_COLUMNS];
    for (column, cell) in row.iter_mut().enumerate() {
        let value = line
            .get(column)
            .context(CsvLineTooShortSnafu { lineno, column })?
            .trim();
        *cell = if column == END_TIME {
            parse_end_time(value).context(TimestampSnafu { lineno, value })?
        } else {
            value
                .parse::<f64>()
                .context(CsvNumberSnafu {
                    lineno,
                    column,
                    value,
                })?
        };
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_str(content: &str) -> PollsResult<Dataset> {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());
        read_records(rdr)
    }

    const HEADER: &str =
        "round,end_time,game_mode,beatmapset_id,topic_id,yes_count,no_count\n";

    #[test]
    fn reads_known_row() {
        let data = read_str(&format!(
            "{}1,2020-01-01T00:00:00+00:00,0,5,9,3,1\n",
            HEADER
        ))
        .unwrap();
        assert_eq!(
            data.rows(),
            &[[1.0, 1577836800.0, 0.0, 5.0, 9.0, 3.0, 1.0]]
        );
    }

    #[test]
    fn ignores_trailing_columns_and_spaces() {
        let data = read_str(&format!(
            "{}2, 2021-06-01T12:00:00+00:00 ,3,10,20,7.0,2,extra\n1,2020-01-01T00:00:00+00:00,1,5,9,3,1\n",
            HEADER
        ))
        .unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.rows()[0][GAMEMODE], 3.0);
        assert_eq!(data.rows()[0][NUM_YES], 7.0);
        assert_eq!(data.rows()[1][GAMEMODE], 1.0);
    }

    #[test]
    fn header_only_is_empty() {
        assert!(read_str(HEADER).unwrap().is_empty());
    }

    #[test]
    fn short_line_is_reported() {
        let err = read_str(&format!("{}1,2020-01-01T00:00:00+00:00,0,5\n", HEADER)).unwrap_err();
        assert!(matches!(
            err,
            PollsError::CsvLineTooShort {
                lineno: 2,
                column: 4
            }
        ));
    }

    #[test]
    fn bad_cells_are_reported() {
        let err = read_str(&format!(
            "{}1,2020-01-01T00:00:00+00:00,0,5,9,three,1\n",
            HEADER
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            PollsError::CsvNumber {
                lineno: 2,
                column: 5,
                ..
            }
        ));

        let err = read_str(&format!("{}1,yesterday,0,5,9,3,1\n", HEADER)).unwrap_err();
        assert!(matches!(err, PollsError::Timestamp { lineno: 2, .. }));
    }
}
