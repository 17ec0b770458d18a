//! Column-oriented CSV tables.
//!
//! Coefficient files are small configuration-time artifacts, so the reader
//! keeps the whole table in memory as named columns and discards column
//! order. A header row is required; quoted cells have their outer quotes
//! stripped by the CSV parser. Extra columns are carried along untouched so
//! that annotated coefficient files survive a read-modify-write cycle.

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::error::Result;

/// Row-match criteria: `(column name, accepted value)` pairs. Several pairs
/// may name the same column, in which case any one of its values matches.
pub type MatchCriteria = [(String, String)];

/// A CSV table held as named columns of string cells.
#[derive(Clone, Debug, Default)]
pub struct CsvTable {
    columns: HashMap<String, Vec<String>>,
}

impl CsvTable {
    /// Read a whole CSV stream. The first row is the header; blank lines
    /// are skipped; short rows are padded with empty cells.
    pub fn read(input: impl Read) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);

        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut columns: HashMap<String, Vec<String>> =
            header.iter().map(|name| (name.clone(), Vec::new())).collect();

        for record in reader.records() {
            let record = record?;
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            for (cidx, name) in header.iter().enumerate() {
                let cell = record.get(cidx).unwrap_or("");
                if let Some(column) = columns.get_mut(name) {
                    column.push(cell.to_string());
                }
            }
        }

        Ok(Self { columns })
    }

    /// Number of rows: the longest column's length.
    pub fn row_count(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }

    /// All cells of one row, keyed by column name. Cells a short column
    /// does not have come back as the empty string.
    pub fn row_cells(&self, row: usize) -> HashMap<String, String> {
        self.columns
            .iter()
            .map(|(name, column)| {
                let cell = column.get(row).cloned().unwrap_or_default();
                (name.clone(), cell)
            })
            .collect()
    }

    /// Iterate over column names, in no particular order.
    pub fn column_names(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }
}

/// True when the row satisfies at least one accepted value for *every*
/// distinct column named in the criteria. An empty criteria list matches
/// everything.
pub fn row_matches_all_criteria(row: &HashMap<String, String>, criteria: &MatchCriteria) -> bool {
    let (_, matches_all) = match_criteria(row, criteria);
    matches_all
}

/// True when the row satisfies at least one criterion column. An empty
/// criteria list matches everything.
pub fn row_matches_any_criteria(row: &HashMap<String, String>, criteria: &MatchCriteria) -> bool {
    let (matches_any, _) = match_criteria(row, criteria);
    matches_any
}

fn match_criteria(row: &HashMap<String, String>, criteria: &MatchCriteria) -> (bool, bool) {
    if criteria.is_empty() {
        return (true, true);
    }

    let mut matches_any = false;
    let mut matches_all = true;
    let mut seen: Vec<&str> = Vec::new();

    for (column, _) in criteria.iter() {
        if seen.contains(&column.as_str()) {
            continue;
        }
        seen.push(column);

        let cell = row.get(column);
        let criterion_ok = criteria
            .iter()
            .filter(|(other, _)| other == column)
            .any(|(_, accepted)| cell.is_some_and(|value| value == accepted));

        matches_any = matches_any || criterion_ok;
        matches_all = matches_all && criterion_ok;
    }

    (matches_any, matches_all)
}

/// Write named data series as CSV in the given column order. Short series
/// are padded with empty cells; the header row is optional.
pub fn write_csv(
    output: impl Write,
    column_order: &[String],
    series: &HashMap<String, Vec<String>>,
    want_header: bool,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(output);

    if want_header {
        writer.write_record(column_order)?;
    }

    let row_count = column_order
        .iter()
        .filter_map(|name| series.get(name).map(Vec::len))
        .max()
        .unwrap_or(0);

    for ridx in 0..row_count {
        let row: Vec<&str> = column_order
            .iter()
            .map(|name| {
                series
                    .get(name)
                    .and_then(|column| column.get(ridx))
                    .map_or("", String::as_str)
            })
            .collect();
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Parse one numeric cell. Missing or malformed cells become zero; the
/// streaming core treats that as a valid (silent) configuration.
pub(crate) fn parse_cell_i64(cell: &str) -> i64 {
    cell.trim().parse::<i64>().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\"bank\",\"stage\",\"num0\",\"note\"\n0,0,17,steep\n0,1,-3,\n1,0,9,gentle\n";

    #[test]
    fn test_read_columns_and_rows() {
        let table = CsvTable::read(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 3);

        let row = table.row_cells(1);
        assert_eq!(row["bank"], "0");
        assert_eq!(row["num0"], "-3");
        assert_eq!(row["note"], "");
        // Cells from columns the row does not have are empty strings.
        assert_eq!(table.row_cells(0)["note"], "steep");
    }

    #[test]
    fn test_criteria_multimap_semantics() {
        let table = CsvTable::read(SAMPLE.as_bytes()).unwrap();
        let row = table.row_cells(0);

        let criteria = vec![
            ("bank".to_string(), "0".to_string()),
            ("bank".to_string(), "1".to_string()),
            ("stage".to_string(), "0".to_string()),
        ];
        assert!(row_matches_all_criteria(&row, &criteria));

        let criteria = vec![
            ("bank".to_string(), "1".to_string()),
            ("stage".to_string(), "0".to_string()),
        ];
        assert!(!row_matches_all_criteria(&row, &criteria));
        assert!(row_matches_any_criteria(&row, &criteria));

        assert!(row_matches_all_criteria(&row, &[]));
    }

    #[test]
    fn test_write_pads_short_columns() {
        let mut series: HashMap<String, Vec<String>> = HashMap::new();
        series.insert("a".into(), vec!["1".into(), "2".into()]);
        series.insert("b".into(), vec!["x".into()]);

        let mut out = Vec::new();
        write_csv(&mut out, &["a".into(), "b".into()], &series, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "\"a\",\"b\"\n\"1\",\"x\"\n\"2\",\"\"\n");
    }

    #[test]
    fn test_round_trip() {
        let table = CsvTable::read(SAMPLE.as_bytes()).unwrap();

        let mut series: HashMap<String, Vec<String>> = HashMap::new();
        for name in table.column_names() {
            let column: Vec<String> = (0..table.row_count())
                .map(|ridx| table.row_cells(ridx)[name].clone())
                .collect();
            series.insert(name.clone(), column);
        }

        let order: Vec<String> = ["bank", "stage", "num0", "note"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut out = Vec::new();
        write_csv(&mut out, &order, &series, true).unwrap();

        let reread = CsvTable::read(out.as_slice()).unwrap();
        assert_eq!(reread.row_count(), 3);
        for ridx in 0..3 {
            assert_eq!(reread.row_cells(ridx), table.row_cells(ridx));
        }
    }

    #[test]
    fn test_parse_cell_tolerates_garbage() {
        assert_eq!(parse_cell_i64("42"), 42);
        assert_eq!(parse_cell_i64(" -7 "), -7);
        assert_eq!(parse_cell_i64(""), 0);
        assert_eq!(parse_cell_i64("bogus"), 0);
    }
}
