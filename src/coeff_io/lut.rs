//! Lookup-table file I/O.
//!
//! Format: a `row` column (plus `bank` for the per-bank variant) and two
//! caller-named value columns. Reading merges into the existing table:
//! rows the file does not mention keep their current contents. Writing
//! emits all active rows.

use std::collections::HashMap;
use std::io::{Read, Write};

use log::debug;

use super::table::{parse_cell_i64, row_matches_all_criteria, CsvTable, MatchCriteria};
use crate::error::Result;
use crate::num::SampleInt;
use crate::signal_processing::lut::{StepLut, StepLutBank};

/// Read entries into a single lookup table, taking every row.
pub fn read_lut<In: SampleInt, Out: SampleInt, R: Read, const ROWS: usize>(
    input: R,
    lut: &mut StepLut<In, Out, ROWS>,
    infield: &str,
    outfield: &str,
) -> Result<()> {
    read_lut_filtered(input, lut, infield, outfield, &[])
}

/// Read entries into a single lookup table; only rows matching all
/// `criteria` columns are used.
pub fn read_lut_filtered<In: SampleInt, Out: SampleInt, R: Read, const ROWS: usize>(
    input: R,
    lut: &mut StepLut<In, Out, ROWS>,
    infield: &str,
    outfield: &str,
    criteria: &MatchCriteria,
) -> Result<()> {
    let table = CsvTable::read(input)?;
    let mut rows_used = 0usize;

    for ridx in 0..table.row_count() {
        let row = table.row_cells(ridx);
        if !row_matches_all_criteria(&row, criteria) {
            continue;
        }
        let cell = |name: &str| row.get(name).map_or("", String::as_str);

        let lut_row = usize::try_from(parse_cell_i64(cell("row"))).unwrap_or(usize::MAX);
        let inval = In::from_i64_signed(parse_cell_i64(cell(infield)));
        let outval = Out::from_i64_signed(parse_cell_i64(cell(outfield)));

        // Out-of-range rows are dropped by the setter.
        lut.set_entry(lut_row, inval, outval);
        rows_used += 1;
    }

    debug!("lut read: {} rows applied", rows_used);
    Ok(())
}

/// Read entries into a per-bank lookup table set, taking every row and
/// leaving bank numbers as-is.
pub fn read_lut_per_bank<
    In: SampleInt,
    Out: SampleInt,
    R: Read,
    const ROWS: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    input: R,
    lut: &mut StepLutBank<In, Out, ROWS, BANKS, CHANS>,
    infield: &str,
    outfield: &str,
) -> Result<()> {
    read_lut_per_bank_filtered(input, lut, infield, outfield, &[], &HashMap::new())
}

/// Read entries into a per-bank lookup table set, with row criteria and
/// bank remapping (`old -> new`).
pub fn read_lut_per_bank_filtered<
    In: SampleInt,
    Out: SampleInt,
    R: Read,
    const ROWS: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    input: R,
    lut: &mut StepLutBank<In, Out, ROWS, BANKS, CHANS>,
    infield: &str,
    outfield: &str,
    criteria: &MatchCriteria,
    bank_remap: &HashMap<i64, i64>,
) -> Result<()> {
    let table = CsvTable::read(input)?;

    for ridx in 0..table.row_count() {
        let row = table.row_cells(ridx);
        if !row_matches_all_criteria(&row, criteria) {
            continue;
        }
        let cell = |name: &str| row.get(name).map_or("", String::as_str);

        let lut_row = usize::try_from(parse_cell_i64(cell("row"))).unwrap_or(usize::MAX);
        let mut bank = parse_cell_i64(cell("bank"));
        if let Some(&mapped) = bank_remap.get(&bank) {
            bank = mapped;
        }
        let bank_idx = usize::try_from(bank).unwrap_or(usize::MAX);

        let inval = In::from_i64_signed(parse_cell_i64(cell(infield)));
        let outval = Out::from_i64_signed(parse_cell_i64(cell(outfield)));

        lut.set_one_entry(bank_idx, lut_row, inval, outval);
    }

    Ok(())
}

/// Write a single lookup table's active rows, without extra columns.
pub fn write_lut<In: SampleInt, Out: SampleInt, W: Write, const ROWS: usize>(
    output: W,
    lut: &StepLut<In, Out, ROWS>,
    infield: &str,
    outfield: &str,
    want_header: bool,
) -> Result<()> {
    write_lut_tagged(output, lut, infield, outfield, want_header, &[], &HashMap::new())
}

/// Write a single lookup table's active rows with extra constant columns.
pub fn write_lut_tagged<In: SampleInt, Out: SampleInt, W: Write, const ROWS: usize>(
    output: W,
    lut: &StepLut<In, Out, ROWS>,
    infield: &str,
    outfield: &str,
    want_header: bool,
    extra_col_order: &[String],
    extra_col_values: &HashMap<String, String>,
) -> Result<()> {
    let mut column_order: Vec<String> = extra_col_order.to_vec();
    column_order.push("row".to_string());
    column_order.push(infield.to_string());
    column_order.push(outfield.to_string());

    let mut series: HashMap<String, Vec<String>> = HashMap::new();
    for ridx in 0..lut.get_active_rows() {
        let (inval, outval) = lut.get_entry(ridx);
        series.entry("row".to_string()).or_default().push(ridx.to_string());
        series
            .entry(infield.to_string())
            .or_default()
            .push(inval.to_i64_signed().to_string());
        series
            .entry(outfield.to_string())
            .or_default()
            .push(outval.to_i64_signed().to_string());
        for name in extra_col_order {
            let value = extra_col_values.get(name).cloned().unwrap_or_default();
            series.entry(name.clone()).or_default().push(value);
        }
    }

    super::table::write_csv(output, &column_order, &series, want_header)
}

/// Write a per-bank lookup table set's active banks and rows, without
/// extra columns.
pub fn write_lut_per_bank<
    In: SampleInt,
    Out: SampleInt,
    W: Write,
    const ROWS: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    output: W,
    lut: &StepLutBank<In, Out, ROWS, BANKS, CHANS>,
    infield: &str,
    outfield: &str,
    want_header: bool,
) -> Result<()> {
    write_lut_per_bank_tagged(output, lut, infield, outfield, want_header, &[], &HashMap::new())
}

/// Write a per-bank lookup table set's active banks and rows with extra
/// constant columns.
pub fn write_lut_per_bank_tagged<
    In: SampleInt,
    Out: SampleInt,
    W: Write,
    const ROWS: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    output: W,
    lut: &StepLutBank<In, Out, ROWS, BANKS, CHANS>,
    infield: &str,
    outfield: &str,
    want_header: bool,
    extra_col_order: &[String],
    extra_col_values: &HashMap<String, String>,
) -> Result<()> {
    let mut column_order: Vec<String> = extra_col_order.to_vec();
    column_order.push("bank".to_string());
    column_order.push("row".to_string());
    column_order.push(infield.to_string());
    column_order.push(outfield.to_string());

    let mut series: HashMap<String, Vec<String>> = HashMap::new();
    for bidx in 0..lut.get_active_banks() {
        for ridx in 0..lut.get_active_rows() {
            let (inval, outval) = lut.get_one_entry(bidx, ridx);
            series.entry("bank".to_string()).or_default().push(bidx.to_string());
            series.entry("row".to_string()).or_default().push(ridx.to_string());
            series
                .entry(infield.to_string())
                .or_default()
                .push(inval.to_i64_signed().to_string());
            series
                .entry(outfield.to_string())
                .or_default()
                .push(outval.to_i64_signed().to_string());
            for name in extra_col_order {
                let value = extra_col_values.get(name).cloned().unwrap_or_default();
                series.entry(name.clone()).or_default().push(value);
            }
        }
    }

    super::table::write_csv(output, &column_order, &series, want_header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_lut_round_trip() {
        let mut lut: StepLut<i32, i32, 8> = StepLut::new();
        lut.set_entry(0, 100, -10);
        lut.set_entry(1, 50, -5);
        lut.set_entry(2, 25, -2);
        lut.set_active_rows(3);

        let mut csv_bytes = Vec::new();
        write_lut(&mut csv_bytes, &lut, "period", "delay", true).unwrap();

        let mut restored: StepLut<i32, i32, 8> = StepLut::new();
        read_lut(csv_bytes.as_slice(), &mut restored, "period", "delay").unwrap();
        restored.set_active_rows(3);

        for ridx in 0..3 {
            assert_eq!(restored.get_entry(ridx), lut.get_entry(ridx));
        }
    }

    #[test]
    fn test_read_merges_into_existing_rows() {
        let mut lut: StepLut<i32, i32, 4> = StepLut::new();
        lut.set_entry(0, 1, 10);
        lut.set_entry(1, 2, 20);
        lut.set_active_rows(2);

        // File only mentions row 1.
        let csv = "\"row\",\"period\",\"delay\"\n1,99,990\n";
        read_lut(csv.as_bytes(), &mut lut, "period", "delay").unwrap();

        assert_eq!(lut.get_entry(0), (1, 10)); // untouched
        assert_eq!(lut.get_entry(1), (99, 990));
    }

    #[test]
    fn test_per_bank_round_trip_with_remap() {
        let mut banked: StepLutBank<u32, u32, 4, 2, 1> = StepLutBank::new();
        banked.set_one_entry(0, 0, 40, 4);
        banked.set_one_entry(1, 0, 80, 8);
        banked.set_active_banks(2);
        banked.set_active_rows(1);

        let mut csv_bytes = Vec::new();
        write_lut_per_bank(&mut csv_bytes, &banked, "period", "delay", true).unwrap();

        // Swap the banks on the way back in.
        let mut remap = HashMap::new();
        remap.insert(0i64, 1i64);
        remap.insert(1i64, 0i64);

        let mut restored: StepLutBank<u32, u32, 4, 2, 1> = StepLutBank::new();
        read_lut_per_bank_filtered(
            csv_bytes.as_slice(),
            &mut restored,
            "period",
            "delay",
            &[],
            &remap,
        )
        .unwrap();

        assert_eq!(restored.get_one_entry(0, 0), (80, 8));
        assert_eq!(restored.get_one_entry(1, 0), (40, 4));
    }

    #[test]
    fn test_criteria_filter_rows() {
        let csv = "\"row\",\"period\",\"delay\",\"rig\"\n0,10,1,a\n1,20,2,b\n";
        let criteria = vec![("rig".to_string(), "b".to_string())];

        let mut lut: StepLut<i32, i32, 4> = StepLut::new();
        read_lut_filtered(csv.as_bytes(), &mut lut, "period", "delay", &criteria).unwrap();

        assert_eq!(lut.get_entry(0), (0, 0));
        assert_eq!(lut.get_entry(1), (20, 2));
    }

    #[test]
    fn test_negative_values_survive_unsigned_tables() {
        let mut lut: StepLut<u32, u32, 2> = StepLut::new();
        lut.set_entry(0, 10, 0u32.wrapping_sub(3));
        lut.set_active_rows(1);

        let mut csv_bytes = Vec::new();
        write_lut(&mut csv_bytes, &lut, "in", "out", true).unwrap();
        // Written as signed text.
        assert!(String::from_utf8(csv_bytes.clone()).unwrap().contains("\"-3\""));

        let mut restored: StepLut<u32, u32, 2> = StepLut::new();
        read_lut(csv_bytes.as_slice(), &mut restored, "in", "out").unwrap();
        assert_eq!(restored.get_entry(0), (10, 0u32.wrapping_sub(3)));
    }
}
