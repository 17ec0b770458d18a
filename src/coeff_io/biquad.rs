//! Biquad coefficient file I/O.
//!
//! Format: one CSV row per `(bank, stage)` pair with columns `bank, stage,
//! num0..num2, den0..den2`. `den0` must be a positive power of two; its bit
//! exponent is recovered by shifting. Extra columns are ignored on read and
//! may be emitted as constants on write, so one annotated file can hold
//! several filter sets selected by match criteria.

use std::collections::HashMap;
use std::io::{Read, Write};

use log::{debug, warn};

use super::table::{parse_cell_i64, row_matches_all_criteria, CsvTable, MatchCriteria};
use crate::error::Result;
use crate::num::SampleInt;
use crate::signal_processing::biquad::{BiquadBank, BiquadCoeffs};

/// Read coefficients from a CSV stream into the filter bank, taking every
/// row and leaving bank numbers as-is.
pub fn read_biquad_coeffs<
    S: SampleInt,
    R: Read,
    const STAGES: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    input: R,
    filter_bank: &mut BiquadBank<S, STAGES, BANKS, CHANS>,
) -> Result<()> {
    read_biquad_coeffs_filtered(input, filter_bank, &[], &HashMap::new())
}

/// Read coefficients from a CSV stream into the filter bank.
///
/// Only rows matching all `criteria` columns are used. Bank numbers found
/// in `bank_remap` are rewritten (`old -> new`) before the row is applied.
/// Rows naming banks or stages outside the compiled geometry are dropped.
pub fn read_biquad_coeffs_filtered<
    S: SampleInt,
    R: Read,
    const STAGES: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    input: R,
    filter_bank: &mut BiquadBank<S, STAGES, BANKS, CHANS>,
    criteria: &MatchCriteria,
    bank_remap: &HashMap<i64, i64>,
) -> Result<()> {
    let table = CsvTable::read(input)?;
    let mut rows_used = 0usize;

    for ridx in 0..table.row_count() {
        let row = table.row_cells(ridx);
        if !row_matches_all_criteria(&row, criteria) {
            continue;
        }

        let cell = |name: &str| row.get(name).map_or("", String::as_str);

        // Absent cells parse from the empty string, giving zero.
        let mut bank = parse_cell_i64(cell("bank"));
        let stage = parse_cell_i64(cell("stage"));

        if let Some(&mapped) = bank_remap.get(&bank) {
            bank = mapped;
        }

        let b0 = S::from_i64_signed(parse_cell_i64(cell("num0")));
        let b1 = S::from_i64_signed(parse_cell_i64(cell("num1")));
        let b2 = S::from_i64_signed(parse_cell_i64(cell("num2")));

        let mut den0 = parse_cell_i64(cell("den0"));
        let a1 = S::from_i64_signed(parse_cell_i64(cell("den1")));
        let a2 = S::from_i64_signed(parse_cell_i64(cell("den2")));

        // Recover the shift exponent; tolerates a non-positive den0 by
        // treating it as 1.
        let mut a0_bits: u8 = 0;
        while den0 > 1 {
            den0 >>= 1;
            a0_bits += 1;
        }

        let bank_idx = usize::try_from(bank).unwrap_or(usize::MAX);
        let stage_idx = usize::try_from(stage).unwrap_or(usize::MAX);
        if bank_idx >= BANKS || stage_idx >= STAGES {
            warn!(
                "biquad row {}: bank {} stage {} outside compiled geometry, dropped",
                ridx, bank, stage
            );
            continue;
        }

        filter_bank.set_coefficients(
            stage_idx,
            bank_idx,
            BiquadCoeffs {
                a0_bits,
                a1,
                a2,
                b0,
                b1,
                b2,
            },
        );
        rows_used += 1;
    }

    debug!("biquad read: {} rows applied", rows_used);
    Ok(())
}

/// Write the active banks and stages as CSV, without extra columns.
pub fn write_biquad_coeffs<
    S: SampleInt,
    W: Write,
    const STAGES: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    output: W,
    filter_bank: &BiquadBank<S, STAGES, BANKS, CHANS>,
    want_header: bool,
) -> Result<()> {
    write_biquad_coeffs_tagged(output, filter_bank, want_header, &[], &HashMap::new())
}

/// Write the active banks and stages as CSV, prepending extra constant
/// columns in the given order.
pub fn write_biquad_coeffs_tagged<
    S: SampleInt,
    W: Write,
    const STAGES: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    output: W,
    filter_bank: &BiquadBank<S, STAGES, BANKS, CHANS>,
    want_header: bool,
    extra_col_order: &[String],
    extra_col_values: &HashMap<String, String>,
) -> Result<()> {
    let active_chans = filter_bank.get_active_chans();
    let active_banks = filter_bank.get_active_banks();
    let active_stages = filter_bank.get_active_stages();

    let mut column_order: Vec<String> = extra_col_order.to_vec();
    for name in ["bank", "stage", "num0", "num1", "num2", "den0", "den1", "den2"] {
        column_order.push(name.to_string());
    }

    let mut series: HashMap<String, Vec<String>> = HashMap::new();
    let mut push = |series: &mut HashMap<String, Vec<String>>, name: &str, value: String| {
        series.entry(name.to_string()).or_default().push(value);
    };

    if active_chans > 0 {
        for bidx in 0..active_banks {
            for sidx in 0..active_stages {
                let coeffs = filter_bank.get_coefficients(sidx, bidx);
                let den0: i64 = 1i64 << coeffs.a0_bits;

                push(&mut series, "bank", bidx.to_string());
                push(&mut series, "stage", sidx.to_string());
                push(&mut series, "num0", coeffs.b0.to_i64_signed().to_string());
                push(&mut series, "num1", coeffs.b1.to_i64_signed().to_string());
                push(&mut series, "num2", coeffs.b2.to_i64_signed().to_string());
                push(&mut series, "den0", den0.to_string());
                push(&mut series, "den1", coeffs.a1.to_i64_signed().to_string());
                push(&mut series, "den2", coeffs.a2.to_i64_signed().to_string());

                for name in extra_col_order {
                    let value = extra_col_values.get(name).cloned().unwrap_or_default();
                    push(&mut series, name, value);
                }
            }
        }
    }

    super::table::write_csv(output, &column_order, &series, want_header)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBank = BiquadBank<i32, 2, 2, 2>;

    fn configured_bank() -> TestBank {
        let mut bank = TestBank::new();
        bank.set_active_banks(2);
        bank.set_active_chans(2);
        bank.set_active_stages(2);
        bank.set_coefficients(
            0,
            0,
            BiquadCoeffs {
                a0_bits: 3,
                a1: -11,
                a2: 7,
                b0: 100,
                b1: -200,
                b2: 100,
            },
        );
        bank.set_coefficients(
            1,
            1,
            BiquadCoeffs {
                a0_bits: 0,
                a1: 0,
                a2: 0,
                b0: 1,
                b1: 0,
                b2: 0,
            },
        );
        bank
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let bank = configured_bank();
        let mut csv_bytes = Vec::new();
        write_biquad_coeffs(&mut csv_bytes, &bank, true).unwrap();

        let mut restored = TestBank::new();
        read_biquad_coeffs(csv_bytes.as_slice(), &mut restored).unwrap();

        for bidx in 0..2 {
            for sidx in 0..2 {
                assert_eq!(
                    restored.get_coefficients(sidx, bidx),
                    bank.get_coefficients(sidx, bidx),
                    "bank {} stage {}",
                    bidx,
                    sidx
                );
            }
        }
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let bank = configured_bank();
        let mut first = Vec::new();
        write_biquad_coeffs(&mut first, &bank, true).unwrap();

        let mut restored = TestBank::new();
        restored.set_active_banks(2);
        restored.set_active_chans(2);
        restored.set_active_stages(2);
        read_biquad_coeffs(first.as_slice(), &mut restored).unwrap();

        let mut second = Vec::new();
        write_biquad_coeffs(&mut second, &restored, true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_den0_exponent_recovery() {
        let csv = "\"bank\",\"stage\",\"num0\",\"num1\",\"num2\",\"den0\",\"den1\",\"den2\"\n\
                   0,0,5,0,0,16,0,0\n";
        let mut bank = TestBank::new();
        read_biquad_coeffs(csv.as_bytes(), &mut bank).unwrap();
        assert_eq!(bank.get_coefficients(0, 0).a0_bits, 4);
    }

    #[test]
    fn test_missing_columns_read_as_zero() {
        let csv = "\"bank\",\"stage\",\"num0\"\n0,1,42\n";
        let mut bank = TestBank::new();
        read_biquad_coeffs(csv.as_bytes(), &mut bank).unwrap();

        let coeffs = bank.get_coefficients(1, 0);
        assert_eq!(coeffs.b0, 42);
        assert_eq!(coeffs.b1, 0);
        assert_eq!(coeffs.a0_bits, 0);
    }

    #[test]
    fn test_criteria_select_rows() {
        let csv = "\"bank\",\"stage\",\"num0\",\"num1\",\"num2\",\"den0\",\"den1\",\"den2\",\"set\"\n\
                   0,0,1,0,0,1,0,0,slow\n\
                   0,0,2,0,0,1,0,0,fast\n";
        let criteria = vec![("set".to_string(), "fast".to_string())];

        let mut bank = TestBank::new();
        read_biquad_coeffs_filtered(csv.as_bytes(), &mut bank, &criteria, &HashMap::new()).unwrap();
        assert_eq!(bank.get_coefficients(0, 0).b0, 2);
    }

    #[test]
    fn test_bank_remap() {
        let csv = "\"bank\",\"stage\",\"num0\",\"num1\",\"num2\",\"den0\",\"den1\",\"den2\"\n\
                   0,0,9,0,0,1,0,0\n";
        let mut remap = HashMap::new();
        remap.insert(0i64, 1i64);

        let mut bank = TestBank::new();
        read_biquad_coeffs_filtered(csv.as_bytes(), &mut bank, &[], &remap).unwrap();
        assert_eq!(bank.get_coefficients(0, 0).b0, 0);
        assert_eq!(bank.get_coefficients(0, 1).b0, 9);
    }

    #[test]
    fn test_extra_constant_columns_written_and_ignored_on_read() {
        let bank = configured_bank();
        let order = vec!["rig".to_string()];
        let mut values = HashMap::new();
        values.insert("rig".to_string(), "bench3".to_string());

        let mut csv_bytes = Vec::new();
        write_biquad_coeffs_tagged(&mut csv_bytes, &bank, true, &order, &values).unwrap();
        let text = String::from_utf8(csv_bytes.clone()).unwrap();
        assert!(text.starts_with("\"rig\","));
        assert!(text.contains("\"bench3\""));

        let mut restored = TestBank::new();
        read_biquad_coeffs(csv_bytes.as_slice(), &mut restored).unwrap();
        assert_eq!(restored.get_coefficients(0, 0), bank.get_coefficients(0, 0));
    }
}
