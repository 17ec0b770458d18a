//! FIR coefficient file I/O.
//!
//! Format: one column per bank, named `bank N`; rows are coefficient
//! samples in order. The fixed-point scaling (`fracbits`) is not persisted;
//! the caller tracks it and supplies it on read. With match criteria, the
//! coefficient count becomes the number of matching rows, so zero matches
//! silently configure a zero-output filter with `fracbits` still applied.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};

use log::debug;

use super::table::{parse_cell_i64, row_matches_all_criteria, CsvTable, MatchCriteria};
use crate::error::Result;
use crate::num::SampleInt;
use crate::signal_processing::fir::FirBank;

/// Parse a `bank N` column name; at least one whitespace character must
/// separate the word from the number.
fn parse_bank_column(name: &str) -> Option<i64> {
    let rest = name.strip_prefix("bank")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let digits = rest.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Read FIR coefficients from a CSV stream, taking every row and leaving
/// bank numbers as-is.
pub fn read_fir_coeffs<
    S: SampleInt,
    R: Read,
    const MAX_COEFFS: usize,
    const BUF_LEN: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    input: R,
    filter_bank: &mut FirBank<S, MAX_COEFFS, BUF_LEN, BANKS, CHANS>,
    frac_bits: u8,
) -> Result<()> {
    read_fir_coeffs_filtered(input, filter_bank, frac_bits, &[], &HashMap::new())
}

/// Read FIR coefficients from a CSV stream.
///
/// Only rows matching all `criteria` columns contribute samples. Bank
/// numbers parsed from column names are rewritten through `bank_remap`
/// before use; banks outside the compiled geometry are dropped. Each named
/// bank is blanked first, so a file with no matching rows leaves a valid
/// zero-output filter.
pub fn read_fir_coeffs_filtered<
    S: SampleInt,
    R: Read,
    const MAX_COEFFS: usize,
    const BUF_LEN: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    input: R,
    filter_bank: &mut FirBank<S, MAX_COEFFS, BUF_LEN, BANKS, CHANS>,
    frac_bits: u8,
    criteria: &MatchCriteria,
    bank_remap: &HashMap<i64, i64>,
) -> Result<()> {
    let table = CsvTable::read(input)?;

    // First pass: find bank columns and apply remapping. A BTreeMap keeps
    // bank processing order deterministic.
    let mut bank_columns: BTreeMap<i64, String> = BTreeMap::new();
    for name in table.column_names() {
        if let Some(mut bank) = parse_bank_column(name) {
            if let Some(&mapped) = bank_remap.get(&bank) {
                bank = mapped;
            }
            bank_columns.insert(bank, name.clone());
        }
    }

    // Second pass: walk rows per column, building each bank's filter.
    let row_count = table.row_count();

    for (&bank, column_name) in bank_columns.iter() {
        let bank_idx = usize::try_from(bank).unwrap_or(usize::MAX);
        filter_bank.blank_one_filter(bank_idx);
        let mut coeff_count = 0usize;

        for ridx in 0..row_count {
            let row = table.row_cells(ridx);
            if !row_matches_all_criteria(&row, criteria) {
                continue;
            }

            let cell = row.get(column_name).map_or("", String::as_str);
            filter_bank.set_one_coefficient(
                bank_idx,
                coeff_count,
                S::from_i64_signed(parse_cell_i64(cell)),
            );
            coeff_count += 1;
        }

        // Zero matching rows still set fracbits on a blank filter.
        filter_bank.set_one_geometry(bank_idx, frac_bits, coeff_count);
        debug!("fir read: bank {} took {} coefficients", bank, coeff_count);
    }

    Ok(())
}

/// Write the active banks' coefficients as CSV, without extra columns.
pub fn write_fir_coeffs<
    S: SampleInt,
    W: Write,
    const MAX_COEFFS: usize,
    const BUF_LEN: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    output: W,
    filter_bank: &FirBank<S, MAX_COEFFS, BUF_LEN, BANKS, CHANS>,
    want_header: bool,
) -> Result<()> {
    write_fir_coeffs_tagged(output, filter_bank, want_header, &[], &HashMap::new())
}

/// Write the active banks' coefficients as CSV, prepending extra constant
/// columns (padded to the longest bank).
pub fn write_fir_coeffs_tagged<
    S: SampleInt,
    W: Write,
    const MAX_COEFFS: usize,
    const BUF_LEN: usize,
    const BANKS: usize,
    const CHANS: usize,
>(
    output: W,
    filter_bank: &FirBank<S, MAX_COEFFS, BUF_LEN, BANKS, CHANS>,
    want_header: bool,
    extra_col_order: &[String],
    extra_col_values: &HashMap<String, String>,
) -> Result<()> {
    let mut column_order: Vec<String> = extra_col_order.to_vec();
    let mut series: HashMap<String, Vec<String>> = HashMap::new();

    let active_banks = filter_bank.get_active_banks();
    let mut max_coeff_count = 0usize;

    for bidx in 0..active_banks {
        let column_name = format!("bank {}", bidx);
        column_order.push(column_name.clone());

        let (_, coeff_count) = filter_bank.get_one_geometry(bidx);
        max_coeff_count = max_coeff_count.max(coeff_count);

        let column: Vec<String> = (0..coeff_count)
            .map(|cidx| {
                filter_bank
                    .get_one_coefficient(bidx, cidx)
                    .to_i64_signed()
                    .to_string()
            })
            .collect();
        series.insert(column_name, column);
    }

    for name in extra_col_order {
        let value = extra_col_values.get(name).cloned().unwrap_or_default();
        series.insert(name.clone(), vec![value; max_coeff_count]);
    }

    super::table::write_csv(output, &column_order, &series, want_header)
}
