//! Stepwise monotonic lookup tables.
//!
//! Delay and phase calibration tables: the caller supplies monotonic
//! `(input, output)` rows and lookups snap to the matching step, with no
//! interpolation. Lookups scan every active row so that timing is
//! independent of the data, matching the hardware they model.

use crate::num::SampleInt;
use crate::slice::Slice;

/// A single stepwise monotonic lookup table.
///
/// The table is not self-validating; the caller guarantees monotonic
/// ordering appropriate to the lookup direction used.
pub struct StepLut<In, Out, const ROWS: usize> {
    input_lut: [In; ROWS],
    output_lut: [Out; ROWS],
    rows_active: usize,
}

impl<In: SampleInt, Out: SampleInt, const ROWS: usize> StepLut<In, Out, ROWS> {
    /// A blanked table with zero active rows.
    pub fn new() -> Self {
        Self {
            input_lut: [In::ZERO; ROWS],
            output_lut: [Out::ZERO; ROWS],
            rows_active: 0,
        }
    }

    /// Search a descending table for the first row whose input is `<=` the
    /// argument. Returns zero when no row matches.
    pub fn lookup_le(&self, inval: In) -> Out {
        let limit = self.rows_active.min(ROWS);
        let mut outval = Out::ZERO;

        // Linear scan over every active row, so lookup time does not vary
        // with the data.
        for ridx in (0..limit).rev() {
            if self.input_lut[ridx] <= inval {
                outval = self.output_lut[ridx];
            }
        }
        outval
    }

    /// Search an ascending table for the first row whose input is `>=` the
    /// argument. Returns zero when no row matches.
    pub fn lookup_ge(&self, inval: In) -> Out {
        let limit = self.rows_active.min(ROWS);
        let mut outval = Out::ZERO;

        for ridx in (0..limit).rev() {
            if self.input_lut[ridx] >= inval {
                outval = self.output_lut[ridx];
            }
        }
        outval
    }

    pub fn blank_table(&mut self) {
        self.input_lut = [In::ZERO; ROWS];
        self.output_lut = [Out::ZERO; ROWS];
    }

    /// Set one row; out-of-range row indices are ignored.
    pub fn set_entry(&mut self, row: usize, inval: In, outval: Out) {
        if row < ROWS {
            self.input_lut[row] = inval;
            self.output_lut[row] = outval;
        }
    }

    /// One row's `(input, output)` pair; zeros for an out-of-range index.
    pub fn get_entry(&self, row: usize) -> (In, Out) {
        if row < ROWS {
            (self.input_lut[row], self.output_lut[row])
        } else {
            (In::ZERO, Out::ZERO)
        }
    }

    pub fn set_active_rows(&mut self, new_rows: usize) {
        self.rows_active = new_rows.min(ROWS);
    }

    pub fn get_active_rows(&self) -> usize {
        self.rows_active
    }
}

impl<In: SampleInt, Out: SampleInt, const ROWS: usize> Default for StepLut<In, Out, ROWS> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-bank lookup tables applied across a full slice.
///
/// Accepts `[BANKS][CHANS]` input but holds only one table per bank; every
/// channel of a slice row goes through that bank's table.
pub struct StepLutBank<In, Out, const ROWS: usize, const BANKS: usize, const CHANS: usize> {
    luts: [StepLut<In, Out, ROWS>; BANKS],
    banks_active: usize,
    chans_active: usize,
    rows_active: usize,
}

impl<In: SampleInt, Out: SampleInt, const ROWS: usize, const BANKS: usize, const CHANS: usize>
    StepLutBank<In, Out, ROWS, BANKS, CHANS>
{
    pub fn new() -> Self {
        Self {
            luts: core::array::from_fn(|_| StepLut::new()),
            banks_active: 0,
            chans_active: 0,
            rows_active: 0,
        }
    }

    /// Single-element descending lookup; zero for an out-of-range bank.
    pub fn lookup_one_le(&self, inval: In, bank: usize) -> Out {
        if bank < BANKS {
            self.luts[bank].lookup_le(inval)
        } else {
            Out::ZERO
        }
    }

    /// Single-element ascending lookup; zero for an out-of-range bank.
    pub fn lookup_one_ge(&self, inval: In, bank: usize) -> Out {
        if bank < BANKS {
            self.luts[bank].lookup_ge(inval)
        } else {
            Out::ZERO
        }
    }

    /// Descending lookup across the whole slice. Inactive cells are
    /// squashed to zero.
    pub fn lookup_all_le(
        &self,
        invals: &Slice<In, BANKS, CHANS>,
        outvals: &mut Slice<Out, BANKS, CHANS>,
    ) {
        outvals.fill(Out::ZERO);
        for bidx in 0..self.banks_active.min(BANKS) {
            for cidx in 0..self.chans_active.min(CHANS) {
                outvals.data[bidx][cidx] = self.luts[bidx].lookup_le(invals.data[bidx][cidx]);
            }
        }
    }

    /// Ascending lookup across the whole slice. Inactive cells are
    /// squashed to zero.
    pub fn lookup_all_ge(
        &self,
        invals: &Slice<In, BANKS, CHANS>,
        outvals: &mut Slice<Out, BANKS, CHANS>,
    ) {
        outvals.fill(Out::ZERO);
        for bidx in 0..self.banks_active.min(BANKS) {
            for cidx in 0..self.chans_active.min(CHANS) {
                outvals.data[bidx][cidx] = self.luts[bidx].lookup_ge(invals.data[bidx][cidx]);
            }
        }
    }

    pub fn blank_tables(&mut self) {
        for lut in self.luts.iter_mut() {
            lut.blank_table();
        }
    }

    /// Load every bank's table from `[BANKS][ROWS]` slices.
    pub fn set_all_luts(
        &mut self,
        invals: &Slice<In, BANKS, ROWS>,
        outvals: &Slice<Out, BANKS, ROWS>,
    ) {
        for bidx in 0..BANKS {
            for ridx in 0..ROWS {
                self.luts[bidx].set_entry(ridx, invals.data[bidx][ridx], outvals.data[bidx][ridx]);
            }
        }
    }

    /// Load one bank's table; out-of-range bank indices are ignored.
    pub fn set_one_lut(
        &mut self,
        bank: usize,
        invals: &Slice<In, 1, ROWS>,
        outvals: &Slice<Out, 1, ROWS>,
    ) {
        if bank < BANKS {
            for ridx in 0..ROWS {
                self.luts[bank].set_entry(ridx, invals.data[0][ridx], outvals.data[0][ridx]);
            }
        }
    }

    /// Set one row of one bank; out-of-range indices are ignored.
    pub fn set_one_entry(&mut self, bank: usize, row: usize, inval: In, outval: Out) {
        if bank < BANKS && row < ROWS {
            self.luts[bank].set_entry(row, inval, outval);
        }
    }

    pub fn get_all_luts(
        &self,
        invals: &mut Slice<In, BANKS, ROWS>,
        outvals: &mut Slice<Out, BANKS, ROWS>,
    ) {
        for bidx in 0..BANKS {
            for ridx in 0..ROWS {
                let (inval, outval) = self.luts[bidx].get_entry(ridx);
                invals.data[bidx][ridx] = inval;
                outvals.data[bidx][ridx] = outval;
            }
        }
    }

    pub fn get_one_lut(
        &self,
        bank: usize,
        invals: &mut Slice<In, 1, ROWS>,
        outvals: &mut Slice<Out, 1, ROWS>,
    ) {
        if bank < BANKS {
            for ridx in 0..ROWS {
                let (inval, outval) = self.luts[bank].get_entry(ridx);
                invals.data[0][ridx] = inval;
                outvals.data[0][ridx] = outval;
            }
        }
    }

    /// One row of one bank; zeros for out-of-range indices.
    pub fn get_one_entry(&self, bank: usize, row: usize) -> (In, Out) {
        if bank < BANKS && row < ROWS {
            self.luts[bank].get_entry(row)
        } else {
            (In::ZERO, Out::ZERO)
        }
    }

    pub fn set_active_banks(&mut self, new_banks: usize) {
        self.banks_active = new_banks.min(BANKS);
    }

    pub fn set_active_chans(&mut self, new_chans: usize) {
        self.chans_active = new_chans.min(CHANS);
    }

    /// Set the active row count, propagating it to every bank's table.
    pub fn set_active_rows(&mut self, new_rows: usize) {
        self.rows_active = new_rows.min(ROWS);
        for lut in self.luts.iter_mut() {
            lut.set_active_rows(self.rows_active);
        }
    }

    pub fn get_active_banks(&self) -> usize {
        self.banks_active
    }

    pub fn get_active_chans(&self) -> usize {
        self.chans_active
    }

    pub fn get_active_rows(&self) -> usize {
        self.rows_active
    }
}

impl<In: SampleInt, Out: SampleInt, const ROWS: usize, const BANKS: usize, const CHANS: usize> Default
    for StepLutBank<In, Out, ROWS, BANKS, CHANS>
{
    fn default() -> Self {
        Self::new()
    }
}
