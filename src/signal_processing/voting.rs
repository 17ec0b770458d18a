//! Winner-take-all voting and conditional latching across banks.
//!
//! When several banks watch the same channel at different sub-bands, these
//! helpers pick the strongest bank per channel and route its values onward.

use crate::slice::Slice;

/// Selection multiplexer: for each channel, copy the cell from the bank
/// named in `selections`. Out-of-range selections default to bank 0.
pub fn select_winning_banks<T: Copy, const BANKS: usize, const CHANS: usize>(
    source: &Slice<T, BANKS, CHANS>,
    dest: &mut Slice<T, 1, CHANS>,
    selections: &Slice<usize, 1, CHANS>,
) {
    for cidx in 0..CHANS {
        let mut bidx = selections.data[0][cidx];
        if bidx >= BANKS {
            bidx = 0;
        }
        dest.data[0][cidx] = source.data[bidx][cidx];
    }
}

/// Keep-vs-replace latching: where `latch_flags` equals `replace_flag`,
/// copy the new value into the target.
pub fn conditionally_latch_new<T: Copy, const BANKS: usize, const CHANS: usize>(
    target: &mut Slice<T, BANKS, CHANS>,
    new_values: &Slice<T, BANKS, CHANS>,
    latch_flags: &Slice<bool, BANKS, CHANS>,
    replace_flag: bool,
) {
    for bidx in 0..BANKS {
        for cidx in 0..CHANS {
            if latch_flags.data[bidx][cidx] == replace_flag {
                target.data[bidx][cidx] = new_values.data[bidx][cidx];
            }
        }
    }
}

/// Winner-take-all voting among banks: per channel, the index of the
/// largest value over the scanned banks.
///
/// `was_local_winner` is true when the winner sits strictly inside the
/// scanned range; a win at bank 0 or at `active_banks - 1` is the edge of
/// the distribution, which usually means the real peak lies outside the
/// covered sub-bands.
pub fn identify_winning_banks<T: Copy + Ord, const BANKS: usize, const CHANS: usize>(
    source: &Slice<T, BANKS, CHANS>,
    active_banks: usize,
    active_chans: usize,
    selections: &mut Slice<usize, 1, CHANS>,
    was_local_winner: &mut Slice<bool, 1, CHANS>,
) {
    let active_banks = active_banks.min(BANKS);
    let active_chans = active_chans.min(CHANS);

    selections.fill(0);
    was_local_winner.fill(false);

    for cidx in 0..active_chans {
        let mut max_val = source.data[0][cidx];
        let mut max_idx = 0;

        for bidx in 1..active_banks {
            let this_val = source.data[bidx][cidx];
            if this_val > max_val {
                max_val = this_val;
                max_idx = bidx;
            }
        }

        let was_local = !(max_idx == 0 || max_idx + 1 == active_banks);

        selections.data[0][cidx] = max_idx;
        was_local_winner.data[0][cidx] = was_local;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_winning_banks_with_default() {
        let mut source: Slice<i32, 3, 2> = Slice::default();
        source.data = [[1, 2], [10, 20], [100, 200]];

        let mut selections: Slice<usize, 1, 2> = Slice::default();
        selections.data = [[1, 9]]; // 9 is invalid, defaults to bank 0

        let mut dest: Slice<i32, 1, 2> = Slice::default();
        select_winning_banks(&source, &mut dest, &selections);
        assert_eq!(dest.data, [[10, 2]]);
    }

    #[test]
    fn test_conditional_latch() {
        let mut target: Slice<i32, 2, 2> = Slice::filled(0);
        let new_values: Slice<i32, 2, 2> = Slice::filled(5);
        let mut flags: Slice<bool, 2, 2> = Slice::filled(false);
        flags.data[0][1] = true;
        flags.data[1][0] = true;

        conditionally_latch_new(&mut target, &new_values, &flags, true);
        assert_eq!(target.data, [[0, 5], [5, 0]]);

        // Inverted replace flag latches the complementary cells.
        conditionally_latch_new(&mut target, &new_values, &flags, false);
        assert_eq!(target.data, [[5, 5], [5, 5]]);
    }

    #[test]
    fn test_identify_winning_banks_interior_winner() {
        let mut source: Slice<i32, 4, 2> = Slice::default();
        source.data = [[1, 9], [7, 2], [3, 1], [0, 0]];

        let mut selections: Slice<usize, 1, 2> = Slice::default();
        let mut was_local: Slice<bool, 1, 2> = Slice::default();
        identify_winning_banks(&source, 4, 2, &mut selections, &mut was_local);

        assert_eq!(selections.data, [[1, 0]]);
        assert_eq!(was_local.data, [[true, false]]); // bank 0 win is an edge
    }

    #[test]
    fn test_identify_winning_banks_edge_of_scanned_range() {
        let mut source: Slice<i32, 4, 1> = Slice::default();
        source.data = [[1], [2], [8], [9]];

        let mut selections: Slice<usize, 1, 1> = Slice::default();
        let mut was_local: Slice<bool, 1, 1> = Slice::default();

        // Scanning only three banks puts the bank-2 winner on the edge.
        identify_winning_banks(&source, 3, 1, &mut selections, &mut was_local);
        assert_eq!(selections.data, [[2]]);
        assert_eq!(was_local.data, [[false]]);
    }
}
