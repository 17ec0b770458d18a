//! Shift-and-subtract modulo.
//!
//! Division is expensive in hardware, so where the quotient is known to be
//! small the pipeline uses a fixed ladder of compare-subtract steps instead.
//! The ladder depth is a compile-time constant so that the software model
//! costs the same number of steps as the hardware it mirrors.

use crate::num::SampleInt;
use crate::slice::Slice;

/// Reduce `sample` modulo `modulus`, assuming `0 <= sample / modulus <
/// 2^SUB_BITS`.
///
/// Takes exactly `SUB_BITS` compare-subtract steps regardless of the data.
#[inline]
pub fn fast_modulo<T: SampleInt, const SUB_BITS: u32>(mut sample: T, modulus: T) -> T {
    let mut shift = SUB_BITS;
    while shift > 0 {
        let test = modulus.wrapping_shl(shift - 1);
        if sample >= test {
            sample = sample.wrapping_sub(test);
        }
        shift -= 1;
    }
    sample
}

/// Slice-wide [`fast_modulo`], one modulus per cell.
pub fn fast_modulo_slice<T: SampleInt, const SUB_BITS: u32, const BANKS: usize, const CHANS: usize>(
    indata: &Slice<T, BANKS, CHANS>,
    moduli: &Slice<T, BANKS, CHANS>,
    outdata: &mut Slice<T, BANKS, CHANS>,
) {
    for bidx in 0..BANKS {
        for cidx in 0..CHANS {
            outdata.data[bidx][cidx] =
                fast_modulo::<T, SUB_BITS>(indata.data[bidx][cidx], moduli.data[bidx][cidx]);
        }
    }
}
