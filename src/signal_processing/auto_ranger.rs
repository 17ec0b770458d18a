//! Auto-ranging preprocessor.
//!
//! Front-end gain staging for the pipeline: watches the span of the raw
//! input and derives a per-channel bit-shift attenuation and offset that map
//! the observed range into a caller-chosen output window. The mapping is
//! `out = (in >> atten_bits) + offset`; offsets may be negative (unsigned
//! sample types wrap, which realizes the negative offset).

use crate::num::{IndexInt, SampleInt};
use crate::slice::Slice;

/// Auto-ranging module over one slice row of `CHANS` channels.
///
/// Tracks per-channel minimum and maximum input values. The attenuation and
/// offset derived from them exist in two variants: *running* values,
/// recomputed on demand from the current bounds, and *latched* values,
/// snapshotted from the running values when a scheduled latch countdown
/// expires. A hardware implementation recomputes every tick and muxes
/// between raw, running and latched outputs; this version recomputes lazily,
/// which gives bit-identical results at the observation points.
pub struct AutoRanger<S, I, const CHANS: usize> {
    min_vals: [S; CHANS],
    max_vals: [S; CHANS],

    latch_countdown: I,
    countdown_active: bool,

    middle_wanted: S,
    halfspan_wanted: S,

    // Attenuation can be tied across channels; offsets are always
    // per-channel.
    atten_tied: bool,

    running_offsets: [S; CHANS],
    running_attens: [u8; CHANS],

    latched_offsets: [S; CHANS],
    latched_attens: [u8; CHANS],
}

impl<S: SampleInt, I: IndexInt, const CHANS: usize> AutoRanger<S, I, CHANS> {
    /// Create an auto-ranger with identity latched mapping, no samples
    /// seen, and the full type range as the desired output window.
    pub fn new() -> Self {
        let mut ranger = Self {
            min_vals: [S::ZERO; CHANS],
            max_vals: [S::ZERO; CHANS],
            latch_countdown: I::ZERO,
            countdown_active: false,
            middle_wanted: S::ZERO,
            halfspan_wanted: S::ZERO,
            atten_tied: false,
            running_offsets: [S::ZERO; CHANS],
            running_attens: [0; CHANS],
            latched_offsets: [S::ZERO; CHANS],
            latched_attens: [0; CHANS],
        };
        ranger.set_desired_range(S::MIN, S::MAX);
        ranger.reset_tracking(false);
        ranger.reset_latched();
        ranger
    }

    /// Recalculate the running attenuation and offset from the tracked
    /// bounds. Hardware does this every tick; here it runs only when an
    /// output or a latch needs it.
    fn recalc_atten_offset(&mut self) {
        for cidx in 0..CHANS {
            let mut this_min = self.min_vals[cidx];
            let mut this_max = self.max_vals[cidx];

            // Before any sample arrives the tracked bounds are inverted.
            if this_max < this_min {
                this_max = this_min;
            }

            // Halve the measured bounds so the midpoint and span arithmetic
            // cannot overflow near the type extremes. The derived offset may
            // be off by one; that is acceptable.
            this_min = this_min.asr(1);
            this_max = this_max.asr(1);

            // (A/2 + B/2) = (A + B)/2, so the midpoint needs no further
            // scaling. The span kept here is half the true span.
            let mut middle = this_min.wrapping_add(this_max);
            let mut half_span = this_max.wrapping_sub(this_min);

            let mut atten: u8 = 0;
            while half_span > self.halfspan_wanted {
                atten = atten.wrapping_add(1);
                // The span is non-negative, so the native shift is fine.
                half_span = half_span.asr(1);
            }
            self.running_attens[cidx] = atten;

            middle = middle.asr(atten as u32);
            // Subtraction wraps for unsigned types, realizing a negative
            // offset.
            self.running_offsets[cidx] = self.middle_wanted.wrapping_sub(middle);
        }
    }

    /// Apply the attenuation and offset mapping to one input slice.
    fn calc_output(
        &self,
        indata: &Slice<S, 1, CHANS>,
        outdata: &mut Slice<S, 1, CHANS>,
        use_latched: bool,
    ) {
        // The tied attenuation is the maximum across channels.
        let mut group_atten: u8 = 0;
        for cidx in 0..CHANS {
            let this_atten = if use_latched {
                self.latched_attens[cidx]
            } else {
                self.running_attens[cidx]
            };
            group_atten = group_atten.max(this_atten);
        }

        for cidx in 0..CHANS {
            let (offset, mut atten) = if use_latched {
                (self.latched_offsets[cidx], self.latched_attens[cidx])
            } else {
                (self.running_offsets[cidx], self.running_attens[cidx])
            };

            if self.atten_tied {
                atten = group_atten;
            }

            let value = indata.data[0][cidx].asr(atten as u32);
            outdata.data[0][cidx] = value.wrapping_add(offset);
        }
    }

    /// Extend the tracked bounds with one input slice and advance the latch
    /// countdown. When the countdown expires, the running attenuation and
    /// offset are snapshotted into the latched values.
    pub fn update_from_sample(&mut self, data: &Slice<S, 1, CHANS>) {
        for cidx in 0..CHANS {
            let value = data.data[0][cidx];
            if value < self.min_vals[cidx] {
                self.min_vals[cidx] = value;
            }
            if value > self.max_vals[cidx] {
                self.max_vals[cidx] = value;
            }
        }

        if self.countdown_active {
            if self.latch_countdown > I::ZERO {
                self.latch_countdown = self.latch_countdown.wrapping_sub(I::ONE);
            } else {
                self.countdown_active = false;
                self.latch_countdown = I::ZERO;

                self.recalc_atten_offset();
                self.latched_offsets = self.running_offsets;
                self.latched_attens = self.running_attens;
            }
        }
    }

    /// Transform `indata` using the running attenuation and offset.
    /// Recomputes the running values; tracking state is untouched.
    pub fn get_running_output(
        &mut self,
        indata: &Slice<S, 1, CHANS>,
        outdata: &mut Slice<S, 1, CHANS>,
    ) {
        self.recalc_atten_offset();
        self.calc_output(indata, outdata, false);
    }

    /// Transform `indata` using the latched attenuation and offset.
    pub fn get_latched_output(&self, indata: &Slice<S, 1, CHANS>, outdata: &mut Slice<S, 1, CHANS>) {
        self.calc_output(indata, outdata, true);
    }

    /// Reinitialize minimum/maximum tracking so that any sample updates
    /// both bounds.
    ///
    /// The argument is accepted for interface compatibility and ignored;
    /// tied attenuation is controlled through [`Self::set_atten_tied`].
    pub fn reset_tracking(&mut self, _want_shared_atten: bool) {
        self.min_vals = [S::MAX; CHANS];
        self.max_vals = [S::MIN; CHANS];
    }

    /// Reset the latched attenuation and offset to the identity mapping.
    pub fn reset_latched(&mut self) {
        self.latched_offsets = [S::ZERO; CHANS];
        self.latched_attens = [0; CHANS];
    }

    /// Schedule a one-shot latch after `sample_count` further update calls.
    pub fn latch_after(&mut self, sample_count: I) {
        self.latch_countdown = sample_count;
        self.countdown_active = true;
    }

    /// True while a scheduled latch has not yet fired.
    pub fn is_autorange_running(&self) -> bool {
        self.countdown_active
    }

    /// Tie the effective attenuation across channels (maximum of the
    /// per-channel values). Offsets stay per-channel.
    pub fn set_atten_tied(&mut self, want_tied: bool) {
        self.atten_tied = want_tied;
    }

    /// Set the output window the input should be mapped into.
    pub fn set_desired_range(&mut self, newmin: S, newmax: S) {
        // Halve the requested bounds for the same overflow-safety reason as
        // the measured bounds; the resulting mapping may be off by one.
        let scratch_min = newmin.asr(1);
        let mut scratch_max = newmax.asr(1);

        if scratch_max < scratch_min {
            scratch_max = scratch_min;
        }

        self.middle_wanted = scratch_min.wrapping_add(scratch_max);
        self.halfspan_wanted = scratch_max.wrapping_sub(scratch_min);
    }

    /// Minimum input values seen since the last tracking reset.
    pub fn get_min_values_seen(&self, data: &mut Slice<S, 1, CHANS>) {
        data.data[0].copy_from_slice(&self.min_vals);
    }

    /// Maximum input values seen since the last tracking reset.
    pub fn get_max_values_seen(&self, data: &mut Slice<S, 1, CHANS>) {
        data.data[0].copy_from_slice(&self.max_vals);
    }

    /// Report the running attenuation and offset values, recomputing them
    /// first.
    pub fn get_running_atten_offset(
        &mut self,
        bitshifts: &mut Slice<S, 1, CHANS>,
        offsets: &mut Slice<S, 1, CHANS>,
    ) {
        self.recalc_atten_offset();
        for cidx in 0..CHANS {
            offsets.data[0][cidx] = self.running_offsets[cidx];
            bitshifts.data[0][cidx] = S::from_i64_signed(self.running_attens[cidx] as i64);
        }
    }

    /// Report the latched attenuation and offset values.
    pub fn get_latched_atten_offset(
        &self,
        bitshifts: &mut Slice<S, 1, CHANS>,
        offsets: &mut Slice<S, 1, CHANS>,
    ) {
        for cidx in 0..CHANS {
            offsets.data[0][cidx] = self.latched_offsets[cidx];
            bitshifts.data[0][cidx] = S::from_i64_signed(self.latched_attens[cidx] as i64);
        }
    }

    /// Manually latch the given attenuation and offset values, overriding
    /// whatever auto-ranging computed.
    pub fn set_atten_offset(&mut self, bitshifts: &Slice<S, 1, CHANS>, offsets: &Slice<S, 1, CHANS>) {
        for cidx in 0..CHANS {
            self.latched_offsets[cidx] = offsets.data[0][cidx];
            self.latched_attens[cidx] = bitshifts.data[0][cidx].to_i64_signed() as u8;
        }
    }
}

impl<S: SampleInt, I: IndexInt, const CHANS: usize> Default for AutoRanger<S, I, CHANS> {
    fn default() -> Self {
        Self::new()
    }
}
