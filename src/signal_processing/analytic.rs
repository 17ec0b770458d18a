//! Peak–trough–zero-crossing analytic signal estimator.
//!
//! Approximates the analytic signal of a narrow-band input without a
//! Hilbert transform: track the magnitude envelope through lobe peaks, and
//! recover period and phase-like timing from the spacing of zero crossings.
//! All outputs are primitives (magnitude, period, samples since each
//! crossing); derived quantities such as frequency or phase fraction are
//! left to the caller so that measurement error stays visible.

use crate::num::{IndexInt, SampleInt};
use crate::slice::Slice;

/// Single-cell peak/trough/zero-crossing estimator.
///
/// The default zero level is 0 for signed and unsigned sample types alike;
/// unsigned band-pass output wraps around zero in two's complement, which
/// the level shift and sign test handle.
#[derive(Clone, Copy, Debug)]
pub struct AnalyticEstimator<S, I> {
    zero_level: S,
    min_zc_gap: I,

    max_mag_seen: S,
    last_mag: S,
    since_rise: I,
    since_fall: I,
    last_period: I,
}

impl<S: SampleInt, I: IndexInt> AnalyticEstimator<S, I> {
    pub fn new() -> Self {
        let mut estimator = Self {
            zero_level: S::ZERO,
            min_zc_gap: I::MAX,
            max_mag_seen: S::ZERO,
            last_mag: S::ZERO,
            since_rise: I::ZERO,
            since_fall: I::ZERO,
            last_period: I::ZERO,
        };
        estimator.reset_state();
        estimator
    }

    /// Reset feature-tracking state. This also resets the zero level to 0
    /// and the minimum crossing gap to its "never detect" default.
    pub fn reset_state(&mut self) {
        self.zero_level = S::ZERO;
        // Suppresses all crossing detection until the caller configures a
        // minimum period.
        self.min_zc_gap = I::MAX;

        self.max_mag_seen = S::ZERO;
        self.last_mag = S::ZERO;
        self.since_rise = I::ZERO;
        self.since_fall = I::ZERO;
        self.last_period = I::ZERO;
    }

    /// Set the shortest period the input is expected to contain. Crossings
    /// closer than half this gap to the previous opposite crossing are
    /// rejected as noise. Should be substantially smaller than the
    /// signal's true minimum period.
    pub fn set_min_period(&mut self, new_min_period: I) {
        self.min_zc_gap = new_min_period.asr(1);
    }

    pub fn set_zero_level(&mut self, new_zero: S) {
        self.zero_level = new_zero;
    }

    /// Advance the estimator by one sample.
    pub fn handle_sample(&mut self, sample: S) {
        self.since_rise = self.since_rise.saturating_add(I::ONE);
        self.since_fall = self.since_fall.saturating_add(I::ONE);

        // Level-shift to zero-centered; unsigned storage wraps.
        let value = sample.wrapping_sub(self.zero_level);

        let is_negative = value.is_negative_signed();
        let magnitude = if is_negative { value.wrapping_neg() } else { value };

        if magnitude > self.max_mag_seen {
            self.max_mag_seen = magnitude;
        }

        if self.since_rise > self.since_fall {
            // In the negative lobe, watching for a rising crossing.
            if !is_negative && self.since_fall >= self.min_zc_gap {
                self.last_period = self.since_rise.wrapping_sub(self.since_fall).wrapping_shl(1);

                self.last_mag = self.max_mag_seen;
                self.max_mag_seen = magnitude;

                self.since_rise = I::ZERO;
            }
        } else {
            // In the positive lobe, watching for a falling crossing.
            if is_negative && self.since_rise >= self.min_zc_gap {
                self.last_period = self.since_fall.wrapping_sub(self.since_rise).wrapping_shl(1);

                self.last_mag = self.max_mag_seen;
                self.max_mag_seen = magnitude;

                self.since_fall = I::ZERO;
            }
        }
    }

    /// The current analytic estimate: `(magnitude, period, samples since
    /// rising crossing, samples since falling crossing)`, all durations in
    /// samples.
    pub fn get_estimated_analytic(&self) -> (S, I, I, I) {
        (self.last_mag, self.last_period, self.since_rise, self.since_fall)
    }
}

impl<S: SampleInt, I: IndexInt> Default for AnalyticEstimator<S, I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bank of independent estimators indexed by bank and channel.
pub struct AnalyticBank<S, I, const BANKS: usize, const CHANS: usize> {
    estimators: [[AnalyticEstimator<S, I>; CHANS]; BANKS],
    banks_active: usize,
    chans_active: usize,
}

impl<S: SampleInt, I: IndexInt, const BANKS: usize, const CHANS: usize>
    AnalyticBank<S, I, BANKS, CHANS>
{
    pub fn new() -> Self {
        Self {
            estimators: [[AnalyticEstimator::new(); CHANS]; BANKS],
            banks_active: BANKS,
            chans_active: CHANS,
        }
    }

    /// Reset every estimator and restore the full active geometry.
    pub fn reset_state(&mut self) {
        for row in self.estimators.iter_mut() {
            for estimator in row.iter_mut() {
                estimator.reset_state();
            }
        }
        self.banks_active = BANKS;
        self.chans_active = CHANS;
    }

    /// Advance the active subrectangle by one sample slice.
    pub fn handle_samples(&mut self, indata: &Slice<S, BANKS, CHANS>) {
        for bidx in 0..self.banks_active {
            for cidx in 0..self.chans_active {
                self.estimators[bidx][cidx].handle_sample(indata.data[bidx][cidx]);
            }
        }
    }

    /// Gather each active estimator's outputs into four slices.
    pub fn get_estimated_analytic(
        &self,
        out_magnitude: &mut Slice<S, BANKS, CHANS>,
        out_period: &mut Slice<I, BANKS, CHANS>,
        out_since_rise: &mut Slice<I, BANKS, CHANS>,
        out_since_fall: &mut Slice<I, BANKS, CHANS>,
    ) {
        for bidx in 0..self.banks_active {
            for cidx in 0..self.chans_active {
                let (magnitude, period, since_rise, since_fall) =
                    self.estimators[bidx][cidx].get_estimated_analytic();
                out_magnitude.data[bidx][cidx] = magnitude;
                out_period.data[bidx][cidx] = period;
                out_since_rise.data[bidx][cidx] = since_rise;
                out_since_fall.data[bidx][cidx] = since_fall;
            }
        }
    }

    pub fn get_active_chans(&self) -> usize {
        self.chans_active
    }

    pub fn set_active_chans(&mut self, new_chans: usize) {
        self.chans_active = new_chans.min(CHANS);
    }

    pub fn get_active_banks(&self) -> usize {
        self.banks_active
    }

    pub fn set_active_banks(&mut self, new_banks: usize) {
        self.banks_active = new_banks.min(BANKS);
    }

    /// Per-bank minimum periods, applied to every channel of each bank.
    pub fn set_min_periods(&mut self, new_min_periods: &Slice<I, BANKS, 1>) {
        for bidx in 0..BANKS {
            for cidx in 0..CHANS {
                self.estimators[bidx][cidx].set_min_period(new_min_periods.data[bidx][0]);
            }
        }
    }

    /// Minimum period for all channels of one bank; out-of-range bank
    /// indices are ignored.
    pub fn set_one_min_period(&mut self, bank: usize, new_min_period: I) {
        if bank < BANKS {
            for estimator in self.estimators[bank].iter_mut() {
                estimator.set_min_period(new_min_period);
            }
        }
    }

    /// Per-cell zero levels.
    pub fn set_zero_levels(&mut self, new_zeros: &Slice<S, BANKS, CHANS>) {
        for bidx in 0..BANKS {
            for cidx in 0..CHANS {
                self.estimators[bidx][cidx].set_zero_level(new_zeros.data[bidx][cidx]);
            }
        }
    }

    /// Zero level for one cell; out-of-range indices are ignored.
    pub fn set_one_zero_level(&mut self, bank: usize, chan: usize, new_zero: S) {
        if bank < BANKS && chan < CHANS {
            self.estimators[bank][chan].set_zero_level(new_zero);
        }
    }
}

impl<S: SampleInt, I: IndexInt, const BANKS: usize, const CHANS: usize> Default
    for AnalyticBank<S, I, BANKS, CHANS>
{
    fn default() -> Self {
        Self::new()
    }
}
