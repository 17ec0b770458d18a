//! Pipeline configuration.
//!
//! Plain structs with documented fields and conservative defaults. These
//! configure the prebuilt detection pipeline in [`crate::pipeline`];
//! individual modules can always be driven directly for unusual setups.

use crate::num::{IndexInt, SampleInt};

/// Configuration for the burst-detection pipeline.
///
/// Sample values (`S`) follow the pipeline's sample type; time values (`I`)
/// are in samples at the input rate.
#[derive(Debug, Clone)]
pub struct PipelineConfig<S, I> {
    /// Number of filter banks to run. Clamped to the compiled bank count.
    pub active_banks: usize,
    /// Number of input channels to run. Clamped to the compiled channel
    /// count.
    pub active_chans: usize,
    /// Biquad stages per chain. Clamped to the compiled stage count.
    pub active_stages: usize,

    /// Lower edge of the auto-ranger's desired output window.
    pub desired_min: S,
    /// Upper edge of the auto-ranger's desired output window.
    pub desired_max: S,
    /// When nonzero, schedule an auto-range latch after this many samples;
    /// the pipeline then feeds the filters from the latched mapping.
    pub autorange_latch_samples: I,
    /// Use the latched mapping (hardware-style) instead of the running
    /// mapping recomputed every tick.
    pub use_latched_range: bool,

    /// Envelope smoother time constant: settling takes about
    /// `2^envelope_avg_bits` samples.
    pub envelope_avg_bits: u8,
    /// Envelope output gain in 1/256 steps (256 = unity).
    pub envelope_coeff: S,

    /// Envelope level that starts a detection.
    pub threshold_high: S,
    /// Envelope level below which a detection ends.
    pub threshold_low: S,

    /// Shortest oscillation period the estimators should accept.
    pub min_period: I,

    /// Detection-flag debounce: rising-edge delay in samples.
    pub deglitch_rise: I,
    /// Detection-flag debounce: falling-edge delay in samples.
    pub deglitch_fall: I,

    /// Stimulation pulse length in samples (at least 1).
    pub pulse_duration: I,
    /// Post-pulse quiet time in samples (at least 1).
    pub pulse_cooldown: I,
    /// Allow a new pulse while the detection flag is still asserted.
    pub reraise_ok: bool,

    /// Target phase as a fraction of a period, 0..255 (128 = half a
    /// period past the rising crossing).
    pub phase_fraction: I,
    /// Time pulses from the falling crossing instead of the rising one.
    pub want_falling: bool,
}

impl<S: SampleInt, I: IndexInt> Default for PipelineConfig<S, I> {
    fn default() -> Self {
        Self {
            active_banks: usize::MAX,
            active_chans: usize::MAX,
            active_stages: usize::MAX,

            desired_min: S::MIN,
            desired_max: S::MAX,
            autorange_latch_samples: I::ZERO,
            use_latched_range: false,

            envelope_avg_bits: 4,
            envelope_coeff: S::from_i64_signed(256),

            threshold_high: S::ZERO,
            threshold_low: S::ZERO,

            // "Never detect" until the caller picks a band.
            min_period: I::MAX,

            deglitch_rise: I::ZERO,
            deglitch_fall: I::ZERO,

            pulse_duration: I::ONE,
            pulse_cooldown: I::from_i64_signed(50),
            reraise_ok: false,

            phase_fraction: I::from_i64_signed(128),
            want_falling: false,
        }
    }
}
