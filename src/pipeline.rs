//! The prebuilt burst-detection pipeline.
//!
//! Wires the processing modules into the canonical chain and advances the
//! whole thing one input slice per tick:
//!
//! raw -> auto-ranger -> IIR bank -> analytic estimators ->
//! {envelope averager -> hysteresis threshold -> de-glitcher} (detect) and
//! {delay calibration LUT} (timing) -> trigger bank -> pulse flags
//!
//! Every intermediate slice is owned by the pipeline, so the per-tick path
//! allocates nothing. The driver stays free to compose the modules
//! differently (FIR front end, voting, multi-trigger routing); this struct
//! covers the common single-chain deployment.

use crate::config::PipelineConfig;
use crate::num::{IndexInt, SampleInt};
use crate::signal_processing::analytic::AnalyticBank;
use crate::signal_processing::auto_ranger::AutoRanger;
use crate::signal_processing::biquad::BiquadBank;
use crate::signal_processing::lut::StepLutBank;
use crate::signal_processing::threshold::{test_samples, AveragerBank, DeGlitcherBank, DualThresholdBank};
use crate::signal_processing::trigger::TriggerBank;
use crate::slice::Slice;

/// Fixed-point scale of the envelope averager's output gain.
pub const ENVELOPE_COEFF_BITS: u8 = 8;

/// Rows available in the per-bank delay calibration tables.
pub const DELAY_LUT_ROWS: usize = 16;

/// A complete detection-and-stimulation pipeline over `CHANS` channels
/// split into `BANKS` frequency bands.
pub struct DetectionPipeline<S, I, const STAGES: usize, const BANKS: usize, const CHANS: usize> {
    auto_ranger: AutoRanger<S, I, CHANS>,
    iir_bank: BiquadBank<S, STAGES, BANKS, CHANS>,
    analytic_bank: AnalyticBank<S, I, BANKS, CHANS>,
    envelope: AveragerBank<S, { ENVELOPE_COEFF_BITS }, BANKS, CHANS>,
    dual_threshold: DualThresholdBank<BANKS, CHANS>,
    deglitcher: DeGlitcherBank<I, BANKS, CHANS>,
    delay_lut: StepLutBank<I, I, DELAY_LUT_ROWS, BANKS, CHANS>,
    trigger_bank: TriggerBank<I, BANKS, CHANS>,

    use_latched_range: bool,
    want_falling: bool,
    phase_fraction: I,

    banks_active: usize,
    chans_active: usize,

    thresholds_high: Slice<S, BANKS, CHANS>,
    thresholds_low: Slice<S, BANKS, CHANS>,

    // Per-tick working slices.
    ranged: Slice<S, 1, CHANS>,
    band: Slice<S, BANKS, CHANS>,
    magnitude: Slice<S, BANKS, CHANS>,
    envelope_out: Slice<S, BANKS, CHANS>,
    period: Slice<I, BANKS, CHANS>,
    since_rise: Slice<I, BANKS, CHANS>,
    since_fall: Slice<I, BANKS, CHANS>,
    activate: Slice<bool, BANKS, CHANS>,
    sustain: Slice<bool, BANKS, CHANS>,
    raw_detect: Slice<bool, BANKS, CHANS>,
    detect: Slice<bool, BANKS, CHANS>,
    target_offset: Slice<I, BANKS, CHANS>,
    signals: Slice<I, BANKS, CHANS>,
    targets: Slice<I, BANKS, CHANS>,
}

impl<S: SampleInt, I: IndexInt, const STAGES: usize, const BANKS: usize, const CHANS: usize>
    DetectionPipeline<S, I, STAGES, BANKS, CHANS>
{
    /// Build a pipeline from a configuration. Filter coefficients and
    /// calibration tables start blank; load them through the component
    /// accessors before expecting band-limited output.
    pub fn new(config: &PipelineConfig<S, I>) -> Self {
        let mut pipeline = Self {
            auto_ranger: AutoRanger::new(),
            iir_bank: BiquadBank::new(),
            analytic_bank: AnalyticBank::new(),
            envelope: AveragerBank::new(),
            dual_threshold: DualThresholdBank::new(),
            deglitcher: DeGlitcherBank::new(),
            delay_lut: StepLutBank::new(),
            trigger_bank: TriggerBank::new(),

            use_latched_range: config.use_latched_range,
            want_falling: config.want_falling,
            phase_fraction: config.phase_fraction,

            banks_active: config.active_banks.min(BANKS),
            chans_active: config.active_chans.min(CHANS),

            thresholds_high: Slice::filled(config.threshold_high),
            thresholds_low: Slice::filled(config.threshold_low),

            ranged: Slice::filled(S::ZERO),
            band: Slice::filled(S::ZERO),
            magnitude: Slice::filled(S::ZERO),
            envelope_out: Slice::filled(S::ZERO),
            period: Slice::filled(I::ZERO),
            since_rise: Slice::filled(I::ZERO),
            since_fall: Slice::filled(I::ZERO),
            activate: Slice::filled(false),
            sustain: Slice::filled(false),
            raw_detect: Slice::filled(false),
            detect: Slice::filled(false),
            target_offset: Slice::filled(I::ZERO),
            signals: Slice::filled(I::ZERO),
            targets: Slice::filled(I::ZERO),
        };

        pipeline.auto_ranger.set_desired_range(config.desired_min, config.desired_max);
        if config.autorange_latch_samples > I::ZERO {
            pipeline.auto_ranger.latch_after(config.autorange_latch_samples);
        }

        pipeline.iir_bank.set_active_banks(pipeline.banks_active);
        pipeline.iir_bank.set_active_chans(pipeline.chans_active);
        pipeline.iir_bank.set_active_stages(config.active_stages);

        pipeline.analytic_bank.set_active_banks(pipeline.banks_active);
        pipeline.analytic_bank.set_active_chans(pipeline.chans_active);
        for bidx in 0..BANKS {
            pipeline.analytic_bank.set_one_min_period(bidx, config.min_period);
        }

        pipeline.envelope.set_active_banks(pipeline.banks_active);
        pipeline.envelope.set_active_chans(pipeline.chans_active);
        pipeline.envelope.set_uniform_avg_bits(config.envelope_avg_bits);
        pipeline.envelope.set_uniform_coeffs(config.envelope_coeff);

        pipeline
            .deglitcher
            .set_uniform_delays(config.deglitch_rise, config.deglitch_fall);

        pipeline.delay_lut.set_active_banks(pipeline.banks_active);
        pipeline.delay_lut.set_active_chans(pipeline.chans_active);

        pipeline.trigger_bank.set_active_banks(pipeline.banks_active);
        pipeline.trigger_bank.set_active_chans(pipeline.chans_active);
        pipeline
            .trigger_bank
            .set_pulse_durations(&Slice::filled(config.pulse_duration));
        pipeline
            .trigger_bank
            .set_pulse_cooldowns(&Slice::filled(config.pulse_cooldown));
        pipeline.trigger_bank.set_all_reraises(config.reraise_ok);
        pipeline.trigger_bank.set_enable_flags(&Slice::filled(true));

        pipeline
    }

    /// Advance the whole pipeline by one tick.
    ///
    /// `input` is one raw sample per channel; `pulses` receives the pulse
    /// flag for every active `(bank, channel)` cell. Cells outside the
    /// active subrectangle are not written.
    pub fn process_slice(&mut self, input: &Slice<S, 1, CHANS>, pulses: &mut Slice<bool, BANKS, CHANS>) {
        // Range normalization.
        self.auto_ranger.update_from_sample(input);
        if self.use_latched_range {
            self.auto_ranger.get_latched_output(input, &mut self.ranged);
        } else {
            self.auto_ranger.get_running_output(input, &mut self.ranged);
        }

        // Band-pass split.
        self.iir_bank.apply_bank_once(&self.ranged, &mut self.band);

        // Envelope and timing primitives.
        self.analytic_bank.handle_samples(&self.band);
        self.analytic_bank.get_estimated_analytic(
            &mut self.magnitude,
            &mut self.period,
            &mut self.since_rise,
            &mut self.since_fall,
        );

        // Detection: smoothed envelope against the hysteresis pair, then
        // debounce.
        self.envelope.update_average(&self.magnitude, &mut self.envelope_out);
        test_samples(&self.envelope_out, &self.thresholds_high, &mut self.activate);
        test_samples(&self.envelope_out, &self.thresholds_low, &mut self.sustain);
        self.dual_threshold
            .test_dual(&self.activate, &self.sustain, &mut self.raw_detect);
        self.deglitcher.process_sample(&self.raw_detect, &mut self.detect);

        // Timing: delay calibration plus the fractional phase target.
        self.delay_lut.lookup_all_le(&self.period, &mut self.target_offset);

        for bidx in 0..self.banks_active {
            for cidx in 0..self.chans_active {
                self.signals.data[bidx][cidx] = if self.want_falling {
                    self.since_fall.data[bidx][cidx]
                } else {
                    self.since_rise.data[bidx][cidx]
                };

                let phase_target = self
                    .phase_fraction
                    .wrapping_mul(self.period.data[bidx][cidx])
                    .asr(8);
                self.targets.data[bidx][cidx] =
                    phase_target.wrapping_add(self.target_offset.data[bidx][cidx]);
            }
        }

        // Pulse generation.
        self.trigger_bank.process_samples(
            &self.signals,
            &self.targets,
            &self.period,
            &self.detect,
            pulses,
        );
    }

    /// Prime the trigger bank: allow up to `max_pulses` pulses within the
    /// next `window_samps` ticks.
    pub fn enable_stimulation(&mut self, window_samps: I, max_pulses: I) {
        self.trigger_bank.enable_triggering(window_samps, max_pulses);
    }

    /// Close the stimulation window. Pulses in flight still complete.
    pub fn disable_stimulation(&mut self) {
        self.trigger_bank.disable_triggering();
    }

    /// Drop every trigger back to idle and zero the stimulation budget.
    pub fn force_idle(&mut self) {
        self.trigger_bank.force_idle();
    }

    /// The detection flags produced on the most recent tick.
    pub fn last_detect_flags(&self) -> &Slice<bool, BANKS, CHANS> {
        &self.detect
    }

    /// The envelope values produced on the most recent tick.
    pub fn last_envelope(&self) -> &Slice<S, BANKS, CHANS> {
        &self.envelope_out
    }

    pub fn auto_ranger(&self) -> &AutoRanger<S, I, CHANS> {
        &self.auto_ranger
    }

    pub fn auto_ranger_mut(&mut self) -> &mut AutoRanger<S, I, CHANS> {
        &mut self.auto_ranger
    }

    pub fn iir_bank(&self) -> &BiquadBank<S, STAGES, BANKS, CHANS> {
        &self.iir_bank
    }

    pub fn iir_bank_mut(&mut self) -> &mut BiquadBank<S, STAGES, BANKS, CHANS> {
        &mut self.iir_bank
    }

    pub fn analytic_bank_mut(&mut self) -> &mut AnalyticBank<S, I, BANKS, CHANS> {
        &mut self.analytic_bank
    }

    pub fn delay_lut_mut(&mut self) -> &mut StepLutBank<I, I, DELAY_LUT_ROWS, BANKS, CHANS> {
        &mut self.delay_lut
    }

    pub fn trigger_bank(&self) -> &TriggerBank<I, BANKS, CHANS> {
        &self.trigger_bank
    }

    pub fn trigger_bank_mut(&mut self) -> &mut TriggerBank<I, BANKS, CHANS> {
        &mut self.trigger_bank
    }
}
