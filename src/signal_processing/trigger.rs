//! Phase-targeted trigger generation.
//!
//! The stateless target- and flag-logic helpers assemble per-trigger timing
//! signals and goal values from bank-level evidence; the trigger state
//! machine then emits a fixed-length pulse once its timing signal reaches
//! the target, honoring a pulse quota, an active window, and a per-pulse
//! cooldown. Each logic case is kept separate so a hardware rendition can
//! instantiate only what a configuration needs.

use crate::num::IndexInt;
use crate::slice::Slice;

/// Zero-crossing target logic: route the rising or falling crossing delay
/// from each trigger's `(bank, chan)` source into `signals_out`.
///
/// Out-of-range sources leave the output cell unchanged.
pub fn select_zc_inputs<I: IndexInt, const BANKS: usize, const CHANS: usize, const TRIGS: usize>(
    src_banks: &Slice<usize, 1, TRIGS>,
    src_chans: &Slice<usize, 1, TRIGS>,
    want_falling: &Slice<bool, 1, TRIGS>,
    rise_delays: &Slice<I, BANKS, CHANS>,
    fall_delays: &Slice<I, BANKS, CHANS>,
    signals_out: &mut Slice<I, 1, TRIGS>,
) {
    for tidx in 0..TRIGS {
        let bidx = src_banks.data[0][tidx];
        let cidx = src_chans.data[0][tidx];

        if bidx < BANKS && cidx < CHANS {
            signals_out.data[0][tidx] = if want_falling.data[0][tidx] {
                fall_delays.data[bidx][cidx]
            } else {
                rise_delays.data[bidx][cidx]
            };
        }
    }
}

/// Phase target logic: convert each trigger's nominal phase fraction
/// (0..255, one turn = 256) into a delay in samples,
/// `(fraction * period) >> 8`.
///
/// Out-of-range sources leave the output cell unchanged.
pub fn select_phase_targets<I: IndexInt, const BANKS: usize, const CHANS: usize, const TRIGS: usize>(
    src_banks: &Slice<usize, 1, TRIGS>,
    src_chans: &Slice<usize, 1, TRIGS>,
    periods: &Slice<I, BANKS, CHANS>,
    nominal_targets: &Slice<I, 1, TRIGS>,
    targets_out: &mut Slice<I, 1, TRIGS>,
) {
    for tidx in 0..TRIGS {
        let bidx = src_banks.data[0][tidx];
        let cidx = src_chans.data[0][tidx];

        if bidx < BANKS && cidx < CHANS {
            let scaled = nominal_targets.data[0][tidx]
                .wrapping_mul(periods.data[bidx][cidx])
                .asr(8);
            targets_out.data[0][tidx] = scaled;
        }
    }
}

/// Combined zero-crossing and phase target logic.
///
/// Triggers with `want_phase` set take the phase signal and a fractional
/// target scaled by the period; the rest take the selected crossing delay
/// and the nominal target verbatim. `want_phase` takes priority over
/// `want_falling`. Out-of-range sources leave the output cells unchanged.
#[allow(clippy::too_many_arguments)]
pub fn select_zc_phase_inputs_and_targets<
    I: IndexInt,
    const BANKS: usize,
    const CHANS: usize,
    const TRIGS: usize,
>(
    src_banks: &Slice<usize, 1, TRIGS>,
    src_chans: &Slice<usize, 1, TRIGS>,
    want_phase: &Slice<bool, 1, TRIGS>,
    want_falling: &Slice<bool, 1, TRIGS>,
    rise_delays: &Slice<I, BANKS, CHANS>,
    fall_delays: &Slice<I, BANKS, CHANS>,
    phases: &Slice<I, BANKS, CHANS>,
    periods: &Slice<I, BANKS, CHANS>,
    signals_out: &mut Slice<I, 1, TRIGS>,
    nominal_targets: &Slice<I, 1, TRIGS>,
    targets_out: &mut Slice<I, 1, TRIGS>,
) {
    for tidx in 0..TRIGS {
        let bidx = src_banks.data[0][tidx];
        let cidx = src_chans.data[0][tidx];

        if bidx < BANKS && cidx < CHANS {
            if want_phase.data[0][tidx] {
                signals_out.data[0][tidx] = phases.data[bidx][cidx];
                targets_out.data[0][tidx] = nominal_targets.data[0][tidx]
                    .wrapping_mul(periods.data[bidx][cidx])
                    .asr(8);
            } else {
                signals_out.data[0][tidx] = if want_falling.data[0][tidx] {
                    fall_delays.data[bidx][cidx]
                } else {
                    rise_delays.data[bidx][cidx]
                };
                targets_out.data[0][tidx] = nominal_targets.data[0][tidx];
            }
        }
    }
}

/// Conditional flag logic: per trigger, "A", "A and B", or "A and not B"
/// over primary/secondary evidence at the trigger's source cell.
///
/// Out-of-range sources produce `false`.
pub fn select_conditional_flags<const BANKS: usize, const CHANS: usize, const TRIGS: usize>(
    src_banks: &Slice<usize, 1, TRIGS>,
    src_chans: &Slice<usize, 1, TRIGS>,
    want_secondary: &Slice<bool, 1, TRIGS>,
    negate_secondary: &Slice<bool, 1, TRIGS>,
    input_primary: &Slice<bool, BANKS, CHANS>,
    input_secondary: &Slice<bool, BANKS, CHANS>,
    output_flags: &mut Slice<bool, 1, TRIGS>,
) {
    for tidx in 0..TRIGS {
        let bidx = src_banks.data[0][tidx];
        let cidx = src_chans.data[0][tidx];

        if bidx < BANKS && cidx < CHANS {
            let mut flag = input_primary.data[bidx][cidx];

            if want_secondary.data[0][tidx] {
                let mut second = input_secondary.data[bidx][cidx];
                if negate_secondary.data[0][tidx] {
                    second = !second;
                }
                flag = flag && second;
            }

            output_flags.data[0][tidx] = flag;
        } else {
            output_flags.data[0][tidx] = false;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum TriggerState {
    #[default]
    Idle,
    WaitRise,
    WaitFall,
    WaitCool,
}

/// One trigger's pulse state machine.
///
/// From `Idle`, an asserted detect flag (with quota remaining) arms the
/// trigger toward a saved target; the timing signal is phase-unwrapped
/// while waiting. Reaching the target asserts the pulse for `duration`
/// ticks, followed by `cooldown` ticks of enforced silence. A pulse that
/// has begun always runs to completion.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trigger<I> {
    duration: I,
    cooldown: I,
    reraise_ok: bool,

    state: TriggerState,
    timeout_left: I,
    saved_target: I,
    prev_signal: I,
    unwrap_offset: I,
}

impl<I: IndexInt> Trigger<I> {
    pub fn new() -> Self {
        let mut trigger = Self {
            duration: I::ONE,
            cooldown: I::ONE,
            reraise_ok: false,
            state: TriggerState::Idle,
            timeout_left: I::ZERO,
            saved_target: I::ZERO,
            prev_signal: I::ZERO,
            unwrap_offset: I::ZERO,
        };
        trigger.reset_state();
        trigger
    }

    /// Restore default configuration (1-sample pulse, 50-sample cooldown,
    /// no re-raise) and go idle.
    pub fn reset_state(&mut self) {
        self.duration = I::ONE;
        self.cooldown = I::from_i64_signed(50);
        self.reraise_ok = false;

        self.force_idle();
    }

    /// Drop back to idle, clearing transient state but keeping
    /// configuration.
    pub fn force_idle(&mut self) {
        self.state = TriggerState::Idle;
        self.timeout_left = I::ZERO;
        self.saved_target = I::ZERO;
        self.prev_signal = I::ZERO;
        self.unwrap_offset = I::ZERO;
    }

    /// Advance the state machine by one tick.
    ///
    /// `signal` is the unwrappable timing signal, `target` the value it
    /// must reach, `period` the oscillation period used for unwrapping and
    /// target advancement. `trigger_count_left` is the shared pulse quota;
    /// it is decremented exactly once per armed pulse. Returns true while
    /// the pulse output is asserted.
    pub fn process_sample(
        &mut self,
        signal: I,
        target: I,
        period: I,
        detect: bool,
        trigger_count_left: &mut I,
    ) -> bool {
        match self.state {
            TriggerState::Idle => {
                if detect && *trigger_count_left > I::ZERO {
                    *trigger_count_left = trigger_count_left.wrapping_sub(I::ONE);
                    self.state = TriggerState::WaitRise;

                    self.saved_target = target;
                    // Already past the target: aim one period later. A
                    // second advance covers calibration offsets that push
                    // the signal past a full period.
                    if signal >= self.saved_target {
                        self.saved_target = self.saved_target.wrapping_add(period);
                    }
                    if signal >= self.saved_target {
                        self.saved_target = self.saved_target.wrapping_add(period);
                    }

                    self.unwrap_offset = I::ZERO;
                    self.prev_signal = signal;
                }
            }

            TriggerState::WaitRise => {
                // Unwrap: the raw signal resets each cycle, so carry an
                // accumulated offset and extend it when the signal jumps
                // backward by more than half a period.
                let mut signal = signal.wrapping_add(self.unwrap_offset);

                if signal.wrapping_add(period.asr(1)) < self.prev_signal {
                    self.unwrap_offset = self.unwrap_offset.wrapping_add(period);
                    signal = signal.wrapping_add(period);
                }

                self.prev_signal = signal;

                if signal >= self.saved_target {
                    self.timeout_left = self.duration;
                    self.state = TriggerState::WaitFall;
                }
            }

            TriggerState::WaitFall => {
                if self.timeout_left > I::ZERO {
                    self.timeout_left = self.timeout_left.wrapping_sub(I::ONE);
                }
                if self.timeout_left == I::ZERO {
                    self.timeout_left = self.cooldown;
                    self.state = TriggerState::WaitCool;
                }
            }

            TriggerState::WaitCool => {
                if self.timeout_left > I::ZERO {
                    self.timeout_left = self.timeout_left.wrapping_sub(I::ONE);
                }
                // Re-arm only once detection drops, unless re-raising on a
                // still-asserted flag is allowed.
                if self.timeout_left == I::ZERO && (!detect || self.reraise_ok) {
                    self.state = TriggerState::Idle;
                }
            }
        }

        self.state == TriggerState::WaitFall
    }

    /// Pulse length in samples; clamped to at least 1.
    pub fn set_pulse_duration(&mut self, new_duration: I) {
        self.duration = if new_duration < I::ONE { I::ONE } else { new_duration };
    }

    /// Post-pulse quiet time in samples; clamped to at least 1.
    pub fn set_pulse_cooldown(&mut self, new_cooldown: I) {
        self.cooldown = if new_cooldown < I::ONE { I::ONE } else { new_cooldown };
    }

    pub fn set_reraise(&mut self, want_reraise: bool) {
        self.reraise_ok = want_reraise;
    }

    pub fn get_pulse_duration(&self) -> I {
        self.duration
    }

    pub fn get_pulse_cooldown(&self) -> I {
        self.cooldown
    }

    pub fn get_reraise(&self) -> bool {
        self.reraise_ok
    }
}

/// Bank-level trigger controller.
///
/// Holds one trigger per cell plus the shared stimulation budget: a pulse
/// quota and an active time window, both set when the bank is primed with
/// [`Self::enable_triggering`]. When the window runs out the quota is
/// forced to zero, but pulses already in flight still complete.
pub struct TriggerBank<I, const BANKS: usize, const CHANS: usize> {
    trigger_count_left: I,
    window_time_left: I,

    triggers: [[Trigger<I>; CHANS]; BANKS],
    enabled: Slice<bool, BANKS, CHANS>,

    banks_active: usize,
    chans_active: usize,
}

impl<I: IndexInt, const BANKS: usize, const CHANS: usize> TriggerBank<I, BANKS, CHANS> {
    pub fn new() -> Self {
        let mut bank = Self {
            trigger_count_left: I::ZERO,
            window_time_left: I::ZERO,
            triggers: [[Trigger::new(); CHANS]; BANKS],
            enabled: Slice::filled(false),
            banks_active: 0,
            chans_active: 0,
        };
        bank.reset_state();
        bank
    }

    /// Reset configuration and state: quota and window zeroed, all
    /// triggers back to defaults, everything disabled.
    pub fn reset_state(&mut self) {
        self.trigger_count_left = I::ZERO;
        self.window_time_left = I::ZERO;

        self.banks_active = 0;
        self.chans_active = 0;

        self.enabled.fill(false);

        for row in self.triggers.iter_mut() {
            for trigger in row.iter_mut() {
                trigger.reset_state();
            }
        }
    }

    /// Halt all triggering and reset transient trigger state, keeping
    /// configuration.
    pub fn force_idle(&mut self) {
        self.trigger_count_left = I::ZERO;
        self.window_time_left = I::ZERO;

        for row in self.triggers.iter_mut() {
            for trigger in row.iter_mut() {
                trigger.force_idle();
            }
        }
    }

    /// Prime the bank: allow up to `max_pulses_sent` pulses within the
    /// next `active_window_samps` ticks.
    pub fn enable_triggering(&mut self, active_window_samps: I, max_pulses_sent: I) {
        self.window_time_left = active_window_samps;
        self.trigger_count_left = max_pulses_sent;
    }

    /// Clear the window and quota. Pulses in progress still complete.
    pub fn disable_triggering(&mut self) {
        self.window_time_left = I::ZERO;
        self.trigger_count_left = I::ZERO;
    }

    /// Advance every enabled trigger in the active subrectangle by one
    /// tick, writing pulse flags into `trigs_out`. Inactive cells are not
    /// written.
    pub fn process_samples(
        &mut self,
        signals: &Slice<I, BANKS, CHANS>,
        targets: &Slice<I, BANKS, CHANS>,
        periods: &Slice<I, BANKS, CHANS>,
        detect_flags: &Slice<bool, BANKS, CHANS>,
        trigs_out: &mut Slice<bool, BANKS, CHANS>,
    ) {
        // Window expiry drops the quota to zero; the per-cell update still
        // runs so in-flight pulses can finish.
        if self.window_time_left > I::ZERO {
            self.window_time_left = self.window_time_left.wrapping_sub(I::ONE);
        } else {
            self.trigger_count_left = I::ZERO;
        }

        for bidx in 0..self.banks_active {
            for cidx in 0..self.chans_active {
                let mut this_out = false;

                if self.enabled.data[bidx][cidx] {
                    this_out = self.triggers[bidx][cidx].process_sample(
                        signals.data[bidx][cidx],
                        targets.data[bidx][cidx],
                        periods.data[bidx][cidx],
                        detect_flags.data[bidx][cidx],
                        &mut self.trigger_count_left,
                    );
                }

                trigs_out.data[bidx][cidx] = this_out;
            }
        }
    }

    pub fn set_active_banks(&mut self, new_banks: usize) {
        self.banks_active = new_banks.min(BANKS);
    }

    pub fn set_active_chans(&mut self, new_chans: usize) {
        self.chans_active = new_chans.min(CHANS);
    }

    pub fn get_active_banks(&self) -> usize {
        self.banks_active
    }

    pub fn get_active_chans(&self) -> usize {
        self.chans_active
    }

    pub fn set_enable_flags(&mut self, want_enabled: &Slice<bool, BANKS, CHANS>) {
        self.enabled.copy_from(want_enabled);
    }

    pub fn get_enable_flags(&self, is_enabled: &mut Slice<bool, BANKS, CHANS>) {
        is_enabled.copy_from(&self.enabled);
    }

    pub fn set_pulse_durations(&mut self, duration_samps: &Slice<I, BANKS, CHANS>) {
        for bidx in 0..BANKS {
            for cidx in 0..CHANS {
                self.triggers[bidx][cidx].set_pulse_duration(duration_samps.data[bidx][cidx]);
            }
        }
    }

    pub fn set_pulse_cooldowns(&mut self, cooldown_samps: &Slice<I, BANKS, CHANS>) {
        for bidx in 0..BANKS {
            for cidx in 0..CHANS {
                self.triggers[bidx][cidx].set_pulse_cooldown(cooldown_samps.data[bidx][cidx]);
            }
        }
    }

    pub fn set_all_reraises(&mut self, want_reraise: bool) {
        for row in self.triggers.iter_mut() {
            for trigger in row.iter_mut() {
                trigger.set_reraise(want_reraise);
            }
        }
    }

    pub fn get_pulse_durations(&self, duration_samps: &mut Slice<I, BANKS, CHANS>) {
        for bidx in 0..BANKS {
            for cidx in 0..CHANS {
                duration_samps.data[bidx][cidx] = self.triggers[bidx][cidx].get_pulse_duration();
            }
        }
    }

    pub fn get_pulse_cooldowns(&self, cooldown_samps: &mut Slice<I, BANKS, CHANS>) {
        for bidx in 0..BANKS {
            for cidx in 0..CHANS {
                cooldown_samps.data[bidx][cidx] = self.triggers[bidx][cidx].get_pulse_cooldown();
            }
        }
    }

    pub fn get_reraises(&self, reraise_flags: &mut Slice<bool, BANKS, CHANS>) {
        for bidx in 0..BANKS {
            for cidx in 0..CHANS {
                reraise_flags.data[bidx][cidx] = self.triggers[bidx][cidx].get_reraise();
            }
        }
    }

    pub fn set_one_enable_flag(&mut self, bank: usize, chan: usize, want_enabled: bool) {
        if bank < BANKS && chan < CHANS {
            self.enabled.data[bank][chan] = want_enabled;
        }
    }

    pub fn set_one_pulse_duration(&mut self, bank: usize, chan: usize, new_duration: I) {
        if bank < BANKS && chan < CHANS {
            self.triggers[bank][chan].set_pulse_duration(new_duration);
        }
    }

    pub fn set_one_pulse_cooldown(&mut self, bank: usize, chan: usize, new_cooldown: I) {
        if bank < BANKS && chan < CHANS {
            self.triggers[bank][chan].set_pulse_cooldown(new_cooldown);
        }
    }

    pub fn set_one_reraise(&mut self, bank: usize, chan: usize, want_reraise: bool) {
        if bank < BANKS && chan < CHANS {
            self.triggers[bank][chan].set_reraise(want_reraise);
        }
    }

    pub fn get_one_enable_flag(&self, bank: usize, chan: usize) -> bool {
        if bank < BANKS && chan < CHANS {
            self.enabled.data[bank][chan]
        } else {
            false
        }
    }

    pub fn get_one_pulse_duration(&self, bank: usize, chan: usize) -> I {
        if bank < BANKS && chan < CHANS {
            self.triggers[bank][chan].get_pulse_duration()
        } else {
            I::ZERO
        }
    }

    pub fn get_one_pulse_cooldown(&self, bank: usize, chan: usize) -> I {
        if bank < BANKS && chan < CHANS {
            self.triggers[bank][chan].get_pulse_cooldown()
        } else {
            I::ZERO
        }
    }

    pub fn get_one_reraise(&self, bank: usize, chan: usize) -> bool {
        if bank < BANKS && chan < CHANS {
            self.triggers[bank][chan].get_reraise()
        } else {
            false
        }
    }
}

impl<I: IndexInt, const BANKS: usize, const CHANS: usize> Default for TriggerBank<I, BANKS, CHANS> {
    fn default() -> Self {
        Self::new()
    }
}
