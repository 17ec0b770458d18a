pub mod analytic;
pub mod auto_ranger;
pub mod biquad;
pub mod fir;
pub mod lut;
pub mod math;
pub mod threshold;
pub mod trigger;
pub mod voting;

pub use analytic::{AnalyticBank, AnalyticEstimator};
pub use auto_ranger::AutoRanger;
pub use biquad::{Biquad, BiquadBank, BiquadChain, BiquadCoeffs, BIQUAD_CHAIN_BUF_LEN};
pub use fir::{FirBank, FirFilter};
pub use lut::{StepLut, StepLutBank};
pub use math::{fast_modulo, fast_modulo_slice};
pub use threshold::{
    test_samples, Averager, AveragerBank, DeGlitcher, DeGlitcherBank, DualThresholdBank,
};
pub use trigger::{
    select_conditional_flags, select_phase_targets, select_zc_inputs,
    select_zc_phase_inputs_and_targets, Trigger, TriggerBank,
};
pub use voting::{conditionally_latch_new, identify_winning_banks, select_winning_banks};
