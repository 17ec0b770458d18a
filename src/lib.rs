//! Integer-only streaming DSP core for closed-loop neural stimulation.
//!
//! Detects transient oscillatory bursts in a local field potential and
//! emits stimulation pulses phase-aligned to the underlying oscillation.
//! Every module advances one sample slice per tick, uses fixed-point
//! integer arithmetic with explicit shift and wrap-around rules, and keeps
//! fixed-size state, so the same processing graph can be reproduced
//! bit-for-bit by a pipelined hardware implementation that time-multiplexes
//! channels through shared arithmetic units.
//!
//! Geometry (bank, channel, stage, coefficient and table-row counts) is
//! fixed per instantiation through const generics; within those bounds the
//! *active* geometry is a run-time setting, so one compiled binary can
//! emulate differently sized rigs. Modules are concrete types composed by
//! passing [`slice::Slice`] references in pipeline order; there is no
//! dynamic dispatch anywhere on the streaming path, and nothing on that
//! path allocates, errors, or logs.
//!
//! [`pipeline::DetectionPipeline`] wires the standard chain; the modules
//! under [`signal_processing`] can be composed directly for anything else.
//! Coefficient and calibration files load and save through [`coeff_io`].

pub mod coeff_io;
pub mod config;
pub mod error;
pub mod num;
pub mod pipeline;
pub mod signal_processing;
pub mod slice;

pub use config::PipelineConfig;
pub use error::{CoeffIoError, Result};
pub use num::{IndexInt, SampleInt};
pub use pipeline::DetectionPipeline;
pub use slice::{map_slice, Slice};
