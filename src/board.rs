//! Capability seam between the control loop and the hardware registers.

use crate::sample::{AnalogReading, DutyCycleValue};

/// The register-level operations the sample-to-duty loop needs.
///
/// Production is a thin adapter over the RP2350's memory-mapped registers
/// (`crate::hardware`); tests substitute the simulated register model
/// ([`crate::sim::SimBoard`]). One-shot configuration is each
/// implementation's constructor, which must leave the converter enabled,
/// the PWM timer running and the comparator at zero before the loop starts.
pub trait Board {
    /// Block for the fixed sample-and-hold settle time.
    fn settle(&mut self);

    /// Assert the conversion-start signal once.
    fn start_conversion(&mut self);

    /// Busy-wait until the converter clears its in-progress flag.
    ///
    /// There is no timeout: a converter that never signals completion
    /// hangs the loop, and a hardware reset is the only recovery.
    fn await_conversion_complete(&mut self);

    /// Read the left-justified result register pair.
    ///
    /// Only meaningful after [`Board::await_conversion_complete`] has
    /// returned; earlier reads see a stale or partial value.
    fn read_result(&mut self) -> AnalogReading;

    /// Write the comparator's primary and fractional duty fields.
    fn load_duty(&mut self, duty: DutyCycleValue);
}
