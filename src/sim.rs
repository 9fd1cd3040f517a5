//! Simulated register model of the converter/comparator pair.
//!
//! Stands in for the real peripherals in unit tests: it keeps the same
//! observable register behavior (a conversion-in-progress flag, a
//! left-justified result pair that stays stale until completion, a
//! two-field comparator) and adds instrumentation: completion can be
//! delayed by a number of polls to exercise the busy-wait, and every
//! comparator write is recorded.

use heapless::Vec;

use crate::board::Board;
use crate::config::DimmerConfig;
use crate::sample::{AnalogReading, DutyCycleValue, FULL_SCALE};

const HISTORY_DEPTH: usize = 64;

pub struct SimBoard {
    // converter register model
    conversion_in_progress: bool,
    result_high: u8,
    result_low: u8,
    // comparator register model
    compare_primary: u8,
    compare_fractional: u8,

    // configuration latched by `init`, in place of real pin/timer state
    pub led_pin_low: bool,
    pub pot_pin_analog: bool,
    pub converter_enabled: bool,
    pub left_justified: bool,
    pub converter_clock_divisor: u8,
    pub period_register: u8,
    pub timer_prescale: u16,
    pub timer_running: bool,

    // harness knobs and probes
    input: u16,
    completion_delay_polls: u32,
    polls_remaining: u32,
    polls_observed: u32,
    settles: u32,
    conversions_started: u32,
    read_while_busy: bool,
    duty_history: Vec<u16, HISTORY_DEPTH>,
}

impl SimBoard {
    /// One-shot configuration, mirroring what the initializer must leave
    /// behind on real hardware before the first loop iteration.
    pub fn init(cfg: &DimmerConfig) -> Self {
        Self {
            conversion_in_progress: false,
            result_high: 0,
            result_low: 0,
            compare_primary: 0,
            compare_fractional: 0,
            led_pin_low: true,
            pot_pin_analog: true,
            converter_enabled: true,
            left_justified: true,
            converter_clock_divisor: cfg.adc_clock_divisor,
            period_register: cfg.pwm_period_register,
            timer_prescale: cfg.timer_prescale,
            timer_running: true,
            input: 0,
            completion_delay_polls: 0,
            polls_remaining: 0,
            polls_observed: 0,
            settles: 0,
            conversions_started: 0,
            read_while_busy: false,
            duty_history: Vec::new(),
        }
    }

    /// Position the simulated potentiometer; captured by the next
    /// conversion, not by ones already in flight.
    pub fn set_input(&mut self, position: u16) {
        self.input = position & FULL_SCALE;
    }

    /// Keep the busy flag set for `polls` extra polls of the next
    /// conversion before it completes.
    pub fn delay_completion(&mut self, polls: u32) {
        self.completion_delay_polls = polls;
    }

    /// Comparator fields as last written: `(primary, fractional)`.
    pub fn compare_fields(&self) -> (u8, u8) {
        (self.compare_primary, self.compare_fractional)
    }

    /// Comparator contents as a 10-bit step count.
    pub fn duty_steps(&self) -> u16 {
        ((self.compare_primary as u16) << 2) | self.compare_fractional as u16
    }

    /// Every comparator write so far, oldest first (bounded).
    pub fn duty_history(&self) -> &[u16] {
        &self.duty_history
    }

    /// Total busy-flag polls across all conversions.
    pub fn polls_observed(&self) -> u32 {
        self.polls_observed
    }

    /// Number of settle delays taken.
    pub fn settles(&self) -> u32 {
        self.settles
    }

    /// Number of conversion starts asserted.
    pub fn conversions_started(&self) -> u32 {
        self.conversions_started
    }

    /// Set if the result registers were ever read while the busy flag was
    /// still up, the ordering violation the loop must never commit.
    pub fn read_while_busy(&self) -> bool {
        self.read_while_busy
    }

    fn complete_conversion(&mut self) {
        // left-justified: high 8 bits fill one register, low 2 bits sit in
        // the top of the other
        self.result_high = (self.input >> 2) as u8;
        self.result_low = ((self.input & 0b11) << 6) as u8;
        self.conversion_in_progress = false;
    }
}

impl Board for SimBoard {
    fn settle(&mut self) {
        self.settles += 1;
    }

    fn start_conversion(&mut self) {
        self.conversions_started += 1;
        self.conversion_in_progress = true;
        self.polls_remaining = self.completion_delay_polls;
    }

    fn await_conversion_complete(&mut self) {
        while self.conversion_in_progress {
            self.polls_observed += 1;
            if self.polls_remaining == 0 {
                self.complete_conversion();
            } else {
                self.polls_remaining -= 1;
            }
        }
    }

    fn read_result(&mut self) -> AnalogReading {
        if self.conversion_in_progress {
            self.read_while_busy = true;
        }
        AnalogReading::from_registers(self.result_high, self.result_low)
    }

    fn load_duty(&mut self, duty: DutyCycleValue) {
        self.compare_primary = duty.primary();
        self.compare_fractional = duty.fractional();
        let _ = self.duty_history.push(duty.steps());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_state_matches_what_the_loop_depends_on() {
        let sim = SimBoard::init(&DimmerConfig::DEFAULT);

        // LED dark, pot routed to the converter, before the first iteration
        assert!(sim.led_pin_low);
        assert!(sim.pot_pin_analog);
        assert!(sim.converter_enabled);
        assert!(sim.left_justified);
        assert!(sim.timer_running);
        assert_eq!(sim.period_register, 255);
        assert_eq!(sim.timer_prescale, 1);
        assert_eq!(sim.converter_clock_divisor, 8);
        assert_eq!(sim.compare_fields(), (0, 0));
        assert_eq!(sim.duty_steps(), 0);
    }

    #[test]
    fn result_registers_stay_stale_until_completion() {
        let mut sim = SimBoard::init(&DimmerConfig::DEFAULT);
        sim.set_input(600);
        sim.delay_completion(3);
        sim.start_conversion();

        // an early read sees the old registers and trips the latch
        assert_eq!(sim.read_result().value(), 0);
        assert!(sim.read_while_busy());

        sim.await_conversion_complete();
        assert_eq!(sim.read_result().value(), 600);
    }

    #[test]
    fn input_is_masked_to_ten_bits() {
        let mut sim = SimBoard::init(&DimmerConfig::DEFAULT);
        sim.set_input(0x7FF);
        sim.start_conversion();
        sim.await_conversion_complete();
        assert_eq!(sim.read_result().value(), 0x3FF);
    }

    #[test]
    fn immediate_completion_still_costs_one_poll() {
        let mut sim = SimBoard::init(&DimmerConfig::DEFAULT);
        sim.start_conversion();
        sim.await_conversion_complete();
        assert_eq!(sim.polls_observed(), 1);
    }
}
