//! The sample-convert-drive control machine.
//!
//! Three states, cyclic, no terminal state. The two blocking points (the
//! settle delay and the conversion poll) sit in [`run_cycle`] between
//! dispatches, so the machine can only reach `Reading` with a completed
//! conversion in hand.

use typed_fsm::{state_machine, Transition};

use crate::board::Board;
use crate::sample::{AnalogReading, DutyCycleValue};

// FSM Context
pub struct DimmerContext {
    /// Result registers captured by the most recent completed conversion.
    pub reading: AnalogReading,
    /// Comparator value derived from `reading`; what the LED shows.
    pub duty: DutyCycleValue,
    /// Completed loop iterations, wrapping.
    pub iterations: u32,
}

// FSM Events
#[derive(Clone, Copy, Debug)]
pub enum DimmerEvent {
    /// The sample-and-hold settle delay has elapsed.
    SettleElapsed,
    /// The converter cleared its busy flag; here are the result registers.
    ConversionDone(AnalogReading),
    /// The comparator has been rewritten; the cycle is complete.
    DutyLoaded,
}

// State Machine Definition
state_machine! {
    Name: DimmerFsm,
    Context: DimmerContext,
    Event: DimmerEvent,
    States: {
        // Sample-and-hold capacitor charging towards the pot voltage
        Settling => {
            entry: |_ctx| {}
            process: |_ctx, evt| {
                match evt {
                    DimmerEvent::SettleElapsed => Transition::To(DimmerFsm::Converting),
                    _ => Transition::None, // stale events cannot shortcut the delay
                }
            }
        },

        // Conversion running; result registers are not valid yet
        Converting => {
            entry: |_ctx| {}
            process: |ctx, evt| {
                match evt {
                    DimmerEvent::ConversionDone(raw) => {
                        ctx.reading = *raw;
                        Transition::To(DimmerFsm::Reading)
                    }
                    _ => Transition::None,
                }
            }
        },

        // Transplant the finished reading into the comparator fields
        Reading => {
            entry: |ctx| {
                ctx.duty = DutyCycleValue::from(ctx.reading);
                ctx.iterations = ctx.iterations.wrapping_add(1);
            }
            process: |_ctx, evt| {
                match evt {
                    DimmerEvent::DutyLoaded => Transition::To(DimmerFsm::Settling),
                    _ => Transition::None,
                }
            }
        }
    }
}

/// One full pass: Settling -> Converting -> Reading -> back to Settling.
///
/// The conversion is started only once the settle delay has elapsed, and
/// the result registers are read only after `await_conversion_complete`
/// has returned, so the comparator is never loaded from a conversion that
/// has not finished.
pub fn run_cycle<B: Board>(board: &mut B, fsm: &mut DimmerFsm, ctx: &mut DimmerContext) {
    board.settle();
    fsm.dispatch(ctx, &DimmerEvent::SettleElapsed);

    board.start_conversion();
    board.await_conversion_complete();
    let raw = board.read_result();
    fsm.dispatch(ctx, &DimmerEvent::ConversionDone(raw));

    board.load_duty(ctx.duty);
    fsm.dispatch(ctx, &DimmerEvent::DutyLoaded);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DimmerConfig;
    use crate::sample::FULL_SCALE;
    use crate::sim::SimBoard;

    fn fresh() -> (SimBoard, DimmerFsm, DimmerContext) {
        let board = SimBoard::init(&DimmerConfig::DEFAULT);
        let mut ctx = DimmerContext {
            reading: AnalogReading::default(),
            duty: DutyCycleValue::default(),
            iterations: 0,
        };
        let mut fsm = DimmerFsm::Settling;
        fsm.init(&mut ctx);
        (board, fsm, ctx)
    }

    #[test]
    fn starts_settling_and_cycles_back_to_settling() {
        let (mut board, mut fsm, mut ctx) = fresh();
        assert!(matches!(fsm, DimmerFsm::Settling));

        board.set_input(300);
        run_cycle(&mut board, &mut fsm, &mut ctx);

        assert!(matches!(fsm, DimmerFsm::Settling));
        assert_eq!(ctx.iterations, 1);
    }

    #[test]
    fn duty_tracks_the_pot_over_the_full_range() {
        let (mut board, mut fsm, mut ctx) = fresh();
        for value in 0..=FULL_SCALE {
            board.set_input(value);
            run_cycle(&mut board, &mut fsm, &mut ctx);

            // identity mapping, and the comparator fields mirror the
            // result registers bit for bit
            assert_eq!(ctx.duty.steps(), value);
            assert_eq!(board.compare_fields(), (ctx.reading.high_byte(), ctx.reading.low_bits()));
        }
        assert_eq!(ctx.iterations, 1024);
    }

    #[test]
    fn end_to_end_brightness_points() {
        let (mut board, mut fsm, mut ctx) = fresh();
        for (value, fields) in [(0, (0x00, 0b00)), (1023, (0xFF, 0b11)), (512, (0x80, 0b00))] {
            board.set_input(value);
            run_cycle(&mut board, &mut fsm, &mut ctx);
            assert_eq!(board.compare_fields(), fields);
        }
    }

    #[test]
    fn delayed_completion_never_leaks_into_reading() {
        let (mut board, mut fsm, mut ctx) = fresh();
        board.set_input(777);
        board.delay_completion(37);

        run_cycle(&mut board, &mut fsm, &mut ctx);

        // the poll loop absorbed the delay; the result was only read once
        // the busy flag had cleared
        assert!(board.polls_observed() > 1);
        assert!(!board.read_while_busy());
        assert_eq!(ctx.duty.steps(), 777);
    }

    #[test]
    fn one_settle_and_one_conversion_per_iteration() {
        let (mut board, mut fsm, mut ctx) = fresh();
        for value in [12, 700, 700, 3, 1023] {
            board.set_input(value);
            run_cycle(&mut board, &mut fsm, &mut ctx);
        }

        assert_eq!(board.settles(), 5);
        assert_eq!(board.conversions_started(), 5);
        assert_eq!(ctx.iterations, 5);
    }

    #[test]
    fn comparator_holds_the_last_duty_between_iterations() {
        let (mut board, mut fsm, mut ctx) = fresh();
        board.set_input(900);
        run_cycle(&mut board, &mut fsm, &mut ctx);
        board.set_input(100);
        run_cycle(&mut board, &mut fsm, &mut ctx);

        assert_eq!(board.duty_history(), &[900, 100]);
        assert_eq!(board.duty_steps(), 100);
    }

    #[test]
    fn stale_events_are_ignored() {
        let (_board, mut fsm, mut ctx) = fresh();

        // a completion that arrives while still settling must not move us
        fsm.dispatch(&mut ctx, &DimmerEvent::ConversionDone(AnalogReading::from_value(55)));
        assert!(matches!(fsm, DimmerFsm::Settling));
        assert_eq!(ctx.duty.steps(), 0);

        fsm.dispatch(&mut ctx, &DimmerEvent::SettleElapsed);
        assert!(matches!(fsm, DimmerFsm::Converting));

        // the settle delay has no meaning while converting
        fsm.dispatch(&mut ctx, &DimmerEvent::SettleElapsed);
        assert!(matches!(fsm, DimmerFsm::Converting));
        fsm.dispatch(&mut ctx, &DimmerEvent::DutyLoaded);
        assert!(matches!(fsm, DimmerFsm::Converting));
    }

    #[test]
    fn reading_state_derives_duty_from_the_latest_reading() {
        let (_board, mut fsm, mut ctx) = fresh();
        fsm.dispatch(&mut ctx, &DimmerEvent::SettleElapsed);
        fsm.dispatch(&mut ctx, &DimmerEvent::ConversionDone(AnalogReading::from_value(641)));

        assert!(matches!(fsm, DimmerFsm::Reading));
        assert_eq!(ctx.reading.value(), 641);
        assert_eq!(ctx.duty.steps(), 641);

        fsm.dispatch(&mut ctx, &DimmerEvent::DutyLoaded);
        assert!(matches!(fsm, DimmerFsm::Settling));
    }
}
