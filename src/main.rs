//! SPDX-License-Identifier: MIT OR Apache-2.0
//!
//! # Potentiometer-Driven LED Dimmer
//!
//! Rotating the pot adjusts the brightness of a single LED: each pass of
//! the control loop waits out the sample-and-hold settle time, runs one
//! analog conversion, and transplants the 10-bit reading straight into the
//! PWM comparator.
//!
//! - **Hardware Module:** one-shot peripheral bring-up (`hardware.rs`).
//! - **FSM:** typed state machine for the loop discipline (`dimmer_fsm.rs`).
//!
//! Target: Raspberry Pi Pico 2 W (RP2350). The hosted build is an empty
//! stub so the library's unit tests run on the host.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
use defmt::*;
#[cfg(target_os = "none")]
use defmt_rtt as _;
#[cfg(all(target_os = "none", target_arch = "arm"))]
use panic_probe as _;
#[cfg(all(target_os = "none", target_arch = "riscv32"))]
use panic_halt as _;

#[cfg(target_os = "none")]
use rp235x_hal as hal;
#[cfg(target_os = "none")]
use hal::entry;

#[cfg(target_os = "none")]
use pot_dimmer::{
    config::DimmerConfig,
    dimmer_fsm::{self, DimmerContext, DimmerFsm},
    hardware,
    sample::{AnalogReading, DutyCycleValue},
};

// --- Bootloader Configuration ---

#[cfg(target_os = "none")]
#[unsafe(link_section = ".start_block")]
#[used]
pub static IMAGE_DEF: hal::block::ImageDef = hal::block::ImageDef::secure_exe();

/// How often the running duty cycle is echoed to the log.
#[cfg(target_os = "none")]
const LOG_EVERY_ITERATIONS: u32 = 65_536;

/// Entry point.
#[cfg(target_os = "none")]
#[entry]
fn main() -> ! {
    info!("Dimmer start");

    // 1. One-shot peripheral bring-up; never runs again
    let cfg = DimmerConfig::DEFAULT;
    let mut board = hardware::init(&cfg);
    info!(
        "PWM at {=u32} Hz, {=u32} duty steps",
        cfg.pwm_frequency_hz(),
        cfg.duty_steps()
    );

    // 2. Control machine, starting in Settling
    let mut ctx = DimmerContext {
        reading: AnalogReading::default(),
        duty: DutyCycleValue::default(),
        iterations: 0,
    };
    let mut fsm = DimmerFsm::Settling;
    fsm.init(&mut ctx);

    // 3. Sample-convert-drive, forever
    loop {
        dimmer_fsm::run_cycle(&mut board, &mut fsm, &mut ctx);

        if ctx.iterations % LOG_EVERY_ITERATIONS == 0 {
            debug!("duty {=u16}/1023", ctx.duty.steps());
        }
    }
}

/// The control loop only exists on the target; hosted builds are for the
/// unit tests in the library.
#[cfg(not(target_os = "none"))]
fn main() {}

// --- Metadata ---

#[cfg(target_os = "none")]
#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [hal::binary_info::EntryAddr; 4] = [
    hal::binary_info::rp_cargo_bin_name!(),
    hal::binary_info::rp_cargo_version!(),
    hal::binary_info::rp_program_description!(c"Potentiometer LED Dimmer"),
    hal::binary_info::rp_program_build_attribute!()
];
