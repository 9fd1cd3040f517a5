//! Hardware Adapter Module
//!
//! This module handles the low-level configuration of the RP2350
//! peripherals and exposes them to the control loop as a [`Board`].
//! The potentiometer sits on GPIO26 (converter channel 0) and the LED on
//! GPIO15, driven by PWM slice 7 channel B.
//!
//! The RP2350's converter is 12-bit and its PWM counter 16-bit; this
//! adapter presents both through the loop's 10-bit model. The top 10 bits
//! of each conversion become the left-justified result pair, and the
//! comparator runs a 2048-count period with two counts per duty step,
//! which keeps every one of the 1024 steps distinct and the on-fraction
//! at exactly steps/1024.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use rp235x_hal as hal;
use hal::pac;

use crate::board::Board;
use crate::config::DimmerConfig;
use crate::sample::{AnalogReading, DutyCycleValue};

/// External crystal frequency used by the Raspberry Pi Pico 2 W.
const XTAL_FREQ_HZ: u32 = 12_000_000u32;

/// System clock produced from the crystal by `init_clocks_and_plls`.
const SYS_CLK_HZ: u32 = 150_000_000u32;

/// Converter channel the potentiometer pin (GPIO26) is routed to.
const POT_ADC_CHANNEL: u8 = 0;

/// PWM counter counts per 10-bit duty step. Two counts per step keeps the
/// on-fraction at steps/1024 while staying inside the divider's 8-bit
/// integer range at 150 MHz.
const DUTY_SCALE: u16 = 2;

/// The real peripherals behind the [`Board`] capability set.
pub struct PicoBoard {
    timer: hal::Timer<hal::timer::CopyableTimer0>,
    pwm: hal::pwm::Slice<hal::pwm::Pwm7, hal::pwm::FreeRunning>,
    settle_us: u32,
}

/// Initializes the hardware stack; runs once and never again.
///
/// This function:
/// 1.  Takes ownership of the raw PAC peripherals.
/// 2.  Configures the clocks (the watchdog is clock-setup plumbing only
///     and is never enabled as a reset source).
/// 3.  Initializes the microsecond timer used for the settle delay.
/// 4.  Drives the LED pin low before anything else can light it.
/// 5.  Enables the converter and routes the potentiometer pin to it in
///     single-shot mode.
/// 6.  Programs the PWM slice from the configuration constants, with the
///     compare value at zero, and starts it.
///
/// There is no error path: misconfiguration here shows up as wrong
/// brightness behavior, not as a reportable fault.
pub fn init(cfg: &DimmerConfig) -> PicoBoard {
    // 1. Take ownership of raw peripherals
    let mut pac = pac::Peripherals::take().unwrap();
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // 2. Configure Clocks
    let clocks = hal::clocks::init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    // 3. Configure Timer (microsecond precision, drives the settle delay)
    let timer = hal::Timer::new_timer0(pac.TIMER0, &mut pac.RESETS, &clocks);

    // 4. Configure GPIOs; the LED must be dark until the PWM owns it
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut led = pins.gpio15.into_push_pull_output();
    let _ = led.set_low();

    // 5. Configure ADC: module enabled, pot pin as the analog source,
    //    single-shot polled conversions
    let _adc = hal::Adc::new(pac.ADC, &mut pac.RESETS);
    let _pot = hal::adc::AdcPin::new(pins.gpio26).unwrap();

    unsafe {
        let adc_regs = &(*pac::ADC::ptr());
        adc_regs.cs().modify(|_, w| {
            w.ainsel().bits(POT_ADC_CHANNEL)
             .start_many().clear_bit()
        });
    }

    // 6. Configure PWM slice 7, channel B -> GPIO15
    let slices = hal::pwm::Slices::new(pac.PWM, &mut pac.RESETS);
    let mut pwm = slices.pwm7;

    let top = cfg.duty_steps() as u16 * DUTY_SCALE - 1;
    let (div_int, div_frac) = cfg.timer_divider(SYS_CLK_HZ, top);
    pwm.set_div_int(div_int);
    pwm.set_div_frac(div_frac);
    pwm.set_top(top);
    let _ = pwm.channel_b.set_duty_cycle(0);
    pwm.channel_b.output_to(led);
    pwm.enable();

    PicoBoard {
        timer,
        pwm,
        settle_us: cfg.settle_delay_us,
    }
}

impl Board for PicoBoard {
    fn settle(&mut self) {
        self.timer.delay_us(self.settle_us);
    }

    fn start_conversion(&mut self) {
        unsafe {
            let adc_regs = &(*pac::ADC::ptr());
            adc_regs.cs().modify(|_, w| w.start_once().set_bit());
        }
    }

    fn await_conversion_complete(&mut self) {
        // READY stays low while a conversion is running; no timeout
        unsafe {
            let adc_regs = &(*pac::ADC::ptr());
            while !adc_regs.cs().read().ready().bit_is_set() {
                core::hint::spin_loop();
            }
        }
    }

    fn read_result(&mut self) -> AnalogReading {
        let raw = unsafe { (*pac::ADC::ptr()).result().read().result().bits() };
        // keep the top 10 of the 12 converted bits, left-justified
        AnalogReading::from_value(raw >> 2)
    }

    fn load_duty(&mut self, duty: DutyCycleValue) {
        let _ = self.pwm.channel_b.set_duty_cycle(duty.steps() * DUTY_SCALE);
    }
}
