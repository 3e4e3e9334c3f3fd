//! StickPass firmware for the nRF52840.
//!
//! Tasks:
//! - `usb_task`: runs the USB device stack; control transfers are handled
//!   synchronously inside it (see `usb::control`).
//! - `main`: the polling loop. Each iteration feeds the watchdog, samples
//!   the button, sends at most one keyboard report and persists the
//!   credential image when it changed.

#![no_std]
#![no_main]

mod board;
mod usb;

use core::cell::RefCell;

use defmt::{info, unwrap, warn};
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Level, Output, OutputDrive, Pin};
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::wdt::{self, Watchdog};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Timer;
use stickpass::config;
use stickpass::StickPass;
use {defmt_rtt as _, panic_probe as _};

use board::{Button, FlashEeprom, UptimeTicks};
use stickpass::input::TickSource;
use usb::hid_device::{self, UsbDriver};

type Device = StickPass<FlashEeprom>;

/// The device context, shared between the USB task and the main loop.
static DEVICE: Mutex<CriticalSectionRawMutex, RefCell<Option<Device>>> =
    Mutex::new(RefCell::new(None));

/// Run `f` on the device. `None` before boot has finished.
pub fn with_device<R>(f: impl FnOnce(&mut Device) -> R) -> Option<R> {
    DEVICE.lock(|cell| cell.borrow_mut().as_mut().map(f))
}

#[embassy_executor::task]
async fn usb_task(device: embassy_usb::UsbDevice<'static, UsbDriver>) -> ! {
    hid_device::run_usb_device(device).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("StickPass starting");

    let mut wdt_config = wdt::Config::default();
    wdt_config.timeout_ticks = config::WATCHDOG_TIMEOUT_TICKS;
    let (_wdt, [mut wdt_handle]) = match Watchdog::try_new(p.WDT, wdt_config) {
        Ok(x) => x,
        Err(_) => {
            // Already running from before a soft reset; it keeps its old config.
            warn!("Watchdog already active");
            cortex_m::peripheral::SCB::sys_reset();
        }
    };

    let mut flash = BlockingAsync::new(Nvmc::new(p.NVMC));
    let eeprom = FlashEeprom::load(&mut flash).await;
    let device = unwrap!(StickPass::boot(eeprom));
    DEVICE.lock(|cell| cell.replace(Some(device)));

    let usb = hid_device::init(p.USBD);
    let mut keyboard = usb.keyboard_writer;
    unwrap!(spawner.spawn(usb_task(usb.device)));

    let button = Button::new(p.P1_06.degrade());
    let mut led = Output::new(p.P0_06, Level::High, OutputDrive::Standard);
    let ticks = UptimeTicks;

    loop {
        wdt_handle.pet();

        let pressed = button.is_pressed();
        let now = ticks.ticks();
        let (report, led_on) = with_device(|dev| {
            dev.poll_button(pressed, now);
            let report = if usb::control::is_configured() {
                dev.next_report()
            } else {
                None
            };
            (report, dev.led())
        })
        .unwrap_or((None, false));

        // LED is active-low.
        if led_on {
            led.set_low();
        } else {
            led.set_high();
        }

        if let Some(report) = report {
            hid_device::send_report(&mut keyboard, &report).await;
        }

        let image = with_device(|dev| dev.store_mut().eeprom_mut().take_dirty()).flatten();
        if let Some(image) = image {
            if !board::save_image(&mut flash, &image).await {
                with_device(|dev| dev.store_mut().eeprom_mut().mark_dirty());
            }
        }

        Timer::after_millis(config::MAIN_LOOP_PERIOD_MS).await;
    }
}
