//! USB device with a single HID keyboard interface.
//!
//! Initialises the Embassy USB stack on the nRF52840 USB peripheral,
//! registers the vendor control handler and exposes the keyboard
//! interrupt-IN endpoint.

use defmt::{info, warn};
use embassy_futures::select::{select, Either};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_time::Timer;
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, State};
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;
use stickpass::config;
use stickpass::hid::{KeyboardReport, KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};

use super::control::{KeyboardRequestHandler, VendorHandler};

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;
pub type KeyboardWriter = HidWriter<'static, UsbDriver, 8>;

static KB_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static VENDOR_HANDLER: StaticCell<VendorHandler> = StaticCell::new();
static KB_REQUEST_HANDLER: StaticCell<KeyboardRequestHandler> = StaticCell::new();

pub struct UsbHidDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub keyboard_writer: KeyboardWriter,
}

/// Initialise the USB stack. Must be called exactly once.
pub fn init(usbd: peripherals::USBD) -> UsbHidDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        USB_CONFIG_DESC.init([0u8; 256]),
        USB_BOS_DESC.init([0u8; 256]),
        USB_MSOS_DESC.init([0u8; 256]),
        USB_CTRL_BUF.init([0u8; 128]),
    );

    builder.handler(VENDOR_HANDLER.init(VendorHandler));

    let kb_config = HidConfig {
        report_descriptor: KEYBOARD_REPORT_DESCRIPTOR,
        request_handler: Some(KB_REQUEST_HANDLER.init(KeyboardRequestHandler)),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let keyboard_writer = HidWriter::new(&mut builder, KB_STATE.init(State::new()), kb_config);

    let device = builder.build();
    info!("USB device initialised (vendor control + keyboard)");

    UsbHidDevice {
        device,
        keyboard_writer,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Hand one report to the interrupt-IN endpoint.
///
/// Returns once the host has collected it, or after
/// `USB_HID_WRITE_TIMEOUT_MS` if it never does (bus suspended, cable
/// pulled), so the main loop keeps feeding the watchdog.
pub async fn send_report(writer: &mut KeyboardWriter, report: &KeyboardReport) {
    let mut buf = [0u8; KEYBOARD_REPORT_SIZE];
    let n = report.serialize(&mut buf);

    match select(
        writer.write(&buf[..n]),
        Timer::after_millis(config::USB_HID_WRITE_TIMEOUT_MS),
    )
    .await
    {
        Either::First(Ok(())) => {}
        Either::First(Err(_e)) => warn!("USB keyboard write failed"),
        Either::Second(()) => warn!("USB keyboard write timed out"),
    }
}
