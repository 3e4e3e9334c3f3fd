//! Control-pipe handlers.
//!
//! Both handlers run inside the USB device task and forward into the
//! shared [`StickPass`](stickpass::StickPass) through
//! [`crate::with_device`]. Each request runs to completion under the
//! lock, so the main loop never observes a half-handled transfer.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{debug, info};
use embassy_usb::class::hid::{ReportId, RequestHandler};
use embassy_usb::control::{InResponse, OutResponse, Request, RequestType};
use embassy_usb::Handler;
use stickpass::device::ControlOutcome;
use stickpass::hid::KEYBOARD_REPORT_SIZE;

use crate::with_device;

static CONFIGURED: AtomicBool = AtomicBool::new(false);

/// Whether the host has configured the device (interrupt-IN is usable).
pub fn is_configured() -> bool {
    CONFIGURED.load(Ordering::Relaxed)
}

fn to_out_response(outcome: Option<ControlOutcome>) -> OutResponse {
    match outcome {
        Some(ControlOutcome::Accepted) => OutResponse::Accepted,
        _ => OutResponse::Rejected,
    }
}

/// Device-level handler: vendor requests and bus state.
pub struct VendorHandler;

impl Handler for VendorHandler {
    fn configured(&mut self, configured: bool) {
        CONFIGURED.store(configured, Ordering::Relaxed);
        info!("USB: configured={}", configured);
    }

    fn suspended(&mut self, suspended: bool) {
        debug!("USB: suspended={}", suspended);
    }

    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        if req.request_type != RequestType::Vendor {
            return None;
        }
        let outcome = with_device(|dev| dev.handle_control(req.request, req.value, data));
        Some(to_out_response(outcome))
    }

    /// Requests without a data stage (LED on/off, clear) may arrive as IN
    /// transfers. They are answered with an empty data stage.
    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        if req.request_type != RequestType::Vendor {
            return None;
        }
        let outcome = with_device(|dev| dev.handle_control(req.request, req.value, &[]));
        match outcome {
            Some(ControlOutcome::Accepted) => Some(InResponse::Accepted(&buf[..0])),
            _ => Some(InResponse::Rejected),
        }
    }
}

/// HID class requests for the keyboard interface.
pub struct KeyboardRequestHandler;

impl RequestHandler for KeyboardRequestHandler {
    fn get_report(&mut self, _id: ReportId, buf: &mut [u8]) -> Option<usize> {
        let report = with_device(|dev| dev.current_report())?;
        match report.serialize(buf) {
            0 => None,
            n => Some(n.min(KEYBOARD_REPORT_SIZE)),
        }
    }

    fn set_report(&mut self, _id: ReportId, _data: &[u8]) -> OutResponse {
        // LED output report from the host; nothing to drive.
        OutResponse::Accepted
    }

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        with_device(|dev| u32::from(dev.idle_rate()) * 4)
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, duration_ms: u32) {
        // Idle rate is kept in 4 ms units, as on the wire.
        let rate = (duration_ms / 4).min(u32::from(u8::MAX)) as u8;
        with_device(|dev| dev.set_idle_rate(rate));
    }
}
