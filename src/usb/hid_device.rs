//! USB HID composite device - keyboard + consumer control.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes two HID endpoints.  Bus state changes and LED
//! output reports are forwarded to the keyboard as events.

use crate::{KeyboardEvent, EVENTS};
use defmt::{info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_usb::class::hid::{
    Config as HidConfig, HidWriter, OutResponse, ReportId, RequestHandler, State,
};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config, UsbDevice};
use splitkb::config;
use splitkb::hid::consumer::{CONSUMER_REPORT_DESCRIPTOR, CONSUMER_REPORT_SIZE};
use splitkb::hid::keyboard::{KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};
use splitkb::hid::HidReport;
use splitkb::Task;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

pub type UsbDeviceRunner = UsbDevice<'static, UsbDriver>;

static KB_STATE: StaticCell<State> = StaticCell::new();
static CONSUMER_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_POWER_HANDLER: StaticCell<UsbPowerHandler> = StaticCell::new();
static LED_HANDLER: StaticCell<KeyboardLedHandler> = StaticCell::new();

/// Tracks whether the host can currently take reports.
struct UsbPowerHandler {
    configured: bool,
    suspended: bool,
}

impl UsbPowerHandler {
    fn publish(&self) {
        let connected = self.configured && !self.suspended;
        if EVENTS.try_send(KeyboardEvent::HostConnected(connected)).is_err() {
            warn!("event queue full, host state {} lost", connected);
        }
    }
}

impl embassy_usb::Handler for UsbPowerHandler {
    fn configured(&mut self, configured: bool) {
        self.configured = configured;
        self.publish();
    }

    fn suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
        self.publish();
    }

    fn reset(&mut self) {
        self.configured = false;
        self.publish();
    }
}

/// Receives keyboard LED output reports.
struct KeyboardLedHandler;

impl RequestHandler for KeyboardLedHandler {
    fn set_report(&mut self, _id: ReportId, data: &[u8]) -> OutResponse {
        if let Some(&leds) = data.first() {
            let _ = EVENTS.try_send(KeyboardEvent::HostLeds(leds));
        }
        OutResponse::Accepted
    }
}

/// The two HID IN endpoints.
pub struct HidWriters {
    pub keyboard: HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>,
    pub consumer: HidWriter<'static, UsbDriver, CONSUMER_REPORT_SIZE>,
}

/// Build result containing the USB device runner and the HID writers.
pub struct UsbHidDevice {
    pub device: UsbDeviceRunner,
    pub writers: HidWriters,
}

/// Initialise the USB stack and create the composite HID device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbHidDevice {
    // Create the low-level USB driver with hardware VBUS detection.
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    // USB device-level configuration.
    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;
    usb_config.supports_remote_wakeup = true;

    // Allocate static descriptor buffers.
    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let usb_handler = USB_POWER_HANDLER.init(UsbPowerHandler {
        configured: false,
        suspended: false,
    });
    builder.handler(usb_handler);

    let kb_state = KB_STATE.init(State::new());
    let kb_config = HidConfig {
        report_descriptor: KEYBOARD_REPORT_DESCRIPTOR,
        request_handler: Some(LED_HANDLER.init(KeyboardLedHandler)),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let keyboard = HidWriter::new(&mut builder, kb_state, kb_config);

    let consumer_state = CONSUMER_STATE.init(State::new());
    let consumer_config = HidConfig {
        report_descriptor: CONSUMER_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let consumer = HidWriter::new(&mut builder, consumer_state, consumer_config);

    let device = builder.build();

    info!("USB HID composite device initialised (keyboard + consumer)");

    UsbHidDevice {
        device,
        writers: HidWriters { keyboard, consumer },
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDeviceRunner) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Write reports handed over by the keyboard and announce when the next
/// one can be taken.
pub async fn hid_writer_task(
    mut writers: HidWriters,
    report_rx: Receiver<'static, CriticalSectionRawMutex, HidReport, 1>,
) -> ! {
    info!("HID writer task started - waiting for reports");

    let mut buf = [0u8; KEYBOARD_REPORT_SIZE];

    loop {
        let report = report_rx.receive().await;
        let n = report.serialize(&mut buf);

        let result = match report {
            HidReport::Keyboard(_) => writers.keyboard.write(&buf[..n]).await,
            HidReport::Consumer(_) => writers.consumer.write(&buf[..n]).await,
        };

        match result {
            Ok(()) => {}
            Err(EndpointError::Disabled) => warn!("USB endpoint disabled, report discarded"),
            Err(EndpointError::BufferOverflow) => warn!("USB report too large, discarded"),
        }

        EVENTS
            .send(KeyboardEvent::Task(Task::TransportReady))
            .await;
    }
}
