//! splitkb - master-half firmware for an nRF52840 split keyboard.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────┐  notify   ┌──────────────┐  EVENTS   ┌───────────────┐
//!  │  slave   │ ────────► │  link_task   │ ────────► │               │
//!  │  half    │           └──────────────┘           │   keyboard    │
//!  └──────────┘           ┌──────────────┐  EVENTS   │   main loop   │
//!                         │ storage_task │ ────────► │  (scan timer, │
//!                         └──────▲───────┘           │  task queue)  │
//!                      PROFILE_WRITES                └──────┬────────┘
//!                                └───────────────────────── │ REPORTS
//!                         ┌──────────────┐  EVENTS          ▼
//!                         │   usb_task   │ ◄──────── hid_writer_task ──► USB host
//!                         └──────────────┘
//! ```
//!
//! All keyboard state lives in one [`Keyboard`] owned by the main loop.
//! Other tasks only talk to it through the `EVENTS` channel.

#![no_std]
#![no_main]

mod ble;
mod board;
mod storage;
mod usb;

use core::mem;

use defmt::{error, info, unwrap};
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::Priority;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Ticker};
use nrf_softdevice::ble::{get_address, set_address, Address, AddressType};
use nrf_softdevice::{raw, Softdevice};
use {defmt_rtt as _, panic_probe as _};

use splitkb::config::{self, Settings};
use splitkb::hid::HidReport;
use splitkb::layouts::ergo_travel::{self, KEYMAP, MASTER_LAYOUT};
use splitkb::power::PowerState;
use splitkb::profile::{DeviceProfile, ProfileStore};
use splitkb::{Keyboard, Task};

use crate::board::NrfBoard;

/// Events delivered to the keyboard main loop.
#[derive(Clone, defmt::Format)]
pub enum KeyboardEvent {
    /// Work for the keyboard task queue.
    Task(Task),
    /// USB configured / deconfigured or suspended.
    HostConnected(bool),
    /// Keyboard LED output report from the host.
    HostLeds(u8),
}

const EVENT_QUEUE_DEPTH: usize = 8;

/// Link, USB and storage tasks → keyboard main loop.
pub static EVENTS: Channel<CriticalSectionRawMutex, KeyboardEvent, EVENT_QUEUE_DEPTH> =
    Channel::new();

/// Keyboard → USB writer.  One slot: a full channel means the transport
/// is busy and the report stays in the keyboard's report buffer.
pub static REPORTS: Channel<CriticalSectionRawMutex, HidReport, 1> = Channel::new();

/// Keyboard → flash writer.
pub static PROFILE_WRITES: Channel<CriticalSectionRawMutex, DeviceProfile, 2> = Channel::new();

// ═══════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn usb_task(device: usb::hid_device::UsbDeviceRunner) -> ! {
    usb::hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn hid_writer_task(writers: usb::hid_device::HidWriters) -> ! {
    usb::hid_device::hid_writer_task(writers, REPORTS.receiver()).await
}

#[embassy_executor::task]
async fn storage_task(flash: nrf_softdevice::Flash) -> ! {
    storage::storage_task(flash, PROFILE_WRITES.receiver(), EVENTS.sender()).await
}

#[embassy_executor::task]
async fn link_task(sd: &'static Softdevice) -> ! {
    ble::link::link_task(sd, EVENTS.sender()).await
}

// ═══════════════════════════════════════════════════════════════════════════
// Entry point
// ═══════════════════════════════════════════════════════════════════════════

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 0,
            central_role_count: 1,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: config::DEVICE_NAME.as_ptr() as _,
            current_len: config::DEVICE_NAME.len() as u16,
            max_len: config::DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("splitkb starting");

    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);

    let sd = Softdevice::enable(&softdevice_config());
    unwrap!(spawner.spawn(softdevice_task(sd)));

    // ErgoTravel master half (Pro Micro footprint): C6 D7 E6 B4 rows,
    // F5 F6 F7 B1 B3 B2 B6 columns.
    let columns = [
        Output::new(p.P0_04, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_03, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_02, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_12, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_14, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_13, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_11, Level::Low, OutputDrive::Standard),
    ];
    let rows = [
        Input::new(p.P0_28, Pull::Down),
        Input::new(p.P0_29, Pull::Down),
        Input::new(p.P0_30, Pull::Down),
        Input::new(p.P0_15, Pull::Down),
    ];
    let mut board = NrfBoard::new(sd, columns, rows);

    // Device profile: load, or create and persist on first boot.
    let mut flash = nrf_softdevice::Flash::take(sd);
    let stored = storage::load_profile(&mut flash).await;
    unwrap!(spawner.spawn(storage_task(flash)));

    let profiles = match ProfileStore::load(stored, &mut board) {
        Ok(profiles) => profiles,
        Err(e) => {
            error!("profile setup failed: {:?}", e);
            cortex_m::peripheral::SCB::sys_reset();
        }
    };

    let base = get_address(sd);
    let address = Address::new(
        AddressType::RandomStatic,
        profiles.profile().device_address(base.bytes()),
    );
    set_address(sd, &address);
    info!("device address {:?}", address);

    let usb = usb::hid_device::init(p.USBD);
    unwrap!(spawner.spawn(usb_task(usb.device)));
    unwrap!(spawner.spawn(hid_writer_task(usb.writers)));
    unwrap!(spawner.spawn(link_task(sd)));

    let mut keyboard = Keyboard::new(&MASTER_LAYOUT, &KEYMAP, Settings::default(), profiles);
    let mut ticker = Ticker::every(Duration::from_millis(config::SCAN_PERIOD_MS as u64));

    info!("keyboard running");

    loop {
        let result = match keyboard.power_state() {
            PowerState::Scanning => match select(ticker.next(), EVENTS.receive()).await {
                Either::First(()) => keyboard.tick(),
                Either::Second(event) => dispatch(&mut keyboard, event),
            },
            PowerState::LowPower => match select(board.wait_for_wake(), EVENTS.receive()).await {
                Either::First(()) => {
                    ticker.reset();
                    keyboard.post(Task::Wake)
                }
                Either::Second(event) => dispatch(&mut keyboard, event),
            },
        };

        if let Err(e) = result.and_then(|()| keyboard.run_pending(&mut board)) {
            error!("fatal: {:?}, resetting", e);
            cortex_m::peripheral::SCB::sys_reset();
        }
    }
}

type MasterKeyboard = Keyboard<
    'static,
    { ergo_travel::ROWS },
    { ergo_travel::COLS },
    { ergo_travel::LAYER_COUNT },
    { ergo_travel::KEY_COUNT },
>;

fn dispatch(keyboard: &mut MasterKeyboard, event: KeyboardEvent) -> Result<(), splitkb::Error> {
    match event {
        KeyboardEvent::Task(task) => keyboard.post(task),
        KeyboardEvent::HostConnected(connected) => {
            keyboard.set_host_connected(connected);
            Ok(())
        }
        KeyboardEvent::HostLeds(leds) => {
            keyboard.on_output_report(&[leds]);
            Ok(())
        }
    }
}
