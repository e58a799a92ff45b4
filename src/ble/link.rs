//! Link to the slave half - GATT client for the key-index service.
//!
//! The slave notifies the key-index characteristic with the signed key
//! edits of each of its scans.  Every notification becomes one
//! `Task::RelayPayload`; losing the connection becomes
//! `Task::LinkDisconnected` so remote keys are not left held.

use defmt::{info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Timer};
use heapless::Vec;
use nrf_softdevice::ble::{central, gatt_client, Address, Connection};
use nrf_softdevice::{raw, Softdevice};

use splitkb::adv_parser::{contains_service_uuid128, extract_device_name};
use splitkb::config::{
    LINK_CONN_INTERVAL_MAX, LINK_CONN_INTERVAL_MIN, LINK_SERVICE_UUID_LE, LINK_SLAVE_LATENCY,
    LINK_SUP_TIMEOUT,
};
use splitkb::relay::RelayPayload;
use splitkb::Task;

use crate::{KeyboardEvent, EVENT_QUEUE_DEPTH};

/// Pause before looking for the slave again after a failure.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Largest notification at the default ATT MTU.
const MAX_NOTIFICATION: usize = 20;

type EventSender = Sender<'static, CriticalSectionRawMutex, KeyboardEvent, EVENT_QUEUE_DEPTH>;

/// nrf-softdevice GATT client struct for the link service.
///
/// The `#[nrf_softdevice::gatt_client]` macro generates discovery and
/// notify helpers for the listed characteristics.
#[nrf_softdevice::gatt_client(uuid = "0d66f36b-af06-44f6-a004-f8a8138518c0")]
pub struct LinkServiceClient {
    /// Key index - notifications carry the slave's signed key edits.
    #[characteristic(uuid = "0d66c74b-af06-44f6-a004-f8a8138518c0", notify)]
    pub key_index: Vec<u8, MAX_NOTIFICATION>,
}

/// Why a link attempt ended before the notification loop.
#[derive(Clone, Copy, defmt::Format)]
enum LinkError {
    ScanFailed,
    ConnectFailed,
    ServiceNotFound,
    NotifyFailed,
}

/// Keep the link to the slave half up for as long as the firmware runs.
pub async fn link_task(sd: &'static Softdevice, events: EventSender) -> ! {
    info!("link task started");

    loop {
        match connect_and_relay(sd, &events).await {
            Ok(()) => {
                info!("link to slave lost");
                events
                    .send(KeyboardEvent::Task(Task::LinkDisconnected))
                    .await;
            }
            Err(e) => warn!("link attempt failed: {:?}", e),
        }
        Timer::after(RETRY_DELAY).await;
    }
}

/// Scan until a peripheral advertises the link service.
async fn find_slave(sd: &Softdevice) -> Result<Address, LinkError> {
    info!("scanning for slave half");

    let config = central::ScanConfig {
        active: true,
        ..Default::default()
    };

    central::scan(sd, &config, |params| {
        let data =
            unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };

        if !contains_service_uuid128(data, &LINK_SERVICE_UUID_LE) {
            return None;
        }

        info!("found slave: {} (RSSI {})", extract_device_name(data).as_str(), params.rssi);
        Some(Address::from_raw(params.peer_addr))
    })
    .await
    .map_err(|_| LinkError::ScanFailed)
}

async fn connect(sd: &Softdevice, address: &Address) -> Result<Connection, LinkError> {
    let whitelist = [address];
    let conn_cfg = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: LINK_CONN_INTERVAL_MIN,
            max_conn_interval: LINK_CONN_INTERVAL_MAX,
            slave_latency: LINK_SLAVE_LATENCY,
            conn_sup_timeout: LINK_SUP_TIMEOUT,
        },
        ..Default::default()
    };

    central::connect(sd, &conn_cfg)
        .await
        .map_err(|_| LinkError::ConnectFailed)
}

/// One connection lifetime.  Returns `Ok` once an established link drops.
async fn connect_and_relay(sd: &Softdevice, events: &EventSender) -> Result<(), LinkError> {
    let address = find_slave(sd).await?;
    let conn = connect(sd, &address).await?;
    info!("connected to slave");

    let client: LinkServiceClient = gatt_client::discover(&conn)
        .await
        .map_err(|_| LinkError::ServiceNotFound)?;

    client
        .key_index_cccd_write(true)
        .await
        .map_err(|_| LinkError::NotifyFailed)?;

    info!("subscribed to slave key edits");

    let _ = gatt_client::run(&conn, &client, |event| match event {
        LinkServiceClientEvent::KeyIndexNotification(data) => {
            let payload = RelayPayload::from_bytes(&data);
            if payload.is_empty() {
                return;
            }
            // Cannot await here; a full queue drops the payload.
            if events
                .try_send(KeyboardEvent::Task(Task::RelayPayload(payload)))
                .is_err()
            {
                warn!("event queue full - dropping relay payload");
            }
        }
    })
    .await;

    Ok(())
}
