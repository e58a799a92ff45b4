//! Persistent storage for the device profile record.
//!
//! Uses the nRF52840's internal flash via `sequential-storage` crate.
//! The record is one map item under [`PROFILE_RECORD_KEY`]; the flash
//! pages are managed by `sequential-storage` which handles wear levelling
//! and GC.
//!
//! Writes are issued by the keyboard through `PROFILE_WRITES` and run
//! here, off the scan loop.  Every write is answered with a
//! `ProfileWritten` event so the keyboard can restart once the record is
//! durable.

use defmt::{error, info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

use splitkb::config::{PROFILE_RECORD_KEY, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use splitkb::profile::DeviceProfile;
use splitkb::{StorageError, Task};

use crate::KeyboardEvent;

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Scratch buffer for one map item (key + record + item header).
const ITEM_BUFFER_SIZE: usize = 64;

/// Read the stored profile.  Missing or unreadable records yield `None`
/// and the keyboard provisions a fresh one.
pub async fn load_profile(flash: &mut impl NorFlash) -> Option<DeviceProfile> {
    let mut buf = [0u8; ITEM_BUFFER_SIZE];

    match fetch_item::<u16, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &PROFILE_RECORD_KEY,
    )
    .await
    {
        Ok(Some(data)) => match DeviceProfile::from_bytes(data) {
            Ok(profile) => {
                info!("loaded device profile: {:?}", profile);
                Some(profile)
            }
            Err(e) => {
                warn!("stored profile rejected: {:?}", e);
                None
            }
        },
        Ok(None) => {
            info!("no device profile in flash");
            None
        }
        Err(e) => {
            error!("flash read error: {:?}", defmt::Debug2Format(&e));
            None
        }
    }
}

async fn store_profile(flash: &mut impl NorFlash, profile: &DeviceProfile) -> Result<(), StorageError> {
    let mut buf = [0u8; ITEM_BUFFER_SIZE];
    let record = profile.to_bytes();

    store_item::<u16, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &PROFILE_RECORD_KEY,
        &record.as_slice(),
    )
    .await
    .map_err(|e| {
        error!("flash write error: {:?}", defmt::Debug2Format(&e));
        StorageError::Flash
    })
}

/// Persist every profile handed over by the keyboard, in order.
pub async fn storage_task(
    mut flash: impl NorFlash,
    writes: Receiver<'static, CriticalSectionRawMutex, DeviceProfile, 2>,
    events: Sender<'static, CriticalSectionRawMutex, KeyboardEvent, { crate::EVENT_QUEUE_DEPTH }>,
) -> ! {
    info!("storage task started");

    loop {
        let profile = writes.receive().await;
        let result = store_profile(&mut flash, &profile).await;
        if result.is_ok() {
            info!("device profile saved (profile {})", profile.active_slot + 1);
        }
        events
            .send(KeyboardEvent::Task(Task::ProfileWritten(result)))
            .await;
    }
}
