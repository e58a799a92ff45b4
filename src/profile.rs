//! Device profile store - which paired host is active and under which
//! radio address each profile advertises.
//!
//! Three profiles each own one address byte (patched into byte 3 of the
//! device address) and an optional bond.  The three address bytes are
//! kept pairwise distinct so every profile looks like a different device
//! to the hosts.
//!
//! Profile changes only take effect after a restart.  Writes are
//! asynchronous: a command marks a restart as pending and issues the
//! write; the restart happens when the write-completion event arrives,
//! never before the new record is durable.

use rand_core::RngCore;

use crate::config::PROFILE_SLOTS;
use crate::error::{Error, StorageError};
use crate::keymap::DeviceCommand;

/// Bond identity of the host paired on a profile.
pub type BondId = u16;

/// Serialized "no bond" marker.
pub const NO_BOND: u16 = 0xFFFF;

/// Serialized record size, padded to the 4-byte flash word.
pub const PROFILE_RECORD_SIZE: usize = 12;

/// Persistent profile record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceProfile {
    pub active_slot: u8,
    pub addresses: [u8; PROFILE_SLOTS],
    pub bonds: [Option<BondId>; PROFILE_SLOTS],
}

impl DeviceProfile {
    /// First-boot record: three distinct random address bytes, no bonds.
    pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut addresses = [0u8; PROFILE_SLOTS];
        loop {
            for address in addresses.iter_mut() {
                *address = random_byte(rng);
            }
            if pairwise_distinct(&addresses) {
                break;
            }
        }
        Self {
            active_slot: 0,
            addresses,
            bonds: [None; PROFILE_SLOTS],
        }
    }

    pub fn is_valid(&self) -> bool {
        (self.active_slot as usize) < PROFILE_SLOTS && pairwise_distinct(&self.addresses)
    }

    pub fn active_address(&self) -> u8 {
        self.addresses[self.active_slot as usize]
    }

    /// Device address for the active profile: `base` with byte 3
    /// replaced by the profile's address byte.
    pub fn device_address(&self, base: [u8; 6]) -> [u8; 6] {
        let mut address = base;
        address[3] = self.active_address();
        address
    }

    pub fn to_bytes(&self) -> [u8; PROFILE_RECORD_SIZE] {
        let mut buf = [0u8; PROFILE_RECORD_SIZE];
        buf[0] = self.active_slot;
        buf[1..1 + PROFILE_SLOTS].copy_from_slice(&self.addresses);
        for (i, bond) in self.bonds.iter().enumerate() {
            let at = 1 + PROFILE_SLOTS + i * 2;
            buf[at..at + 2].copy_from_slice(&bond.unwrap_or(NO_BOND).to_le_bytes());
        }
        buf
    }

    /// Parse a stored record.  Short or inconsistent records are corrupt.
    pub fn from_bytes(data: &[u8]) -> Result<Self, StorageError> {
        if data.len() < 1 + PROFILE_SLOTS * 3 {
            return Err(StorageError::Corrupt);
        }

        let mut addresses = [0u8; PROFILE_SLOTS];
        addresses.copy_from_slice(&data[1..1 + PROFILE_SLOTS]);

        let mut bonds = [None; PROFILE_SLOTS];
        for (i, bond) in bonds.iter_mut().enumerate() {
            let at = 1 + PROFILE_SLOTS + i * 2;
            let raw = u16::from_le_bytes([data[at], data[at + 1]]);
            *bond = (raw != NO_BOND).then_some(raw);
        }

        let profile = Self {
            active_slot: data[0],
            addresses,
            bonds,
        };
        if profile.is_valid() {
            Ok(profile)
        } else {
            Err(StorageError::Corrupt)
        }
    }
}

/// Durable storage for the profile record.
pub trait ProfileBackend {
    /// Start writing `profile`.  Completion is reported later through
    /// [`ProfileStore::on_write_complete`].  An error here means the
    /// write could not even be issued.
    fn persist(&mut self, profile: &DeviceProfile) -> Result<(), StorageError>;
}

/// System reset.
pub trait SystemControl {
    /// Reboot the device.  Does not return on hardware.
    fn restart(&mut self);
}

pub struct ProfileStore {
    profile: DeviceProfile,
    restart_pending: bool,
}

impl ProfileStore {
    /// Use a stored record, or create and persist a fresh one when there
    /// is none (first boot) or it is unusable.
    pub fn load<B>(stored: Option<DeviceProfile>, board: &mut B) -> Result<Self, Error>
    where
        B: ProfileBackend + RngCore + ?Sized,
    {
        if let Some(profile) = stored.filter(DeviceProfile::is_valid) {
            info!("profile {} active", profile.active_slot + 1);
            return Ok(Self {
                profile,
                restart_pending: false,
            });
        }

        let profile = DeviceProfile::generate(board);
        info!("created device profiles {:?}", profile.addresses);
        board.persist(&profile)?;
        Ok(Self {
            profile,
            restart_pending: false,
        })
    }

    /// Run a device command bound to a key.
    pub fn execute<B>(&mut self, command: DeviceCommand, board: &mut B) -> Result<(), Error>
    where
        B: ProfileBackend + SystemControl + RngCore + ?Sized,
    {
        match command {
            DeviceCommand::Switch(slot) => self.switch_profile(slot, board),
            DeviceCommand::NewPairing => self.request_new_pairing(board),
        }
    }

    /// Select profile `slot`.  Re-selecting the active profile restarts
    /// right away, which reconnects to its host.
    pub fn switch_profile<B>(&mut self, slot: u8, board: &mut B) -> Result<(), Error>
    where
        B: ProfileBackend + SystemControl + ?Sized,
    {
        if slot as usize >= PROFILE_SLOTS {
            warn!("no profile {}", slot);
            return Ok(());
        }

        if slot == self.profile.active_slot {
            info!("profile {} reselected, restarting", slot + 1);
            board.restart();
            return Ok(());
        }

        info!("switching to profile {}", slot + 1);
        self.profile.active_slot = slot;
        self.persist(board)
    }

    /// Forget the active profile's host and give it a new address.
    pub fn request_new_pairing<B>(&mut self, board: &mut B) -> Result<(), Error>
    where
        B: ProfileBackend + RngCore + ?Sized,
    {
        let address = loop {
            let candidate = random_byte(board);
            if !self.profile.addresses.contains(&candidate) {
                break candidate;
            }
        };

        let slot = self.profile.active_slot as usize;
        info!("profile {} re-pairing with address {:#x}", slot + 1, address);
        self.profile.addresses[slot] = address;
        self.profile.bonds[slot] = None;
        self.persist(board)
    }

    /// Persistence completion.  A failed write is fatal; a successful one
    /// performs the pending restart, if any.
    pub fn on_write_complete<B>(
        &mut self,
        result: Result<(), StorageError>,
        board: &mut B,
    ) -> Result<(), Error>
    where
        B: SystemControl + ?Sized,
    {
        if let Err(e) = result {
            error!("profile write failed: {:?}", e);
            return Err(Error::Storage(e));
        }

        if self.restart_pending {
            info!("profile stored, restarting");
            self.restart_pending = false;
            board.restart();
        }
        Ok(())
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn restart_pending(&self) -> bool {
        self.restart_pending
    }

    fn persist<B>(&mut self, backend: &mut B) -> Result<(), Error>
    where
        B: ProfileBackend + ?Sized,
    {
        self.restart_pending = true;
        backend.persist(&self.profile)?;
        Ok(())
    }
}

fn random_byte<R: RngCore + ?Sized>(rng: &mut R) -> u8 {
    let mut byte = [0u8; 1];
    rng.fill_bytes(&mut byte);
    byte[0]
}

fn pairwise_distinct(addresses: &[u8; PROFILE_SLOTS]) -> bool {
    addresses
        .iter()
        .enumerate()
        .all(|(i, a)| !addresses[i + 1..].contains(a))
}
