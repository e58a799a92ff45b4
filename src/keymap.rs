//! Layered keymap and its code space.
//!
//! A keymap is a `[layer][index]` table of [`KeyCode`]s.  Every layer
//! covers every index; "fall through to the layer below" is the explicit
//! [`KeyCode::Transparent`] entry, not a missing one.
//!
//! Keymaps can also be written as raw 32-bit codes (see [`KeyCode::from_raw`]):
//!
//! ```text
//! bits 24-31  0x01 = consumer usage in bits 0-15
//! bits  8-15  modifier mask (LCTRL 0x01 .. RGUI 0x80)
//! bits  0-7   base code:
//!             0x00        no key
//!             0x03        transparent
//!             0x04-0xA4   keyboard usage
//!             0xA5-0xA7   switch to profile 1-3
//!             0xA8        pair a new host on the active profile
//!             0xA9-0xB8   layer 0-15
//! ```

use crate::config::{MAX_LAYERS, PROFILE_SLOTS};

/// Modifier bits as laid out in byte 0 of a keyboard report.
pub mod modifier {
    pub const LCTRL: u8 = 0x01;
    pub const LSHIFT: u8 = 0x02;
    pub const LALT: u8 = 0x04;
    pub const LGUI: u8 = 0x08;
    pub const RCTRL: u8 = 0x10;
    pub const RSHIFT: u8 = 0x20;
    pub const RALT: u8 = 0x40;
    pub const RGUI: u8 = 0x80;
}

const RAW_TRANSPARENT: u32 = 0x03;
const RAW_KEY_FIRST: u32 = 0x04;
const RAW_KEY_LAST: u32 = 0xA4;
const RAW_DEVICE_FIRST: u32 = 0xA5;
const RAW_NEW_PAIRING: u32 = 0xA8;
const RAW_LAYER_FIRST: u32 = 0xA9;
const RAW_CONSUMER_TAG: u32 = 0x0100_0000;

/// Profile commands bound to keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceCommand {
    /// Make profile `n` (0-based) the active one.  Re-selecting the
    /// active profile reconnects.
    Switch(u8),
    /// Forget the active profile's host and advertise under a new address.
    NewPairing,
}

/// One keymap entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyCode {
    /// Dead position.
    No,
    /// Use the first non-transparent entry on a lower layer.
    Transparent,
    /// Keyboard usage with optional modifiers.  `usage == 0` is a bare
    /// modifier key.
    Keyboard { modifiers: u8, usage: u8 },
    /// Consumer-control usage (volume, media, brightness).
    Consumer(u16),
    /// While held, later keys resolve against this layer.
    Layer(u8),
    /// Device profile command, executed on press.
    Device(DeviceCommand),
}

impl KeyCode {
    pub const fn key(usage: u8) -> Self {
        KeyCode::Keyboard {
            modifiers: 0,
            usage,
        }
    }

    pub const fn modifier(modifiers: u8) -> Self {
        KeyCode::Keyboard {
            modifiers,
            usage: 0,
        }
    }

    pub const fn with_modifiers(modifiers: u8, usage: u8) -> Self {
        KeyCode::Keyboard { modifiers, usage }
    }

    pub const fn shifted(usage: u8) -> Self {
        Self::with_modifiers(modifier::LSHIFT, usage)
    }

    /// Decode a raw 32-bit keymap code.  Unknown codes decode to `No`.
    pub const fn from_raw(raw: u32) -> Self {
        if raw & 0xFF00_0000 == RAW_CONSUMER_TAG {
            return KeyCode::Consumer((raw & 0xFFFF) as u16);
        }
        if raw & 0xFFFF_0000 != 0 {
            return KeyCode::No;
        }

        let modifiers = ((raw >> 8) & 0xFF) as u8;
        let base = raw & 0xFF;

        if modifiers != 0 {
            let usage = if base >= RAW_KEY_FIRST && base <= RAW_KEY_LAST {
                base as u8
            } else {
                0
            };
            return KeyCode::Keyboard { modifiers, usage };
        }

        match base {
            RAW_TRANSPARENT => KeyCode::Transparent,
            RAW_KEY_FIRST..=RAW_KEY_LAST => KeyCode::key(base as u8),
            RAW_DEVICE_FIRST..=0xA7 => {
                KeyCode::Device(DeviceCommand::Switch((base - RAW_DEVICE_FIRST) as u8))
            }
            RAW_NEW_PAIRING => KeyCode::Device(DeviceCommand::NewPairing),
            _ if base >= RAW_LAYER_FIRST && base < RAW_LAYER_FIRST + MAX_LAYERS as u32 => {
                KeyCode::Layer((base - RAW_LAYER_FIRST) as u8)
            }
            _ => KeyCode::No,
        }
    }

    /// Encode back to the raw form.  Values that have no raw form
    /// (out-of-range layers or profiles) encode as `0`.
    pub const fn to_raw(self) -> u32 {
        match self {
            KeyCode::No => 0,
            KeyCode::Transparent => RAW_TRANSPARENT,
            KeyCode::Keyboard { modifiers, usage } => ((modifiers as u32) << 8) | usage as u32,
            KeyCode::Consumer(usage) => RAW_CONSUMER_TAG | usage as u32,
            KeyCode::Layer(n) if n < MAX_LAYERS => RAW_LAYER_FIRST + n as u32,
            KeyCode::Device(DeviceCommand::Switch(n)) if (n as usize) < PROFILE_SLOTS => {
                RAW_DEVICE_FIRST + n as u32
            }
            KeyCode::Device(DeviceCommand::NewPairing) => RAW_NEW_PAIRING,
            KeyCode::Layer(_) | KeyCode::Device(_) => 0,
        }
    }
}

/// `LAYERS` layers of `KEYS` entries each.  Index 1 is entry 0.
pub struct Keymap<const LAYERS: usize, const KEYS: usize> {
    layers: [[KeyCode; KEYS]; LAYERS],
}

impl<const LAYERS: usize, const KEYS: usize> Keymap<LAYERS, KEYS> {
    pub const fn new(layers: [[KeyCode; KEYS]; LAYERS]) -> Self {
        Self { layers }
    }

    /// Build a keymap from raw 32-bit codes.
    pub const fn from_raw(raw: &[[u32; KEYS]; LAYERS]) -> Self {
        let mut layers = [[KeyCode::No; KEYS]; LAYERS];
        let mut layer = 0;
        while layer < LAYERS {
            let mut key = 0;
            while key < KEYS {
                layers[layer][key] = KeyCode::from_raw(raw[layer][key]);
                key += 1;
            }
            layer += 1;
        }
        Self { layers }
    }

    /// Entry for a 1-based key `index` on `layer`.  Anything outside the
    /// table reads as `No`.
    pub fn get(&self, layer: u8, index: u8) -> KeyCode {
        if index == 0 {
            return KeyCode::No;
        }
        self.layers
            .get(layer as usize)
            .and_then(|l| l.get(index as usize - 1))
            .copied()
            .unwrap_or(KeyCode::No)
    }

    /// First non-transparent entry for `index` strictly below `layer`,
    /// searching downwards.
    pub fn fall_through(&self, layer: u8, index: u8) -> Option<KeyCode> {
        (0..layer)
            .rev()
            .map(|l| self.get(l, index))
            .find(|code| *code != KeyCode::Transparent)
    }

    pub const fn layer_count(&self) -> usize {
        LAYERS
    }
}

/// Named keymap entries.
#[allow(missing_docs)]
pub mod kc {
    use super::{modifier as m, DeviceCommand, KeyCode};

    pub const NO: KeyCode = KeyCode::No;
    pub const TRNS: KeyCode = KeyCode::Transparent;

    pub const A: KeyCode = KeyCode::key(0x04);
    pub const B: KeyCode = KeyCode::key(0x05);
    pub const C: KeyCode = KeyCode::key(0x06);
    pub const D: KeyCode = KeyCode::key(0x07);
    pub const E: KeyCode = KeyCode::key(0x08);
    pub const F: KeyCode = KeyCode::key(0x09);
    pub const G: KeyCode = KeyCode::key(0x0A);
    pub const H: KeyCode = KeyCode::key(0x0B);
    pub const I: KeyCode = KeyCode::key(0x0C);
    pub const J: KeyCode = KeyCode::key(0x0D);
    pub const K: KeyCode = KeyCode::key(0x0E);
    pub const L: KeyCode = KeyCode::key(0x0F);
    pub const M: KeyCode = KeyCode::key(0x10);
    pub const N: KeyCode = KeyCode::key(0x11);
    pub const O: KeyCode = KeyCode::key(0x12);
    pub const P: KeyCode = KeyCode::key(0x13);
    pub const Q: KeyCode = KeyCode::key(0x14);
    pub const R: KeyCode = KeyCode::key(0x15);
    pub const S: KeyCode = KeyCode::key(0x16);
    pub const T: KeyCode = KeyCode::key(0x17);
    pub const U: KeyCode = KeyCode::key(0x18);
    pub const V: KeyCode = KeyCode::key(0x19);
    pub const W: KeyCode = KeyCode::key(0x1A);
    pub const X: KeyCode = KeyCode::key(0x1B);
    pub const Y: KeyCode = KeyCode::key(0x1C);
    pub const Z: KeyCode = KeyCode::key(0x1D);
    pub const N1: KeyCode = KeyCode::key(0x1E);
    pub const N2: KeyCode = KeyCode::key(0x1F);
    pub const N3: KeyCode = KeyCode::key(0x20);
    pub const N4: KeyCode = KeyCode::key(0x21);
    pub const N5: KeyCode = KeyCode::key(0x22);
    pub const N6: KeyCode = KeyCode::key(0x23);
    pub const N7: KeyCode = KeyCode::key(0x24);
    pub const N8: KeyCode = KeyCode::key(0x25);
    pub const N9: KeyCode = KeyCode::key(0x26);
    pub const N0: KeyCode = KeyCode::key(0x27);
    pub const ENT: KeyCode = KeyCode::key(0x28);
    pub const ESC: KeyCode = KeyCode::key(0x29);
    pub const BSPC: KeyCode = KeyCode::key(0x2A);
    pub const TAB: KeyCode = KeyCode::key(0x2B);
    pub const SPC: KeyCode = KeyCode::key(0x2C);
    pub const MINS: KeyCode = KeyCode::key(0x2D);
    pub const EQL: KeyCode = KeyCode::key(0x2E);
    pub const LBRC: KeyCode = KeyCode::key(0x2F);
    pub const RBRC: KeyCode = KeyCode::key(0x30);
    pub const BSLS: KeyCode = KeyCode::key(0x31);
    pub const SCLN: KeyCode = KeyCode::key(0x33);
    pub const QUOT: KeyCode = KeyCode::key(0x34);
    pub const GRV: KeyCode = KeyCode::key(0x35);
    pub const COMM: KeyCode = KeyCode::key(0x36);
    pub const DOT: KeyCode = KeyCode::key(0x37);
    pub const SLSH: KeyCode = KeyCode::key(0x38);
    pub const CAPS: KeyCode = KeyCode::key(0x39);
    pub const F1: KeyCode = KeyCode::key(0x3A);
    pub const F2: KeyCode = KeyCode::key(0x3B);
    pub const F3: KeyCode = KeyCode::key(0x3C);
    pub const F4: KeyCode = KeyCode::key(0x3D);
    pub const F5: KeyCode = KeyCode::key(0x3E);
    pub const F6: KeyCode = KeyCode::key(0x3F);
    pub const F7: KeyCode = KeyCode::key(0x40);
    pub const F8: KeyCode = KeyCode::key(0x41);
    pub const F9: KeyCode = KeyCode::key(0x42);
    pub const F10: KeyCode = KeyCode::key(0x43);
    pub const F11: KeyCode = KeyCode::key(0x44);
    pub const F12: KeyCode = KeyCode::key(0x45);
    pub const HOME: KeyCode = KeyCode::key(0x4A);
    pub const PGUP: KeyCode = KeyCode::key(0x4B);
    pub const DEL: KeyCode = KeyCode::key(0x4C);
    pub const END: KeyCode = KeyCode::key(0x4D);
    pub const PGDN: KeyCode = KeyCode::key(0x4E);
    pub const RGHT: KeyCode = KeyCode::key(0x4F);
    pub const LEFT: KeyCode = KeyCode::key(0x50);
    pub const DOWN: KeyCode = KeyCode::key(0x51);
    pub const UP: KeyCode = KeyCode::key(0x52);
    pub const NLCK: KeyCode = KeyCode::key(0x53);
    pub const PSLS: KeyCode = KeyCode::key(0x54);
    pub const PAST: KeyCode = KeyCode::key(0x55);
    pub const PMNS: KeyCode = KeyCode::key(0x56);
    pub const PPLS: KeyCode = KeyCode::key(0x57);
    pub const PENT: KeyCode = KeyCode::key(0x58);
    pub const P1: KeyCode = KeyCode::key(0x59);
    pub const P2: KeyCode = KeyCode::key(0x5A);
    pub const P3: KeyCode = KeyCode::key(0x5B);
    pub const P4: KeyCode = KeyCode::key(0x5C);
    pub const P5: KeyCode = KeyCode::key(0x5D);
    pub const P6: KeyCode = KeyCode::key(0x5E);
    pub const P7: KeyCode = KeyCode::key(0x5F);
    pub const P8: KeyCode = KeyCode::key(0x60);
    pub const P9: KeyCode = KeyCode::key(0x61);
    pub const P0: KeyCode = KeyCode::key(0x62);
    pub const PDOT: KeyCode = KeyCode::key(0x63);

    pub const LCTL: KeyCode = KeyCode::modifier(m::LCTRL);
    pub const LSFT: KeyCode = KeyCode::modifier(m::LSHIFT);
    pub const LALT: KeyCode = KeyCode::modifier(m::LALT);
    pub const LGUI: KeyCode = KeyCode::modifier(m::LGUI);
    pub const RCTL: KeyCode = KeyCode::modifier(m::RCTRL);
    pub const RSFT: KeyCode = KeyCode::modifier(m::RSHIFT);
    pub const RALT: KeyCode = KeyCode::modifier(m::RALT);
    pub const RGUI: KeyCode = KeyCode::modifier(m::RGUI);

    pub const TILD: KeyCode = KeyCode::shifted(0x35);
    pub const EXLM: KeyCode = KeyCode::shifted(0x1E);
    pub const AT: KeyCode = KeyCode::shifted(0x1F);
    pub const HASH: KeyCode = KeyCode::shifted(0x20);
    pub const DLR: KeyCode = KeyCode::shifted(0x21);
    pub const PERC: KeyCode = KeyCode::shifted(0x22);
    pub const CIRC: KeyCode = KeyCode::shifted(0x23);
    pub const AMPR: KeyCode = KeyCode::shifted(0x24);
    pub const ASTR: KeyCode = KeyCode::shifted(0x25);
    pub const LPRN: KeyCode = KeyCode::shifted(0x26);
    pub const RPRN: KeyCode = KeyCode::shifted(0x27);
    pub const UNDS: KeyCode = KeyCode::shifted(0x2D);
    pub const PLUS: KeyCode = KeyCode::shifted(0x2E);
    pub const LCBR: KeyCode = KeyCode::shifted(0x2F);
    pub const RCBR: KeyCode = KeyCode::shifted(0x30);
    pub const PIPE: KeyCode = KeyCode::shifted(0x31);

    /// Ctrl+Left / Ctrl+Right.
    pub const PRWD: KeyCode = KeyCode::with_modifiers(m::LCTRL, 0x50);
    pub const NXWD: KeyCode = KeyCode::with_modifiers(m::LCTRL, 0x4F);

    pub const VOLU: KeyCode = KeyCode::Consumer(0x00E9);
    pub const VOLD: KeyCode = KeyCode::Consumer(0x00EA);
    pub const MUTE: KeyCode = KeyCode::Consumer(0x00E2);
    pub const MPLY: KeyCode = KeyCode::Consumer(0x00CD);
    pub const MNXT: KeyCode = KeyCode::Consumer(0x00B5);
    pub const MPRV: KeyCode = KeyCode::Consumer(0x00B6);
    pub const BRIU: KeyCode = KeyCode::Consumer(0x006F);
    pub const BRID: KeyCode = KeyCode::Consumer(0x0070);

    pub const DVC1: KeyCode = KeyCode::Device(DeviceCommand::Switch(0));
    pub const DVC2: KeyCode = KeyCode::Device(DeviceCommand::Switch(1));
    pub const DVC3: KeyCode = KeyCode::Device(DeviceCommand::Switch(2));
    pub const DVCN: KeyCode = KeyCode::Device(DeviceCommand::NewPairing);

    pub const L0: KeyCode = KeyCode::Layer(0);
    pub const L1: KeyCode = KeyCode::Layer(1);
    pub const L2: KeyCode = KeyCode::Layer(2);
    pub const L3: KeyCode = KeyCode::Layer(3);
    pub const L4: KeyCode = KeyCode::Layer(4);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_decode_to_variants() {
        assert_eq!(KeyCode::from_raw(0x00), KeyCode::No);
        assert_eq!(KeyCode::from_raw(0x03), KeyCode::Transparent);
        assert_eq!(KeyCode::from_raw(0x04), kc::A);
        assert_eq!(KeyCode::from_raw(0xA4), KeyCode::key(0xA4));
        assert_eq!(KeyCode::from_raw(0xA5), kc::DVC1);
        assert_eq!(KeyCode::from_raw(0xA7), kc::DVC3);
        assert_eq!(KeyCode::from_raw(0xA8), kc::DVCN);
        assert_eq!(KeyCode::from_raw(0xA9), kc::L0);
        assert_eq!(KeyCode::from_raw(0xAA), kc::L1);
        assert_eq!(KeyCode::from_raw(0xB8), KeyCode::Layer(15));
        assert_eq!(KeyCode::from_raw(0xB9), KeyCode::No);
        assert_eq!(KeyCode::from_raw(0x01), KeyCode::No);
    }

    #[test]
    fn raw_modifier_codes() {
        assert_eq!(KeyCode::from_raw(0x0200), kc::LSFT);
        assert_eq!(KeyCode::from_raw(0x0235), kc::TILD);
        assert_eq!(KeyCode::from_raw(0x0150), kc::PRWD);
        // Modifier bits on a non-key base keep only the modifiers.
        assert_eq!(KeyCode::from_raw(0x02A9), kc::LSFT);
    }

    #[test]
    fn raw_consumer_codes() {
        assert_eq!(KeyCode::from_raw(0x0100_00E9), kc::VOLU);
        assert_eq!(kc::MUTE.to_raw(), 0x0100_00E2);
        assert_eq!(KeyCode::from_raw(0x0001_0004), KeyCode::No);
    }

    #[test]
    fn named_codes_survive_raw_form() {
        for code in [kc::A, kc::TRNS, kc::PIPE, kc::RGUI, kc::BRID, kc::L4, kc::DVC2, kc::DVCN] {
            assert_eq!(KeyCode::from_raw(code.to_raw()), code);
        }
    }

    #[test]
    fn out_of_range_values_have_no_raw_form() {
        assert_eq!(KeyCode::Layer(16).to_raw(), 0);
        assert_eq!(KeyCode::Device(DeviceCommand::Switch(3)).to_raw(), 0);
    }

    #[test]
    fn lookup_is_one_based_and_total() {
        let keymap = Keymap::new([[kc::A, kc::B], [kc::TRNS, kc::C]]);
        assert_eq!(keymap.get(0, 1), kc::A);
        assert_eq!(keymap.get(1, 2), kc::C);
        assert_eq!(keymap.get(0, 0), KeyCode::No);
        assert_eq!(keymap.get(0, 3), KeyCode::No);
        assert_eq!(keymap.get(2, 1), KeyCode::No);
    }

    #[test]
    fn fall_through_skips_transparent_layers() {
        let keymap = Keymap::new([[kc::A], [kc::TRNS], [kc::TRNS]]);
        assert_eq!(keymap.fall_through(2, 1), Some(kc::A));

        let all_transparent = Keymap::new([[kc::TRNS], [kc::TRNS]]);
        assert_eq!(all_transparent.fall_through(1, 1), None);
        assert_eq!(all_transparent.fall_through(0, 1), None);
    }

    #[test]
    fn keymap_from_raw_table() {
        const RAW: [[u32; 3]; 2] = [[0x04, 0xAA, 0x0100_00E9], [0x03, 0x05, 0x00]];
        let keymap = Keymap::from_raw(&RAW);
        assert_eq!(keymap.get(0, 1), kc::A);
        assert_eq!(keymap.get(0, 2), kc::L1);
        assert_eq!(keymap.get(0, 3), kc::VOLU);
        assert_eq!(keymap.get(1, 1), kc::TRNS);
        assert_eq!(keymap.layer_count(), 2);
    }
}
