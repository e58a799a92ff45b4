//! ErgoTravel: 4 x 7 matrix per half, 56 logical keys.
//!
//! Indices run left to right across both halves, 14 per row: the master
//! (left) half owns 1-7 of each row and the slave (right) half 8-14.  The
//! slave columns are wired mirrored, so its table counts down.

use crate::keymap::kc::*;
use crate::keymap::{KeyCode, Keymap};
use crate::matrix::MatrixLayout;

pub const ROWS: usize = 4;
pub const COLS: usize = 7;
pub const KEY_COUNT: usize = 56;
pub const LAYER_COUNT: usize = 5;

pub const MASTER_LAYOUT: MatrixLayout<ROWS, COLS> = [
    [1, 2, 3, 4, 5, 6, 7],
    [15, 16, 17, 18, 19, 20, 21],
    [29, 30, 31, 32, 33, 34, 35],
    [43, 44, 45, 46, 47, 48, 49],
];

pub const SLAVE_LAYOUT: MatrixLayout<ROWS, COLS> = [
    [14, 13, 12, 11, 10, 9, 8],
    [28, 27, 26, 25, 24, 23, 22],
    [42, 41, 40, 39, 38, 37, 36],
    [56, 55, 54, 53, 52, 51, 50],
];

const _______: KeyCode = TRNS;
const XXXXXXX: KeyCode = NO;

#[rustfmt::skip]
pub static KEYMAP: Keymap<LAYER_COUNT, KEY_COUNT> = Keymap::new([
    // Base
    [
        TAB,     Q,       W,       E,       R,       T,       ESC,      XXXXXXX, Y,       U,       I,       O,       P,       BSPC,
        LCTL,    A,       S,       D,       F,       G,       XXXXXXX,  XXXXXXX, H,       J,       K,       L,       SCLN,    QUOT,
        LSFT,    Z,       X,       C,       V,       B,       XXXXXXX,  DEL,     N,       M,       COMM,    DOT,     SLSH,    ENT,
        ESC,     L4,      LGUI,    LALT,    L1,      SPC,     XXXXXXX,  XXXXXXX, RSFT,    L2,      RALT,    RGUI,    XXXXXXX, XXXXXXX,
    ],
    // Symbols and numbers
    [
        TILD,    EXLM,    AT,      HASH,    DLR,     PERC,    TILD,     PIPE,    CIRC,    AMPR,    ASTR,    MINS,    EQL,     PIPE,
        GRV,     N1,      N2,      N3,      N4,      N5,      GRV,      BSLS,    N6,      N7,      N8,      N9,      N0,      BSLS,
        _______, _______, _______, LCBR,    LBRC,    LPRN,    _______,  _______, RPRN,    RBRC,    RCBR,    UNDS,    PLUS,    _______,
        _______, _______, _______, _______, _______, _______, _______,  _______, _______, L3,      _______, _______, _______, _______,
    ],
    // Function keys and navigation
    [
        F1,      F2,      F3,      F4,      F5,      F6,      _______,  _______, PGUP,    PGDN,    HOME,    END,     _______, DEL,
        F7,      F8,      F9,      F10,     F11,     F12,     _______,  _______, LEFT,    DOWN,    UP,      RGHT,    _______, _______,
        _______, _______, _______, _______, _______, _______, _______,  _______, PRWD,    NXWD,    _______, _______, _______, _______,
        _______, _______, _______, _______, L3,      _______, _______,  _______, _______, _______, _______, _______, _______, _______,
    ],
    // Numpad
    [
        _______, _______, _______, _______, _______, _______, _______,  _______, PAST,    P7,      P8,      P9,      PMNS,    NLCK,
        CAPS,    _______, _______, _______, _______, _______, _______,  _______, PSLS,    P4,      P5,      P6,      PPLS,    _______,
        _______, _______, _______, _______, _______, _______, _______,  _______, P0,      P1,      P2,      P3,      PDOT,    PENT,
        _______, _______, _______, _______, _______, _______, _______,  _______, _______, _______, _______, _______, _______, _______,
    ],
    // Media and device profiles
    [
        VOLU,    BRIU,    _______, _______, DVCN,    DVC1,    _______,  _______, _______, _______, _______, _______, _______, _______,
        VOLD,    BRID,    _______, _______, _______, DVC2,    _______,  _______, _______, _______, _______, _______, _______, _______,
        MUTE,    _______, _______, _______, _______, DVC3,    _______,  _______, _______, _______, _______, _______, _______, _______,
        _______, _______, _______, _______, _______, _______, _______,  _______, _______, _______, _______, _______, _______, _______,
    ],
]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::DeviceCommand;

    #[test]
    fn halves_cover_every_index_once() {
        let mut seen = [false; KEY_COUNT + 1];
        for row in MASTER_LAYOUT.iter().chain(SLAVE_LAYOUT.iter()) {
            for &index in row {
                assert!(index > 0 && (index as usize) <= KEY_COUNT);
                assert!(!seen[index as usize], "index {} wired twice", index);
                seen[index as usize] = true;
            }
        }
        assert!(seen[1..].iter().all(|&s| s));
    }

    #[test]
    fn base_layer_corners() {
        assert_eq!(KEYMAP.get(0, 1), TAB);
        assert_eq!(KEYMAP.get(0, 14), BSPC);
        assert_eq!(KEYMAP.get(0, 44), L4);
        assert_eq!(KEYMAP.get(0, 52), L2);
    }

    #[test]
    fn media_layer() {
        assert_eq!(KEYMAP.get(4, 1), KeyCode::Consumer(0x00E9));
        assert_eq!(KEYMAP.get(4, 6), KeyCode::Device(DeviceCommand::Switch(0)));
        assert_eq!(KEYMAP.get(4, 5), KeyCode::Device(DeviceCommand::NewPairing));
        assert_eq!(KEYMAP.get(4, 34), KeyCode::Device(DeviceCommand::Switch(2)));
    }
}
