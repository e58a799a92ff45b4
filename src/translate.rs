//! Key translator - resolves held keys through the layered keymap.
//!
//! One pass walks the registry in press order and resolves every slot
//! that is still untranslated.  The active layer starts at the base
//! layer for each pass and is changed by layer keys as they are met, so
//! a layer key pressed before another key in the same pass affects it.
//! Layer keys themselves stay untranslated and are met again on every
//! later pass while held.

use crate::keymap::{DeviceCommand, KeyCode, Keymap};
use crate::registry::{KeyRegistry, Translation};

/// Layer every pass starts from.
pub const BASE_LAYER: u8 = 0;

/// Resolve all untranslated slots.
///
/// Device commands are handed to `dispatch` the moment they are resolved;
/// their slot becomes `NoReport` so a later pass does not run them again.
pub fn translate<const N: usize, const LAYERS: usize, const KEYS: usize, F>(
    registry: &mut KeyRegistry<N>,
    keymap: &Keymap<LAYERS, KEYS>,
    mut dispatch: F,
) where
    F: FnMut(DeviceCommand),
{
    let mut active_layer = BASE_LAYER;

    for slot in registry.iter_mut() {
        if !slot.translation.is_untranslated() {
            continue;
        }

        let mut code = keymap.get(active_layer, slot.index);

        if let KeyCode::Layer(layer) = code {
            trace!("key {} switches to layer {}", slot.index, layer);
            active_layer = layer;
            continue;
        }

        if code == KeyCode::Transparent {
            slot.translation = Translation::NoReport;
            match keymap.fall_through(active_layer, slot.index) {
                Some(resolved) => code = resolved,
                None => continue,
            }
        }

        slot.translation = match code {
            KeyCode::Keyboard {
                modifiers,
                usage: 0,
            } if modifiers != 0 => Translation::Modifier(modifiers),
            KeyCode::Keyboard {
                modifiers: 0,
                usage,
            } if usage != 0 => Translation::Key(usage),
            KeyCode::Keyboard { modifiers, usage } if usage != 0 => {
                Translation::KeyWithModifier(modifiers, usage)
            }
            KeyCode::Consumer(usage) => Translation::Consumer(usage),
            KeyCode::Device(command) => {
                debug!("key {} runs {}", slot.index, command);
                dispatch(command);
                Translation::NoReport
            }
            // Empty keyboard entry, dead key, or a layer key reached through
            // a transparent entry.
            KeyCode::Keyboard { .. } | KeyCode::No | KeyCode::Layer(_) | KeyCode::Transparent => {
                Translation::NoReport
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::kc;
    use crate::registry::Source;
    use heapless::Vec;

    fn translations<const N: usize>(registry: &KeyRegistry<N>) -> Vec<Translation, N> {
        registry.iter().map(|s| s.translation).collect()
    }

    fn run<const N: usize, const L: usize, const K: usize>(
        registry: &mut KeyRegistry<N>,
        keymap: &Keymap<L, K>,
    ) -> Vec<DeviceCommand, 8> {
        let mut commands = Vec::new();
        translate(registry, keymap, |c| commands.push(c).unwrap());
        commands
    }

    #[test]
    fn plain_modifier_and_combined_keys() {
        let keymap = Keymap::new([[kc::A, kc::LSFT, kc::PIPE, kc::VOLU, kc::NO]]);
        let mut registry = KeyRegistry::<8>::new();
        for index in 1..=5 {
            registry.apply(index, Source::Local);
        }

        run(&mut registry, &keymap);
        assert_eq!(
            translations(&registry).as_slice(),
            &[
                Translation::Key(0x04),
                Translation::Modifier(0x02),
                Translation::KeyWithModifier(0x02, 0x31),
                Translation::Consumer(0x00E9),
                Translation::NoReport,
            ]
        );
    }

    #[test]
    fn layer_key_affects_later_keys_in_same_pass() {
        let keymap = Keymap::new([[kc::L1, kc::A], [kc::TRNS, kc::B]]);
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(1, Source::Local);
        registry.apply(2, Source::Local);

        run(&mut registry, &keymap);
        assert_eq!(
            translations(&registry).as_slice(),
            &[Translation::Untranslated, Translation::Key(0x05)]
        );
    }

    #[test]
    fn key_pressed_before_layer_key_keeps_base_layer() {
        let keymap = Keymap::new([[kc::L1, kc::A], [kc::TRNS, kc::B]]);
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(2, Source::Local);
        registry.apply(1, Source::Local);

        run(&mut registry, &keymap);
        assert_eq!(
            translations(&registry).as_slice(),
            &[Translation::Key(0x04), Translation::Untranslated]
        );
    }

    #[test]
    fn held_layer_key_applies_to_later_passes() {
        let keymap = Keymap::new([[kc::L1, kc::A], [kc::TRNS, kc::B]]);
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(1, Source::Local);
        run(&mut registry, &keymap);

        registry.apply(2, Source::Remote);
        run(&mut registry, &keymap);
        assert_eq!(registry.iter().nth(1).unwrap().translation, Translation::Key(0x05));
    }

    #[test]
    fn transparent_resolves_to_nearest_lower_layer() {
        let keymap = Keymap::new([
            [kc::L2, kc::A],
            [kc::TRNS, kc::C],
            [kc::TRNS, kc::TRNS],
        ]);
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(1, Source::Local);
        registry.apply(2, Source::Local);

        run(&mut registry, &keymap);
        assert_eq!(registry.iter().nth(1).unwrap().translation, Translation::Key(0x06));
    }

    #[test]
    fn transparent_on_every_layer_is_no_report() {
        let keymap = Keymap::new([[kc::L1, kc::TRNS], [kc::TRNS, kc::TRNS]]);
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(1, Source::Local);
        registry.apply(2, Source::Local);

        run(&mut registry, &keymap);
        assert_eq!(registry.iter().nth(1).unwrap().translation, Translation::NoReport);
    }

    #[test]
    fn layer_reached_through_transparent_is_no_report() {
        let keymap = Keymap::new([[kc::L1, kc::L1], [kc::TRNS, kc::TRNS]]);
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(1, Source::Local);
        registry.apply(2, Source::Local);

        run(&mut registry, &keymap);
        assert_eq!(
            translations(&registry).as_slice(),
            &[Translation::Untranslated, Translation::NoReport]
        );
    }

    #[test]
    fn device_command_dispatched_once() {
        let keymap = Keymap::new([[kc::L1, kc::A], [kc::TRNS, kc::DVC2]]);
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(1, Source::Local);
        registry.apply(2, Source::Local);

        assert_eq!(run(&mut registry, &keymap).as_slice(), &[DeviceCommand::Switch(1)]);
        assert_eq!(registry.iter().nth(1).unwrap().translation, Translation::NoReport);
        assert!(run(&mut registry, &keymap).is_empty());
    }

    #[test]
    fn second_pass_without_changes_is_noop() {
        let keymap = Keymap::new([[kc::L1, kc::A, kc::DVCN], [kc::TRNS, kc::VOLD, kc::TRNS]]);
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(1, Source::Local);
        registry.apply(2, Source::Local);
        registry.apply(3, Source::Remote);

        let first_commands = run(&mut registry, &keymap);
        let first = translations(&registry);
        let second_commands = run(&mut registry, &keymap);

        assert_eq!(first_commands.as_slice(), &[DeviceCommand::NewPairing]);
        assert!(second_commands.is_empty());
        assert_eq!(translations(&registry), first);
    }

    #[test]
    fn index_outside_keymap_is_no_report() {
        let keymap = Keymap::new([[kc::A]]);
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(40, Source::Remote);

        run(&mut registry, &keymap);
        assert_eq!(registry.iter().next().unwrap().translation, Translation::NoReport);
    }
}
