//! Report builder - turns the translated registry into HID reports.
//!
//! A keyboard report and a consumer report are built independently on
//! every pass.  Non-empty reports are always produced; an empty report is
//! produced only for the first pass after its kind went from non-empty to
//! empty, so idle release-only scans do not flood the host.

use heapless::Vec;

use crate::hid::{ConsumerReport, HidReport, KeyboardReport};
use crate::registry::{KeyRegistry, Translation};

/// Reports produced by one pass (keyboard first).
pub type Reports = Vec<HidReport, 2>;

pub struct ReportBuilder {
    keyboard_empty_sent: bool,
    consumer_empty_sent: bool,
}

impl ReportBuilder {
    /// Both kinds start as "empty already sent": nothing goes out until a
    /// key is held.
    pub const fn new() -> Self {
        Self {
            keyboard_empty_sent: true,
            consumer_empty_sent: true,
        }
    }

    pub fn build<const N: usize>(&mut self, registry: &KeyRegistry<N>) -> Reports {
        let mut keyboard = KeyboardReport::empty();
        let mut consumer = ConsumerReport::empty();

        for slot in registry.iter() {
            match slot.translation {
                Translation::Modifier(mask) => keyboard.modifier |= mask,
                Translation::Key(usage) => push_key(&mut keyboard, usage),
                Translation::KeyWithModifier(mask, usage) => {
                    keyboard.modifier |= mask;
                    push_key(&mut keyboard, usage);
                }
                Translation::Consumer(usage) => consumer.usage = usage,
                Translation::Untranslated | Translation::NoReport => {}
            }
        }

        let mut reports = Reports::new();

        let keyboard_empty = keyboard.is_empty();
        if !keyboard_empty || !self.keyboard_empty_sent {
            let _ = reports.push(HidReport::Keyboard(keyboard));
        }
        self.keyboard_empty_sent = keyboard_empty;

        let consumer_empty = consumer.is_empty();
        if !consumer_empty || !self.consumer_empty_sent {
            let _ = reports.push(HidReport::Consumer(consumer));
        }
        self.consumer_empty_sent = consumer_empty;

        reports
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn push_key(report: &mut KeyboardReport, usage: u8) {
    if !report.push_key(usage) {
        debug!("rollover exceeded, key {:#x} not reported", usage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Source;

    fn registry_with(translations: &[Translation]) -> KeyRegistry<8> {
        let mut registry = KeyRegistry::new();
        for (i, _) in translations.iter().enumerate() {
            registry.apply(i as i8 + 1, Source::Local);
        }
        for (slot, t) in registry.iter_mut().zip(translations) {
            slot.translation = *t;
        }
        registry
    }

    #[test]
    fn nothing_sent_while_idle() {
        let mut builder = ReportBuilder::new();
        let registry = KeyRegistry::<8>::new();
        assert!(builder.build(&registry).is_empty());
        assert!(builder.build(&registry).is_empty());
    }

    #[test]
    fn modifiers_are_merged_and_keys_ordered() {
        let mut builder = ReportBuilder::new();
        let registry = registry_with(&[
            Translation::Key(0x0B),
            Translation::Modifier(0x01),
            Translation::KeyWithModifier(0x02, 0x31),
            Translation::NoReport,
            Translation::Untranslated,
        ]);

        let reports = builder.build(&registry);
        assert_eq!(reports.len(), 1);
        let HidReport::Keyboard(kb) = reports[0] else {
            panic!("expected keyboard report");
        };
        assert_eq!(kb.modifier, 0x03);
        assert_eq!(kb.keycodes, [0x0B, 0x31, 0, 0, 0, 0]);
    }

    #[test]
    fn rollover_truncates_to_first_six() {
        let mut builder = ReportBuilder::new();
        let registry = registry_with(&[
            Translation::Key(0x04),
            Translation::Key(0x05),
            Translation::Key(0x06),
            Translation::Key(0x07),
            Translation::Key(0x08),
            Translation::Key(0x09),
            Translation::Key(0x0A),
            Translation::Modifier(0x20),
        ]);

        let reports = builder.build(&registry);
        let HidReport::Keyboard(kb) = reports[0] else {
            panic!("expected keyboard report");
        };
        assert_eq!(kb.keycodes, [0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
        // Modifiers after the truncation point still apply.
        assert_eq!(kb.modifier, 0x20);
    }

    #[test]
    fn last_consumer_key_wins() {
        let mut builder = ReportBuilder::new();
        let registry = registry_with(&[
            Translation::Consumer(0x00E9),
            Translation::Key(0x04),
            Translation::Consumer(0x00E2),
        ]);

        let reports = builder.build(&registry);
        assert_eq!(reports.len(), 2);
        assert!(reports[0].is_keyboard());
        assert_eq!(reports[1], HidReport::Consumer(ConsumerReport::new(0x00E2)));
    }

    #[test]
    fn one_empty_report_per_release() {
        let mut builder = ReportBuilder::new();
        let held = registry_with(&[Translation::Key(0x04)]);
        let released = KeyRegistry::<8>::new();

        assert_eq!(builder.build(&held).len(), 1);
        let reports = builder.build(&released);
        assert_eq!(reports.as_slice(), &[HidReport::Keyboard(KeyboardReport::empty())]);
        assert!(builder.build(&released).is_empty());
        assert!(builder.build(&released).is_empty());
    }

    #[test]
    fn held_key_is_reported_every_pass() {
        let mut builder = ReportBuilder::new();
        let held = registry_with(&[Translation::Key(0x04)]);
        assert_eq!(builder.build(&held).len(), 1);
        assert_eq!(builder.build(&held).len(), 1);
    }

    #[test]
    fn keyboard_and_consumer_suppression_are_independent() {
        let mut builder = ReportBuilder::new();
        let both = registry_with(&[Translation::Key(0x04), Translation::Consumer(0x00EA)]);
        let key_only = registry_with(&[Translation::Key(0x04)]);

        assert_eq!(builder.build(&both).len(), 2);
        let reports = builder.build(&key_only);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1], HidReport::Consumer(ConsumerReport::empty()));

        let reports = builder.build(&key_only);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_keyboard());
    }
}
