//! Key registry - the ordered set of currently held keys.
//!
//! Slot order is press order.  It decides which keys win the limited
//! rollover positions of a report and in which order layer keys affect
//! later keys during translation, so removal shifts the remainder left
//! instead of swapping.

use heapless::Vec;

/// Half of the keyboard a key edit came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    /// Scanned by this half.
    Local,
    /// Relayed from the other half.
    Remote,
}

/// What a held key contributes to the outgoing reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Translation {
    /// Not resolved yet (or a held layer key, resolved again every pass).
    Untranslated,
    /// Resolved to nothing reportable.
    NoReport,
    /// Modifier bits only.
    Modifier(u8),
    /// A keyboard usage.
    Key(u8),
    /// A keyboard usage sent together with modifier bits.
    KeyWithModifier(u8, u8),
    /// A consumer-control usage.
    Consumer(u16),
}

impl Translation {
    pub fn is_untranslated(&self) -> bool {
        matches!(self, Translation::Untranslated)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySlot {
    /// 1-based logical key index.
    pub index: u8,
    pub source: Source,
    pub translation: Translation,
}

/// Fixed-capacity ordered collection of held keys.
#[derive(Debug)]
pub struct KeyRegistry<const N: usize> {
    slots: Vec<KeySlot, N>,
}

impl<const N: usize> KeyRegistry<N> {
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Apply one signed key edit.
    ///
    /// A positive index appends an untranslated slot (dropped when full
    /// or when the same key from the same source is already held).
    /// A negative index removes the slot with the same index and source.
    /// Zero and unmatched releases are ignored.
    pub fn apply(&mut self, edit: i8, source: Source) {
        if edit > 0 {
            if self.position(edit as u8, source).is_some() {
                debug!("key {} already held, press ignored", edit);
                return;
            }
            let slot = KeySlot {
                index: edit as u8,
                source,
                translation: Translation::Untranslated,
            };
            if self.slots.push(slot).is_err() {
                warn!("key registry full, dropping key {}", edit);
            }
        } else if edit < 0 {
            let index = edit.unsigned_abs();
            if let Some(pos) = self.position(index, source) {
                self.slots.remove(pos);
            } else {
                trace!("release of key {} with no held slot", index);
            }
        }
    }

    fn position(&self, index: u8, source: Source) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.index == index && s.source == source)
    }

    /// Remove every slot that came from `source`, keeping the order of
    /// the rest.  Returns how many were removed.
    pub fn remove_all(&mut self, source: Source) -> usize {
        let before = self.slots.len();
        self.slots.retain(|s| s.source != source);
        before - self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeySlot> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut KeySlot> {
        self.slots.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }
}

impl<const N: usize> Default for KeyRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held<const N: usize>(registry: &KeyRegistry<N>) -> heapless::Vec<(u8, Source), N> {
        registry.iter().map(|s| (s.index, s.source)).collect()
    }

    #[test]
    fn press_then_release_keeps_order_of_rest() {
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(1, Source::Local);
        registry.apply(3, Source::Local);
        assert_eq!(
            held(&registry).as_slice(),
            &[(1, Source::Local), (3, Source::Local)]
        );

        registry.apply(-1, Source::Local);
        assert_eq!(held(&registry).as_slice(), &[(3, Source::Local)]);
    }

    #[test]
    fn new_slot_is_untranslated() {
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(7, Source::Remote);
        let slot = registry.iter().next().unwrap();
        assert_eq!(slot.translation, Translation::Untranslated);
        assert_eq!(slot.source, Source::Remote);
    }

    #[test]
    fn press_beyond_capacity_is_dropped() {
        let mut registry = KeyRegistry::<2>::new();
        registry.apply(1, Source::Local);
        registry.apply(2, Source::Local);
        registry.apply(3, Source::Local);
        assert!(registry.is_full());
        assert_eq!(
            held(&registry).as_slice(),
            &[(1, Source::Local), (2, Source::Local)]
        );

        // The dropped key's release is a no-op.
        registry.apply(-3, Source::Local);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn release_matches_source() {
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(5, Source::Local);
        registry.apply(5, Source::Remote);

        registry.apply(-5, Source::Remote);
        assert_eq!(held(&registry).as_slice(), &[(5, Source::Local)]);

        registry.apply(-5, Source::Remote);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_all_drops_only_that_source() {
        let mut registry = KeyRegistry::<8>::new();
        registry.apply(1, Source::Local);
        registry.apply(2, Source::Remote);
        registry.apply(3, Source::Local);
        registry.apply(9, Source::Remote);

        assert_eq!(registry.remove_all(Source::Remote), 2);
        assert_eq!(
            held(&registry).as_slice(),
            &[(1, Source::Local), (3, Source::Local)]
        );
        assert_eq!(registry.remove_all(Source::Remote), 0);
    }

    #[test]
    fn repeated_press_keeps_one_slot() {
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(2, Source::Remote);
        registry.apply(2, Source::Remote);
        registry.apply(2, Source::Local);
        assert_eq!(
            held(&registry).as_slice(),
            &[(2, Source::Remote), (2, Source::Local)]
        );

        registry.apply(-2, Source::Remote);
        assert_eq!(held(&registry).as_slice(), &[(2, Source::Local)]);
    }

    #[test]
    fn zero_edit_is_ignored() {
        let mut registry = KeyRegistry::<4>::new();
        registry.apply(0, Source::Local);
        assert!(registry.is_empty());
    }

    #[test]
    fn interleaved_edits_track_held_keys() {
        let mut registry = KeyRegistry::<8>::new();
        let edits: [(i8, Source); 10] = [
            (4, Source::Local),
            (2, Source::Remote),
            (6, Source::Local),
            (-4, Source::Local),
            (4, Source::Remote),
            (-9, Source::Local),
            (8, Source::Local),
            (-2, Source::Remote),
            (2, Source::Local),
            (-6, Source::Local),
        ];
        for (edit, source) in edits {
            registry.apply(edit, source);
        }
        assert_eq!(
            held(&registry).as_slice(),
            &[(4, Source::Remote), (8, Source::Local), (2, Source::Local)]
        );
    }
}
