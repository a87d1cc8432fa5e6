use crate::canvas::CanvasState;

pub const NUM_CLIPBOARDS: usize = 10;

/// Slot 0 is the default slot and mirrors the most recently used non-empty named slot
/// `1..=NUM_CLIPBOARDS`.
#[derive(Debug, Clone, Default)]
pub struct ClipboardManager {
    slots: [CanvasState; NUM_CLIPBOARDS + 1],
}

impl ClipboardManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty canvas for an unused or unknown slot.
    pub fn read(&mut self, index: usize) -> CanvasState {
        let Some(canvas) = self.slots.get(index).cloned() else {
            log::warn!("clipboard slot {index} does not exist");
            return CanvasState::default();
        };
        if index != 0 && !canvas.is_empty() {
            self.slots[0] = canvas.clone();
        }
        canvas
    }

    pub fn write(&mut self, canvas: &CanvasState, index: usize) {
        let Some(slot) = self.slots.get_mut(index) else {
            log::warn!("clipboard slot {index} does not exist");
            return;
        };
        *slot = canvas.clone();
        if index != 0 {
            self.slots[0] = canvas.clone();
        }
        log::info!("copied {}x{} canvas to clipboard slot {index}", canvas.width(), canvas.height());
    }

    pub fn is_empty(&self, index: usize) -> bool {
        self.slots.get(index).is_none_or(CanvasState::is_empty)
    }

    /// Slot indices in display order: named slots first, the default slot last.
    pub fn order() -> impl Iterator<Item = usize> {
        (1..=NUM_CLIPBOARDS).chain(std::iter::once(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::ElementKind;

    fn sample() -> CanvasState {
        let mut canvas = CanvasState::new(2, 1);
        canvas.set(0, 0, ElementKind::Source.into());
        canvas
    }

    #[test]
    fn named_write_mirrors_into_default() {
        let mut clipboard = ClipboardManager::new();
        let canvas = sample();
        clipboard.write(&canvas, 3);
        assert!(clipboard.read(0).shares_storage(&canvas));
        assert!(clipboard.read(3).shares_storage(&canvas));
    }

    #[test]
    fn default_write_leaves_named_slots() {
        let mut clipboard = ClipboardManager::new();
        clipboard.write(&sample(), 0);
        assert!(clipboard.read(4).is_empty());
        assert!(clipboard.is_empty(4));
        assert!(!clipboard.is_empty(0));
    }

    #[test]
    fn reading_a_named_slot_refreshes_default() {
        let mut clipboard = ClipboardManager::new();
        let first = sample();
        let second = CanvasState::new(1, 1);
        clipboard.write(&first, 1);
        clipboard.write(&second, 0);

        clipboard.read(2);
        assert!(clipboard.read(0).shares_storage(&second), "empty slot does not mirror");
        clipboard.read(1);
        assert!(clipboard.read(0).shares_storage(&first));
    }

    #[test]
    fn unknown_slot_is_ignored() {
        let mut clipboard = ClipboardManager::new();
        clipboard.write(&sample(), NUM_CLIPBOARDS + 1);
        assert!(clipboard.read(NUM_CLIPBOARDS + 1).is_empty());
        assert!(clipboard.is_empty(0));
    }

    #[test]
    fn display_order() {
        let order: Vec<usize> = ClipboardManager::order().collect();
        assert_eq!(order.len(), NUM_CLIPBOARDS + 1);
        assert_eq!(order.first(), Some(&1));
        assert_eq!(order.last(), Some(&0));
    }
}
