use crate::{EntryId, EntryList};

/// Pointer-driven drag state: pointer-down captures the source, pointer-over
/// tracks the highlight candidate, pointer-up performs exactly one move and
/// clears everything. All transitions are synchronous and run to completion.
#[derive(Debug, Default, Clone)]
pub struct DragSession {
    source: Option<EntryId>,
    hover: Option<EntryId>,
}

impl DragSession {
    pub fn begin(&mut self, source: EntryId) {
        self.source = Some(source);
        self.hover = None;
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&EntryId> {
        self.source.as_ref()
    }

    /// Pointer moved over a candidate target. Returns whether the target
    /// should highlight; hovering the dragged entry itself never highlights.
    pub fn hover(&mut self, target: EntryId) -> bool {
        if !self.is_active() || self.source.as_ref() == Some(&target) {
            self.hover = None;
            return false;
        }
        self.hover = Some(target);
        true
    }

    /// Pointer left the current candidate without dropping.
    pub fn leave(&mut self) {
        self.hover = None;
    }

    pub fn highlight(&self) -> Option<&EntryId> {
        self.hover.as_ref()
    }

    /// Pointer-up. Moves the source next to the hovered target, if any, and
    /// clears all drag state either way. Returns whether a move happened.
    pub fn drop_on(&mut self, list: &mut EntryList) -> bool {
        let source = self.source.take();
        let target = self.hover.take();
        match (source, target) {
            (Some(source), Some(target)) => {
                list.move_entry(&source, &target);
                true
            }
            _ => false,
        }
    }

    /// Drag aborted (pointer-up outside any target, escape key).
    pub fn cancel(&mut self) {
        self.source = None;
        self.hover = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_loras() -> (EntryList, EntryId, EntryId) {
        let mut list = EntryList::empty();
        let a = list.add_lora();
        let b = list.add_lora();
        (list, a, b)
    }

    #[test]
    fn test_drop_moves_once_and_clears() {
        let (mut list, a, b) = two_loras();
        let mut drag = DragSession::default();

        drag.begin(b.clone());
        assert!(drag.hover(a.clone()));
        assert!(drag.drop_on(&mut list));

        assert_eq!(list.entries[0].id(), &b);
        assert!(!drag.is_active());
        assert!(drag.highlight().is_none());

        // A second pointer-up without a new drag does nothing.
        let before = list.clone();
        assert!(!drag.drop_on(&mut list));
        assert_eq!(list, before);
    }

    #[test]
    fn test_hover_self_never_highlights() {
        let (_, a, _) = two_loras();
        let mut drag = DragSession::default();
        drag.begin(a.clone());
        assert!(!drag.hover(a));
        assert!(drag.highlight().is_none());
    }

    #[test]
    fn test_cancel_leaves_list_untouched() {
        let (mut list, a, b) = two_loras();
        let before = list.clone();
        let mut drag = DragSession::default();

        drag.begin(b);
        drag.hover(a);
        drag.cancel();
        assert!(!drag.drop_on(&mut list));
        assert_eq!(list, before);
    }

    #[test]
    fn test_leave_clears_highlight_only() {
        let (_, a, b) = two_loras();
        let mut drag = DragSession::default();
        drag.begin(b);
        drag.hover(a);
        drag.leave();
        assert!(drag.is_active());
        assert!(drag.highlight().is_none());
    }
}
