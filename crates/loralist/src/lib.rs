use serde::{Deserialize, Serialize};
use thiserror::Error;

mod entry;
pub use entry::*;
mod commands;
pub use commands::*;
mod drag;
pub use drag::*;
mod view;
pub use view::*;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("invalid operation: {0}")]
    InvalidOp(String),
    #[error("entry already exists: {0}")]
    EntryExists(EntryId),
    #[error("entry not found: {0}")]
    EntryNotFound(EntryId),
    #[error("folder is not empty: {0}")]
    HasChildren(EntryId),
    #[error("history empty: {0}")]
    HistoryEmpty(&'static str),
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub const MIN_WEIGHT: f64 = -10.0;
pub const MAX_WEIGHT: f64 = 10.0;

/// The ordered, two-level-nestable entry collection. The flat `entries`
/// vector is the single source of truth: it carries both top-level order and
/// within-folder child order (children are the same sequence filtered by
/// `parent_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryList {
    pub entries: Vec<Entry>,
}

impl Default for EntryList {
    fn default() -> Self {
        // A fresh widget starts with one empty LoRA row.
        Self {
            entries: vec![Entry::Lora(LoraEntry::new())],
        }
    }
}

impl EntryList {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    fn get_mut(&mut self, id: &EntryId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id() == id)
    }

    fn index_of(&self, id: &EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    /// Appends a new top-level LoRA row with defaults.
    pub fn add_lora(&mut self) -> EntryId {
        let lora = LoraEntry::new();
        let id = lora.id.clone();
        self.entries.push(Entry::Lora(lora));
        id
    }

    /// Appends a new expanded top-level folder.
    pub fn add_folder(&mut self) -> EntryId {
        let folder = FolderEntry::new("New Folder");
        let id = folder.id.clone();
        self.entries.push(Entry::Folder(folder));
        id
    }

    pub fn has_children(&self, id: &EntryId) -> bool {
        self.entries.iter().any(|e| e.parent_id() == Some(id))
    }

    /// Removes the entry with the given id. Non-empty folders are refused
    /// with `HasChildren` and the list stays untouched; a missing id is a
    /// no-op, not an error.
    pub fn remove(&mut self, id: &EntryId) -> Result<(), ListError> {
        let Some(idx) = self.index_of(id) else {
            return Ok(());
        };
        if self.entries[idx].is_folder() && self.has_children(id) {
            return Err(ListError::HasChildren(id.clone()));
        }
        self.entries.remove(idx);
        Ok(())
    }

    pub fn set_enabled(&mut self, id: &EntryId, enabled: bool) {
        if let Some(lora) = self.get_mut(id).and_then(Entry::as_lora_mut) {
            lora.enabled = enabled;
        }
    }

    pub fn set_weight(&mut self, id: &EntryId, weight: f64) {
        if let Some(lora) = self.get_mut(id).and_then(Entry::as_lora_mut) {
            lora.weight = weight.clamp(MIN_WEIGHT, MAX_WEIGHT);
        }
    }

    pub fn set_display_name(&mut self, id: &EntryId, display_name: impl Into<String>) {
        if let Some(lora) = self.get_mut(id).and_then(Entry::as_lora_mut) {
            lora.display_name = display_name.into();
        }
    }

    pub fn set_custom_text(&mut self, id: &EntryId, custom_text: impl Into<String>) {
        if let Some(lora) = self.get_mut(id).and_then(Entry::as_lora_mut) {
            lora.custom_text = custom_text.into();
        }
    }

    pub fn set_lora_name(&mut self, id: &EntryId, lora_name: impl Into<String>) {
        if let Some(lora) = self.get_mut(id).and_then(Entry::as_lora_mut) {
            lora.lora_name = lora_name.into();
        }
    }

    pub fn set_folder_name(&mut self, id: &EntryId, name: impl Into<String>) {
        if let Some(folder) = self.get_mut(id).and_then(Entry::as_folder_mut) {
            folder.name = name.into();
        }
    }

    pub fn toggle_collapsed(&mut self, id: &EntryId) {
        if let Some(folder) = self.get_mut(id).and_then(Entry::as_folder_mut) {
            folder.is_collapsed = !folder.is_collapsed;
        }
    }

    /// Puts a LoRA entry into a folder (`Some`) or back at top level (`None`).
    /// No-op for folders, missing ids, or a target that is not a folder.
    pub fn set_parent(&mut self, id: &EntryId, folder_id: Option<&EntryId>) {
        if let Some(fid) = folder_id {
            if !self.get(fid).is_some_and(Entry::is_folder) {
                return;
            }
        }
        if let Some(idx) = self.index_of(id) {
            self.set_parent_unchecked(idx, folder_id.cloned());
        }
    }

    // Folders never take a parent; assigning one to a folder index is a no-op,
    // which is what keeps the hierarchy at two levels.
    fn set_parent_unchecked(&mut self, idx: usize, parent: Option<EntryId>) {
        if let Some(lora) = self.entries[idx].as_lora_mut() {
            lora.parent_id = parent;
        }
    }

    /// The drag-drop primitive. Dropping a LoRA onto a folder nests it as the
    /// folder's first visible child; any other drop reorders the source to
    /// sit immediately before the target and adopts the target's parent,
    /// which is also how an entry leaves a folder. Self-drops and missing ids
    /// do nothing.
    pub fn move_entry(&mut self, source: &EntryId, target: &EntryId) {
        if source == target {
            return;
        }
        let (Some(src_idx), Some(tgt_idx)) = (self.index_of(source), self.index_of(target))
        else {
            return;
        };
        if self.entries[tgt_idx].is_folder() && !self.entries[src_idx].is_folder() {
            self.set_parent_unchecked(src_idx, Some(target.clone()));
            self.reorder(source, target, Anchor::After);
        } else {
            let parent = self.entries[tgt_idx].parent_id().cloned();
            self.set_parent_unchecked(src_idx, parent);
            self.reorder(source, target, Anchor::Before);
        }
    }

    fn reorder(&mut self, source: &EntryId, target: &EntryId, anchor: Anchor) {
        let Some(src_idx) = self.index_of(source) else {
            return;
        };
        let entry = self.entries.remove(src_idx);
        let Some(tgt_idx) = self.index_of(target) else {
            // Target vanished between lookup and reorder; put the source back.
            self.entries.insert(src_idx.min(self.entries.len()), entry);
            return;
        };
        let at = match anchor {
            Anchor::Before => tgt_idx,
            Anchor::After => tgt_idx + 1,
        };
        self.entries.insert(at, entry);
    }

    /// Serializes to the persisted wire shape, `{"entries":[...]}`, in flat
    /// document order.
    pub fn to_json(&self) -> Result<String, ListError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Strict parse of a persisted document, repaired for editing: dangling
    /// `parent_id`s from corrupted or hand-edited documents are cleared to
    /// top-level and out-of-range weights are clamped. Tooling that needs to
    /// report those problems instead of repairing them should deserialize
    /// the raw document and call [`EntryList::integrity_issues`].
    pub fn parse_json(json: &str) -> Result<Self, ListError> {
        let mut list: EntryList = serde_json::from_str(json)?;
        list.sanitize();
        Ok(list)
    }

    /// Lenient parse: a malformed document yields the default single-row
    /// list instead of an unusable widget.
    pub fn from_json(json: &str) -> Self {
        Self::parse_json(json).unwrap_or_default()
    }

    fn sanitize(&mut self) {
        let folder_ids: Vec<EntryId> = self
            .entries
            .iter()
            .filter(|e| e.is_folder())
            .map(|e| e.id().clone())
            .collect();
        for entry in &mut self.entries {
            if let Some(lora) = entry.as_lora_mut() {
                if let Some(parent) = &lora.parent_id {
                    if !folder_ids.contains(parent) {
                        lora.parent_id = None;
                    }
                }
                lora.weight = lora.weight.clamp(MIN_WEIGHT, MAX_WEIGHT);
            }
        }
    }

    /// Consistency report for `validate`-style tooling: duplicate ids,
    /// dangling parents, out-of-range weights.
    pub fn integrity_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|e| e.id() == entry.id()) {
                issues.push(format!("duplicate id: {}", entry.id()));
            }
            if let Some(lora) = entry.as_lora() {
                if let Some(parent) = &lora.parent_id {
                    if !self.get(parent).is_some_and(Entry::is_folder) {
                        issues.push(format!(
                            "entry {} has dangling parent_id {}",
                            lora.id, parent
                        ));
                    }
                }
                if !(MIN_WEIGHT..=MAX_WEIGHT).contains(&lora.weight) {
                    issues.push(format!(
                        "entry {} weight {} out of range",
                        lora.id, lora.weight
                    ));
                }
            }
        }
        issues
    }
}

enum Anchor {
    Before,
    After,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(list: &mut EntryList, name: &str) -> EntryId {
        let id = list.add_folder();
        list.set_folder_name(&id, name);
        id
    }

    #[test]
    fn test_default_list_seeds_one_lora() {
        let list = EntryList::default();
        assert_eq!(list.len(), 1);
        let lora = list.entries[0].as_lora().unwrap();
        assert_eq!(lora.lora_name, NONE_LORA);
        assert_eq!(lora.weight, 1.0);
        assert!(lora.enabled);
    }

    #[test]
    fn test_remove_nonempty_folder_refused() {
        let mut list = EntryList::empty();
        let f = folder(&mut list, "Char");
        let e = list.add_lora();
        list.set_parent(&e, Some(&f));

        let before = list.clone();
        let err = list.remove(&f).unwrap_err();
        assert!(matches!(err, ListError::HasChildren(ref id) if *id == f));
        assert_eq!(list, before);

        // Once the child leaves, removal goes through.
        list.set_parent(&e, None);
        list.remove(&f).unwrap();
        assert!(list.get(&f).is_none());
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut list = EntryList::default();
        let before = list.clone();
        list.remove(&EntryId::from("ghost")).unwrap();
        assert_eq!(list, before);
    }

    #[test]
    fn test_move_lora_into_folder() {
        let mut list = EntryList::empty();
        let f = folder(&mut list, "Char");
        let e = list.add_lora();

        list.move_entry(&e, &f);

        assert_eq!(list.get(&e).unwrap().parent_id(), Some(&f));
        // First visible child: immediately after the folder header.
        assert_eq!(list.entries[0].id(), &f);
        assert_eq!(list.entries[1].id(), &e);
    }

    #[test]
    fn test_move_lora_out_of_folder() {
        let mut list = EntryList::empty();
        let f = folder(&mut list, "Char");
        let e = list.add_lora();
        let top = list.add_lora();
        list.move_entry(&e, &f);

        // Dropping next to a top-level row clears the parent.
        list.move_entry(&e, &top);

        assert_eq!(list.get(&e).unwrap().parent_id(), None);
        let e_idx = list.index_of(&e).unwrap();
        let top_idx = list.index_of(&top).unwrap();
        assert_eq!(e_idx + 1, top_idx);
    }

    #[test]
    fn test_move_folder_onto_folder_reorders_siblings() {
        let mut list = EntryList::empty();
        let a = folder(&mut list, "A");
        let b = folder(&mut list, "B");

        list.move_entry(&b, &a);

        // Sibling reorder, never folder-in-folder.
        assert_eq!(list.entries[0].id(), &b);
        assert_eq!(list.entries[1].id(), &a);
        assert_eq!(list.get(&b).unwrap().parent_id(), None);
    }

    #[test]
    fn test_move_self_or_missing_is_noop() {
        let mut list = EntryList::default();
        let id = list.entries[0].id().clone();
        let before = list.clone();
        list.move_entry(&id, &id);
        list.move_entry(&id, &EntryId::from("ghost"));
        list.move_entry(&EntryId::from("ghost"), &id);
        assert_eq!(list, before);
    }

    #[test]
    fn test_move_preserves_sibling_order_within_folder() {
        let mut list = EntryList::empty();
        let f = folder(&mut list, "Char");
        let a = list.add_lora();
        let b = list.add_lora();
        list.move_entry(&a, &f);
        list.move_entry(&b, &f);

        // Latest drop onto the folder lands first.
        let ids: Vec<&EntryId> = list.entries.iter().map(Entry::id).collect();
        assert_eq!(ids, vec![&f, &b, &a]);

        // Reorder a before b inside the folder keeps the parent.
        list.move_entry(&a, &b);
        assert_eq!(list.get(&a).unwrap().parent_id(), Some(&f));
        let ids: Vec<&EntryId> = list.entries.iter().map(Entry::id).collect();
        assert_eq!(ids, vec![&f, &a, &b]);
    }

    #[test]
    fn test_weight_clamping() {
        let mut list = EntryList::default();
        let id = list.entries[0].id().clone();
        list.set_weight(&id, 15.0);
        assert_eq!(list.entries[0].as_lora().unwrap().weight, 10.0);
        list.set_weight(&id, -99.0);
        assert_eq!(list.entries[0].as_lora().unwrap().weight, -10.0);
    }

    #[test]
    fn test_mutators_noop_on_missing_id() {
        let mut list = EntryList::default();
        let before = list.to_json().unwrap();
        let ghost = EntryId::from("ghost");
        list.set_enabled(&ghost, false);
        list.set_weight(&ghost, 5.0);
        list.set_display_name(&ghost, "x");
        list.set_custom_text(&ghost, "x");
        list.set_lora_name(&ghost, "x");
        list.set_folder_name(&ghost, "x");
        list.toggle_collapsed(&ghost);
        list.set_parent(&ghost, None);
        assert_eq!(list.to_json().unwrap(), before);
    }

    #[test]
    fn test_set_parent_rejects_non_folder_target() {
        let mut list = EntryList::empty();
        let a = list.add_lora();
        let b = list.add_lora();
        list.set_parent(&a, Some(&b));
        assert_eq!(list.get(&a).unwrap().parent_id(), None);
    }

    #[test]
    fn test_toggle_collapsed_noop_on_lora() {
        let mut list = EntryList::default();
        let id = list.entries[0].id().clone();
        let before = list.clone();
        list.toggle_collapsed(&id);
        assert_eq!(list, before);
    }

    #[test]
    fn test_drop_parsed_lora_onto_parsed_folder() {
        // entries = [folder "a", top-level lora "b"]; move(b, a).
        let json = r#"{"entries": [
            {"id": "a", "item_type": "folder", "name": "Char"},
            {"id": "b", "item_type": "lora", "lora_name": "x.safetensors", "parent_id": null}
        ]}"#;
        let mut list = EntryList::parse_json(json).unwrap();
        list.move_entry(&EntryId::from("b"), &EntryId::from("a"));

        assert_eq!(list.entries[0].id().as_str(), "a");
        assert_eq!(
            list.get(&EntryId::from("b")).unwrap().parent_id(),
            Some(&EntryId::from("a"))
        );
        assert_eq!(
            children_of(&list, &EntryId::from("a")).count(),
            1
        );
    }

    #[test]
    fn test_integrity_issues() {
        let json = r#"{"entries": [
            {"id": "a", "item_type": "lora", "parent_id": "missing", "weight": 99.0},
            {"id": "a", "item_type": "lora"}
        ]}"#;
        let list: EntryList = serde_json::from_str(json).unwrap();
        let issues = list.integrity_issues();
        assert!(issues.iter().any(|i| i.contains("duplicate id")));
        assert!(issues.iter().any(|i| i.contains("dangling parent_id")));
        assert!(issues.iter().any(|i| i.contains("out of range")));
    }
}
