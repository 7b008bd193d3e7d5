use serde::{Deserialize, Serialize};

use crate::{Entry, EntryId, EntryList, ListError, MAX_WEIGHT, MIN_WEIGHT};

/// Editor-facing mutations. Unlike the direct `EntryList` API, commands
/// report stale ids as errors so the undo history never records a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EntryCommand {
    InsertEntry {
        entry: Entry,
        #[serde(default)]
        position: Option<usize>,
    },
    RemoveEntry {
        id: EntryId,
    },
    /// Re-seat an entry at an exact position with an exact state. Used as the
    /// inverse of `MoveEntry`.
    RestoreEntry {
        entry: Entry,
        position: usize,
    },
    MoveEntry {
        source: EntryId,
        target: EntryId,
    },
    SetEnabled {
        id: EntryId,
        enabled: bool,
    },
    SetWeight {
        id: EntryId,
        weight: f64,
    },
    SetDisplayName {
        id: EntryId,
        display_name: String,
    },
    SetCustomText {
        id: EntryId,
        custom_text: String,
    },
    SetLoraName {
        id: EntryId,
        lora_name: String,
    },
    SetParent {
        id: EntryId,
        parent_id: Option<EntryId>,
    },
    SetFolderName {
        id: EntryId,
        name: String,
    },
    ToggleCollapsed {
        id: EntryId,
    },
}

pub fn apply_command(
    list: &mut EntryList,
    command: EntryCommand,
) -> Result<EntryCommand, ListError> {
    match command {
        EntryCommand::InsertEntry { entry, position } => insert_entry(list, entry, position),
        EntryCommand::RemoveEntry { id } => remove_entry(list, id),
        EntryCommand::RestoreEntry { entry, position } => restore_entry(list, entry, position),
        EntryCommand::MoveEntry { source, target } => move_entry(list, source, target),
        EntryCommand::SetEnabled { id, enabled } => set_enabled(list, id, enabled),
        EntryCommand::SetWeight { id, weight } => set_weight(list, id, weight),
        EntryCommand::SetDisplayName { id, display_name } => {
            set_display_name(list, id, display_name)
        }
        EntryCommand::SetCustomText { id, custom_text } => set_custom_text(list, id, custom_text),
        EntryCommand::SetLoraName { id, lora_name } => set_lora_name(list, id, lora_name),
        EntryCommand::SetParent { id, parent_id } => set_parent(list, id, parent_id),
        EntryCommand::SetFolderName { id, name } => set_folder_name(list, id, name),
        EntryCommand::ToggleCollapsed { id } => toggle_collapsed(list, id),
    }
}

fn position_of(list: &EntryList, id: &EntryId) -> Result<usize, ListError> {
    list.entries
        .iter()
        .position(|e| e.id() == id)
        .ok_or_else(|| ListError::EntryNotFound(id.clone()))
}

fn insert_entry(
    list: &mut EntryList,
    entry: Entry,
    position: Option<usize>,
) -> Result<EntryCommand, ListError> {
    if list.get(entry.id()).is_some() {
        return Err(ListError::EntryExists(entry.id().clone()));
    }
    let id = entry.id().clone();
    let at = position.unwrap_or(list.entries.len()).min(list.entries.len());
    list.entries.insert(at, entry);
    Ok(EntryCommand::RemoveEntry { id })
}

fn remove_entry(list: &mut EntryList, id: EntryId) -> Result<EntryCommand, ListError> {
    let position = position_of(list, &id)?;
    if list.entries[position].is_folder() && list.has_children(&id) {
        return Err(ListError::HasChildren(id));
    }
    let entry = list.entries.remove(position);
    Ok(EntryCommand::InsertEntry {
        entry,
        position: Some(position),
    })
}

fn restore_entry(
    list: &mut EntryList,
    entry: Entry,
    position: usize,
) -> Result<EntryCommand, ListError> {
    let current = position_of(list, entry.id())?;
    let previous = list.entries.remove(current);
    let at = position.min(list.entries.len());
    list.entries.insert(at, entry);
    Ok(EntryCommand::RestoreEntry {
        entry: previous,
        position: current,
    })
}

fn move_entry(
    list: &mut EntryList,
    source: EntryId,
    target: EntryId,
) -> Result<EntryCommand, ListError> {
    if source == target {
        return Err(ListError::InvalidOp(format!(
            "cannot move entry onto itself: {source}"
        )));
    }
    let position = position_of(list, &source)?;
    position_of(list, &target)?;
    let snapshot = list.entries[position].clone();
    list.move_entry(&source, &target);
    Ok(EntryCommand::RestoreEntry {
        entry: snapshot,
        position,
    })
}

fn set_enabled(
    list: &mut EntryList,
    id: EntryId,
    enabled: bool,
) -> Result<EntryCommand, ListError> {
    let lora = lora_of(list, &id)?;
    let previous = lora.enabled;
    list.set_enabled(&id, enabled);
    Ok(EntryCommand::SetEnabled {
        id,
        enabled: previous,
    })
}

fn set_weight(list: &mut EntryList, id: EntryId, weight: f64) -> Result<EntryCommand, ListError> {
    let lora = lora_of(list, &id)?;
    let previous = lora.weight;
    list.set_weight(&id, weight.clamp(MIN_WEIGHT, MAX_WEIGHT));
    Ok(EntryCommand::SetWeight {
        id,
        weight: previous,
    })
}

fn set_display_name(
    list: &mut EntryList,
    id: EntryId,
    display_name: String,
) -> Result<EntryCommand, ListError> {
    let lora = lora_of(list, &id)?;
    let previous = lora.display_name.clone();
    list.set_display_name(&id, display_name);
    Ok(EntryCommand::SetDisplayName {
        id,
        display_name: previous,
    })
}

fn set_custom_text(
    list: &mut EntryList,
    id: EntryId,
    custom_text: String,
) -> Result<EntryCommand, ListError> {
    let lora = lora_of(list, &id)?;
    let previous = lora.custom_text.clone();
    list.set_custom_text(&id, custom_text);
    Ok(EntryCommand::SetCustomText {
        id,
        custom_text: previous,
    })
}

fn set_lora_name(
    list: &mut EntryList,
    id: EntryId,
    lora_name: String,
) -> Result<EntryCommand, ListError> {
    let lora = lora_of(list, &id)?;
    let previous = lora.lora_name.clone();
    list.set_lora_name(&id, lora_name);
    Ok(EntryCommand::SetLoraName {
        id,
        lora_name: previous,
    })
}

fn set_parent(
    list: &mut EntryList,
    id: EntryId,
    parent_id: Option<EntryId>,
) -> Result<EntryCommand, ListError> {
    if let Some(folder_id) = &parent_id {
        if !list.get(folder_id).is_some_and(Entry::is_folder) {
            return Err(ListError::InvalidOp(format!(
                "parent is not a folder: {folder_id}"
            )));
        }
    }
    let lora = lora_of(list, &id)?;
    let previous = lora.parent_id.clone();
    list.set_parent(&id, parent_id.as_ref());
    Ok(EntryCommand::SetParent {
        id,
        parent_id: previous,
    })
}

fn set_folder_name(
    list: &mut EntryList,
    id: EntryId,
    name: String,
) -> Result<EntryCommand, ListError> {
    let folder = list
        .get(&id)
        .ok_or_else(|| ListError::EntryNotFound(id.clone()))?
        .as_folder()
        .ok_or_else(|| ListError::InvalidOp(format!("not a folder entry: {id}")))?;
    let previous = folder.name.clone();
    list.set_folder_name(&id, name);
    Ok(EntryCommand::SetFolderName { id, name: previous })
}

fn toggle_collapsed(list: &mut EntryList, id: EntryId) -> Result<EntryCommand, ListError> {
    match list.get(&id) {
        None => return Err(ListError::EntryNotFound(id)),
        Some(entry) if !entry.is_folder() => {
            return Err(ListError::InvalidOp(format!("not a folder entry: {id}")))
        }
        Some(_) => {}
    }
    list.toggle_collapsed(&id);
    // Toggling is its own inverse.
    Ok(EntryCommand::ToggleCollapsed { id })
}

fn lora_of<'a>(list: &'a EntryList, id: &EntryId) -> Result<&'a crate::LoraEntry, ListError> {
    list.get(id)
        .ok_or_else(|| ListError::EntryNotFound(id.clone()))?
        .as_lora()
        .ok_or_else(|| ListError::InvalidOp(format!("not a lora entry: {id}")))
}

#[derive(Debug, Default, Clone)]
pub struct CommandHistory {
    undo_stack: Vec<EntryCommand>,
    redo_stack: Vec<EntryCommand>,
}

impl CommandHistory {
    pub fn apply(&mut self, list: &mut EntryList, command: EntryCommand) -> Result<(), ListError> {
        let inverse = apply_command(list, command)?;
        self.undo_stack.push(inverse);
        self.redo_stack.clear();
        Ok(())
    }

    pub fn undo(&mut self, list: &mut EntryList) -> Result<(), ListError> {
        let command = self
            .undo_stack
            .pop()
            .ok_or(ListError::HistoryEmpty("undo stack"))?;
        // A failed step stays on the stack; the history never loses it.
        match apply_command(list, command.clone()) {
            Ok(inverse) => {
                self.redo_stack.push(inverse);
                Ok(())
            }
            Err(e) => {
                self.undo_stack.push(command);
                Err(e)
            }
        }
    }

    pub fn redo(&mut self, list: &mut EntryList) -> Result<(), ListError> {
        let command = self
            .redo_stack
            .pop()
            .ok_or(ListError::HistoryEmpty("redo stack"))?;
        match apply_command(list, command.clone()) {
            Ok(inverse) => {
                self.undo_stack.push(inverse);
                Ok(())
            }
            Err(e) => {
                self.redo_stack.push(command);
                Err(e)
            }
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
