use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{MAX_WEIGHT, MIN_WEIGHT};

/// Stable entry identifier. The persisted wire shape carries string ids, so
/// this wraps `String` rather than `Uuid`; freshly minted ids are UUIDv4.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Lora,
    Folder,
}

impl Default for ItemType {
    fn default() -> Self {
        Self::Lora
    }
}

/// Sentinel for "no file picked".
pub const NONE_LORA: &str = "None";

fn default_lora_name() -> String {
    NONE_LORA.to_string()
}

fn default_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

/// A LoRA reference row. `parent_id`, when set, names the containing folder;
/// top-level entries carry no parent.
#[derive(Debug, Clone, PartialEq)]
pub struct LoraEntry {
    pub id: EntryId,
    pub display_name: String,
    pub custom_text: String,
    pub lora_name: String,
    pub weight: f64,
    pub enabled: bool,
    pub parent_id: Option<EntryId>,
}

impl LoraEntry {
    pub fn new() -> Self {
        Self {
            id: EntryId::generate(),
            display_name: String::new(),
            custom_text: String::new(),
            lora_name: default_lora_name(),
            weight: default_weight(),
            enabled: default_enabled(),
            parent_id: None,
        }
    }

    pub fn with_lora_name(mut self, lora_name: impl Into<String>) -> Self {
        self.lora_name = lora_name.into();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.clamp(MIN_WEIGHT, MAX_WEIGHT);
        self
    }
}

impl Default for LoraEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// A grouping row. Folders are always top-level and hold zero or more LoRA
/// entries by back-reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderEntry {
    pub id: EntryId,
    pub name: String,
    pub is_collapsed: bool,
}

impl FolderEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntryId::generate(),
            name: name.into(),
            is_collapsed: false,
        }
    }
}

/// One item in the editable list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEntry", into = "RawEntry")]
pub enum Entry {
    Lora(LoraEntry),
    Folder(FolderEntry),
}

impl Entry {
    pub fn id(&self) -> &EntryId {
        match self {
            Entry::Lora(lora) => &lora.id,
            Entry::Folder(folder) => &folder.id,
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            Entry::Lora(_) => ItemType::Lora,
            Entry::Folder(_) => ItemType::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Entry::Folder(_))
    }

    pub fn parent_id(&self) -> Option<&EntryId> {
        match self {
            Entry::Lora(lora) => lora.parent_id.as_ref(),
            Entry::Folder(_) => None,
        }
    }

    pub fn as_lora(&self) -> Option<&LoraEntry> {
        match self {
            Entry::Lora(lora) => Some(lora),
            Entry::Folder(_) => None,
        }
    }

    pub fn as_lora_mut(&mut self) -> Option<&mut LoraEntry> {
        match self {
            Entry::Lora(lora) => Some(lora),
            Entry::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderEntry> {
        match self {
            Entry::Folder(folder) => Some(folder),
            Entry::Lora(_) => None,
        }
    }

    pub fn as_folder_mut(&mut self) -> Option<&mut FolderEntry> {
        match self {
            Entry::Folder(folder) => Some(folder),
            Entry::Lora(_) => None,
        }
    }
}

/// Wire form. Older saved documents omit newer fields (`item_type`,
/// `parent_id`, `display_name`, `custom_text`, `is_collapsed`, `name`), so
/// every field defaults; type-specific fields are skipped when absent on the
/// way out.
#[derive(Debug, Serialize, Deserialize)]
struct RawEntry {
    #[serde(default = "EntryId::generate")]
    id: EntryId,
    #[serde(default)]
    item_type: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lora_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<EntryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_collapsed: Option<bool>,
}

impl From<RawEntry> for Entry {
    fn from(raw: RawEntry) -> Self {
        match raw.item_type {
            ItemType::Lora => Entry::Lora(LoraEntry {
                id: raw.id,
                display_name: raw.display_name.unwrap_or_default(),
                custom_text: raw.custom_text.unwrap_or_default(),
                lora_name: raw.lora_name.unwrap_or_else(default_lora_name),
                // Not clamped here: the wire form reports what the document
                // says so consistency checks can see an out-of-range value.
                // `EntryList::parse_json` clamps during its sanitize sweep.
                weight: raw.weight.unwrap_or_else(default_weight),
                enabled: raw.enabled.unwrap_or_else(default_enabled),
                parent_id: raw.parent_id,
            }),
            ItemType::Folder => Entry::Folder(FolderEntry {
                id: raw.id,
                name: raw.name.unwrap_or_default(),
                is_collapsed: raw.is_collapsed.unwrap_or(false),
            }),
        }
    }
}

impl From<Entry> for RawEntry {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::Lora(lora) => RawEntry {
                id: lora.id,
                item_type: ItemType::Lora,
                display_name: Some(lora.display_name),
                custom_text: Some(lora.custom_text),
                lora_name: Some(lora.lora_name),
                weight: Some(lora.weight),
                enabled: Some(lora.enabled),
                parent_id: lora.parent_id,
                name: None,
                is_collapsed: None,
            },
            Entry::Folder(folder) => RawEntry {
                id: folder.id,
                item_type: ItemType::Folder,
                display_name: None,
                custom_text: None,
                lora_name: None,
                weight: None,
                enabled: None,
                parent_id: None,
                name: Some(folder.name),
                is_collapsed: Some(folder.is_collapsed),
            },
        }
    }
}
